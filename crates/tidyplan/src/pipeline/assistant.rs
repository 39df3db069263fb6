//! The cleaning assistant.
//!
//! Orchestrates one run: analyze the input, obtain a plan, execute it,
//! analyze the result, ask for insights and charts, then compose the report.

use crate::advisor::{CleaningAdvisor, InsightAdvisor, VisualAdvisor, VisualPlan};
use crate::ai::AIProvider;
use crate::config::{AssistantConfig, ConfigValidationError};
use crate::engine::TransformEngine;
use crate::error::{CleaningError, Result};
use crate::pipeline::progress::{
    AssistantStage, CancellationToken, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
use crate::plan::{CleaningPlanResponse, Plan};
use crate::profiler::DataProfiler;
use crate::reporting::{Report, ReportWriter, assistant_report};
use crate::types::{DatasetAnalysis, StepOutcome};
use polars::prelude::*;
use serde::Serialize;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Share of removed rows above which a run carries a data-loss warning.
const HIGH_ROW_LOSS_PCT: f64 = 30.0;

/// Where and why the plan stopped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanFailureInfo {
    pub failed_step: usize,
    pub error_code: &'static str,
    pub cause: String,
}

/// Everything one assistant run produced.
///
/// When the plan stopped early, `cleaned` is the partial table (every step
/// before the failing one applied) and `plan_failure` says where it stopped.
#[derive(Debug, Clone)]
pub struct AssistantResult {
    pub cleaned: DataFrame,
    pub analysis_before: DatasetAnalysis,
    pub analysis_after: DatasetAnalysis,
    pub plan: Plan,
    pub explanation: String,
    pub outcomes: Vec<StepOutcome>,
    pub plan_failure: Option<PlanFailureInfo>,
    pub insights: String,
    pub visual_plan: VisualPlan,
    pub report: Report,
    pub warnings: Vec<String>,
    /// Files written when saving to disk is enabled.
    pub saved_files: Vec<PathBuf>,
    pub duration_ms: u64,
}

impl AssistantResult {
    pub fn rows_removed(&self) -> usize {
        self.analysis_before.shape.0.saturating_sub(self.analysis_after.shape.0)
    }

    pub fn columns_removed(&self) -> usize {
        self.analysis_before.shape.1.saturating_sub(self.analysis_after.shape.1)
    }

    /// Machine-readable summary of the run (the table itself is left out).
    pub fn summary_json(&self) -> Value {
        json!({
            "shape_before": self.analysis_before.shape,
            "shape_after": self.analysis_after.shape,
            "plan": self.plan.to_json(),
            "explanation": self.explanation,
            "outcomes": self.outcomes,
            "plan_failure": self.plan_failure,
            "insights": self.insights,
            "visual_plan": self.visual_plan,
            "warnings": self.warnings,
            "saved_files": self.saved_files,
            "duration_ms": self.duration_ms,
        })
    }
}

/// The cleaning assistant.
///
/// Use [`Assistant::builder()`] to create one.
///
/// # Example
///
/// ```rust,ignore
/// use tidyplan::{Assistant, AssistantConfig};
/// use tidyplan::ai::OpenRouterProvider;
/// use std::sync::Arc;
///
/// let provider = Arc::new(OpenRouterProvider::new(api_key)?);
///
/// let result = Assistant::builder()
///     .ai_provider(provider)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .config(AssistantConfig::default())
///     .build()?
///     .run(dataframe)?;
///
/// // Without a model: run a plan from the configuration
/// let config = AssistantConfig::builder()
///     .use_ai(false)
///     .plan_override(steps)
///     .build()?;
/// let result = Assistant::builder().config(config).build()?.run(dataframe)?;
/// ```
pub struct Assistant {
    config: AssistantConfig,
    ai_provider: Option<Arc<dyn AIProvider>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: CancellationToken,
    profiler: DataProfiler,
    engine: TransformEngine,
    writer: ReportWriter,
}

static_assertions::assert_impl_all!(Assistant: Send);

impl Assistant {
    pub fn builder() -> AssistantBuilder {
        AssistantBuilder::default()
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// Run the assistant over `df`.
    ///
    /// # Errors
    ///
    /// Returns [`CleaningError::Cancelled`] if the token was cancelled, and
    /// [`CleaningError::AiClientError`] if the model could not be reached for
    /// the cleaning plan. A failing plan step is not an error: the result
    /// carries the partial table and [`AssistantResult::plan_failure`].
    pub fn run(&self, df: DataFrame) -> Result<AssistantResult> {
        match self.run_internal(df) {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Assistant finished"));
                Ok(result)
            }
            Err(e) => {
                if e.is_cancelled() {
                    self.report_progress(ProgressUpdate::cancelled());
                } else {
                    self.report_progress(ProgressUpdate::failed(e.to_string()));
                }
                error!("Assistant error: {}", e);
                Err(e)
            }
        }
    }

    /// Analyze `df` and obtain a plan without executing it.
    pub fn preview(&self, df: &DataFrame) -> Result<(DatasetAnalysis, CleaningPlanResponse)> {
        let analysis = self.profiler.analyze(df)?;
        let response = self.obtain_plan(&analysis)?;
        Ok((analysis, response))
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(CleaningError::Cancelled);
        }
        Ok(())
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    /// Provider to use for model calls, if the run is allowed to make any.
    fn provider(&self) -> Option<&dyn AIProvider> {
        if !self.config.use_ai {
            return None;
        }
        self.ai_provider.as_deref()
    }

    /// A supplied plan wins over the model; with neither, the plan is empty.
    fn obtain_plan(&self, analysis: &DatasetAnalysis) -> Result<CleaningPlanResponse> {
        if let Some(steps) = &self.config.plan_override {
            info!("Using the plan supplied in the configuration");
            return Ok(CleaningPlanResponse {
                plan: Plan::from_json_steps(&Value::Array(steps.clone())),
                explanation: "Plan supplied by the user.".to_string(),
                diagnostics: Vec::new(),
            });
        }

        if let Some(provider) = self.provider() {
            info!("Asking {} for a cleaning plan...", provider.name());
            return CleaningAdvisor::propose(provider, analysis);
        }

        info!("No model and no supplied plan; the table is left unchanged");
        Ok(CleaningPlanResponse {
            plan: Plan::default(),
            explanation: "No cleaning plan was available; the data was left unchanged.".to_string(),
            diagnostics: Vec::new(),
        })
    }

    fn run_internal(&self, df: DataFrame) -> Result<AssistantResult> {
        let start_time = Instant::now();
        let mut warnings: Vec<String> = Vec::new();

        info!("Starting assistant run...");
        self.check_cancelled()?;

        // Analyze the input
        self.report_progress(ProgressUpdate::new(
            AssistantStage::Analyzing,
            0.0,
            "Analyzing dataset...",
        ));
        let analysis_before = self.profiler.analyze(&df)?;
        debug!("Input shape: {:?}", analysis_before.shape);
        self.report_progress(ProgressUpdate::new(
            AssistantStage::Analyzing,
            1.0,
            format!(
                "Analyzed {} rows x {} columns",
                analysis_before.shape.0, analysis_before.shape.1
            ),
        ));

        self.check_cancelled()?;

        // Obtain a plan
        self.report_progress(ProgressUpdate::new(
            AssistantStage::Planning,
            0.0,
            "Preparing cleaning plan...",
        ));
        let CleaningPlanResponse {
            plan,
            explanation,
            diagnostics,
        } = self.obtain_plan(&analysis_before)?;
        warnings.extend(diagnostics.into_iter().map(|d| format!("Plan reply: {d}")));
        for outcome in &plan.ignored {
            warnings.push(outcome.describe());
        }
        self.report_progress(ProgressUpdate::new(
            AssistantStage::Planning,
            1.0,
            format!("Plan has {} steps", plan.len()),
        ));

        self.check_cancelled()?;

        // Execute it
        self.report_progress(ProgressUpdate::with_items(
            AssistantStage::Executing,
            0,
            plan.len(),
            "Executing cleaning plan...",
        ));
        let (mut cleaned, outcomes, plan_failure) = match self.engine.apply(df, &plan) {
            Ok(report) => (report.table, report.outcomes, None),
            Err(failure) => {
                let info = PlanFailureInfo {
                    failed_step: failure.failed_step,
                    error_code: failure.cause.error_code(),
                    cause: failure.cause.to_string(),
                };
                warn!(
                    "Plan stopped at step {}; continuing with the partial table",
                    info.failed_step
                );
                warnings.push(format!(
                    "Plan stopped at step {}: {}",
                    info.failed_step, info.cause
                ));
                (failure.table, failure.outcomes, Some(info))
            }
        };
        self.report_progress(ProgressUpdate::with_items(
            AssistantStage::Executing,
            outcomes.len(),
            plan.len(),
            format!("Executed {} of {} steps", outcomes.len(), plan.len()),
        ));

        self.check_cancelled()?;

        // Analyze the result
        self.report_progress(ProgressUpdate::new(
            AssistantStage::Reanalyzing,
            0.0,
            "Analyzing cleaned data...",
        ));
        let analysis_after = self.profiler.analyze(&cleaned)?;
        self.report_progress(ProgressUpdate::new(
            AssistantStage::Reanalyzing,
            1.0,
            format!(
                "Cleaned data has {} rows x {} columns",
                analysis_after.shape.0, analysis_after.shape.1
            ),
        ));

        if analysis_before.shape.0 > 0 {
            let removed = analysis_before.shape.0.saturating_sub(analysis_after.shape.0);
            let pct = removed as f64 / analysis_before.shape.0 as f64 * 100.0;
            if pct > HIGH_ROW_LOSS_PCT {
                warnings.push(format!("High data loss: {pct:.1}% of rows were removed"));
            }
        }

        self.check_cancelled()?;

        let columns = analysis_after.columns_json();

        // Insights
        let insights = match self.provider() {
            Some(provider) if self.config.generate_insights => {
                self.report_progress(ProgressUpdate::new(
                    AssistantStage::Insights,
                    0.0,
                    "Generating insights...",
                ));
                let advisor = InsightAdvisor::new(self.config.insight_language.clone());
                let text = advisor.summarize(provider, &columns).unwrap_or_else(|e| {
                    warnings.push(format!("Insights unavailable: {e}"));
                    String::new()
                });
                self.report_progress(ProgressUpdate::new(
                    AssistantStage::Insights,
                    1.0,
                    "Insights ready",
                ));
                text
            }
            _ => {
                debug!("Skipping insights");
                String::new()
            }
        };

        self.check_cancelled()?;

        // Visualization plan
        let visual_plan = match self.provider() {
            Some(provider) if self.config.generate_visual_plan => {
                self.report_progress(ProgressUpdate::new(
                    AssistantStage::Visualizing,
                    0.0,
                    "Planning visualizations...",
                ));
                let visual_plan = match VisualAdvisor::propose(provider, &columns) {
                    Ok(visual_plan) => {
                        warnings.extend(
                            visual_plan
                                .diagnostics
                                .iter()
                                .map(|d| format!("Visualization reply: {d}")),
                        );
                        visual_plan
                    }
                    Err(e) => {
                        warnings.push(format!("Visualization plan unavailable: {e}"));
                        VisualPlan::default()
                    }
                };
                self.report_progress(ProgressUpdate::new(
                    AssistantStage::Visualizing,
                    1.0,
                    format!("{} charts suggested", visual_plan.visualizations.len()),
                ));
                visual_plan
            }
            _ => {
                debug!("Skipping visualization plan");
                VisualPlan::default()
            }
        };

        self.check_cancelled()?;

        // Report
        self.report_progress(ProgressUpdate::new(
            AssistantStage::Reporting,
            0.0,
            "Composing report...",
        ));
        let failure_text = plan_failure
            .as_ref()
            .map(|f| format!("step {} failed: {}", f.failed_step, f.cause));
        let report = assistant_report(
            &explanation,
            &outcomes,
            failure_text.as_deref(),
            &insights,
            &visual_plan,
        );

        let mut saved_files = Vec::new();
        if self.config.save_to_disk {
            saved_files.push(self.writer.write_table(&mut cleaned)?);
            let (md, json) = self.writer.write_report(&report, &self.config.output_name)?;
            saved_files.push(md);
            saved_files.push(json);
        }
        self.report_progress(ProgressUpdate::new(
            AssistantStage::Reporting,
            1.0,
            "Report ready",
        ));

        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Assistant finished in {} ms with {} warnings",
            duration_ms,
            warnings.len()
        );

        Ok(AssistantResult {
            cleaned,
            analysis_before,
            analysis_after,
            plan,
            explanation,
            outcomes,
            plan_failure,
            insights,
            visual_plan,
            report,
            warnings,
            saved_files,
            duration_ms,
        })
    }
}

/// Builder for [`Assistant`].
#[derive(Default)]
pub struct AssistantBuilder {
    config: Option<AssistantConfig>,
    ai_provider: Option<Arc<dyn AIProvider>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: Option<CancellationToken>,
}

static_assertions::assert_impl_all!(AssistantBuilder: Send);

impl AssistantBuilder {
    pub fn config(mut self, config: AssistantConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the model used for planning, insights and charts.
    ///
    /// Without one, the assistant runs the configured `plan_override` (or
    /// nothing) and skips insights and charts.
    pub fn ai_provider(mut self, provider: Arc<dyn AIProvider>) -> Self {
        self.ai_provider = Some(provider);
        self
    }

    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Set a token for stopping the run between stages.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Build the assistant; fails if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Assistant, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let writer = ReportWriter::new(config.output_dir.clone());
        let profiler = DataProfiler::new(config.max_example_values);

        Ok(Assistant {
            config,
            ai_provider: self.ai_provider,
            progress_reporter: self.progress_reporter,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
            profiler,
            engine: TransformEngine::new(),
            writer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers each prompt kind with a canned reply.
    struct ScriptedProvider {
        plan: &'static str,
        insights: Option<&'static str>,
        visuals: &'static str,
    }

    impl AIProvider for ScriptedProvider {
        fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            if prompt.contains("data cleaning agent") {
                Ok(self.plan.to_string())
            } else if prompt.contains("senior data analyst") {
                self.insights
                    .map(str::to_string)
                    .ok_or_else(|| anyhow::anyhow!("rate limited"))
            } else {
                Ok(self.visuals.to_string())
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn offline_config() -> AssistantConfig {
        AssistantConfig::builder().save_to_disk(false).build().unwrap()
    }

    fn sample() -> DataFrame {
        df![
            "id" => [1i64, 2, 3, 4],
            "age" => [Some(20.0), None, Some(40.0), Some(30.0)],
        ]
        .unwrap()
    }

    #[test]
    fn test_assistant_builder_default() {
        let assistant = Assistant::builder().build().unwrap();
        assert!(assistant.ai_provider.is_none());
        assert!(assistant.config.use_ai);
        assert!(assistant.provider().is_none());
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let config = AssistantConfig {
            max_example_values: 0,
            ..AssistantConfig::default()
        };
        assert!(Assistant::builder().config(config).build().is_err());
    }

    #[test]
    fn test_check_cancelled() {
        let token = CancellationToken::new();
        let assistant = Assistant::builder()
            .cancellation_token(token.clone())
            .build()
            .unwrap();

        assert!(assistant.check_cancelled().is_ok());
        token.cancel();
        assert!(matches!(
            assistant.check_cancelled().unwrap_err(),
            CleaningError::Cancelled
        ));
    }

    #[test]
    fn test_cancelled_run_reports_cancelled_stage() {
        let token = CancellationToken::new();
        token.cancel();
        let stages = Arc::new(Mutex::new(Vec::new()));
        let stages_clone = stages.clone();

        let result = Assistant::builder()
            .config(offline_config())
            .cancellation_token(token)
            .on_progress(move |update| stages_clone.lock().unwrap().push(update.stage))
            .build()
            .unwrap()
            .run(sample());

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(*stages.lock().unwrap(), vec![AssistantStage::Cancelled]);
    }

    #[test]
    fn test_run_without_model_leaves_table() {
        let result = Assistant::builder()
            .config(offline_config())
            .build()
            .unwrap()
            .run(sample())
            .unwrap();

        assert!(result.plan.is_empty());
        assert!(result.outcomes.is_empty());
        assert_eq!(result.cleaned.shape(), (4, 2));
        assert!(result.insights.is_empty());
        assert!(result.saved_files.is_empty());
        assert!(result.report.section("Cleaning Summary").is_some());
    }

    #[test]
    fn test_run_with_plan_override() {
        let config = AssistantConfig::builder()
            .save_to_disk(false)
            .use_ai(false)
            .plan_override(vec![
                json!({"column": "id", "action": "drop", "reason": "identifier"}),
                json!({"column": "age", "action": "impute", "method": "median"}),
                json!({"column": "age", "action": "explode"}),
            ])
            .build()
            .unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let result = Assistant::builder()
            .config(config)
            .on_progress(move |_| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap()
            .run(sample())
            .unwrap();

        let names: Vec<String> = result
            .cleaned
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["age".to_string()]);
        assert_eq!(result.cleaned.column("age").unwrap().null_count(), 0);
        assert_eq!(result.outcomes.len(), 3);
        assert!(!result.outcomes[2].is_applied());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.plan_failure.is_none());
        assert!(count.load(Ordering::SeqCst) > 5);
    }

    #[test]
    fn test_run_with_model() {
        let provider = ScriptedProvider {
            plan: r#"Sure! {"plan": [{"column": "id", "action": "drop", "method": null, "reason": "id"}],
                     "explanation": "Dropped the identifier."}"#,
            insights: Some("  Ages cluster around thirty.  "),
            visuals: r#"{"visualizations": [{"title": "Age", "description": "Ages", "code": "plt.savefig('charts/age.png')"}]}"#,
        };

        let result = Assistant::builder()
            .config(offline_config())
            .ai_provider(Arc::new(provider))
            .build()
            .unwrap()
            .run(sample())
            .unwrap();

        assert_eq!(result.explanation, "Dropped the identifier.");
        assert_eq!(result.cleaned.width(), 1);
        assert_eq!(result.columns_removed(), 1);
        assert_eq!(result.insights, "Ages cluster around thirty.");
        assert_eq!(result.visual_plan.visualizations.len(), 1);
        assert!(result.warnings.is_empty());
        assert_eq!(
            result.report.section("EDA Summary").unwrap().body,
            "Ages cluster around thirty."
        );
    }

    #[test]
    fn test_insight_failure_becomes_warning() {
        let provider = ScriptedProvider {
            plan: r#"{"plan": [], "explanation": "Nothing to do."}"#,
            insights: None,
            visuals: "no charts today",
        };

        let result = Assistant::builder()
            .config(offline_config())
            .ai_provider(Arc::new(provider))
            .build()
            .unwrap()
            .run(sample())
            .unwrap();

        assert!(result.insights.is_empty());
        assert!(result.visual_plan.is_empty());
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings[0].starts_with("Insights unavailable"));
        assert!(result.warnings[1].starts_with("Visualization reply"));
    }

    #[test]
    fn test_failing_step_keeps_partial_table() {
        let config = AssistantConfig::builder()
            .save_to_disk(false)
            .use_ai(false)
            .plan_override(vec![
                json!({"column": "id", "action": "drop"}),
                json!({"column": "id", "action": "impute", "method": "mean"}),
            ])
            .build()
            .unwrap();

        let result = Assistant::builder()
            .config(config)
            .build()
            .unwrap()
            .run(sample())
            .unwrap();

        let failure = result.plan_failure.as_ref().unwrap();
        assert_eq!(failure.failed_step, 1);
        assert_eq!(failure.error_code, "COLUMN_NOT_FOUND");
        assert_eq!(result.cleaned.width(), 1);
        assert_eq!(result.summary_json()["plan_failure"]["failed_step"], 1);
        assert!(
            result
                .report
                .section("Applied Steps")
                .unwrap()
                .body
                .contains("Stopped: step 1 failed")
        );
    }

    #[test]
    fn test_preview_does_not_execute() {
        let config = AssistantConfig::builder()
            .save_to_disk(false)
            .plan_override(vec![json!({"column": "id", "action": "drop"})])
            .build()
            .unwrap();
        let df = sample();

        let (analysis, response) = Assistant::builder()
            .config(config)
            .build()
            .unwrap()
            .preview(&df)
            .unwrap();

        assert_eq!(analysis.shape, (4, 2));
        assert_eq!(response.plan.len(), 1);
        assert_eq!(df.width(), 2);
    }
}
