//! Configuration for the cleaning assistant.
//!
//! Configuration uses the builder pattern; [`AssistantConfigBuilder::build`]
//! validates the result before handing it out.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Default number of example values collected per column.
pub const DEFAULT_MAX_EXAMPLE_VALUES: usize = 5;

/// Upper bound for [`AssistantConfig::max_example_values`].
pub const MAX_EXAMPLE_VALUES_LIMIT: usize = 50;

/// Configuration for one assistant run.
///
/// Use [`AssistantConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use tidyplan::config::AssistantConfig;
///
/// let config = AssistantConfig::builder()
///     .use_ai(false)
///     .output_dir("outputs")
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Ask the language model for a cleaning plan.
    /// When false (or no provider is attached) the plan comes from `plan_override`.
    /// Default: true
    pub use_ai: bool,

    /// Ask the language model for narrative insights on the cleaned table.
    /// Default: true
    pub generate_insights: bool,

    /// Ask the language model for a visualization plan.
    /// Default: true
    pub generate_visual_plan: bool,

    /// Language the insight text should be written in.
    /// Default: "English"
    pub insight_language: String,

    /// Directory for the cleaned table and report files.
    /// Default: "outputs"
    pub output_dir: PathBuf,

    /// File stem for the report files (`<stem>_report.md`).
    /// Default: "eda"
    pub output_name: String,

    /// Write the cleaned table and the report to `output_dir`.
    /// Default: true
    pub save_to_disk: bool,

    /// Number of distinct example values collected per column (1 - 50).
    /// Default: 5
    pub max_example_values: usize,

    /// Plan used instead of asking the model, as raw JSON step objects.
    /// Default: None
    pub plan_override: Option<Vec<Value>>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            use_ai: true,
            generate_insights: true,
            generate_visual_plan: true,
            insight_language: "English".to_string(),
            output_dir: PathBuf::from("outputs"),
            output_name: "eda".to_string(),
            save_to_disk: true,
            max_example_values: DEFAULT_MAX_EXAMPLE_VALUES,
            plan_override: None,
        }
    }
}

impl AssistantConfig {
    /// Create a new configuration builder.
    pub fn builder() -> AssistantConfigBuilder {
        AssistantConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(1..=MAX_EXAMPLE_VALUES_LIMIT).contains(&self.max_example_values) {
            return Err(ConfigValidationError::InvalidExampleCount(
                self.max_example_values,
            ));
        }

        if self.insight_language.trim().is_empty() {
            return Err(ConfigValidationError::EmptyField("insight_language"));
        }

        let name = self.output_name.trim();
        if name.is_empty() {
            return Err(ConfigValidationError::EmptyField("output_name"));
        }
        if name.contains(['/', '\\']) {
            return Err(ConfigValidationError::InvalidOutputName(
                self.output_name.clone(),
            ));
        }

        if let Some(plan) = &self.plan_override
            && let Some(position) = plan.iter().position(|step| !step.is_object())
        {
            return Err(ConfigValidationError::InvalidPlanEntry(position));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid example count: {0} (must be between 1 and {MAX_EXAMPLE_VALUES_LIMIT})")]
    InvalidExampleCount(usize),

    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("Invalid output name '{0}' (must not contain path separators)")]
    InvalidOutputName(String),

    #[error("Plan entry {0} is not a JSON object")]
    InvalidPlanEntry(usize),
}

/// Builder for [`AssistantConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct AssistantConfigBuilder {
    use_ai: Option<bool>,
    generate_insights: Option<bool>,
    generate_visual_plan: Option<bool>,
    insight_language: Option<String>,
    output_dir: Option<PathBuf>,
    output_name: Option<String>,
    save_to_disk: Option<bool>,
    max_example_values: Option<usize>,
    plan_override: Option<Vec<Value>>,
}

impl AssistantConfigBuilder {
    /// Enable or disable model-generated cleaning plans.
    pub fn use_ai(mut self, use_ai: bool) -> Self {
        self.use_ai = Some(use_ai);
        self
    }

    /// Enable or disable narrative insights.
    pub fn generate_insights(mut self, generate: bool) -> Self {
        self.generate_insights = Some(generate);
        self
    }

    /// Enable or disable the visualization plan.
    pub fn generate_visual_plan(mut self, generate: bool) -> Self {
        self.generate_visual_plan = Some(generate);
        self
    }

    /// Set the language of the insight text (e.g. "English", "French").
    pub fn insight_language(mut self, language: impl Into<String>) -> Self {
        self.insight_language = Some(language.into());
        self
    }

    /// Set the output directory for the cleaned table and reports.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set the file stem of the report files.
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    /// Enable or disable writing results to disk.
    ///
    /// When false, results are kept in memory only.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    /// Set how many distinct example values the profiler collects per column.
    pub fn max_example_values(mut self, count: usize) -> Self {
        self.max_example_values = Some(count);
        self
    }

    /// Supply a plan as raw JSON step objects.
    pub fn plan_override(mut self, steps: Vec<Value>) -> Self {
        self.plan_override = Some(steps);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `AssistantConfig` or an error if validation fails.
    pub fn build(self) -> Result<AssistantConfig, ConfigValidationError> {
        let defaults = AssistantConfig::default();
        let config = AssistantConfig {
            use_ai: self.use_ai.unwrap_or(defaults.use_ai),
            generate_insights: self.generate_insights.unwrap_or(defaults.generate_insights),
            generate_visual_plan: self
                .generate_visual_plan
                .unwrap_or(defaults.generate_visual_plan),
            insight_language: self.insight_language.unwrap_or(defaults.insight_language),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            output_name: self.output_name.unwrap_or(defaults.output_name),
            save_to_disk: self.save_to_disk.unwrap_or(defaults.save_to_disk),
            max_example_values: self
                .max_example_values
                .unwrap_or(defaults.max_example_values),
            plan_override: self.plan_override,
        };

        config.validate()?;
        Ok(config)
    }
}
