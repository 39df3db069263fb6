//! LLM-Planned Data Cleaning
//!
//! Profiles a tabular dataset, asks a language model for a cleaning plan,
//! executes that plan with a deterministic transform engine, and writes the
//! cleaned table together with an exploratory report.
//!
//! # Overview
//!
//! - **Transform Engine**: applies an ordered list of declarative steps
//!   (`drop`, `impute`, `convert_dtype`, `fill_outliers`, ...) to a polars `DataFrame`
//! - **Plan Parsing**: typed steps read from model JSON; unusable entries are
//!   kept as ignored outcomes instead of failing the plan
//! - **Dataset Analysis**: dtype, missing percentage, unique count and example
//!   values per column, plus describe-style statistics
//! - **Advisors**: prompts for the cleaning plan, narrative insights and charts
//! - **Reporting**: Markdown and JSON reports
//! - **Progress Reporting**: stage updates with cancellation between stages
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tidyplan::{Assistant, AssistantConfig};
//! use tidyplan::ai::OpenRouterProvider;
//! use polars::prelude::*;
//! use std::sync::Arc;
//!
//! let df = CsvReadOptions::default()
//!     .try_into_reader_with_file_path(Some("data.csv".into()))?
//!     .finish()?;
//!
//! let provider = Arc::new(OpenRouterProvider::new(api_key)?);
//! let result = Assistant::builder()
//!     .ai_provider(provider)
//!     .config(AssistantConfig::builder().output_dir("outputs").build()?)
//!     .build()?
//!     .run(df)?;
//!
//! println!("{}", result.explanation);
//! ```
//!
//! # Running a plan directly
//!
//! ```rust,ignore
//! use tidyplan::{Plan, TransformEngine};
//!
//! let plan = Plan::from_json_str(r#"[
//!     {"column": "id", "action": "drop"},
//!     {"column": "age", "action": "impute", "method": "median"}
//! ]"#)?;
//!
//! match TransformEngine::new().apply(df, &plan) {
//!     Ok(report) => println!("{:?}", report.table),
//!     Err(failure) => eprintln!("{failure}"),
//! }
//! ```

pub mod advisor;
pub mod ai;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod plan;
pub mod profiler;
pub mod reporting;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use advisor::{CleaningAdvisor, InsightAdvisor, VisualAdvisor, VisualPlan, VisualSpec};
pub use config::{AssistantConfig, AssistantConfigBuilder, ConfigValidationError};
pub use engine::{PlanFailure, PlanOutcome, PlanReport, TransformEngine, apply_plan, apply_step};
pub use error::{CleaningError, Result, ResultExt};
pub use pipeline::{
    Assistant, AssistantBuilder, AssistantResult, AssistantStage, CancellationToken,
    ClosureProgressReporter, PlanFailureInfo, ProgressReporter, ProgressUpdate,
};
pub use plan::{
    Action, CleaningPlanResponse, ConvertTarget, ImputeMethod, NumericFill, OutlierFill, Plan,
    RawStep, ScaleMethod, Step, extract_json_object, parse_cleaning_response,
};
pub use profiler::DataProfiler;
pub use reporting::{Report, ReportBuilder, ReportWriter};
pub use types::{ColumnAnalysis, DatasetAnalysis, StepOutcome};
pub use utils::{dtype_label, is_numeric_dtype};
