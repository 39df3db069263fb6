//! Transform engine.
//!
//! Applies a [`Plan`] to a table one step at a time, each step seeing the
//! table produced by the previous one. A failing step stops the run; the
//! [`PlanFailure`] keeps the table as it was before that step.
//!
//! # Example
//!
//! ```rust,ignore
//! use tidyplan::engine::TransformEngine;
//! use tidyplan::plan::Plan;
//!
//! let plan = Plan::from_json_str(r#"[{"column": "age", "action": "impute", "method": "median"}]"#)?;
//! match TransformEngine::new().apply(df, &plan) {
//!     Ok(report) => println!("{} rows", report.table.height()),
//!     Err(failure) => eprintln!("stopped at step {}: {}", failure.failed_step, failure.cause),
//! }
//! ```

pub mod actions;
pub mod coercion;
pub mod outliers;
pub mod stats;

use crate::error::{CleaningError, Result};
use crate::plan::{Action, ConvertTarget, Plan, Step};
use crate::types::StepOutcome;
use coercion::NumericTarget;
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Successful run of a plan.
#[derive(Debug, Clone)]
pub struct PlanReport {
    pub table: DataFrame,
    /// One outcome per plan entry, in plan order.
    pub outcomes: Vec<StepOutcome>,
}

/// A plan that stopped at a failing step.
#[derive(Debug, thiserror::Error)]
#[error("plan failed at step {failed_step}: {cause}")]
pub struct PlanFailure {
    /// Table with the effects of every step before `failed_step`.
    pub table: DataFrame,
    pub failed_step: usize,
    /// Outcomes of the entries before `failed_step`.
    pub outcomes: Vec<StepOutcome>,
    #[source]
    pub cause: CleaningError,
}

impl PlanFailure {
    /// Drop the partial table and keep only the error.
    pub fn into_error(self) -> CleaningError {
        CleaningError::PlanFailed {
            step: self.failed_step,
            reason: self.cause.to_string(),
        }
    }
}

pub type PlanOutcome = std::result::Result<PlanReport, PlanFailure>;

/// Runs cleaning plans. Holds no state between runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformEngine;

impl TransformEngine {
    pub fn new() -> Self {
        Self
    }

    /// Apply every entry of `plan` in order.
    pub fn apply(&self, table: DataFrame, plan: &Plan) -> PlanOutcome {
        apply_plan(table, plan)
    }
}

/// Apply every entry of `plan` in order.
pub fn apply_plan(mut table: DataFrame, plan: &Plan) -> PlanOutcome {
    let mut outcomes = Vec::with_capacity(plan.len());
    let mut steps = plan.steps.iter().peekable();
    let mut ignored = plan.ignored.iter().peekable();

    for index in 0..plan.len() {
        if let Some(outcome) = ignored.next_if(|o| o.index() == index) {
            outcomes.push(outcome.clone());
            continue;
        }
        let Some((_, step)) = steps.next_if(|(i, _)| *i == index) else {
            continue;
        };

        let rows_before = table.height();
        let columns_before = table.width();
        debug!(
            "Step {}: {} on {}",
            index,
            step.action.name(),
            step.column.as_deref().unwrap_or("<table>")
        );

        match apply_step(&table, step) {
            Ok(next) => {
                outcomes.push(StepOutcome::Applied {
                    index,
                    action: step.action.name().to_string(),
                    column: step.column.clone(),
                    rows_before,
                    rows_after: next.height(),
                    columns_before,
                    columns_after: next.width(),
                });
                table = next;
            }
            Err(cause) => {
                warn!("Step {} ({}) failed: {}", index, step.action.name(), cause);
                return Err(PlanFailure {
                    table,
                    failed_step: index,
                    outcomes,
                    cause,
                });
            }
        }
    }

    let applied = outcomes.iter().filter(|o| o.is_applied()).count();
    info!(
        "Applied {} of {} steps ({} ignored), table now {}x{}",
        applied,
        plan.len(),
        plan.len() - applied,
        table.height(),
        table.width()
    );

    Ok(PlanReport { table, outcomes })
}

/// Apply a single step, returning a new table.
pub fn apply_step(df: &DataFrame, step: &Step) -> Result<DataFrame> {
    let column = match (&step.action, step.column.as_deref()) {
        (Action::RemoveDuplicates, _) => return actions::remove_duplicates(df),
        (Action::Drop, Some(column)) => return actions::drop_column(df, column),
        (_, Some(column)) => column,
        (action, None) => {
            return Err(CleaningError::InvalidStep(format!(
                "action '{}' requires a column",
                action.name()
            )));
        }
    };

    let series = df
        .column(column)
        .map_err(|_| CleaningError::ColumnNotFound(column.to_string()))?
        .as_materialized_series();

    let replaced = match &step.action {
        Action::Impute(method) => actions::impute(series, method)?,
        Action::Standardize {
            remove_special_chars,
        } => actions::standardize(series, *remove_special_chars)?,
        Action::Normalize => actions::min_max(series)?,
        Action::Scale(method) => actions::scale(series, *method)?,
        Action::ClipOutliers { lower, upper } => {
            let values = actions::require_numeric(series)?;
            outliers::clip(series.name().clone(), &values, *lower, *upper)
        }
        Action::FillOutliers(method) => {
            let values = actions::require_numeric(series)?;
            outliers::fill(series.name().clone(), &values, *method)
        }
        Action::MapValues { mapping } => actions::map_values(series, mapping)?,
        Action::StripWhitespace => actions::strip_whitespace(series)?,
        Action::ConvertDtype(target) => match target {
            ConvertTarget::Int { impute } => {
                return coercion::convert_numeric(df, column, NumericTarget::Int, *impute);
            }
            ConvertTarget::Float { impute } => {
                return coercion::convert_numeric(df, column, NumericTarget::Float, *impute);
            }
            ConvertTarget::Str => coercion::to_text(series)?,
            ConvertTarget::Datetime { format } => coercion::to_datetime(series, format.as_deref())?,
        },
        Action::Drop | Action::RemoveDuplicates => return Ok(df.clone()),
    };

    let mut out = df.clone();
    out.replace(column, replaced)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{ImputeMethod, OutlierFill};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_df() -> DataFrame {
        df![
            "age" => [Some(30.0), None, Some(40.0), Some(50.0)],
            "city" => [Some("Paris"), Some("Lyon"), None, Some("Paris")],
            "id" => [1, 2, 3, 4],
        ]
        .unwrap()
    }

    #[test]
    fn test_apply_in_order() {
        let plan = Plan::new(vec![
            Step::on("age", Action::Impute(ImputeMethod::Median)),
            Step::on("id", Action::Drop),
        ]);
        let report = TransformEngine::new().apply(sample_df(), &plan).unwrap();

        assert_eq!(report.table.width(), 2);
        assert_eq!(report.table.column("age").unwrap().null_count(), 0);
        assert_eq!(report.outcomes.len(), 2);
        assert!(report.outcomes.iter().all(StepOutcome::is_applied));
    }

    #[test]
    fn test_failure_keeps_partial_table() {
        let plan = Plan::new(vec![
            Step::on("id", Action::Drop),
            Step::on("id", Action::Impute(ImputeMethod::Mean)),
            Step::on("age", Action::Normalize),
        ]);
        let failure = apply_plan(sample_df(), &plan).unwrap_err();

        assert_eq!(failure.failed_step, 1);
        assert_eq!(failure.table.width(), 2);
        assert_eq!(failure.outcomes.len(), 1);
        assert_eq!(failure.cause.error_code(), "COLUMN_NOT_FOUND");
        // Step 2 never ran.
        assert_eq!(failure.table.column("age").unwrap().null_count(), 1);
    }

    #[test]
    fn test_ignored_entries_keep_positions() {
        let plan = Plan::from_json_steps(&json!([
            {"column": "age", "action": "teleport"},
            {"column": "city", "action": "strip_whitespace"},
            {"column": "age", "action": "impute", "method": "knn"}
        ]));
        let report = apply_plan(sample_df(), &plan).unwrap();
        let kinds: Vec<(usize, bool)> = report
            .outcomes
            .iter()
            .map(|o| (o.index(), o.is_applied()))
            .collect();
        assert_eq!(kinds, vec![(0, false), (1, true), (2, false)]);
    }

    #[test]
    fn test_numeric_action_on_text_fails() {
        let step = Step::on("city", Action::FillOutliers(OutlierFill::Median));
        let err = apply_step(&sample_df(), &step).unwrap_err();
        assert_eq!(err.error_code(), "NON_NUMERIC_COLUMN");
    }

    #[test]
    fn test_convert_changes_row_count() {
        let df = df!["v" => [Some("3"), Some("4.5"), Some("abc"), None]].unwrap();
        let step = Step::on(
            "v",
            Action::ConvertDtype(ConvertTarget::Int { impute: None }),
        );
        let plan = Plan::new(vec![step]);
        let report = apply_plan(df, &plan).unwrap();
        match &report.outcomes[0] {
            StepOutcome::Applied {
                rows_before,
                rows_after,
                ..
            } => assert_eq!((*rows_before, *rows_after), (4, 3)),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_map_to_numbers_then_normalize() {
        let df = df!["answer" => ["yes", "no", "yes", "no"]].unwrap();
        let plan = Plan::new(vec![
            Step::on(
                "answer",
                Action::MapValues {
                    mapping: vec![(json!("yes"), json!(1)), (json!("no"), json!(0))],
                },
            ),
            Step::on("answer", Action::Normalize),
        ]);
        let report = apply_plan(df, &plan).unwrap();
        let values: Vec<Option<f64>> = report
            .table
            .column("answer")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some(1.0), Some(0.0), Some(1.0), Some(0.0)]);
    }

    #[test]
    fn test_plan_failure_into_error() {
        let plan = Plan::new(vec![Step::on("missing", Action::Normalize)]);
        let error = apply_plan(sample_df(), &plan).unwrap_err().into_error();
        assert_eq!(error.error_code(), "PLAN_FAILED");
        assert!(error.to_string().contains("missing"));
    }
}
