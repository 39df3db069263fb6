//! Cleaning plans.
//!
//! A [`Plan`] is an ordered list of typed [`Step`]s together with the entries
//! that could not be understood. Each entry keeps its position in the source
//! list, so step outcomes can point back at what the model wrote.

mod parse;
mod step;

pub use parse::{
    CleaningPlanResponse, ResponseShapeError, extract_json_object, parse_cleaning_response,
};
pub use step::{
    Action, ConvertTarget, ImputeMethod, NumericFill, OutlierFill, RawStep, ScaleMethod, Step,
};

use crate::types::StepOutcome;
use serde::Serialize;
use serde_json::Value;

/// Ordered cleaning plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Plan {
    /// Understood steps, with their position in the source list.
    pub steps: Vec<(usize, Step)>,
    /// `StepOutcome::Ignored` for every entry that could not be understood.
    pub ignored: Vec<StepOutcome>,
}

impl Plan {
    /// Build a plan from already typed steps.
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: steps.into_iter().enumerate().collect(),
            ignored: Vec::new(),
        }
    }

    /// Parse a JSON array of step objects.
    ///
    /// Entries that are not understood become ignored outcomes instead of errors.
    /// A value that is not an array yields an empty plan.
    pub fn from_json_steps(value: &Value) -> Self {
        let Some(entries) = value.as_array() else {
            return Self::default();
        };

        let mut plan = Self::default();
        for (index, entry) in entries.iter().enumerate() {
            let action = entry
                .get("action")
                .and_then(Value::as_str)
                .map(str::to_string);

            let parsed = serde_json::from_value::<RawStep>(entry.clone())
                .map_err(|e| format!("malformed step: {e}"))
                .and_then(Step::from_raw);

            match parsed {
                Ok(step) => plan.steps.push((index, step)),
                Err(reason) => {
                    tracing::debug!("Ignoring step {}: {}", index, reason);
                    plan.ignored.push(StepOutcome::Ignored {
                        index,
                        action,
                        reason,
                    });
                }
            }
        }
        plan
    }

    /// Parse a JSON document holding a list of step objects.
    pub fn from_json_str(text: &str) -> crate::Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_array() {
            return Err(crate::CleaningError::InvalidStep(
                "expected a JSON list of steps".to_string(),
            ));
        }
        Ok(Self::from_json_steps(&value))
    }

    /// Total number of entries, understood or not.
    pub fn len(&self) -> usize {
        self.steps.len() + self.ignored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Understood steps in plan order.
    pub fn iter_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().map(|(_, step)| step)
    }

    /// Understood steps in their wire JSON form.
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.iter_steps()
                .map(|step| serde_json::to_value(step).unwrap_or(Value::Null))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_steps_keeps_indices() {
        let plan = Plan::from_json_steps(&json!([
            {"column": "a", "action": "drop"},
            {"column": "b", "action": "impute", "method": "knn"},
            "not an object",
            {"action": "remove_duplicates"}
        ]));

        assert_eq!(plan.len(), 4);
        let indices: Vec<usize> = plan.steps.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 3]);
        let ignored: Vec<usize> = plan.ignored.iter().map(StepOutcome::index).collect();
        assert_eq!(ignored, vec![1, 2]);
    }

    #[test]
    fn test_ignored_outcome_keeps_action_name() {
        let plan = Plan::from_json_steps(&json!([{"column": "a", "action": "explode"}]));
        match &plan.ignored[0] {
            StepOutcome::Ignored { action, reason, .. } => {
                assert_eq!(action.as_deref(), Some("explode"));
                assert!(reason.contains("unrecognized action"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_from_json_str_requires_list() {
        assert!(Plan::from_json_str(r#"{"plan": []}"#).is_err());
        let plan = Plan::from_json_str(r#"[{"column": "x", "action": "strip_whitespace"}]"#).unwrap();
        assert_eq!(plan.steps.len(), 1);
    }

    #[test]
    fn test_new_numbers_steps() {
        let plan = Plan::new(vec![
            Step::on("a", Action::Normalize),
            Step::table(Action::RemoveDuplicates),
        ]);
        assert_eq!(plan.steps[1].0, 1);
        assert_eq!(plan.to_json().as_array().map(Vec::len), Some(2));
    }
}
