use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// ============================================================================
// Dataset Analysis
// ============================================================================

/// Per-column facts handed to the language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnAnalysis {
    pub dtype: String,
    /// Percentage of missing values (0 - 100).
    pub missing_pct: f64,
    /// Number of distinct non-missing values.
    pub unique_vals: usize,
    /// First few distinct non-missing values, in order of appearance.
    pub example_vals: Vec<Value>,
}

/// Result of profiling a table.
///
/// `columns` keeps the table's column order; `summary` holds describe-style
/// statistics keyed by column, then by statistic name (`count`, `mean`, `25%`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetAnalysis {
    pub shape: (usize, usize),
    pub columns: Vec<(String, ColumnAnalysis)>,
    pub summary: BTreeMap<String, BTreeMap<String, Value>>,
}

impl DatasetAnalysis {
    /// Look up the analysis of one column.
    pub fn column(&self, name: &str) -> Option<&ColumnAnalysis> {
        self.columns
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, analysis)| analysis)
    }

    /// Column section as a JSON object, in table order.
    ///
    /// This is the payload embedded into every prompt.
    pub fn columns_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        for (name, analysis) in &self.columns {
            map.insert(
                name.clone(),
                serde_json::to_value(analysis).unwrap_or(Value::Null),
            );
        }
        Value::Object(map)
    }

    /// Total number of missing cells across all columns.
    pub fn missing_cells(&self) -> usize {
        let rows = self.shape.0 as f64;
        self.columns
            .iter()
            .map(|(_, col)| (col.missing_pct / 100.0 * rows).round() as usize)
            .sum()
    }
}

// ============================================================================
// Step Outcomes
// ============================================================================

/// What happened to one plan entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step ran against the table.
    Applied {
        index: usize,
        action: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        column: Option<String>,
        rows_before: usize,
        rows_after: usize,
        columns_before: usize,
        columns_after: usize,
    },
    /// The step was not understood and had no effect.
    Ignored {
        index: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        action: Option<String>,
        reason: String,
    },
}

impl StepOutcome {
    /// Position of the step in the plan.
    pub fn index(&self) -> usize {
        match self {
            Self::Applied { index, .. } | Self::Ignored { index, .. } => *index,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// Human-readable one-line description.
    pub fn describe(&self) -> String {
        match self {
            Self::Applied {
                index,
                action,
                column,
                rows_before,
                rows_after,
                ..
            } => {
                let target = column.as_deref().unwrap_or("table");
                if rows_before == rows_after {
                    format!("Step {}: {} on '{}'", index + 1, action, target)
                } else {
                    format!(
                        "Step {}: {} on '{}' ({} -> {} rows)",
                        index + 1,
                        action,
                        target,
                        rows_before,
                        rows_after
                    )
                }
            }
            Self::Ignored {
                index,
                action,
                reason,
            } => format!(
                "Step {}: ignored {} ({})",
                index + 1,
                action.as_deref().unwrap_or("step"),
                reason
            ),
        }
    }
}
