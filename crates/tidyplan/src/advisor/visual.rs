//! Chart suggestions and the chart files they point at.

use super::{ask, column_block};
use crate::ai::AIProvider;
use crate::error::Result;
use crate::plan::extract_json_object;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

static SAVEFIG_TARGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"plt\.savefig\(['"](.*?)['"]\)"#).expect("Invalid regex: savefig target")
});

const VISUAL_PROMPT: &str = r#"You are a data visualization expert. Below is a summary of a cleaned dataset.

Your tasks:
1. Suggest 3 to 5 genuinely interesting visualizations that would help uncover patterns or relationships (do not suggest a correlation matrix).
2. For each one, describe the insight it may reveal.
3. For each one, write Python code using pandas/seaborn/matplotlib that draws an appealing plot. Use 'df' as the dataframe.
4. Be careful and precise with column names.

Reply with JSON in exactly this format:
{
  "visualizations": [
    {
      "title": "Histogram of Age",
      "description": "Shows the distribution of age",
      "code": "sns.histplot(df['age'], kde=True); plt.title('Age Distribution'); plt.savefig('charts/age.png'); plt.clf()"
    }
  ]
}

Dataset Summary:
"#;

/// One suggested chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualSpec {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Plotting code as written by the model; recorded, never executed.
    #[serde(default)]
    pub code: String,
}

impl VisualSpec {
    /// Image path the plotting code saves to (first `plt.savefig('...')` target).
    pub fn chart_path(&self) -> Option<&str> {
        SAVEFIG_TARGET
            .captures(&self.code)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// Charts suggested for the cleaned table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisualPlan {
    pub visualizations: Vec<VisualSpec>,
    /// Problems found in the reply shape.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

impl VisualPlan {
    /// Read a reply expected to look like `{"visualizations": [...]}`.
    pub fn from_reply(text: &str) -> Self {
        let parsed = match extract_json_object(text) {
            Ok(value) => value,
            Err(e) => return Self::failed(e.to_string()),
        };

        let Some(entries) = parsed.get("visualizations").and_then(Value::as_array) else {
            return Self::failed("response has no 'visualizations' list".to_string());
        };

        let mut plan = Self::default();
        for (index, entry) in entries.iter().enumerate() {
            match serde_json::from_value::<VisualSpec>(entry.clone()) {
                Ok(spec) => plan.visualizations.push(spec),
                Err(e) => plan
                    .diagnostics
                    .push(format!("visualization {index} skipped: {e}")),
            }
        }
        plan
    }

    fn failed(diagnostic: String) -> Self {
        warn!("Could not read visualization plan: {}", diagnostic);
        Self {
            visualizations: Vec::new(),
            diagnostics: vec![diagnostic],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.visualizations.is_empty()
    }
}

/// Asks the model which charts to draw.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisualAdvisor;

impl VisualAdvisor {
    pub fn prompt(columns: &Value) -> String {
        format!("{VISUAL_PROMPT}{}\n", column_block(columns))
    }

    /// Ask for a visualization plan over the column analysis of the cleaned table.
    pub fn propose(provider: &dyn AIProvider, columns: &Value) -> Result<VisualPlan> {
        let reply = ask(provider, "visualization plan", &Self::prompt(columns))?;
        Ok(VisualPlan::from_reply(&reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_chart_path() {
        let spec = VisualSpec {
            title: "Age".to_string(),
            description: "Distribution".to_string(),
            code: "sns.histplot(df['age']); plt.savefig(\"charts/age.png\"); plt.savefig('other.png')"
                .to_string(),
        };
        assert_eq!(spec.chart_path(), Some("charts/age.png"));

        let no_save = VisualSpec {
            code: "plt.show()".to_string(),
            ..spec
        };
        assert_eq!(no_save.chart_path(), None);
    }

    #[test]
    fn test_from_reply() {
        let reply = r#"```json
{"visualizations": [
  {"title": "Income", "description": "Spread of income", "code": "plt.savefig('charts/income.png')"},
  {"title": "Broken", "description": 5}
]}
```"#;
        let plan = VisualPlan::from_reply(reply);
        assert_eq!(plan.visualizations.len(), 1);
        assert_eq!(plan.visualizations[0].chart_path(), Some("charts/income.png"));
        assert_eq!(plan.diagnostics.len(), 1);
    }

    #[test]
    fn test_from_reply_shape_faults() {
        assert!(VisualPlan::from_reply("no json").is_empty());
        let plan = VisualPlan::from_reply(r#"{"charts": []}"#);
        assert!(plan.is_empty());
        assert_eq!(plan.diagnostics, vec!["response has no 'visualizations' list".to_string()]);
    }

    #[test]
    fn test_prompt_embeds_columns() {
        let prompt = VisualAdvisor::prompt(&json!({"age": {"dtype": "int64"}}));
        assert!(prompt.contains("\"age\""));
        assert!(prompt.contains("correlation matrix"));
    }
}
