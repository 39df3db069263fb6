use super::{ask, column_block};
use crate::ai::AIProvider;
use crate::error::Result;
use serde_json::Value;

/// Asks the model for a narrative reading of the cleaned table.
#[derive(Debug, Clone)]
pub struct InsightAdvisor {
    language: String,
}

impl Default for InsightAdvisor {
    fn default() -> Self {
        Self::new("English")
    }
}

impl InsightAdvisor {
    /// Advisor that asks for insights written in `language`.
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn prompt(&self, columns: &Value) -> String {
        let lang = &self.language;
        format!(
            "You are a senior data analyst. Below is a summary of a dataset and its column statistics after cleaning.\n\
             \n\
             Please do the following, writing in {lang}:\n\
             1. Describe the structure of the data in natural language.\n\
             2. Point out interesting patterns or distributions (most common values, ranges, anomalies).\n\
             3. Derive whatever basic insights you can (relationships between columns, high-cardinality features, outliers).\n\
             4. Flag anything surprising or worth further investigation.\n\
             \n\
             Be specific. Do not explain generic EDA steps; interpret this data as if you were writing a short report.\n\
             \n\
             Column Summary:\n{}\n",
            column_block(columns)
        )
    }

    /// Ask for insights over the column analysis of the cleaned table.
    pub fn summarize(&self, provider: &dyn AIProvider, columns: &Value) -> Result<String> {
        let reply = ask(provider, "insights", &self.prompt(columns))?;
        Ok(reply.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoProvider;

    impl AIProvider for EchoProvider {
        fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            Ok(format!("  {}  ", prompt.len()))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[test]
    fn test_prompt_language() {
        let columns = json!({"city": {"dtype": "object"}});
        assert!(InsightAdvisor::default().prompt(&columns).contains("writing in English"));
        let arabic = InsightAdvisor::new("Arabic");
        assert_eq!(arabic.language(), "Arabic");
        assert!(arabic.prompt(&columns).contains("writing in Arabic"));
        assert!(arabic.prompt(&columns).contains("\"city\""));
    }

    #[test]
    fn test_summarize_trims_reply() {
        let columns = json!({});
        let text = InsightAdvisor::default().summarize(&EchoProvider, &columns).unwrap();
        assert_eq!(text, text.trim());
        assert!(!text.is_empty());
    }
}
