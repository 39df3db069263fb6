//! Cleaning plan proposals from the language model.

use super::{ask, column_block};
use crate::ai::AIProvider;
use crate::error::Result;
use crate::plan::{CleaningPlanResponse, parse_cleaning_response};
use crate::types::DatasetAnalysis;
use tracing::info;

const PLAN_PROMPT: &str = r#"You are an expert data cleaning agent. Study the summary statistics and example values of every column below, work out what each column means, and write a detailed cleaning plan with a justification for every step.

The dataset may contain:
- numeric columns (age, price, income, ...)
- categorical columns (gender, country, status, ...)
- identifiers (id, uuid, ...)
- free text (comments, descriptions, ...)
- dates or timestamps
- noisy or unexpected values
- missing data
- inconsistent formatting

Your goals:
1. Identify what each column most likely represents.
2. Decide whether it should be imputed, dropped, mapped, scaled, standardized or otherwise cleaned.
3. Pick a suitable method for each step (for example: impute with the median, map inconsistent labels, fill outliers).
4. Give a reason for every step explaining why it is needed.
5. Finish with a plain-language summary of the whole plan for a human reader.

Reply with JSON in exactly this format. The key must be spelled "column" exactly.
{
  "plan": [
    {
      "column": "col_name",
      "action": "impute" | "drop" | "standardize" | "normalize" | "scale" | "clip_outliers" | "fill_outliers" | "convert_dtype" | "map_values" | "strip_whitespace" | "remove_duplicates",
      "method": "mean" | "median" | "mode" | "minmax" | "zscore" | "constant" | "int" | "float" | "str" | "datetime" | null,
      "params": { optional object of extra parameters },
      "reason": "Why this step is needed."
    }
  ],
  "explanation": "A clear summary of the full cleaning plan."
}

Supported params: impute/constant uses "value"; standardize uses "remove_special_chars" (true/false); convert_dtype uses "impute_missing" (true/false), "impute_method" ("mean" or "median") and "format" (strftime pattern for datetime); clip_outliers uses "lower" and "upper"; map_values uses "mapping" (object of old value to new value).

Only propose changes that are statistically or logically justified. Be rigorous but practical.

Column Analysis:
"#;

/// Asks the model for a cleaning plan.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleaningAdvisor;

impl CleaningAdvisor {
    /// Prompt for a plan over the given analysis.
    pub fn prompt(analysis: &DatasetAnalysis) -> String {
        format!("{PLAN_PROMPT}{}\n", column_block(&analysis.columns_json()))
    }

    /// Ask the model for a plan and parse its reply.
    ///
    /// A reply without a usable plan gives an empty plan with diagnostics.
    pub fn propose(provider: &dyn AIProvider, analysis: &DatasetAnalysis) -> Result<CleaningPlanResponse> {
        let reply = ask(provider, "cleaning plan", &Self::prompt(analysis))?;
        let response = parse_cleaning_response(&reply);
        info!(
            "Model proposed {} steps ({} not understood)",
            response.plan.len(),
            response.plan.ignored.len()
        );
        Ok(response)
    }
}
