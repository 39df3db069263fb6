//! Extraction of plans from free-form model output.

use super::Plan;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Greedy span from the first `{` to the last `}`, across lines.
static JSON_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("Invalid regex: JSON object span"));

/// Why a model response could not be turned into a JSON object.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResponseShapeError {
    #[error("no JSON object found in response")]
    NoJsonObject,

    #[error("invalid JSON in response: {0}")]
    InvalidJson(String),
}

/// Find the outermost JSON object in free text and parse it.
pub fn extract_json_object(text: &str) -> Result<Value, ResponseShapeError> {
    let span = JSON_OBJECT
        .find(text)
        .ok_or(ResponseShapeError::NoJsonObject)?;
    serde_json::from_str(span.as_str()).map_err(|e| ResponseShapeError::InvalidJson(e.to_string()))
}

/// Cleaning plan and explanation recovered from a model response.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleaningPlanResponse {
    pub plan: Plan,
    pub explanation: String,
    /// Problems found in the response shape; an empty plan is returned instead of an error.
    pub diagnostics: Vec<String>,
}

/// Parse a response expected to look like `{"plan": [...], "explanation": "..."}`.
pub fn parse_cleaning_response(text: &str) -> CleaningPlanResponse {
    let parsed = match extract_json_object(text) {
        Ok(value) => value,
        Err(e) => {
            warn!("Could not read cleaning plan: {}", e);
            debug!("Raw model output: {}", text);
            return CleaningPlanResponse {
                diagnostics: vec![e.to_string()],
                ..Default::default()
            };
        }
    };

    let mut diagnostics = Vec::new();

    let explanation = match parsed.get("explanation") {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let plan = match parsed.get("plan") {
        Some(value @ Value::Array(_)) => Plan::from_json_steps(value),
        Some(_) => {
            diagnostics.push("'plan' is not a list of steps".to_string());
            Plan::default()
        }
        None => {
            diagnostics.push("response has no 'plan' key".to_string());
            Plan::default()
        }
    };

    for diagnostic in &diagnostics {
        warn!("Cleaning plan response: {}", diagnostic);
    }

    CleaningPlanResponse {
        plan,
        explanation,
        diagnostics,
    }
}
