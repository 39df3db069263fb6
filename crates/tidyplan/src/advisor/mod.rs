//! Prompting the language model.
//!
//! Each advisor owns one prompt template and knows how to read the reply:
//!
//! - [`CleaningAdvisor`] asks for a cleaning plan and its explanation
//! - [`InsightAdvisor`] asks for a narrative summary of the cleaned table
//! - [`VisualAdvisor`] asks for a list of charts worth drawing
//!
//! Provider failures surface as [`CleaningError::AiClientError`](crate::CleaningError::AiClientError).
//! Replies that do not have the expected shape never fail; they produce empty
//! results plus diagnostics.

mod cleaning;
mod insight;
mod visual;

pub use cleaning::CleaningAdvisor;
pub use insight::InsightAdvisor;
pub use visual::{VisualAdvisor, VisualPlan, VisualSpec};

use crate::ai::AIProvider;
use crate::error::{CleaningError, Result};
use serde_json::Value;
use tracing::debug;

/// Render the column analysis the way every prompt embeds it.
pub(crate) fn column_block(columns: &Value) -> String {
    serde_json::to_string_pretty(columns).unwrap_or_else(|_| columns.to_string())
}

/// Send a prompt, mapping provider failures into the crate error.
pub(crate) fn ask(provider: &dyn AIProvider, purpose: &str, prompt: &str) -> Result<String> {
    debug!(
        "Asking {} ({}) for {}",
        provider.name(),
        provider.model().unwrap_or("default model"),
        purpose
    );
    provider
        .complete(prompt)
        .map_err(|e| CleaningError::AiClientError(format!("{purpose}: {e}")))
}
