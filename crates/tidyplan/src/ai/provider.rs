//! AI provider trait for abstracting LLM interactions.

use anyhow::Result;

/// A text completion backend.
///
/// Implementations must be `Send + Sync` so an assistant holding one can be
/// moved to a worker thread.
pub trait AIProvider: Send + Sync {
    /// Send a prompt and return the model's reply text.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the reply holds no text.
    fn complete(&self, prompt: &str) -> Result<String>;

    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Model used by this provider, if it exposes one.
    fn model(&self) -> Option<&str> {
        None
    }
}
