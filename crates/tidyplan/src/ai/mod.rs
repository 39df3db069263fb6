//! Language model access.
//!
//! The assistant talks to a language model through the [`AIProvider`] trait:
//! one prompt in, one completion out. The trait is always available so callers
//! (and tests) can plug in their own backend.
//!
//! # Feature Flag
//!
//! The HTTP-backed [`OpenRouterProvider`] requires the `ai` feature (enabled by
//! default).
//!
//! ```toml
//! # Disable the HTTP provider for a smaller binary
//! tidyplan = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use tidyplan::ai::OpenRouterProvider;
//! use tidyplan::Assistant;
//! use std::sync::Arc;
//!
//! let provider = Arc::new(OpenRouterProvider::new("your-api-key")?);
//! let result = Assistant::builder()
//!     .ai_provider(provider)
//!     .build()?
//!     .run(dataframe)?;
//! ```

mod provider;
pub use provider::AIProvider;

#[cfg(feature = "ai")]
mod openrouter;

#[cfg(feature = "ai")]
pub use openrouter::{OpenRouterConfig, OpenRouterConfigBuilder, OpenRouterProvider};
