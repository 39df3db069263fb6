//! Progress reporting and cancellation for assistant runs.
//!
//! A run calls back into a [`ProgressReporter`] at every stage and checks a
//! [`CancellationToken`] between stages. Steps of a plan are never interrupted.
//!
//! # Example
//!
//! ```rust,ignore
//! use tidyplan::{Assistant, CancellationToken};
//!
//! let token = CancellationToken::new();
//! let token_clone = token.clone();
//!
//! std::thread::spawn(move || {
//!     std::thread::sleep(std::time::Duration::from_secs(30));
//!     token_clone.cancel();
//! });
//!
//! let result = Assistant::builder()
//!     .cancellation_token(token)
//!     .on_progress(|update| println!("[{:?}] {}", update.stage, update.message))
//!     .build()?
//!     .run(df);
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stages of an assistant run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantStage {
    /// Profiling the input table
    Analyzing,
    /// Obtaining a cleaning plan (model or supplied)
    Planning,
    /// Applying the plan
    Executing,
    /// Profiling the cleaned table
    Reanalyzing,
    /// Asking for narrative insights
    Insights,
    /// Asking for a visualization plan
    Visualizing,
    /// Composing and writing the report
    Reporting,
    /// Run finished
    Complete,
    /// Run was cancelled
    Cancelled,
    /// Run failed with an error
    Failed,
}

impl AssistantStage {
    /// Human-readable name of the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Analyzing => "Analyzing Dataset",
            Self::Planning => "Planning Cleaning",
            Self::Executing => "Executing Plan",
            Self::Reanalyzing => "Analyzing Cleaned Data",
            Self::Insights => "Generating Insights",
            Self::Visualizing => "Planning Visualizations",
            Self::Reporting => "Writing Report",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }

    /// Share of the whole run taken by this stage.
    ///
    /// Model calls dominate, so planning and insights weigh the most.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Analyzing => 0.05,
            Self::Planning => 0.25,
            Self::Executing => 0.15,
            Self::Reanalyzing => 0.05,
            Self::Insights => 0.25,
            Self::Visualizing => 0.15,
            Self::Reporting => 0.10,
            Self::Complete | Self::Cancelled | Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Analyzing => 0.0,
            Self::Planning => 0.05,
            Self::Executing => 0.30,
            Self::Reanalyzing => 0.45,
            Self::Insights => 0.50,
            Self::Visualizing => 0.75,
            Self::Reporting => 0.90,
            Self::Complete => 1.0,
            Self::Cancelled | Self::Failed => 0.0,
        }
    }
}

/// One progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: AssistantStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within the current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,

    /// Items done in the current stage (plan steps while executing)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_total: Option<usize>,
}

impl ProgressUpdate {
    pub fn new(stage: AssistantStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    /// Update carrying item counts.
    pub fn with_items(
        stage: AssistantStage,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            current as f32 / total as f32
        } else {
            1.0
        };
        Self {
            items_processed: Some(current),
            items_total: Some(total),
            ..Self::new(stage, stage_progress, message)
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            progress: 1.0,
            stage_progress: 1.0,
            ..Self::new(AssistantStage::Complete, 1.0, message)
        }
    }

    pub fn cancelled() -> Self {
        Self::new(AssistantStage::Cancelled, 0.0, "Run cancelled by user")
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(AssistantStage::Failed, 0.0, message)
    }
}

/// Receives progress updates.
///
/// Implementations must be `Send + Sync`; a run may happen on a worker thread
/// while the updates are shown elsewhere.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

/// Token for cancelling a run from another thread.
///
/// Clones share the same flag. The run checks it between stages and returns
/// [`CleaningError::Cancelled`](crate::error::CleaningError::Cancelled).
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Safe to call from any thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can be reused.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}
