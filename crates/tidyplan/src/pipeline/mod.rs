//! Assistant pipeline.
//!
//! The [`Assistant`] drives a whole run and reports progress through the
//! types in [`progress`].

mod assistant;
pub mod progress;

pub use assistant::{Assistant, AssistantBuilder, AssistantResult, PlanFailureInfo};
pub use progress::{
    AssistantStage, CancellationToken, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
