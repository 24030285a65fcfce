//! Container lifecycle for a single execution.

pub mod lifecycle;
pub mod output;
pub mod staging;

pub use lifecycle::{ContainerLifecycle, ExecutionOutcome, ExecutionRequest, LifecycleState};
pub use output::{demultiplex, CapturedOutput, DEFAULT_CAPTURE_LIMIT};
pub use staging::StagedFile;
