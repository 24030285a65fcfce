//! Error types for every failure mode of a harness run
//!
//! Failures are grouped by where they originate so the top-level invocation can
//! translate them into a process exit status: configuration problems detected
//! before the container engine is touched, connectivity problems reaching the
//! engine, and failures of individual engine operations. None of these are
//! retried; each one aborts the run with a message naming the failing step.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Engine operations, used to tag which step of a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOp {
    Version,
    ListImages,
    Pull,
    ListContainers,
    Remove,
    Create,
    Upload,
    Start,
    Wait,
    Logs,
    Stop,
}

impl fmt::Display for EngineOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineOp::Version => "query engine version",
            EngineOp::ListImages => "list images",
            EngineOp::Pull => "pull image",
            EngineOp::ListContainers => "list containers",
            EngineOp::Remove => "remove container",
            EngineOp::Create => "create container",
            EngineOp::Upload => "copy files into container",
            EngineOp::Start => "start container",
            EngineOp::Wait => "wait for container",
            EngineOp::Logs => "fetch container logs",
            EngineOp::Stop => "stop container",
        };
        f.write_str(name)
    }
}

// Errors reported by a container engine implementation
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to {op}: {message}")]
    Operation { op: EngineOp, message: String },
    #[error("malformed event stream: {0}")]
    MalformedStream(String),
}

impl EngineError {
    pub fn operation(op: EngineOp, message: impl Into<String>) -> Self {
        EngineError::Operation {
            op,
            message: message.into(),
        }
    }

    /// Adapter for `map_err` that tags a client error with the failing operation.
    pub fn at<E: fmt::Display>(op: EngineOp) -> impl FnOnce(E) -> EngineError {
        move |err| EngineError::operation(op, err.to_string())
    }

    pub fn op(&self) -> Option<EngineOp> {
        match self {
            EngineError::Operation { op, .. } => Some(*op),
            EngineError::MalformedStream(_) => Some(EngineOp::Pull),
        }
    }
}

#[derive(Error, Debug)]
pub enum JumpError {
    #[error("Unsupported file extension '{extension}'")]
    UnsupportedExtension { extension: String },
    #[error("No execution command available for runtime '{runtime}'")]
    UnsupportedRuntime { runtime: String },
    #[error("Companion file '{name}' not found under {}", root.display())]
    CompanionNotFound { name: String, root: PathBuf },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Cannot reach the container engine: {0}")]
    Connectivity(String),
    #[error("Container engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("Pulling image '{image}' failed: {reason}")]
    PullFailed { image: String, reason: String },
    #[error("Malformed image pull event stream: {0}")]
    MalformedPullStream(String),
    #[error("Container did not finish within {0} seconds")]
    WaitTimeout(u64),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl JumpError {
    pub fn io(context: impl Into<String>) -> impl FnOnce(std::io::Error) -> JumpError {
        let context = context.into();
        move |source| JumpError::Io { context, source }
    }

    /// Errors detected before any container engine call is made.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            JumpError::UnsupportedExtension { .. }
                | JumpError::UnsupportedRuntime { .. }
                | JumpError::CompanionNotFound { .. }
                | JumpError::Config(_)
        )
    }

    /// Process exit status used when a run is aborted by this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            err if err.is_configuration() => 2,
            JumpError::Connectivity(_) => 3,
            JumpError::Io { .. } => 5,
            _ => 4,
        }
    }
}
