//! Container engine abstraction.
//!
//! The orchestrator talks to the container engine only through
//! [`ContainerEngine`], so image acquisition and the container lifecycle can be
//! driven by the Docker client in production and by a scripted engine in tests.
//! Every operation is fallible and none of them retry.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::errors::EngineError;

pub mod docker;

pub use docker::DockerEngine;

/// One decoded unit of an image pull progress stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullEvent {
    pub layer_id: String,
    pub status: String,
    pub progress: String,
    pub error: Option<String>,
}

impl PullEvent {
    pub fn new(layer_id: &str, status: &str) -> Self {
        Self {
            layer_id: layer_id.to_string(),
            status: status.to_string(),
            ..Default::default()
        }
    }

    pub fn with_progress(mut self, progress: &str) -> Self {
        self.progress = progress.to_string();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub id: String,
    pub tags: Vec<String>,
}

impl ImageInfo {
    pub fn primary_tag(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub id: String,
    pub image: String,
    pub status: String,
}

/// Everything needed to create a container for one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: Option<String>,
    pub image: String,
    pub cmd: Vec<String>,
    pub working_dir: String,
}

/// A demultiplexed piece of container output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogChunk {
    Stdout(Bytes),
    Stderr(Bytes),
}

pub type PullStream<'a> = BoxStream<'a, Result<PullEvent, EngineError>>;
pub type LogStream<'a> = BoxStream<'a, Result<LogChunk, EngineError>>;

#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Engine version, used to verify connectivity.
    async fn version(&self) -> Result<String, EngineError>;

    async fn list_images(&self) -> Result<Vec<ImageInfo>, EngineError>;

    /// Start pulling an image; events arrive in engine order.
    fn pull_image<'a>(&'a self, reference: &'a str) -> PullStream<'a>;

    /// All containers, running or not.
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, EngineError>;

    /// Forcibly remove a container whatever its state.
    async fn remove_container(&self, id: &str) -> Result<(), EngineError>;

    /// Create a container and return its id.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, EngineError>;

    /// Extract a tar archive into `dest_dir` inside the container.
    async fn upload_archive(&self, id: &str, dest_dir: &str, archive: Bytes)
        -> Result<(), EngineError>;

    async fn start_container(&self, id: &str) -> Result<(), EngineError>;

    /// Block until the container stops running and return its exit status.
    async fn wait_container(&self, id: &str) -> Result<i64, EngineError>;

    /// Combined stdout/stderr of a container, already demultiplexed.
    fn container_logs<'a>(&'a self, id: &'a str, timestamps: bool) -> LogStream<'a>;

    /// Stop a container; stopping an exited container succeeds.
    async fn stop_container(&self, id: &str) -> Result<(), EngineError>;
}
