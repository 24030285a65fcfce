//! Scripted container engine and terminal recorder for tests.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use std::io::{self, Read};
use std::sync::{Arc, Mutex};

use crate::engine::{
    ContainerEngine, ContainerInfo, ContainerSpec, ImageInfo, LogChunk, LogStream, PullEvent,
    PullStream,
};
use crate::errors::{EngineError, EngineOp};
use crate::image::progress::{ProgressSink, TerminalOp};

pub const MOCK_CONTAINER_ID: &str = "mock-container";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Version,
    ListImages,
    Pull(String),
    ListContainers,
    Remove(String),
    Create(ContainerSpec),
    Upload {
        id: String,
        dest_dir: String,
        files: Vec<(String, Vec<u8>)>,
    },
    Start(String),
    Wait(String),
    Logs { id: String, timestamps: bool },
    Stop(String),
}

#[derive(Debug, Clone)]
pub enum ScriptedPull {
    Event(PullEvent),
    Malformed(String),
}

/// In-memory engine that replays a script and records every call.
pub struct MockEngine {
    images: Vec<ImageInfo>,
    containers: Vec<ContainerInfo>,
    pull: Mutex<Vec<ScriptedPull>>,
    exit_code: i64,
    logs: Vec<LogChunk>,
    fail_on: Option<EngineOp>,
    hang_on_wait: bool,
    calls: Mutex<Vec<EngineCall>>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            images: Vec::new(),
            containers: Vec::new(),
            pull: Mutex::new(Vec::new()),
            exit_code: 0,
            logs: Vec::new(),
            fail_on: None,
            hang_on_wait: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_images(mut self, images: Vec<ImageInfo>) -> Self {
        self.images = images;
        self
    }

    /// Mark `reference` as present locally.
    pub fn with_image(self, reference: &str) -> Self {
        self.with_images(vec![ImageInfo {
            id: format!("sha256:{}", reference.len()),
            tags: vec![reference.to_string()],
        }])
    }

    pub fn with_containers(mut self, containers: Vec<ContainerInfo>) -> Self {
        self.containers = containers;
        self
    }

    pub fn with_exit_code(mut self, exit_code: i64) -> Self {
        self.exit_code = exit_code;
        self
    }

    pub fn with_logs(mut self, logs: Vec<LogChunk>) -> Self {
        self.logs = logs;
        self
    }

    pub fn failing_on(mut self, op: EngineOp) -> Self {
        self.fail_on = Some(op);
        self
    }

    /// Make `wait_container` never resolve.
    pub fn hanging_on_wait(mut self) -> Self {
        self.hang_on_wait = true;
        self
    }

    pub fn set_pull(&self, events: Vec<ScriptedPull>) {
        *self.pull.lock().unwrap() = events;
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Position of the first call matching `predicate`.
    pub fn position(&self, predicate: impl Fn(&EngineCall) -> bool) -> Option<usize> {
        self.calls().iter().position(predicate)
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, op: EngineOp) -> Result<(), EngineError> {
        if self.fail_on == Some(op) {
            return Err(EngineError::operation(op, "mock failure"));
        }
        Ok(())
    }
}

fn archive_files(archive: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut files = Vec::new();
    let mut archive = tar::Archive::new(archive);
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let name = entry.path().unwrap().to_string_lossy().to_string();
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        files.push((name, content));
    }
    files
}

#[async_trait]
impl ContainerEngine for MockEngine {
    async fn version(&self) -> Result<String, EngineError> {
        self.record(EngineCall::Version);
        self.check(EngineOp::Version)?;
        Ok("mock".to_string())
    }

    async fn list_images(&self) -> Result<Vec<ImageInfo>, EngineError> {
        self.record(EngineCall::ListImages);
        self.check(EngineOp::ListImages)?;
        Ok(self.images.clone())
    }

    fn pull_image<'a>(&'a self, reference: &'a str) -> PullStream<'a> {
        self.record(EngineCall::Pull(reference.to_string()));
        if let Err(e) = self.check(EngineOp::Pull) {
            return stream::iter(vec![Err(e)]).boxed();
        }
        let script = std::mem::take(&mut *self.pull.lock().unwrap());
        stream::iter(script.into_iter().map(|item| match item {
            ScriptedPull::Event(event) => Ok(event),
            ScriptedPull::Malformed(message) => Err(EngineError::MalformedStream(message)),
        }))
        .boxed()
    }

    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, EngineError> {
        self.record(EngineCall::ListContainers);
        self.check(EngineOp::ListContainers)?;
        Ok(self.containers.clone())
    }

    async fn remove_container(&self, id: &str) -> Result<(), EngineError> {
        self.record(EngineCall::Remove(id.to_string()));
        self.check(EngineOp::Remove)
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, EngineError> {
        self.record(EngineCall::Create(spec.clone()));
        self.check(EngineOp::Create)?;
        Ok(MOCK_CONTAINER_ID.to_string())
    }

    async fn upload_archive(
        &self,
        id: &str,
        dest_dir: &str,
        archive: Bytes,
    ) -> Result<(), EngineError> {
        self.record(EngineCall::Upload {
            id: id.to_string(),
            dest_dir: dest_dir.to_string(),
            files: archive_files(&archive),
        });
        self.check(EngineOp::Upload)
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.record(EngineCall::Start(id.to_string()));
        self.check(EngineOp::Start)
    }

    async fn wait_container(&self, id: &str) -> Result<i64, EngineError> {
        self.record(EngineCall::Wait(id.to_string()));
        self.check(EngineOp::Wait)?;
        if self.hang_on_wait {
            std::future::pending::<()>().await;
        }
        Ok(self.exit_code)
    }

    fn container_logs<'a>(&'a self, id: &'a str, timestamps: bool) -> LogStream<'a> {
        self.record(EngineCall::Logs {
            id: id.to_string(),
            timestamps,
        });
        if let Err(e) = self.check(EngineOp::Logs) {
            return stream::iter(vec![Err(e)]).boxed();
        }
        stream::iter(self.logs.clone().into_iter().map(Ok)).boxed()
    }

    async fn stop_container(&self, id: &str) -> Result<(), EngineError> {
        self.record(EngineCall::Stop(id.to_string()));
        self.check(EngineOp::Stop)
    }
}

/// Progress sink that keeps every operation for inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingTerminal {
    ops: Arc<Mutex<Vec<TerminalOp>>>,
}

impl RecordingTerminal {
    pub fn ops(&self) -> Vec<TerminalOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn count(&self, op: &TerminalOp) -> usize {
        self.ops.lock().unwrap().iter().filter(|o| *o == op).count()
    }
}

impl ProgressSink for RecordingTerminal {
    fn apply(&mut self, ops: &[TerminalOp]) -> io::Result<()> {
        self.ops.lock().unwrap().extend_from_slice(ops);
        Ok(())
    }
}
