//! Per-execution container lifecycle.
//!
//! A run walks `Listing → Evicting (optional) → Creating → Staging → Starting →
//! Running → Collecting → Stopped`. Any engine failure ends the run; nothing is
//! retried. Containers are keyed by image: a pre-existing container for the
//! target image is always removed before a new one is created, so there is at
//! most one container per image and two runs of the same language cannot
//! overlap. Keying containers by an execution id instead would lift that.

use std::time::Duration;
use tokio::io::AsyncWrite;

use super::output::{demultiplex, DEFAULT_CAPTURE_LIMIT};
use super::staging::StagedFile;
use crate::engine::{ContainerEngine, ContainerSpec};
use crate::errors::JumpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Listing,
    Evicting,
    Creating,
    Staging,
    Starting,
    Running,
    Collecting,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub image: String,
    pub command: Vec<String>,
    pub files: Vec<StagedFile>,
    pub container_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub exit_code: i64,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

pub struct ContainerLifecycle<'a, E: ContainerEngine + ?Sized> {
    engine: &'a E,
    work_dir: String,
    wait_timeout: Option<Duration>,
    timestamps: bool,
    capture_limit: usize,
    state: LifecycleState,
}

impl<'a, E: ContainerEngine + ?Sized> ContainerLifecycle<'a, E> {
    pub fn new(engine: &'a E, work_dir: impl Into<String>) -> Self {
        Self {
            engine,
            work_dir: work_dir.into(),
            wait_timeout: None,
            timestamps: false,
            capture_limit: DEFAULT_CAPTURE_LIMIT,
            state: LifecycleState::Idle,
        }
    }

    pub fn with_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn with_timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Bytes of each output stream kept in the [`ExecutionOutcome`].
    pub fn with_capture_limit(mut self, bytes: usize) -> Self {
        self.capture_limit = bytes;
        self
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    fn enter(&mut self, next: LifecycleState) {
        log::debug!("Container lifecycle: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run `request` in a fresh container, streaming its output to the sinks.
    pub async fn execute<O, W>(
        &mut self,
        request: &ExecutionRequest,
        stdout: O,
        stderr: W,
    ) -> Result<ExecutionOutcome, JumpError>
    where
        O: AsyncWrite + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        self.enter(LifecycleState::Listing);
        self.evict_stale(&request.image).await?;

        self.enter(LifecycleState::Creating);
        let spec = ContainerSpec {
            name: request.container_name.clone(),
            image: request.image.clone(),
            cmd: request.command.clone(),
            working_dir: self.work_dir.clone(),
        };
        let id = self.engine.create_container(&spec).await?;
        log::info!("Container created {}", id);

        match self.run_created(&id, request, stdout, stderr).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                log::debug!("Run failed in state {:?}: {}", self.state, err);
                self.discard(&id).await;
                Err(err)
            }
        }
    }

    async fn evict_stale(&mut self, image: &str) -> Result<(), JumpError> {
        let containers = self.engine.list_containers().await?;
        for container in &containers {
            log::debug!(
                "{} {} (status: {})",
                container.id,
                container.image,
                container.status
            );
        }

        let stale: Vec<_> = containers
            .iter()
            .filter(|container| container.image == image)
            .collect();
        if stale.is_empty() {
            return Ok(());
        }

        self.enter(LifecycleState::Evicting);
        for container in stale {
            log::info!(
                "Container {} already exists for {}, removing",
                container.id,
                image
            );
            self.engine.remove_container(&container.id).await?;
        }
        Ok(())
    }

    async fn run_created<O, W>(
        &mut self,
        id: &str,
        request: &ExecutionRequest,
        stdout: O,
        stderr: W,
    ) -> Result<ExecutionOutcome, JumpError>
    where
        O: AsyncWrite + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        self.enter(LifecycleState::Staging);
        for file in &request.files {
            let archive = file.to_archive()?;
            log::info!("Copying {} to container {}:{}", file.name, id, self.work_dir);
            self.engine
                .upload_archive(id, &self.work_dir, archive)
                .await?;
        }

        self.enter(LifecycleState::Starting);
        self.engine.start_container(id).await?;

        self.enter(LifecycleState::Running);
        log::info!("Waiting for container {} to finish", id);
        let exit_code = self.wait(id).await?;
        log::info!("Container {} exited with status {}", id, exit_code);

        self.enter(LifecycleState::Collecting);
        let captured = demultiplex(
            self.engine.container_logs(id, self.timestamps),
            stdout,
            stderr,
            self.capture_limit,
        )
        .await?;

        self.enter(LifecycleState::Stopped);
        self.engine.stop_container(id).await?;
        log::info!("Container {} stopped", id);

        Ok(ExecutionOutcome {
            exit_code,
            stdout: captured.stdout,
            stderr: captured.stderr,
        })
    }

    async fn wait(&self, id: &str) -> Result<i64, JumpError> {
        let wait = self.engine.wait_container(id);
        match self.wait_timeout {
            Some(limit) => {
                tokio::select! {
                    exit = wait => Ok(exit?),
                    _ = tokio::time::sleep(limit) => {
                        log::warn!("Execution timed out for container {}", id);
                        Err(JumpError::WaitTimeout(limit.as_secs()))
                    }
                }
            }
            None => Ok(wait.await?),
        }
    }

    /// Best-effort removal of a container whose run was aborted.
    async fn discard(&self, id: &str) {
        if let Err(e) = self.engine.remove_container(id).await {
            log::warn!("Failed to remove container {} after error: {}", id, e);
        }
    }
}
