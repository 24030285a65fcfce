// src/engine/docker.rs
use async_trait::async_trait;
use bollard::container::LogOutput; // For LogOutput::StdOut, LogOutput::StdErr
use bollard::errors::Error as BollardError;
use bollard::models::{ContainerCreateBody, ContainerWaitResponse};
use bollard::query_parameters::{
    CreateContainerOptions as BollardCreateContainerOptionsQuery,
    CreateImageOptions as BollardCreateImageOptionsQuery,
    ListContainersOptions as BollardListContainersOptionsQuery,
    ListImagesOptions as BollardListImagesOptionsQuery,
    LogsOptions as BollardLogsOptionsQuery,
    RemoveContainerOptions as BollardRemoveContainerOptionsQuery,
    StartContainerOptions as BollardStartContainerOptionsQuery,
    StopContainerOptions as BollardStopContainerOptionsQuery,
    UploadToContainerOptions as BollardUploadToContainerOptionsQuery,
    WaitContainerOptions as BollardWaitContainerOptionsQuery,
};
use bollard::Docker;
use bytes::Bytes;
use futures_util::future;
use futures_util::stream::StreamExt;

use super::{ContainerEngine, ContainerInfo, ContainerSpec, ImageInfo, LogChunk, LogStream, PullEvent, PullStream};
use crate::errors::{EngineError, EngineOp, JumpError};

/// [`ContainerEngine`] backed by the local Docker daemon.
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connect using `DOCKER_HOST` or the platform default socket.
    pub fn connect() -> Result<Self, JumpError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| JumpError::Connectivity(format!("Failed to connect to Docker: {}", e)))?;
        Ok(Self { docker })
    }

    pub fn from_docker(docker: Docker) -> Self {
        Self { docker }
    }
}

fn pull_error(err: BollardError) -> EngineError {
    match err {
        BollardError::DockerStreamError { error } => EngineError::operation(EngineOp::Pull, error),
        err @ (BollardError::JsonDataError { .. } | BollardError::JsonSerdeError { .. }) => {
            EngineError::MalformedStream(err.to_string())
        }
        other => EngineError::at(EngineOp::Pull)(other),
    }
}

/// Exit status from the first item of a wait stream.
fn wait_outcome(
    first: Option<Result<ContainerWaitResponse, BollardError>>,
) -> Result<i64, EngineError> {
    match first {
        Some(Ok(response)) => {
            if let Some(message) = response.error.and_then(|error| error.message) {
                return Err(EngineError::operation(EngineOp::Wait, message));
            }
            Ok(response.status_code)
        }
        // Bollard reports a non-zero exit as an error; it is still an exit status.
        Some(Err(BollardError::DockerContainerWaitError { code, .. })) => Ok(code),
        Some(Err(e)) => Err(EngineError::at(EngineOp::Wait)(e)),
        None => Err(EngineError::operation(
            EngineOp::Wait,
            "wait stream ended before the container stopped",
        )),
    }
}

fn stop_outcome(result: Result<(), BollardError>) -> Result<(), EngineError> {
    match result {
        Ok(()) => Ok(()),
        // 304: the container had already stopped.
        Err(BollardError::DockerResponseServerError {
            status_code: 304, ..
        }) => Ok(()),
        Err(e) => Err(EngineError::at(EngineOp::Stop)(e)),
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn version(&self) -> Result<String, EngineError> {
        let version = self
            .docker
            .version()
            .await
            .map_err(EngineError::at(EngineOp::Version))?;
        Ok(version.version.unwrap_or_default())
    }

    async fn list_images(&self) -> Result<Vec<ImageInfo>, EngineError> {
        let options = Some(BollardListImagesOptionsQuery {
            all: true,
            ..Default::default()
        });
        let images = self
            .docker
            .list_images(options)
            .await
            .map_err(EngineError::at(EngineOp::ListImages))?;

        Ok(images
            .into_iter()
            .map(|image| ImageInfo {
                id: image.id,
                tags: image.repo_tags,
            })
            .collect())
    }

    fn pull_image<'a>(&'a self, reference: &'a str) -> PullStream<'a> {
        let options = Some(BollardCreateImageOptionsQuery {
            from_image: Some(reference.to_string()),
            ..Default::default()
        });

        self.docker
            .create_image(options, None, None)
            .map(|result| match result {
                Ok(info) => Ok(PullEvent {
                    layer_id: info.id.unwrap_or_default(),
                    status: info.status.unwrap_or_default(),
                    progress: info.progress.unwrap_or_default(),
                    error: info.error_detail.and_then(|detail| detail.message),
                }),
                Err(e) => Err(pull_error(e)),
            })
            .boxed()
    }

    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, EngineError> {
        let options = Some(BollardListContainersOptionsQuery {
            all: true,
            ..Default::default()
        });
        let containers = self
            .docker
            .list_containers(options)
            .await
            .map_err(EngineError::at(EngineOp::ListContainers))?;

        Ok(containers
            .into_iter()
            .map(|container| ContainerInfo {
                id: container.id.unwrap_or_default(),
                image: container.image.unwrap_or_default(),
                status: container.status.unwrap_or_default(),
            })
            .collect())
    }

    async fn remove_container(&self, id: &str) -> Result<(), EngineError> {
        let options = Some(BollardRemoveContainerOptionsQuery {
            force: true,
            ..Default::default()
        });
        self.docker
            .remove_container(id, options)
            .await
            .map_err(EngineError::at(EngineOp::Remove))
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, EngineError> {
        let options = spec
            .name
            .as_ref()
            .map(|name| BollardCreateContainerOptionsQuery {
                name: Some(name.clone()),
                ..Default::default()
            });

        let config = ContainerCreateBody {
            image: Some(spec.image.clone()),
            cmd: Some(spec.cmd.clone()),
            working_dir: Some(spec.working_dir.clone()),
            tty: Some(false),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let container = self
            .docker
            .create_container(options, config)
            .await
            .map_err(EngineError::at(EngineOp::Create))?;
        for warning in &container.warnings {
            log::warn!("Container {}: {}", container.id, warning);
        }
        Ok(container.id)
    }

    async fn upload_archive(
        &self,
        id: &str,
        dest_dir: &str,
        archive: Bytes,
    ) -> Result<(), EngineError> {
        let options = Some(BollardUploadToContainerOptionsQuery {
            path: dest_dir.to_string(),
            ..Default::default()
        });
        self.docker
            .upload_to_container(id, options, bollard::body_full(archive))
            .await
            .map_err(EngineError::at(EngineOp::Upload))
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.docker
            .start_container(id, None::<BollardStartContainerOptionsQuery>)
            .await
            .map_err(EngineError::at(EngineOp::Start))
    }

    async fn wait_container(&self, id: &str) -> Result<i64, EngineError> {
        let options = Some(BollardWaitContainerOptionsQuery {
            condition: "not-running".to_string(),
        });

        // The wait stream carries both the exit result and any engine-side
        // error; whichever the daemon sends first settles the wait.
        let mut wait_stream = self.docker.wait_container(id, options);
        wait_outcome(wait_stream.next().await)
    }

    fn container_logs<'a>(&'a self, id: &'a str, timestamps: bool) -> LogStream<'a> {
        let options = Some(BollardLogsOptionsQuery {
            stdout: true,
            stderr: true,
            timestamps,
            ..Default::default()
        });

        self.docker
            .logs(id, options)
            .filter_map(|log_result| {
                future::ready(match log_result {
                    Ok(LogOutput::StdOut { message }) | Ok(LogOutput::Console { message }) => {
                        Some(Ok(LogChunk::Stdout(message)))
                    }
                    Ok(LogOutput::StdErr { message }) => Some(Ok(LogChunk::Stderr(message))),
                    Ok(LogOutput::StdIn { .. }) => None,
                    Err(e) => Some(Err(EngineError::at(EngineOp::Logs)(e))),
                })
            })
            .boxed()
    }

    async fn stop_container(&self, id: &str) -> Result<(), EngineError> {
        stop_outcome(
            self.docker
                .stop_container(id, None::<BollardStopContainerOptionsQuery>)
                .await,
        )
    }
}
