//! Execution entry point: resolve, acquire, run.
//!
//! [`prepare`] does every check that needs no container engine, so an
//! unsupported file or a missing companion is reported before a connection is
//! opened. [`Orchestrator::execute`] then ensures the runtime image and hands
//! the plan to the container lifecycle.

use std::path::Path;
use tokio::io::AsyncWrite;
use uuid::Uuid;

use crate::companion::find_companions;
use crate::config::HarnessConfig;
use crate::container::{ContainerLifecycle, ExecutionOutcome, ExecutionRequest, StagedFile};
use crate::engine::{ContainerEngine, DockerEngine};
use crate::errors::JumpError;
use crate::image::{CrosstermSink, ImageAcquisition, ProgressSink};
use crate::runtime::{shell_invocation, CommandSynthesizer, RuntimeDescriptor, RuntimeRegistry};

/// Everything needed to run a source file, resolved from the host side.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub runtime: RuntimeDescriptor,
    pub command: Vec<String>,
    pub files: Vec<StagedFile>,
}

impl ExecutionPlan {
    /// The shell script passed to `sh -c`.
    pub fn script(&self) -> &str {
        self.command.last().map(String::as_str).unwrap_or_default()
    }
}

pub async fn prepare(
    source: &Path,
    config: &HarnessConfig,
    registry: &RuntimeRegistry,
) -> Result<ExecutionPlan, JumpError> {
    let extension = source
        .extension()
        .map(|extension| extension.to_string_lossy().to_string())
        .unwrap_or_default();
    let runtime = registry.lookup(&extension);
    if runtime.is_empty() {
        return Err(JumpError::UnsupportedExtension { extension });
    }
    log::debug!("Resolved runtime {} ({})", runtime.name, runtime.image);

    let filename = source
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| JumpError::Config(format!("{} has no file name", source.display())))?;
    let script = CommandSynthesizer::new(config.work_dir.as_str())
        .with_announce(config.verbose)
        .build(&filename, &runtime);
    if script.is_empty() {
        return Err(JumpError::UnsupportedRuntime {
            runtime: runtime.name.clone(),
        });
    }

    let companions = find_companions(source, &config.shared_dir).await?;
    let files = vec![
        StagedFile::read(source).await?,
        StagedFile::read(&companions.test_cases).await?,
        StagedFile::read(&companions.test_runner).await?,
    ];

    Ok(ExecutionPlan {
        runtime,
        command: shell_invocation(&script),
        files,
    })
}

/// Container name for one run: `jump-<runtime>-<uuid>`.
pub fn container_name(runtime: &RuntimeDescriptor) -> String {
    let name: String = runtime
        .name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' { c } else { '_' })
        .collect();
    format!("jump-{}-{}", name, Uuid::new_v4())
}

/// An open, verified connection to the container engine.
///
/// Held for the whole run and released when dropped, whatever the outcome.
pub struct Session<E: ContainerEngine> {
    engine: E,
}

impl Session<DockerEngine> {
    pub async fn connect() -> Result<Self, JumpError> {
        Self::open(DockerEngine::connect()?).await
    }
}

impl<E: ContainerEngine> Session<E> {
    pub async fn open(engine: E) -> Result<Self, JumpError> {
        let version = engine
            .version()
            .await
            .map_err(|e| JumpError::Connectivity(e.to_string()))?;
        log::debug!("Connected to container engine {}", version);
        Ok(Self { engine })
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E: ContainerEngine> Drop for Session<E> {
    fn drop(&mut self) {
        log::debug!("Closing container engine session");
    }
}

pub struct Orchestrator<'a, E: ContainerEngine + ?Sized> {
    engine: &'a E,
    config: &'a HarnessConfig,
}

impl<'a, E: ContainerEngine + ?Sized> Orchestrator<'a, E> {
    pub fn new(engine: &'a E, config: &'a HarnessConfig) -> Self {
        Self { engine, config }
    }

    pub async fn execute<S, O, W>(
        &self,
        plan: &ExecutionPlan,
        progress: S,
        stdout: O,
        stderr: W,
    ) -> Result<ExecutionOutcome, JumpError>
    where
        S: ProgressSink,
        O: AsyncWrite + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let image = &plan.runtime.image;
        let acquired = ImageAcquisition::new(self.engine)
            .ensure_image(image, progress)
            .await?;
        if !acquired {
            // The image may already be local under another tag; creation reports
            // a genuinely missing image.
            log::warn!("Pull of {} was not confirmed, continuing", image);
        }

        let request = ExecutionRequest {
            image: image.clone(),
            command: plan.command.clone(),
            files: plan.files.clone(),
            container_name: Some(container_name(&plan.runtime)),
        };
        log::debug!("Container command: {}", plan.script());

        ContainerLifecycle::new(self.engine, self.config.work_dir.as_str())
            .with_wait_timeout(self.config.wait_timeout())
            .with_timestamps(self.config.log_timestamps())
            .with_capture_limit(self.config.capture_limit_bytes)
            .execute(&request, stdout, stderr)
            .await
    }
}

/// Resolve and run `file_path` against the local Docker daemon, streaming
/// program output to this process's stdout and stderr.
pub async fn execute_file(
    file_path: &Path,
    config: &HarnessConfig,
) -> Result<ExecutionOutcome, JumpError> {
    let registry = config.registry();
    let plan = prepare(file_path, config, &registry).await?;

    let session = Session::connect().await?;
    Orchestrator::new(session.engine(), config)
        .execute(
            &plan,
            CrosstermSink::stdout(),
            tokio::io::stdout(),
            tokio::io::stderr(),
        )
        .await
}

/// Run `file_path` with default configuration and return the process exit status.
pub async fn run(file_path: &Path, verbose: bool) -> i32 {
    run_with_config(file_path, &HarnessConfig::default().with_verbose(verbose)).await
}

pub async fn run_with_config(file_path: &Path, config: &HarnessConfig) -> i32 {
    match execute_file(file_path, config).await {
        Ok(outcome) => exit_status(outcome.exit_code),
        Err(err) => {
            log::debug!("Execution aborted: {:?}", err);
            eprintln!("Error: {}", err);
            err.exit_code()
        }
    }
}

/// Container exit codes outside the `i32` range collapse to 1.
pub fn exit_status(code: i64) -> i32 {
    i32::try_from(code).unwrap_or(1)
}
