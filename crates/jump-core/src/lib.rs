//! Local code-execution harness.
//!
//! Given a solution file, this crate selects a language runtime image, makes
//! sure the image is present locally, stages the source together with its test
//! cases and test runner into a fresh container, runs a language-specific
//! command and streams the program's output back.
//!
//! # Architecture Overview
//!
//! - **Runtime registry**: file extension to image and runtime family
//! - **Image acquisition**: presence check and pull with per-layer progress rows
//! - **Command synthesis**: the shell script that checks, compiles and runs a file
//! - **Container lifecycle**: evict, create, stage, start, wait, collect, stop
//! - **Engine abstraction**: the [`engine::ContainerEngine`] trait with a Docker backend
//! - **Configuration system**: YAML file and environment overrides on built-in defaults

pub mod companion;
pub mod config;
pub mod container;
pub mod engine;
pub mod errors;
pub mod image;
pub mod orchestrator;
pub mod runtime;

pub use config::*;
pub use engine::{ContainerEngine, DockerEngine};
pub use errors::{EngineError, JumpError};
pub use orchestrator::{execute_file, prepare, run, run_with_config, ExecutionPlan, Orchestrator, Session};
pub use runtime::{CommandSynthesizer, RuntimeDescriptor, RuntimeFamily, RuntimeRegistry};

#[cfg(test)]
pub mod test_utils;

#[cfg(test)]
mod test_end_to_end;
