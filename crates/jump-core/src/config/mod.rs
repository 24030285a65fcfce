//! Configuration module for the execution harness
//!
//! Everything has a built-in default, so a configuration file is optional. A
//! YAML file can move the container work directory, bound how long a program
//! may run, and add or replace language runtimes.

pub mod loader;
pub mod types;

pub use loader::*;
pub use types::*;
