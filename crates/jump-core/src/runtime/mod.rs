//! Language runtimes: which image runs a source file and with what command.

pub mod command;
pub mod registry;

pub use command::{shell_invocation, CommandSynthesizer};
pub use registry::{RuntimeDescriptor, RuntimeFamily, RuntimeRegistry};
