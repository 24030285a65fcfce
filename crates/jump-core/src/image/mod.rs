//! Runtime image acquisition and pull progress display.

pub mod acquisition;
pub mod progress;

pub use acquisition::{pull_confirmed, ImageAcquisition};
pub use progress::{CrosstermSink, LayerRowMap, ProgressRenderer, ProgressSink, TerminalOp};
