//! Multi-line pull progress rendering with relative cursor motion.
//!
//! Each image layer owns one terminal row, assigned the first time the layer
//! shows up in the event stream. Later events for that layer rewrite its row in
//! place: the renderer moves the cursor up or down by the row difference,
//! clears the line and prints the new status. Nothing is ever positioned
//! absolutely and the alternate screen is never used, so the rendered block
//! stays in the normal scrollback once the pull is done.
//!
//! Row bookkeeping lives in [`LayerRowMap`], a plain value, and the renderer
//! emits [`TerminalOp`]s to a [`ProgressSink`]. That keeps the position
//! arithmetic independent of a real terminal.

use crossterm::{cursor, queue, style, terminal};
use std::io::{self, Write};

use crate::engine::PullEvent;

pub const PULL_COMPLETE: &str = "Pull complete";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalOp {
    HideCursor,
    ShowCursor,
    MoveDown(u16),
    MoveUp(u16),
    ClearLine,
    /// Print text followed by a newline.
    Line(String),
}

/// Destination for rendered progress.
pub trait ProgressSink: Send {
    fn apply(&mut self, ops: &[TerminalOp]) -> io::Result<()>;
}

/// Writes progress to a terminal through crossterm commands.
pub struct CrosstermSink<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> CrosstermSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl CrosstermSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ProgressSink for CrosstermSink<W> {
    fn apply(&mut self, ops: &[TerminalOp]) -> io::Result<()> {
        for op in ops {
            match op {
                TerminalOp::HideCursor => queue!(self.out, cursor::Hide)?,
                TerminalOp::ShowCursor => queue!(self.out, cursor::Show)?,
                TerminalOp::MoveDown(rows) => queue!(self.out, cursor::MoveToNextLine(*rows))?,
                TerminalOp::MoveUp(rows) => queue!(self.out, cursor::MoveToPreviousLine(*rows))?,
                TerminalOp::ClearLine => {
                    queue!(self.out, terminal::Clear(terminal::ClearType::CurrentLine))?
                }
                TerminalOp::Line(text) => queue!(self.out, style::Print(text), style::Print("\n"))?,
            }
        }
        self.out.flush()
    }
}

/// Row assignment for the lines of a pull.
///
/// Position in `rows` is the line offset from the first row ever printed.
/// Layers keep their row for the lifetime of the pull and the map only grows.
/// Summary lines occupy a row without a layer id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerRowMap {
    rows: Vec<Option<String>>,
    current_row: usize,
}

impl LayerRowMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_of(&self, layer_id: &str) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.as_deref() == Some(layer_id))
    }

    /// Row the physical cursor is on, relative to the first row.
    pub fn current_row(&self) -> usize {
        self.current_row
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn layers(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().filter_map(|row| row.as_deref())
    }

    /// Resolve `layer_id` to its row, appending it if unseen, and return the
    /// cursor motion that brings the cursor onto that row.
    pub fn seek(&mut self, layer_id: &str) -> (usize, Option<TerminalOp>) {
        let row = match self.row_of(layer_id) {
            Some(row) => row,
            None => {
                self.rows.push(Some(layer_id.to_string()));
                self.rows.len() - 1
            }
        };
        (row, self.move_to(row))
    }

    /// Append an anonymous row below everything printed so far.
    pub fn seek_end(&mut self) -> (usize, Option<TerminalOp>) {
        self.rows.push(None);
        let row = self.rows.len() - 1;
        (row, self.move_to(row))
    }

    /// Record that `row` was printed, leaving the cursor on the line below.
    pub fn printed(&mut self, row: usize) {
        self.current_row = row + 1;
    }

    fn move_to(&self, row: usize) -> Option<TerminalOp> {
        if row > self.current_row {
            Some(TerminalOp::MoveDown(clamp_rows(row - self.current_row)))
        } else if row < self.current_row {
            Some(TerminalOp::MoveUp(clamp_rows(self.current_row - row)))
        } else {
            None
        }
    }
}

fn clamp_rows(rows: usize) -> u16 {
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn is_summary(status: &str) -> bool {
    status.starts_with("Digest:") || status.starts_with("Status:")
}

/// Text printed on a layer's row.
pub fn layer_line(event: &PullEvent) -> String {
    if event.status == PULL_COMPLETE || event.progress.is_empty() {
        format!("{}: {}", event.layer_id, event.status)
    } else {
        format!("{}: {} {}", event.layer_id, event.status, event.progress)
    }
}

/// Renders pull events onto stable terminal rows.
///
/// The cursor is hidden by [`begin`](Self::begin) and shown again by
/// [`end`](Self::end). `end` runs at most once per `begin` and is also run on
/// drop, so the cursor is restored on error paths and unwinding.
pub struct ProgressRenderer<S: ProgressSink> {
    sink: S,
    rows: LayerRowMap,
    active: bool,
}

impl<S: ProgressSink> ProgressRenderer<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            rows: LayerRowMap::new(),
            active: false,
        }
    }

    pub fn rows(&self) -> &LayerRowMap {
        &self.rows
    }

    pub fn begin(&mut self) -> io::Result<()> {
        if self.active {
            return Ok(());
        }
        self.active = true;
        self.sink
            .apply(&[TerminalOp::HideCursor, TerminalOp::Line(String::new())])
    }

    pub fn render(&mut self, event: &PullEvent) -> io::Result<()> {
        let (row, motion) = if is_summary(&event.status) {
            self.rows.seek_end()
        } else {
            self.rows.seek(&event.layer_id)
        };

        let text = if is_summary(&event.status) {
            event.status.clone()
        } else {
            layer_line(event)
        };

        let mut ops = Vec::with_capacity(3);
        ops.extend(motion);
        ops.push(TerminalOp::ClearLine);
        ops.push(TerminalOp::Line(text));
        self.rows.printed(row);
        self.sink.apply(&ops)
    }

    pub fn end(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        let mut ops = Vec::with_capacity(2);
        // Park the cursor below the block so later output does not overwrite it.
        if self.rows.current_row() < self.rows.len() {
            ops.push(TerminalOp::MoveDown(clamp_rows(
                self.rows.len() - self.rows.current_row(),
            )));
        }
        ops.push(TerminalOp::ShowCursor);
        self.sink.apply(&ops)
    }
}

impl<S: ProgressSink> Drop for ProgressRenderer<S> {
    fn drop(&mut self) {
        if let Err(e) = self.end() {
            log::warn!("Failed to restore terminal cursor: {}", e);
        }
    }
}
