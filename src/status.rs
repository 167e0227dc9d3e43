//! The status loop: the single consumer of layout and time events and the
//! only writer of standard output.
//!
//! Each event produces a candidate line `"<layout> <time>\n"` (or just
//! `"<time>\n"` when no IPC connection exists).  A candidate identical to
//! the previously written line is dropped.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use log::debug;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::mpsc;

/// An event that may change the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// The reported keyboard layout changed.
    Layout(String),
    /// The ticker fired at the given wall-clock time.
    Tick(DateTime<Local>),
}

/// A validated strftime-style time format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeFormat(String);

/// The format string contains an unknown or incomplete specifier.
#[derive(Debug, thiserror::Error)]
#[error("invalid time format: {0:?}")]
pub struct TimeFormatError(String);

impl TimeFormat {
    /// Validate `format` so that rendering cannot fail later.
    pub fn new(format: impl Into<String>) -> Result<Self, TimeFormatError> {
        let format = format.into();
        if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
            return Err(TimeFormatError(format));
        }
        Ok(Self(format))
    }

    /// The raw format string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append `time` formatted with this format to `out`.
    pub fn render(&self, time: &DateTime<Local>, out: &mut String) -> std::fmt::Result {
        write!(out, "{}", time.format(&self.0))
    }
}

/// Builds status lines and writes the ones that differ from the last.
pub struct StatusLine<W> {
    out: W,
    format: TimeFormat,
    /// Whether a layout prefix is shown at all (IPC connected).
    with_layout: bool,
    layout: String,
    last: String,
}

impl<W: Write> StatusLine<W> {
    /// Create a status line writing to `out`.
    ///
    /// `with_layout` is `false` when running without a Sway connection,
    /// in which case lines carry only the time.
    pub fn new(out: W, format: TimeFormat, with_layout: bool) -> Self {
        Self {
            out,
            format,
            with_layout,
            layout: String::new(),
            last: String::new(),
        }
    }

    /// The last line written, including its newline.
    #[cfg(test)]
    fn last_line(&self) -> &str {
        &self.last
    }

    /// Process events until every sender has hung up.
    ///
    /// Any write failure ends the loop with an error.
    pub fn run(&mut self, events: mpsc::Receiver<StatusEvent>) -> io::Result<()> {
        for event in events {
            self.handle(event)?;
        }
        Ok(())
    }

    /// Process one event, stamping layout changes with the current time.
    pub fn handle(&mut self, event: StatusEvent) -> io::Result<bool> {
        self.handle_at(event, Local::now())
    }

    /// Process one event; layout changes are stamped with `now`, ticks
    /// with their own time.
    ///
    /// Returns whether a line was written.
    pub fn handle_at(&mut self, event: StatusEvent, now: DateTime<Local>) -> io::Result<bool> {
        let time = match event {
            StatusEvent::Layout(layout) => {
                debug!("layout event {:?}", layout);
                self.layout = layout;
                now
            }
            StatusEvent::Tick(t) => t,
        };
        let line = self.render(&time)?;
        self.emit(line)
    }

    fn render(&self, time: &DateTime<Local>) -> io::Result<String> {
        let mut line = String::new();
        if self.with_layout {
            line.push_str(&self.layout);
            line.push(' ');
        }
        self.format
            .render(time, &mut line)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "failed to format time"))?;
        line.push('\n');
        Ok(line)
    }

    /// Write `line` in one call unless it repeats the previous line.
    fn emit(&mut self, line: String) -> io::Result<bool> {
        if line == self.last {
            return Ok(false);
        }
        let n = self.out.write(line.as_bytes())?;
        if n < line.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "short write of status line",
            ));
        }
        self.out.flush()?;
        self.last = line;
        Ok(true)
    }
}

//  Tests
