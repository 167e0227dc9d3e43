//! The seam between event producers and the status loop.
//!
//! The [`StatusLine`](crate::status::StatusLine) does not know whether an
//! event came from Sway, a timer or a test harness; it only drains a
//! channel of [`StatusEvent`]s.

use crate::status::StatusEvent;
use std::sync::mpsc;

/// A source of [`StatusEvent`]s.
///
/// # Contract
///
/// * [`run`](EventSource::run) **blocks** until the source fails or the
///   sink is closed.  A closed sink is a normal shutdown and returns
///   `Ok(())`.
/// * Implementations must be [`Send`] so they can run on a dedicated
///   thread.
pub trait EventSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Produce events into `sink` until done.
    fn run(&mut self, sink: mpsc::SyncSender<StatusEvent>) -> Result<(), Self::Error>;
}
