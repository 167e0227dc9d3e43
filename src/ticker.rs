//! Wall-clock aligned time events.
//!
//! The ticker fires, then sleeps until the next multiple of its period in
//! local time, so a one-minute ticker always fires at `:00` seconds no
//! matter when the process started.

use crate::status::StatusEvent;
use crate::traits::EventSource;
use chrono::{DateTime, Local};
use log::debug;
use std::convert::Infallible;
use std::sync::mpsc;
use std::time::Duration;

/// An [`EventSource`] producing [`StatusEvent::Tick`]s.
pub struct Ticker {
    period: Duration,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }
}

/// Time from `now` until the next local wall-clock multiple of `period`.
///
/// Exactly on a boundary this is a whole `period`.
pub fn until_next_boundary(now: DateTime<Local>, period: Duration) -> Duration {
    let period = period.as_nanos() as i128;
    if period == 0 {
        return Duration::ZERO;
    }
    let local_secs = now.timestamp() + i64::from(now.offset().local_minus_utc());
    let local_nanos =
        i128::from(local_secs) * 1_000_000_000 + i128::from(now.timestamp_subsec_nanos());
    let wait = period - local_nanos.rem_euclid(period);
    Duration::from_nanos(wait as u64)
}

impl EventSource for Ticker {
    type Error = Infallible;

    /// Fire immediately, then on every boundary.  Never fails; returns
    /// when the sink is closed.
    fn run(&mut self, sink: mpsc::SyncSender<StatusEvent>) -> Result<(), Infallible> {
        loop {
            let now = Local::now();
            debug!("tick at {}", now);
            if sink.send(StatusEvent::Tick(now)).is_err() {
                return Ok(());
            }
            std::thread::sleep(until_next_boundary(Local::now(), self.period));
        }
    }
}
