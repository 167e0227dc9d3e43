//! **sklt**: a swaybar status line showing the keyboard layout that
//! changed last, followed by the time.
//!
//! Sway keeps a layout per input device.  sklt follows all of them over
//! Sway's IPC socket and shows only the most recently changed one, which
//! is the one the user just switched.
//!
//! # Architecture
//!
//! Two [`traits::EventSource`]s run on their own threads and hand
//! [`status::StatusEvent`]s to the [`status::StatusLine`] over a
//! rendezvous channel:
//!
//! * [`sway::monitor::LayoutMonitor`] owns the IPC connection and the
//!   [`registry::DeviceRegistry`] and reports layout changes.
//! * [`ticker::Ticker`] fires on wall-clock aligned boundaries.
//!
//! The status line is the only writer of standard output and suppresses
//! repeated lines.  Every IPC or output error is fatal; the bar restarts
//! the program.

pub mod config;
pub mod interval;
pub mod layout_names;
pub mod registry;
pub mod status;
pub mod sway;
pub mod ticker;
pub mod traits;
