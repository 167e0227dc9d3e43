//! Sway IPC message types and the subset of JSON payloads we read.
//!
//! # Wire format
//!
//! ```text
//! [magic:6 = "i3-ipc"][length:4][type:4][payload:length]
//! ```
//!
//! `length` and `type` are unsigned 32-bit integers in the host's native
//! byte order, which is what Sway itself writes.  Payloads are JSON.

use serde::Deserialize;
use std::fmt;

/// Protocol magic at the start of every header.
pub const MAGIC: [u8; 6] = *b"i3-ipc";

/// Size of the fixed message header.
pub const HEADER_LEN: usize = 14;

/// Sway message type code as it appears in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageType(pub u32);

impl MessageType {
    /// Subscribe to event classes; the reply carries a success flag.
    pub const SUBSCRIBE: MessageType = MessageType(2);
    /// List input devices.
    pub const GET_INPUTS: MessageType = MessageType(100);
    /// Pushed by Sway when an input device is added, removed or changed.
    pub const INPUT_EVENT: MessageType = MessageType(0x8000_0015);

    /// Whether this is an asynchronously pushed event rather than a
    /// reply.  Events have the high bit set.
    pub fn is_event(self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// Encode for the header.
    pub fn to_wire(self) -> [u8; 4] {
        self.0.to_ne_bytes()
    }

    /// Decode from the header.
    pub fn from_wire(bytes: [u8; 4]) -> Self {
        MessageType(u32::from_ne_bytes(bytes))
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MessageType::SUBSCRIBE => write!(f, "SUBSCRIBE"),
            MessageType::GET_INPUTS => write!(f, "GET_INPUTS"),
            MessageType::INPUT_EVENT => write!(f, "input event"),
            MessageType(code) => write!(f, "type {:#x}", code),
        }
    }
}

/// Reply to [`MessageType::SUBSCRIBE`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubscribeReply {
    pub success: bool,
}

/// Subset of one element of the `GET_INPUTS` reply.
///
/// Non-keyboard devices have no `xkb_active_layout_name`; they are
/// treated as having an empty layout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InputDevice {
    pub identifier: String,
    #[serde(default)]
    pub xkb_active_layout_name: Option<String>,
}

impl InputDevice {
    /// Active layout name, `""` when the device reports none.
    pub fn layout(&self) -> &str {
        self.xkb_active_layout_name.as_deref().unwrap_or("")
    }
}

/// Payload of [`MessageType::INPUT_EVENT`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InputEvent {
    pub change: String,
    pub input: InputDevice,
}

impl InputEvent {
    /// Whether the device was unplugged.
    pub fn is_removal(&self) -> bool {
        self.change == "removed"
    }
}
