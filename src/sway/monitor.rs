//! Watches Sway keyboard layouts and reports the one that changed last.
//!
//! The monitor owns the IPC connection and the [`DeviceRegistry`].  It
//! subscribes to `input` events, asks for the initial device list, and
//! then follows input events forever.  After every message it compares
//! the (translated) layout of the most recently changed device with the
//! last one it reported and forwards it only if it differs.
//!
//! ```text
//! Subscribing ──send SUBSCRIBE──▶ AwaitingSubscribeAck
//!     ──success reply, send GET_INPUTS──▶ AwaitingInitialInputs
//!     ──device list──▶ Steady ◀──input events──┐
//!                        └─────────────────────┘
//! ```
//!
//! Every error is fatal; there is no reconnect.

use super::codec::{read_message_with, write_empty_message, write_json_message};
use super::message::{InputDevice, InputEvent, MessageType, SubscribeReply};
use super::IpcError;
use crate::layout_names::LayoutNames;
use crate::registry::DeviceRegistry;
use crate::status::StatusEvent;
use crate::traits::EventSource;
use log::{debug, info};
use std::io::{BufReader, Read, Write};
use std::sync::mpsc;

/// Where the monitor is in the subscription handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing sent yet.
    Subscribing,
    /// Subscribe request sent, waiting for its reply.
    AwaitingSubscribeAck,
    /// `GET_INPUTS` sent, waiting for the device list.
    AwaitingInitialInputs,
    /// Following input events.
    Steady,
}

/// A decoded inbound message.
#[derive(Debug)]
enum Incoming {
    Subscribed(SubscribeReply),
    Inputs(Vec<InputDevice>),
    Input(InputEvent),
    Ignored(MessageType),
}

/// Decode the payload of a message of type `kind`.
///
/// serde_json reads byte by byte, so the payload is buffered; the caller's
/// length limit keeps the buffer inside the message.
fn decode<R: Read>(kind: MessageType, payload: R) -> Result<Incoming, IpcError> {
    let payload = BufReader::new(payload);
    Ok(match kind {
        MessageType::SUBSCRIBE => Incoming::Subscribed(serde_json::from_reader(payload)?),
        MessageType::GET_INPUTS => Incoming::Inputs(serde_json::from_reader(payload)?),
        MessageType::INPUT_EVENT => Incoming::Input(serde_json::from_reader(payload)?),
        other => Incoming::Ignored(other),
    })
}

/// An [`EventSource`] producing [`StatusEvent::Layout`]s from a Sway
/// IPC connection.
pub struct LayoutMonitor<S> {
    conn: S,
    registry: DeviceRegistry,
    names: LayoutNames,
    phase: Phase,
    /// Last layout handed to the sink, after translation.
    last_emitted: String,
}

impl<S: Read + Write> LayoutMonitor<S> {
    /// Wrap an open connection.  Nothing is sent until
    /// [`subscribe`](Self::subscribe) or [`run`](EventSource::run).
    pub fn new(conn: S, names: LayoutNames) -> Self {
        Self {
            conn,
            registry: DeviceRegistry::new(),
            names,
            phase: Phase::Subscribing,
            last_emitted: String::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Ask Sway for `input` events.
    pub fn subscribe(&mut self) -> Result<(), IpcError> {
        write_json_message(&mut self.conn, MessageType::SUBSCRIBE, &["input"])?;
        self.phase = Phase::AwaitingSubscribeAck;
        Ok(())
    }

    /// Block for the next message and apply it.
    ///
    /// Returns the new layout if the reported layout changed.
    pub fn poll(&mut self) -> Result<Option<String>, IpcError> {
        let incoming = read_message_with(&mut self.conn, |kind, payload| decode(kind, payload))?;
        self.apply(incoming)?;
        Ok(self.take_update())
    }

    fn apply(&mut self, incoming: Incoming) -> Result<(), IpcError> {
        match incoming {
            Incoming::Subscribed(reply) => {
                if self.phase != Phase::AwaitingSubscribeAck {
                    debug!("unexpected subscribe reply in {:?}", self.phase);
                    return Ok(());
                }
                if !reply.success {
                    return Err(IpcError::SubscribeRejected);
                }
                info!("subscribed to input events");
                write_empty_message(&mut self.conn, MessageType::GET_INPUTS)?;
                self.phase = Phase::AwaitingInitialInputs;
            }
            Incoming::Inputs(devices) => {
                debug!("initial device list with {} entries", devices.len());
                for dev in &devices {
                    self.registry.set(&dev.identifier, dev.layout());
                }
                debug!("tracking {} keyboard(s)", self.registry.len());
                self.phase = Phase::Steady;
            }
            Incoming::Input(event) => {
                debug!("input {} {}", event.change, event.input.identifier);
                if event.is_removal() {
                    self.registry.delete(&event.input.identifier);
                } else {
                    self.registry.set(&event.input.identifier, event.input.layout());
                }
            }
            Incoming::Ignored(kind) if kind.is_event() => debug!("ignoring event {}", kind),
            Incoming::Ignored(kind) => debug!("ignoring reply {}", kind),
        }
        Ok(())
    }

    /// The translated current layout, if it differs from the last one
    /// reported.
    fn take_update(&mut self) -> Option<String> {
        let current = self.names.translate(self.registry.current_layout());
        if current == self.last_emitted {
            return None;
        }
        self.last_emitted = current.to_string();
        Some(self.last_emitted.clone())
    }
}

impl<S: Read + Write + Send> EventSource for LayoutMonitor<S> {
    type Error = IpcError;

    /// Subscribe and follow layout changes until the connection fails or
    /// the sink is closed.
    fn run(&mut self, sink: mpsc::SyncSender<StatusEvent>) -> Result<(), IpcError> {
        self.subscribe()?;
        loop {
            if let Some(layout) = self.poll()? {
                debug!("reporting layout {:?}", layout);
                if sink.send(StatusEvent::Layout(layout)).is_err() {
                    info!("status loop gone, stopping layout monitor");
                    return Ok(());
                }
            }
        }
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sway::codec::read_message;
    use serde_json::{json, Value};
    use std::os::unix::net::UnixStream;

    /// The compositor end of a socket pair.
    struct FakeSway {
        stream: UnixStream,
    }

    impl FakeSway {
        fn expect(&mut self, kind: MessageType) -> Value {
            let msg = read_message(&mut self.stream).unwrap();
            assert_eq!(msg.kind, kind);
            if msg.payload.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&msg.payload).unwrap()
            }
        }

        fn send(&mut self, kind: MessageType, payload: Value) {
            write_json_message(&mut self.stream, kind, &payload).unwrap();
        }

        fn input(&mut self, change: &str, id: &str, layout: Option<&str>) {
            self.send(
                MessageType::INPUT_EVENT,
                json!({"change": change,
                       "input": {"identifier": id, "xkb_active_layout_name": layout}}),
            );
        }

        /// Drive the handshake up to the device list.
        fn handshake(&mut self, devices: Value) {
            assert_eq!(self.expect(MessageType::SUBSCRIBE), json!(["input"]));
            self.send(MessageType::SUBSCRIBE, json!({"success": true}));
            assert_eq!(self.expect(MessageType::GET_INPUTS), Value::Null);
            self.send(MessageType::GET_INPUTS, devices);
        }
    }

    fn pair(names: LayoutNames) -> (LayoutMonitor<UnixStream>, FakeSway) {
        let (a, b) = UnixStream::pair().unwrap();
        (LayoutMonitor::new(a, names), FakeSway { stream: b })
    }

    #[test]
    fn handshake_walks_through_phases() {
        let (mut monitor, mut sway) = pair(LayoutNames::new());
        assert_eq!(monitor.phase(), Phase::Subscribing);

        monitor.subscribe().unwrap();
        assert_eq!(monitor.phase(), Phase::AwaitingSubscribeAck);
        assert_eq!(sway.expect(MessageType::SUBSCRIBE), json!(["input"]));

        sway.send(MessageType::SUBSCRIBE, json!({"success": true}));
        assert_eq!(monitor.poll().unwrap(), None);
        assert_eq!(monitor.phase(), Phase::AwaitingInitialInputs);
        sway.expect(MessageType::GET_INPUTS);

        sway.send(
            MessageType::GET_INPUTS,
            json!([{"identifier": "A", "xkb_active_layout_name": "us"}]),
        );
        assert_eq!(monitor.poll().unwrap(), Some("us".to_string()));
        assert_eq!(monitor.phase(), Phase::Steady);
        assert_eq!(monitor.registry().current_layout(), "us");
    }

    #[test]
    fn initial_list_is_applied_in_order() {
        let (mut monitor, mut sway) = pair(LayoutNames::new());
        monitor.subscribe().unwrap();
        sway.expect(MessageType::SUBSCRIBE);
        sway.send(MessageType::SUBSCRIBE, json!({"success": true}));
        monitor.poll().unwrap();
        sway.expect(MessageType::GET_INPUTS);
        sway.send(
            MessageType::GET_INPUTS,
            json!([
                {"identifier": "kbd0", "xkb_active_layout_name": "us"},
                {"identifier": "mouse", "type": "pointer"},
                {"identifier": "kbd1", "xkb_active_layout_name": "de"}
            ]),
        );
        assert_eq!(monitor.poll().unwrap(), Some("de".to_string()));
        assert_eq!(monitor.registry().len(), 2);
    }

    #[test]
    fn rejected_subscription_is_fatal() {
        let (mut monitor, mut sway) = pair(LayoutNames::new());
        monitor.subscribe().unwrap();
        sway.expect(MessageType::SUBSCRIBE);
        sway.send(MessageType::SUBSCRIBE, json!({"success": false}));
        assert!(matches!(monitor.poll(), Err(IpcError::SubscribeRejected)));
    }

    #[test]
    fn malformed_payload_is_fatal() {
        let (mut monitor, mut sway) = pair(LayoutNames::new());
        monitor.subscribe().unwrap();
        sway.expect(MessageType::SUBSCRIBE);
        sway.send(MessageType::SUBSCRIBE, json!({"succ": "maybe"}));
        assert!(matches!(monitor.poll(), Err(IpcError::Json(_))));
    }

    #[test]
    fn wrong_magic_is_fatal() {
        let (mut monitor, mut sway) = pair(LayoutNames::new());
        sway.stream.write_all(b"i3-ipX\0\0\0\0\0\0\0\0").unwrap();
        assert!(matches!(monitor.poll(), Err(IpcError::BadMagic(_))));
    }

    #[test]
    fn unknown_message_types_are_ignored() {
        let (mut monitor, mut sway) = pair(LayoutNames::new());
        sway.send(MessageType(0x8000_0000), json!({"change": "focus"}));
        assert_eq!(monitor.poll().unwrap(), None);
        assert_eq!(monitor.phase(), Phase::Subscribing);
    }

    #[test]
    fn translated_duplicates_are_reported_once() {
        let names: LayoutNames = [("English (US)", "us"), ("English (intl)", "us")]
            .into_iter()
            .collect();
        let (mut monitor, mut sway) = pair(names);
        sway.input("added", "kbd0", Some("English (US)"));
        assert_eq!(monitor.poll().unwrap(), Some("us".to_string()));
        sway.input("xkb_layout", "kbd0", Some("English (intl)"));
        assert_eq!(monitor.poll().unwrap(), None);
        assert_eq!(monitor.registry().current_layout(), "English (intl)");
    }

    /// An in-memory connection that counts `read` calls on the inbound side.
    struct CountingConn {
        inbound: std::io::Cursor<Vec<u8>>,
        reads: usize,
    }

    impl Read for CountingConn {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.reads += 1;
            self.inbound.read(buf)
        }
    }

    impl Write for CountingConn {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn large_device_list_is_read_in_few_calls() {
        let devices: Vec<Value> = (0..40)
            .map(|i| {
                json!({"identifier": format!("1:{}:Some_Vendor_Keyboard_{}", i, i),
                       "type": "keyboard",
                       "xkb_active_layout_name": "English (US)"})
            })
            .collect();
        let mut wire = Vec::new();
        write_json_message(&mut wire, MessageType::GET_INPUTS, &devices).unwrap();
        let wire_len = wire.len();
        assert!(wire_len > 2000);

        let conn = CountingConn {
            inbound: std::io::Cursor::new(wire),
            reads: 0,
        };
        let mut monitor = LayoutMonitor::new(conn, LayoutNames::new());
        assert_eq!(monitor.poll().unwrap(), Some("English (US)".to_string()));
        assert_eq!(monitor.registry().len(), 40);
        assert!(
            monitor.conn.reads < 10,
            "{} read calls for a {} byte message",
            monitor.conn.reads,
            wire_len
        );
    }

    #[test]
    fn run_reports_changes_until_connection_closes() {
        let (mut monitor, mut sway) = pair(LayoutNames::new());
        let (tx, rx) = mpsc::sync_channel(0);
        let handle = std::thread::spawn(move || monitor.run(tx));

        sway.handshake(json!([{"identifier": "A", "xkb_active_layout_name": "us"}]));
        assert_eq!(rx.recv().unwrap(), StatusEvent::Layout("us".into()));

        sway.input("added", "B", Some("de"));
        assert_eq!(rx.recv().unwrap(), StatusEvent::Layout("de".into()));

        // Same layout again: no notification, so the next one seen is the
        // removal below.
        sway.input("xkb_keymap", "B", Some("de"));
        sway.send(MessageType(0x8000_0003), json!({"change": "run"}));
        sway.input("removed", "B", None);
        assert_eq!(rx.recv().unwrap(), StatusEvent::Layout("us".into()));

        sway.input("removed", "A", None);
        assert_eq!(rx.recv().unwrap(), StatusEvent::Layout(String::new()));

        drop(sway);
        let result = handle.join().unwrap();
        assert!(matches!(result, Err(IpcError::Io(_))));
    }

    #[test]
    fn run_stops_when_sink_closes() {
        let (mut monitor, mut sway) = pair(LayoutNames::new());
        let (tx, rx) = mpsc::sync_channel(0);
        drop(rx);
        let handle = std::thread::spawn(move || monitor.run(tx));
        sway.handshake(json!([{"identifier": "A", "xkb_active_layout_name": "us"}]));
        assert!(handle.join().unwrap().is_ok());
    }
}
