//! Framing for Sway IPC messages.
//!
//! Every payload is read through a reader limited to the length announced
//! in the header, and whatever the handler leaves unread is drained before
//! returning.  A handler that bails out early or chokes on malformed JSON
//! therefore never leaves the stream in the middle of a message.

use super::message::{MessageType, HEADER_LEN, MAGIC};
use super::IpcError;
use log::debug;
use serde::Serialize;
use std::io::{self, Read, Take, Write};

/// A fully received message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageType,
    pub payload: Vec<u8>,
}

/// Receive the next message from `r` and hand its payload to `f`.
///
/// Blocks until a whole header is available.  The payload reader yields
/// exactly the announced number of bytes; any bytes `f` does not consume
/// are discarded afterwards.  If `f` fails, its error is returned, but
/// only after the payload has been drained.
pub fn read_message_with<R, T, F>(r: &mut R, f: F) -> Result<T, IpcError>
where
    R: Read,
    F: FnOnce(MessageType, &mut Take<&mut R>) -> Result<T, IpcError>,
{
    let mut header = [0u8; HEADER_LEN];
    r.read_exact(&mut header)?;

    let mut magic = [0u8; 6];
    magic.copy_from_slice(&header[..6]);
    if magic != MAGIC {
        return Err(IpcError::BadMagic(magic));
    }
    let len = u32::from_ne_bytes([header[6], header[7], header[8], header[9]]);
    let kind = MessageType::from_wire([header[10], header[11], header[12], header[13]]);
    debug!("received {} with {} byte payload", kind, len);

    let mut payload = (&mut *r).take(u64::from(len));
    let handled = f(kind, &mut payload);
    let drained = io::copy(&mut payload, &mut io::sink());
    let value = handled?;
    drained?;
    if payload.limit() > 0 {
        return Err(IpcError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed inside a message payload",
        )));
    }
    Ok(value)
}

/// Receive the next message from `r` with its whole payload.
pub fn read_message<R: Read>(r: &mut R) -> Result<Message, IpcError> {
    read_message_with(r, |kind, payload| {
        let mut buf = Vec::with_capacity(payload.limit().min(64 * 1024) as usize);
        payload.read_to_end(&mut buf)?;
        Ok(Message { kind, payload: buf })
    })
}

/// Send a message of type `kind` with no payload.
pub fn write_empty_message<W: Write>(w: &mut W, kind: MessageType) -> Result<(), IpcError> {
    w.write_all(&header(kind, 0))?;
    w.flush()?;
    Ok(())
}

/// Send a message of type `kind` whose payload is `value` encoded as JSON.
///
/// Header and payload go out in a single write.
pub fn write_json_message<W, T>(w: &mut W, kind: MessageType, value: &T) -> Result<(), IpcError>
where
    W: Write,
    T: Serialize + ?Sized,
{
    let body = serde_json::to_vec(value)?;
    let len = u32::try_from(body.len()).map_err(|_| IpcError::PayloadTooLarge(body.len()))?;

    let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
    frame.extend_from_slice(&header(kind, len));
    frame.extend_from_slice(&body);
    w.write_all(&frame)?;
    w.flush()?;
    debug!("sent {} with {} byte payload", kind, len);
    Ok(())
}

fn header(kind: MessageType, len: u32) -> [u8; HEADER_LEN] {
    let mut h = [0u8; HEADER_LEN];
    h[..6].copy_from_slice(&MAGIC);
    h[6..10].copy_from_slice(&len.to_ne_bytes());
    h[10..].copy_from_slice(&kind.to_wire());
    h
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn json_message_round_trip() {
        let mut wire = Vec::new();
        write_json_message(&mut wire, MessageType::SUBSCRIBE, &["input"]).unwrap();

        let msg = read_message(&mut Cursor::new(wire)).unwrap();
        assert_eq!(msg.kind, MessageType::SUBSCRIBE);
        let doc: serde_json::Value = serde_json::from_slice(&msg.payload).unwrap();
        assert_eq!(doc, json!(["input"]));
    }

    #[test]
    fn empty_message_has_bare_header() {
        let mut wire = Vec::new();
        write_empty_message(&mut wire, MessageType::GET_INPUTS).unwrap();
        assert_eq!(wire.len(), HEADER_LEN);
        assert_eq!(&wire[..6], b"i3-ipc");
        assert_eq!(&wire[6..10], &0u32.to_ne_bytes());
        assert_eq!(&wire[10..], &100u32.to_ne_bytes());

        let msg = read_message(&mut Cursor::new(wire)).unwrap();
        assert_eq!(msg.kind, MessageType::GET_INPUTS);
        assert!(msg.payload.is_empty());
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut wire = Vec::new();
        write_json_message(&mut wire, MessageType::SUBSCRIBE, &json!({"success": true})).unwrap();
        wire[..6].copy_from_slice(b"i3-ipx");

        let err = read_message(&mut Cursor::new(wire)).unwrap_err();
        assert!(matches!(err, IpcError::BadMagic(m) if &m == b"i3-ipx"));
    }

    #[test]
    fn truncated_header_is_io_error() {
        let err = read_message(&mut Cursor::new(b"i3-ipc\x00".to_vec())).unwrap_err();
        match err {
            IpcError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected io error, got {:?}", other),
        }
    }

    #[test]
    fn truncated_payload_is_io_error() {
        let mut wire = Vec::new();
        write_json_message(&mut wire, MessageType::GET_INPUTS, &json!([1, 2, 3])).unwrap();
        wire.truncate(wire.len() - 2);

        let err = read_message(&mut Cursor::new(wire)).unwrap_err();
        assert!(matches!(err, IpcError::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn unread_payload_is_drained() {
        let mut wire = Vec::new();
        write_json_message(&mut wire, MessageType::GET_INPUTS, &json!({"big": "x".repeat(64)}))
            .unwrap();
        write_empty_message(&mut wire, MessageType::SUBSCRIBE).unwrap();
        let mut cursor = Cursor::new(wire);

        // Read only two bytes of the first payload.
        let kind = read_message_with(&mut cursor, |kind, payload| {
            let mut two = [0u8; 2];
            payload.read_exact(&mut two)?;
            Ok(kind)
        })
        .unwrap();
        assert_eq!(kind, MessageType::GET_INPUTS);

        let next = read_message(&mut cursor).unwrap();
        assert_eq!(next.kind, MessageType::SUBSCRIBE);
    }

    #[test]
    fn handler_error_still_drains_payload() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&header(MessageType::INPUT_EVENT, 9));
        wire.extend_from_slice(b"not json!");
        write_empty_message(&mut wire, MessageType::SUBSCRIBE).unwrap();
        let mut cursor = Cursor::new(wire);

        let err = read_message_with(&mut cursor, |_, payload| {
            let v: serde_json::Value = serde_json::from_reader(payload)?;
            Ok(v)
        })
        .unwrap_err();
        assert!(matches!(err, IpcError::Json(_)));

        let next = read_message(&mut cursor).unwrap();
        assert_eq!(next.kind, MessageType::SUBSCRIBE);
    }

    /// A writer that accepts at most `cap` bytes and then reports zero.
    struct ShortWriter {
        cap: usize,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.cap);
            self.cap -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn short_write_is_io_error() {
        let mut w = ShortWriter { cap: HEADER_LEN + 2 };
        let err = write_json_message(&mut w, MessageType::SUBSCRIBE, &["input"]).unwrap_err();
        assert!(matches!(err, IpcError::Io(ref e) if e.kind() == io::ErrorKind::WriteZero));
    }
}
