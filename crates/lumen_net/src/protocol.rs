//! Framed binary wire protocol between master and workers.
//!
//! Packet layout, all integers little-endian:
//!
//! ```text
//!  4 bytes  tag (ASCII, no terminator)
//!  8 bytes  worker id (ASCII, right-padded with zero bytes)
//!  4 bytes  payload length (u32)
//!  N bytes  payload
//! ```
//!
//! The worker puts its own id in the field; the master echoes the
//! destination id. Each side only accepts the tags addressed to it.

use std::fmt;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

/// Receive-side cap on payload size.
pub const MAX_PAYLOAD: usize = 1024 * 1024;

/// Length of the worker id field.
pub const ID_LEN: usize = 8;

/// Errors raised by packet framing.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown packet tag {0:?}")]
    UnknownTag([u8; 4]),

    #[error("packet {tag} not acceptable for the {side} side")]
    WrongSide { tag: Tag, side: Side },

    #[error("payload of {0} bytes exceeds the {MAX_PAYLOAD} byte limit")]
    OversizedPayload(u32),

    #[error("malformed {tag} payload")]
    Malformed { tag: Tag },
}

/// Which end of the connection is receiving.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Side {
    Master,
    Worker,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Master => write!(f, "master"),
            Side::Worker => write!(f, "worker"),
        }
    }
}

/// Packet tags.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Tag {
    /// Worker -> master: ready to receive work.
    Ready,
    /// Master -> worker: serialized scene. Reserved, not yet sent.
    Scene,
    /// Master -> worker: serialized camera.
    Camera,
    /// Master -> worker: serialized work chunk input.
    Work,
    /// Worker -> master: rendered chunk pixels.
    Pixels,
}

impl Tag {
    pub fn bytes(self) -> [u8; 4] {
        match self {
            Tag::Ready => *b"RDY!",
            Tag::Scene => *b"SCNE",
            Tag::Camera => *b"CAMR",
            Tag::Work => *b"WORK",
            Tag::Pixels => *b"PXLS",
        }
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Option<Tag> {
        match &bytes {
            b"RDY!" => Some(Tag::Ready),
            b"SCNE" => Some(Tag::Scene),
            b"CAMR" => Some(Tag::Camera),
            b"WORK" => Some(Tag::Work),
            b"PXLS" => Some(Tag::Pixels),
            _ => None,
        }
    }

    /// Whether this side of the connection accepts the tag.
    pub fn acceptable_for(self, side: Side) -> bool {
        match side {
            Side::Master => matches!(self, Tag::Ready | Tag::Pixels),
            Side::Worker => matches!(self, Tag::Scene | Tag::Camera | Tag::Work),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.bytes();
        write!(f, "{}", String::from_utf8_lossy(&bytes))
    }
}

/// Fixed-width worker id, right-padded with zero bytes. Longer names are
/// truncated at construction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WorkerId([u8; ID_LEN]);

impl WorkerId {
    pub fn new(name: &str) -> Self {
        let mut id = [0u8; ID_LEN];
        let bytes = name.as_bytes();
        let len = bytes.len().min(ID_LEN);
        id[..len].copy_from_slice(&bytes[..len]);
        Self(id)
    }

    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }
}

impl From<[u8; ID_LEN]> for WorkerId {
    fn from(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(ID_LEN);
        write!(f, "{}", String::from_utf8_lossy(&self.0[..end]))
    }
}

/// A framed packet.
#[derive(Debug, Clone)]
pub struct Packet {
    pub tag: Tag,
    pub id: WorkerId,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn new(tag: Tag, id: WorkerId, payload: Vec<u8>) -> Self {
        Self { tag, id, payload }
    }
}

/// Write one packet.
pub fn send_packet(stream: &mut impl Write, packet: &Packet) -> Result<(), ProtocolError> {
    stream.write_all(&packet.tag.bytes())?;
    stream.write_all(packet.id.as_bytes())?;
    stream.write_u32::<LittleEndian>(packet.payload.len() as u32)?;
    stream.write_all(&packet.payload)?;
    stream.flush()?;
    Ok(())
}

/// Read one packet, enforcing the payload cap and the side's tag set.
pub fn recv_packet(stream: &mut impl Read, side: Side) -> Result<Packet, ProtocolError> {
    let mut tag_bytes = [0u8; 4];
    stream.read_exact(&mut tag_bytes)?;
    let mut id_bytes = [0u8; ID_LEN];
    stream.read_exact(&mut id_bytes)?;
    let length = stream.read_u32::<LittleEndian>()?;

    let tag = Tag::from_bytes(tag_bytes).ok_or(ProtocolError::UnknownTag(tag_bytes))?;
    if !tag.acceptable_for(side) {
        return Err(ProtocolError::WrongSide { tag, side });
    }
    if length as usize > MAX_PAYLOAD {
        return Err(ProtocolError::OversizedPayload(length));
    }

    let mut payload = vec![0u8; length as usize];
    stream.read_exact(&mut payload)?;

    Ok(Packet::new(tag, WorkerId::from(id_bytes), payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_packet_round_trip() {
        let packet = Packet::new(Tag::Pixels, WorkerId::new("worker1"), vec![1, 2, 3, 4, 5]);
        let mut wire = Vec::new();
        send_packet(&mut wire, &packet).unwrap();

        // 4 tag + 8 id + 4 length + payload.
        assert_eq!(wire.len(), 16 + 5);
        assert_eq!(&wire[..4], b"PXLS");
        assert_eq!(&wire[4..12], b"worker1\0");
        assert_eq!(&wire[12..16], &[5, 0, 0, 0]);

        let back = recv_packet(&mut Cursor::new(&wire), Side::Master).unwrap();
        assert_eq!(back.tag, Tag::Pixels);
        assert_eq!(back.id, packet.id);
        assert_eq!(back.payload, packet.payload);
    }

    #[test]
    fn test_empty_payload() {
        let packet = Packet::new(Tag::Ready, WorkerId::new("w"), Vec::new());
        let mut wire = Vec::new();
        send_packet(&mut wire, &packet).unwrap();
        assert_eq!(wire.len(), 16);

        let back = recv_packet(&mut Cursor::new(&wire), Side::Master).unwrap();
        assert_eq!(back.tag, Tag::Ready);
        assert!(back.payload.is_empty());
    }

    #[test]
    fn test_wrong_side_is_rejected() {
        let packet = Packet::new(Tag::Work, WorkerId::new("w"), vec![0; 24]);
        let mut wire = Vec::new();
        send_packet(&mut wire, &packet).unwrap();

        // WORK is master -> worker; the master must not accept it.
        let err = recv_packet(&mut Cursor::new(&wire), Side::Master).unwrap_err();
        assert!(matches!(err, ProtocolError::WrongSide { tag: Tag::Work, side: Side::Master }));

        assert!(recv_packet(&mut Cursor::new(&wire), Side::Worker).is_ok());
    }

    #[test]
    fn test_oversized_payload_is_rejected() {
        let mut wire = Vec::new();
        wire.extend_from_slice(b"PXLS");
        wire.extend_from_slice(&[0u8; ID_LEN]);
        wire.extend_from_slice(&(MAX_PAYLOAD as u32 + 1).to_le_bytes());

        let err = recv_packet(&mut Cursor::new(&wire), Side::Master).unwrap_err();
        assert!(matches!(err, ProtocolError::OversizedPayload(_)));
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let mut wire = Vec::new();
        wire.extend_from_slice(b"NOPE");
        wire.extend_from_slice(&[0u8; ID_LEN]);
        wire.extend_from_slice(&0u32.to_le_bytes());

        let err = recv_packet(&mut Cursor::new(&wire), Side::Master).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownTag(_)));
    }

    #[test]
    fn test_truncated_stream_is_an_io_error() {
        let packet = Packet::new(Tag::Ready, WorkerId::new("w"), vec![1, 2, 3]);
        let mut wire = Vec::new();
        send_packet(&mut wire, &packet).unwrap();
        wire.truncate(wire.len() - 2);

        let err = recv_packet(&mut Cursor::new(&wire), Side::Master).unwrap_err();
        assert!(matches!(err, ProtocolError::Io(_)));
    }

    #[test]
    fn test_worker_id_truncates_and_displays() {
        let id = WorkerId::new("averylongworkername");
        assert_eq!(id.as_bytes(), b"averylon");
        assert_eq!(id.to_string(), "averylon");

        let short = WorkerId::new("w1");
        assert_eq!(short.as_bytes(), b"w1\0\0\0\0\0\0");
        assert_eq!(short.to_string(), "w1");
    }
}
