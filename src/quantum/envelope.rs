//! On-disk envelope framing.
//!
//! Each logged message is one envelope: a fixed 8-byte little-endian header
//! followed by the message's own wire encoding.
//!
//! ```text
//! offset 0: destination_id   (u32 LE)
//! offset 4: payload_len      (u32 LE)
//! offset 8: payload          (payload_len bytes)
//! ```
//!
//! The file is a raw concatenation of envelopes. Window rotation on the
//! writer side leaves no boundary marker in the byte stream.

use std::io;

/// Size of the fixed envelope header in bytes.
pub const ENVELOPE_HEADER_BYTES: usize = 8;

/// One framed message as it appears in the quantum file.
///
/// Invariant: the encoded `payload_len` field always equals
/// `payload.len()`; construction rejects payloads that cannot be
/// represented in a `u32`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Identifier of the destination mailbox
    pub destination_id: u32,
    /// The message's wire encoding, without transport framing
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Frames a payload for the given destination.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the payload length does not fit in the
    /// header's `u32` length field.
    pub fn new(destination_id: u32, payload: Vec<u8>) -> io::Result<Self> {
        if payload.len() > u32::MAX as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("payload of {} bytes exceeds u32 length field", payload.len()),
            ));
        }
        Ok(Self {
            destination_id,
            payload,
        })
    }

    /// Total framed size: header plus payload.
    pub fn frame_len(&self) -> usize {
        ENVELOPE_HEADER_BYTES + self.payload.len()
    }

    /// Serializes the complete envelope (header followed by payload).
    pub fn encode(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(self.frame_len());
        frame.extend_from_slice(&self.destination_id.to_le_bytes());
        frame.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&self.payload);
        frame
    }

    /// Deserializes one envelope from the front of `data`.
    ///
    /// Returns the envelope and the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// - `UnexpectedEof` if `data` is shorter than the header or the header's
    ///   declared payload length
    pub fn decode(data: &[u8]) -> io::Result<(Self, usize)> {
        if data.len() < ENVELOPE_HEADER_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "envelope header truncated",
            ));
        }

        let destination_id = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let payload_len = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;

        let frame_len = ENVELOPE_HEADER_BYTES + payload_len;
        if data.len() < frame_len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "envelope truncated: header declares {} payload bytes, {} available",
                    payload_len,
                    data.len() - ENVELOPE_HEADER_BYTES
                ),
            ));
        }

        let payload = data[ENVELOPE_HEADER_BYTES..frame_len].to_vec();
        Ok((
            Self {
                destination_id,
                payload,
            },
            frame_len,
        ))
    }
}
