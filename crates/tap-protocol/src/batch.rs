//! Session-level batch codec.
//!
//! A wire frame (live or replayed) carries a batch: one header byte
//! followed by a deflate stream of varuint-length-prefixed packet
//! records. One [`BatchCodec`] is shared across every frame of a session
//! so both directions decode with the same state.

use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::io_ext::{read_varu32, write_varu32};
use crate::packets::Packet;
use crate::{ProtocolError, Result};

/// First byte of every batch payload.
pub const BATCH_HEADER: u8 = 0xFE;

/// Stateful batch encoder/decoder shared across a session's frames.
#[derive(Debug, Default)]
pub struct BatchCodec {
    frames_decoded: u64,
}

impl BatchCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of batch payloads decoded so far.
    #[must_use]
    pub const fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    /// Decode one batch payload into its packets.
    ///
    /// Any malformed record is a hard error; a batch is all-or-nothing
    /// since a bad record means the stream is desynchronized.
    pub fn decode(&mut self, payload: &[u8]) -> Result<Vec<Packet>> {
        let (&header, compressed) = payload
            .split_first()
            .ok_or(ProtocolError::BadBatchHeader(0))?;
        if header != BATCH_HEADER {
            return Err(ProtocolError::BadBatchHeader(header));
        }

        let mut decompressed = Vec::new();
        DeflateDecoder::new(compressed).read_to_end(&mut decompressed)?;

        let mut packets = Vec::new();
        let mut cursor = decompressed.as_slice();
        while !cursor.is_empty() {
            let len = read_varu32(&mut cursor)? as usize;
            if len > cursor.len() {
                return Err(ProtocolError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "packet record longer than batch",
                )));
            }
            let (record, rest) = cursor.split_at(len);
            cursor = rest;

            let mut record = record;
            let id = read_varu32(&mut record)? & 0x3FF;
            packets.push(Packet::decode_body(id, &mut record)?);
        }

        self.frames_decoded += 1;
        Ok(packets)
    }

    /// Encode packets into one batch payload.
    pub fn encode(&mut self, packets: &[Packet]) -> Result<Vec<u8>> {
        let mut records = Vec::new();
        for packet in packets {
            let mut body = Vec::new();
            packet.encode(&mut body)?;
            write_varu32(&mut records, body.len() as u32)?;
            records.extend_from_slice(&body);
        }

        let mut payload = vec![BATCH_HEADER];
        let mut encoder = DeflateEncoder::new(&mut payload, Compression::default());
        encoder.write_all(&records)?;
        encoder.finish()?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::{Animate, MovePlayer};

    #[test]
    fn batch_roundtrip_preserves_order() {
        let mut codec = BatchCodec::new();
        let packets = vec![
            Packet::Animate(Animate {
                action_type: 1,
                entity_runtime_id: 7,
            }),
            Packet::MovePlayer(MovePlayer {
                entity_runtime_id: 7,
                position: [1.0, 64.0, -3.0],
                ..MovePlayer::default()
            }),
            Packet::Unknown {
                id: 0x50,
                payload: vec![1, 2, 3, 4],
            },
        ];
        let payload = codec.encode(&packets).unwrap();
        assert_eq!(payload[0], BATCH_HEADER);

        let out = codec.decode(&payload).unwrap();
        assert_eq!(out.len(), 3);
        assert!(matches!(out[0], Packet::Animate(_)));
        assert!(matches!(out[1], Packet::MovePlayer(_)));
        assert!(matches!(out[2], Packet::Unknown { id: 0x50, .. }));
        assert_eq!(codec.frames_decoded(), 1);
    }

    #[test]
    fn missing_header_byte_is_rejected() {
        let mut codec = BatchCodec::new();
        assert!(matches!(
            codec.decode(&[0x00, 1, 2, 3]),
            Err(ProtocolError::BadBatchHeader(0x00))
        ));
        assert!(matches!(
            codec.decode(&[]),
            Err(ProtocolError::BadBatchHeader(0))
        ));
    }
}
