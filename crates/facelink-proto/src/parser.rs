//! Packet decoding.
//!
//! Wire format:
//! ```text
//! ┌────────────┬─────────┬──────┬──────────┬──────────┬────────┬──────────────────┐
//! │ Sync (2B)  │ Ver     │ Type │ Length   │ Seq      │ CRC-8  │ Payload          │
//! │ 0x55 0xAA  │ (1B)    │ (1B) │ (2B LE)  │ (2B LE)  │ (1B)   │ (Length bytes)   │
//! └────────────┴─────────┴──────┴──────────┴──────────┴────────┴──────────────────┘
//! ```
//! The CRC-8 covers the first eight header bytes.

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::crc::crc8;
use crate::error::{ProtoError, Result};
use crate::types::{
    FramePayload, Header, InfoPayload, Packet, PacketType, Payload, CANVAS_PIXELS, CHECKSUM_SPAN,
    HEADER_SIZE, PROTOCOL_VERSION, SYNC_MARKER,
};

/// Parse and checksum-verify the first [`HEADER_SIZE`] bytes of `buf`.
///
/// Only the checksum is validated here; sync and version are checked by [`parse_packet`].
pub fn parse_header(buf: &[u8]) -> Result<Header> {
    if buf.len() < HEADER_SIZE {
        return Err(ProtoError::TooSmallBuffer {
            needed: HEADER_SIZE,
            actual: buf.len(),
        });
    }

    let computed = crc8(&buf[..CHECKSUM_SPAN]);
    let stored = buf[CHECKSUM_SPAN];
    if computed != stored {
        return Err(ProtoError::ChecksumMismatch {
            expected: computed,
            actual: stored,
        });
    }

    Ok(Header {
        sync: u16::from_le_bytes([buf[0], buf[1]]),
        version: buf[2],
        packet_type: buf[3],
        length: u16::from_le_bytes([buf[4], buf[5]]),
        seq: u16::from_le_bytes([buf[6], buf[7]]),
        crc8: stored,
    })
}

/// Decode one complete packet from the start of `buf`.
///
/// Bytes past the announced payload length are ignored.
pub fn parse_packet(buf: &[u8]) -> Result<Packet> {
    let header = validated_header(buf)?;

    let total = header.packet_size();
    if buf.len() < total {
        return Err(ProtoError::TooSmallBuffer {
            needed: total,
            actual: buf.len(),
        });
    }

    let body = &buf[HEADER_SIZE..total];
    let payload = match PacketType::try_from(header.packet_type)? {
        PacketType::Frame => Payload::Frame(parse_frame_payload(body)?),
        PacketType::Info => Payload::Info(parse_info_payload(body)?),
        PacketType::Cmd => Payload::Cmd(Bytes::copy_from_slice(body)),
        PacketType::Led => Payload::Led(Bytes::copy_from_slice(body)),
    };

    Ok(Packet { header, payload })
}

/// Parse a FRAME payload, expanding compressed pixels to the full canvas.
pub fn parse_frame_payload(payload: &[u8]) -> Result<FramePayload> {
    FramePayload::parse(payload, CANVAS_PIXELS)
}

/// Parse an INFO payload.
pub fn parse_info_payload(payload: &[u8]) -> Result<InfoPayload> {
    InfoPayload::parse(payload)
}

/// Decode the next packet from a byte stream buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete packet yet.
/// On success, consumes the packet bytes from the buffer.
///
/// On a header failure (checksum, sync, version) the buffer is advanced to the next
/// sync candidate before the error is returned. On a payload failure the offending
/// packet is consumed. Either way the following call continues with the next packet.
pub fn decode_packet(src: &mut BytesMut) -> Result<Option<Packet>> {
    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    let header = match validated_header(&src[..]) {
        Ok(header) => header,
        Err(err) => {
            let skipped = resync(src);
            debug!(error = %err, skipped, "dropping bytes after bad header");
            return Err(err);
        }
    };

    let total = header.packet_size();
    if src.len() < total {
        return Ok(None); // Need more data
    }

    let raw = src.split_to(total);
    trace!(
        packet_type = header.packet_type,
        seq = header.seq,
        len = header.length,
        "decoding packet"
    );
    parse_packet(&raw)
        .inspect_err(|err| {
            debug!(error = %err, seq = header.seq, "dropping undecodable packet");
        })
        .map(Some)
}

fn validated_header(buf: &[u8]) -> Result<Header> {
    let header = parse_header(buf)?;
    if header.sync != SYNC_MARKER {
        return Err(ProtoError::InvalidSync(header.sync));
    }
    if header.version != PROTOCOL_VERSION {
        return Err(ProtoError::UnsupportedVersion(header.version));
    }
    Ok(header)
}

/// Drop at least one byte, then everything up to the next sync marker candidate.
fn resync(src: &mut BytesMut) -> usize {
    let sync = SYNC_MARKER.to_le_bytes();
    let skip = match src[1..].windows(2).position(|w| w == sync) {
        Some(pos) => pos + 1,
        // Keep a trailing first sync byte; its partner may still be in flight.
        None if src.last() == Some(&sync[0]) => src.len() - 1,
        None => src.len(),
    };
    src.advance(skip);
    skip
}

#[cfg(test)]
mod tests {
    use bytes::BufMut;

    use super::*;
    use crate::builder::{build_cmd, build_frame, build_info, build_packet};
    use crate::types::{CANVAS_BYTES, FrameFlags};

    /// Header bytes with a correct checksum.
    fn raw_header(sync: u16, version: u8, packet_type: u8, length: u16, seq: u16) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u16_le(sync);
        buf.put_u8(version);
        buf.put_u8(packet_type);
        buf.put_u16_le(length);
        buf.put_u16_le(seq);
        let crc = crc8(&buf);
        buf.put_u8(crc);
        buf.to_vec()
    }

    #[test]
    fn header_fields_are_little_endian() {
        let raw = raw_header(SYNC_MARKER, PROTOCOL_VERSION, 0x02, 0x0102, 0x0304);
        assert_eq!(&raw[..8], &[0x55, 0xAA, 0x04, 0x02, 0x02, 0x01, 0x04, 0x03]);

        let header = parse_header(&raw).unwrap();
        assert_eq!(header.sync, SYNC_MARKER);
        assert_eq!(header.version, PROTOCOL_VERSION);
        assert_eq!(header.packet_type, 0x02);
        assert_eq!(header.length, 0x0102);
        assert_eq!(header.seq, 0x0304);
        assert_eq!(header.crc8, raw[8]);
    }

    #[test]
    fn five_byte_buffer_is_too_small() {
        let err = parse_header(&[0x55, 0xAA, 0x04, 0x01, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            ProtoError::TooSmallBuffer {
                needed: 9,
                actual: 5
            }
        ));
        assert!(matches!(
            parse_packet(&[0x55; 5]),
            Err(ProtoError::TooSmallBuffer { .. })
        ));
    }

    #[test]
    fn corrupted_header_fails_checksum() {
        let mut raw = raw_header(SYNC_MARKER, PROTOCOL_VERSION, 0x01, 0, 0);
        raw[6] ^= 0x10;
        assert!(matches!(
            parse_header(&raw),
            Err(ProtoError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn any_single_bit_flip_is_rejected() {
        let good = build_info(0x0102, 200, 5).unwrap();
        for byte in 0..CHECKSUM_SPAN {
            for bit in 0..8 {
                let mut bad = good.to_vec();
                bad[byte] ^= 1 << bit;
                assert!(
                    matches!(parse_packet(&bad), Err(ProtoError::ChecksumMismatch { .. })),
                    "flip byte {byte} bit {bit}"
                );
            }
        }
    }

    #[test]
    fn wrong_sync_is_rejected() {
        let raw = raw_header(0x1234, PROTOCOL_VERSION, 0x01, 0, 0);
        assert_eq!(raw.len(), 9);
        assert!(matches!(
            parse_packet(&raw),
            Err(ProtoError::InvalidSync(0x1234))
        ));
    }

    #[test]
    fn other_versions_are_rejected() {
        let raw = raw_header(SYNC_MARKER, 0x05, 0x01, 0, 0);
        assert!(matches!(
            parse_packet(&raw),
            Err(ProtoError::UnsupportedVersion(0x05))
        ));
        let raw = raw_header(SYNC_MARKER, 0x03, 0x01, 0, 0);
        assert!(matches!(
            parse_packet(&raw),
            Err(ProtoError::UnsupportedVersion(0x03))
        ));
    }

    #[test]
    fn reserved_type_four_is_unknown() {
        let mut raw = raw_header(SYNC_MARKER, PROTOCOL_VERSION, 0x04, 2, 0);
        raw.extend_from_slice(&[0xDE, 0xAD]);
        assert!(matches!(
            parse_packet(&raw),
            Err(ProtoError::UnknownPacketType(0x04))
        ));
    }

    #[test]
    fn short_payload_is_too_small() {
        let mut raw = raw_header(SYNC_MARKER, PROTOCOL_VERSION, 0x01, 4, 0);
        raw.extend_from_slice(&[1, 2]);
        assert!(matches!(
            parse_packet(&raw),
            Err(ProtoError::TooSmallBuffer {
                needed: 13,
                actual: 11
            })
        ));
    }

    #[test]
    fn short_frame_and_info_payloads_are_too_small() {
        let mut raw = raw_header(SYNC_MARKER, PROTOCOL_VERSION, 0x02, 2, 0);
        raw.extend_from_slice(&[1, 0]);
        assert!(matches!(
            parse_packet(&raw),
            Err(ProtoError::TooSmallBuffer { needed: 3, .. })
        ));

        let mut raw = raw_header(SYNC_MARKER, PROTOCOL_VERSION, 0x03, 1, 0);
        raw.push(9);
        assert!(matches!(
            parse_packet(&raw),
            Err(ProtoError::TooSmallBuffer { needed: 3, .. })
        ));
    }

    #[test]
    fn info_scenario() {
        let wire = build_info(0x0102, 200, 5).unwrap();
        let packet = parse_packet(&wire).unwrap();

        assert_eq!(packet.header.packet_type, PacketType::Info.as_u8());
        assert_eq!(packet.header.seq, 5);
        assert_eq!(
            packet.payload,
            Payload::Info(InfoPayload {
                fw_version: 0x0102,
                brightness: 200
            })
        );
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut wire = build_cmd(0x01, &[42], 1).unwrap().to_vec();
        wire.extend_from_slice(&[0xFF, 0xFF, 0xFF]);
        let packet = parse_packet(&wire).unwrap();
        assert_eq!(packet.payload, Payload::Cmd(Bytes::from_static(&[0x01, 42])));
    }

    #[test]
    fn opaque_led_payload_is_returned_verbatim() {
        let wire = build_packet(PacketType::Led, &[9, 8, 7, 6], 3).unwrap();
        let packet = parse_packet(&wire).unwrap();
        assert_eq!(packet.payload, Payload::Led(Bytes::from_static(&[9, 8, 7, 6])));
    }

    #[test]
    fn compressed_frame_expands_to_canvas() {
        let pixels = vec![0x11; CANVAS_BYTES];
        let wire = build_frame(7, &pixels, 2, true).unwrap();
        assert!(wire.len() < CANVAS_BYTES);

        let packet = parse_packet(&wire).unwrap();
        let Payload::Frame(frame) = packet.payload else {
            panic!("expected frame payload");
        };
        assert_eq!(frame.frame_id, 7);
        assert_eq!(frame.flags, FrameFlags::COMPRESSED);
        assert!(frame.is_complete());
        assert_eq!(frame.pixels.as_ref(), pixels.as_slice());
    }

    #[test]
    fn truncated_compressed_frame_keeps_decoded_prefix() {
        let payload = [0x05, 0x00, 0x01, 0x89, 10, 20, 30, 0x85, 1, 2];
        let mut raw = raw_header(SYNC_MARKER, PROTOCOL_VERSION, 0x02, payload.len() as u16, 4);
        raw.extend_from_slice(&payload);

        let packet = parse_packet(&raw).unwrap();
        let Payload::Frame(frame) = packet.payload else {
            panic!("expected frame payload");
        };
        assert_eq!(frame.frame_id, 5);
        assert!(frame.flags.is_compressed());
        assert_eq!(frame.pixel_count(), 10);
        assert_eq!(frame.pixels.as_ref(), &[10u8, 20, 30].repeat(10)[..]);
        assert!(!frame.is_complete());
    }

    #[test]
    fn stream_decode_waits_for_complete_packet() {
        let wire = build_cmd(0x02, &[1, 2, 3], 9).unwrap();
        let mut buf = BytesMut::from(&wire[..5]);
        assert!(decode_packet(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&wire[5..11]);
        assert!(decode_packet(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&wire[11..]);

        let packet = decode_packet(&mut buf).unwrap().unwrap();
        assert_eq!(packet.seq(), 9);
        assert!(buf.is_empty());
    }

    #[test]
    fn stream_decode_resyncs_after_garbage() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0x00, 0x13, 0x55, 0x37, 0x99, 0x01, 0x02, 0x03, 0x04, 0x05]);
        buf.extend_from_slice(&build_info(1, 2, 3).unwrap());

        let err = decode_packet(&mut buf).unwrap_err();
        assert!(err.is_header_error());

        let packet = decode_packet(&mut buf).unwrap().unwrap();
        assert_eq!(packet.packet_type(), PacketType::Info);
        assert!(buf.is_empty());
    }

    #[test]
    fn stream_decode_skips_unknown_type_and_continues() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&raw_header(SYNC_MARKER, PROTOCOL_VERSION, 0x04, 1, 0));
        buf.put_u8(0xAB);
        buf.extend_from_slice(&build_cmd(0x01, &[], 1).unwrap());

        assert!(matches!(
            decode_packet(&mut buf),
            Err(ProtoError::UnknownPacketType(0x04))
        ));
        let packet = decode_packet(&mut buf).unwrap().unwrap();
        assert_eq!(packet.payload.command(), Some((0x01, &[0u8; 0][..])));
    }

    #[test]
    fn resync_keeps_trailing_sync_byte() {
        let mut buf = BytesMut::from(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x55][..]);
        let skipped = resync(&mut buf);
        assert_eq!(skipped, 8);
        assert_eq!(buf.as_ref(), &[0x55]);
    }
}
