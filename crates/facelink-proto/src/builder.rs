//! Packet encoding.

use bytes::{BufMut, Bytes, BytesMut};

use crate::crc::crc8;
use crate::error::{ProtoError, Result};
use crate::rle::rle_encode;
use crate::types::{
    FrameFlags, InfoPayload, Packet, PacketType, Payload, CHECKSUM_SPAN, FRAME_PREFIX_SIZE,
    HEADER_SIZE, MAX_PAYLOAD, PROTOCOL_VERSION, SYNC_MARKER,
};

/// Encode a packet into `dst`.
///
/// Fails with [`ProtoError::PayloadTooLarge`] if `payload` exceeds the 16-bit length field.
pub fn encode_packet(
    packet_type: PacketType,
    version: u8,
    seq: u16,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    let length = u16::try_from(payload.len()).map_err(|_| ProtoError::PayloadTooLarge {
        size: payload.len(),
        max: MAX_PAYLOAD,
    })?;

    dst.reserve(HEADER_SIZE + payload.len());
    let start = dst.len();
    dst.put_u16_le(SYNC_MARKER);
    dst.put_u8(version);
    dst.put_u8(packet_type.as_u8());
    dst.put_u16_le(length);
    dst.put_u16_le(seq);
    let crc = crc8(&dst[start..start + CHECKSUM_SPAN]);
    dst.put_u8(crc);
    dst.put_slice(payload);
    Ok(())
}

/// Frame `payload` as a packet of the current protocol version.
pub fn build_packet(packet_type: PacketType, payload: &[u8], seq: u16) -> Result<Bytes> {
    build_packet_with_version(packet_type, payload, seq, PROTOCOL_VERSION)
}

/// Frame `payload` with an explicit version byte.
pub fn build_packet_with_version(
    packet_type: PacketType,
    payload: &[u8],
    seq: u16,
    version: u8,
) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    encode_packet(packet_type, version, seq, payload, &mut buf)?;
    Ok(buf.freeze())
}

/// Build a FRAME packet from RGB888 pixels.
///
/// With `compress` set, the RLE form is sent only when it is strictly smaller than the
/// raw pixels; otherwise the pixels go out verbatim without the compressed flag.
pub fn build_frame(frame_id: u16, pixels: &[u8], seq: u16, compress: bool) -> Result<Bytes> {
    let payload = frame_payload(frame_id, pixels, compress);
    build_packet(PacketType::Frame, &payload, seq)
}

/// Build an LED packet carrying strip pixels in the frame payload layout.
pub fn build_led_strip_frame(
    frame_id: u16,
    pixels: &[u8],
    seq: u16,
    compress: bool,
) -> Result<Bytes> {
    let payload = frame_payload(frame_id, pixels, compress);
    build_packet(PacketType::Led, &payload, seq)
}

/// Build an INFO packet.
pub fn build_info(fw_version: u16, brightness: u8, seq: u16) -> Result<Bytes> {
    let info = InfoPayload {
        fw_version,
        brightness,
    };
    build_packet(PacketType::Info, &info.to_bytes(), seq)
}

/// Build a CMD packet: command id followed by opaque command data.
pub fn build_cmd(cmd_id: u8, cmd_data: &[u8], seq: u16) -> Result<Bytes> {
    let mut payload = Vec::with_capacity(1 + cmd_data.len());
    payload.push(cmd_id);
    payload.extend_from_slice(cmd_data);
    build_packet(PacketType::Cmd, &payload, seq)
}

fn frame_payload(frame_id: u16, pixels: &[u8], compress: bool) -> Vec<u8> {
    let mut flags = FrameFlags::empty();
    let compressed = compress.then(|| rle_encode(pixels));
    let data = match &compressed {
        Some(encoded) if encoded.len() < pixels.len() => {
            flags.insert(FrameFlags::COMPRESSED);
            encoded.as_slice()
        }
        _ => pixels,
    };

    let mut payload = Vec::with_capacity(FRAME_PREFIX_SIZE + data.len());
    payload.extend_from_slice(&frame_id.to_le_bytes());
    payload.push(flags.bits());
    payload.extend_from_slice(data);
    payload
}

impl Packet {
    /// Re-encode this packet for transmission, keeping its sequence number and version.
    ///
    /// Frame pixels are recompressed only if the frame arrived compressed.
    pub fn to_wire(&self) -> Result<Bytes> {
        let seq = self.header.seq;
        let version = self.header.version;
        match &self.payload {
            Payload::Frame(frame) => {
                let payload =
                    frame_payload(frame.frame_id, &frame.pixels, frame.flags.is_compressed());
                build_packet_with_version(PacketType::Frame, &payload, seq, version)
            }
            Payload::Info(info) => {
                build_packet_with_version(PacketType::Info, &info.to_bytes(), seq, version)
            }
            Payload::Cmd(bytes) => build_packet_with_version(PacketType::Cmd, bytes, seq, version),
            Payload::Led(bytes) => build_packet_with_version(PacketType::Led, bytes, seq, version),
        }
    }
}
