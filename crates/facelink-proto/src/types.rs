use bytes::Bytes;

use crate::error::{ProtoError, Result};
use crate::rle::{rle_decode_report, BYTES_PER_PIXEL};

/// Header: sync (2) + version (1) + type (1) + length (2) + seq (2) + crc8 (1) = 9 bytes.
pub const HEADER_SIZE: usize = 9;

/// Number of header bytes covered by the checksum.
pub const CHECKSUM_SPAN: usize = HEADER_SIZE - 1;

/// Start-of-packet marker, sent little-endian as `0x55 0xAA`.
pub const SYNC_MARKER: u16 = 0xAA55;

/// The only protocol revision this codec speaks.
pub const PROTOCOL_VERSION: u8 = 0x04;

/// Largest payload the 16-bit length field can describe.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

pub const CANVAS_WIDTH: usize = 128;
pub const CANVAS_HEIGHT: usize = 32;

/// Pixels in one full display frame.
pub const CANVAS_PIXELS: usize = CANVAS_WIDTH * CANVAS_HEIGHT;

/// Bytes in one decoded RGB888 display frame.
pub const CANVAS_BYTES: usize = CANVAS_PIXELS * BYTES_PER_PIXEL;

/// Frame-style payload prefix: frame id (2) + flags (1).
pub const FRAME_PREFIX_SIZE: usize = 3;

/// Fixed INFO payload size: firmware version (2) + brightness (1).
pub const INFO_PAYLOAD_SIZE: usize = 3;

/// Command id that sets display brightness; its data is one brightness byte.
pub const CMD_BRIGHTNESS: u8 = 0x01;

/// Packet type tag carried in header byte 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    Cmd = 0x01,
    Frame = 0x02,
    Info = 0x03,
    Led = 0x05,
}

impl PacketType {
    /// Wire tag for this type.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            PacketType::Cmd => "CMD",
            PacketType::Frame => "FRAME",
            PacketType::Info => "INFO",
            PacketType::Led => "LED",
        }
    }
}

impl TryFrom<u8> for PacketType {
    type Error = ProtoError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0x01 => Ok(PacketType::Cmd),
            0x02 => Ok(PacketType::Frame),
            0x03 => Ok(PacketType::Info),
            0x05 => Ok(PacketType::Led),
            other => Err(ProtoError::UnknownPacketType(other)),
        }
    }
}

/// Bitmask carried in byte 2 of a frame-style payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameFlags(u8);

impl FrameFlags {
    /// Pixel data is an RLE token stream.
    pub const COMPRESSED: FrameFlags = FrameFlags(1 << 0);

    /// No flags set.
    pub const fn empty() -> Self {
        FrameFlags(0)
    }

    /// Wrap a raw flags byte; unknown bits are kept.
    pub const fn from_bits(bits: u8) -> Self {
        FrameFlags(bits)
    }

    /// Raw flags byte.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True if every bit of `other` is set.
    pub const fn contains(self, other: FrameFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set the bits of `other`.
    pub fn insert(&mut self, other: FrameFlags) {
        self.0 |= other.0;
    }

    /// Shorthand for `contains(FrameFlags::COMPRESSED)`.
    pub const fn is_compressed(self) -> bool {
        self.contains(FrameFlags::COMPRESSED)
    }
}

/// The 9-byte packet header, as read off the wire.
///
/// `packet_type` stays a raw tag here; it is validated when the payload is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub sync: u16,
    pub version: u8,
    pub packet_type: u8,
    pub length: u16,
    pub seq: u16,
    pub crc8: u8,
}

impl Header {
    /// Total wire size of the packet this header announces.
    pub fn packet_size(&self) -> usize {
        HEADER_SIZE + usize::from(self.length)
    }
}

/// Decoded FRAME payload (also the layout of LED strip payloads).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePayload {
    /// Frame identifier; wraps independently of the header sequence number.
    pub frame_id: u16,
    pub flags: FrameFlags,
    /// RGB888 pixels, already expanded if the frame was compressed.
    pub pixels: Bytes,
}

impl FramePayload {
    /// Parse `[frameId:u16][flags:u8][pixelData]`, expanding RLE data to `expected_pixels`.
    pub fn parse(payload: &[u8], expected_pixels: usize) -> Result<Self> {
        if payload.len() < FRAME_PREFIX_SIZE {
            return Err(ProtoError::TooSmallBuffer {
                needed: FRAME_PREFIX_SIZE,
                actual: payload.len(),
            });
        }

        let frame_id = u16::from_le_bytes([payload[0], payload[1]]);
        let flags = FrameFlags::from_bits(payload[2]);
        let data = &payload[FRAME_PREFIX_SIZE..];

        let pixels = if flags.is_compressed() {
            Bytes::from(rle_decode_report(data, expected_pixels).pixels)
        } else {
            Bytes::copy_from_slice(data)
        };

        Ok(Self {
            frame_id,
            flags,
            pixels,
        })
    }

    /// Number of whole pixels carried.
    pub fn pixel_count(&self) -> usize {
        self.pixels.len() / BYTES_PER_PIXEL
    }

    /// True when the frame fills the whole display canvas.
    pub fn is_complete(&self) -> bool {
        self.pixels.len() >= CANVAS_BYTES
    }
}

/// Decoded INFO payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfoPayload {
    pub fw_version: u16,
    pub brightness: u8,
}

impl InfoPayload {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < INFO_PAYLOAD_SIZE {
            return Err(ProtoError::TooSmallBuffer {
                needed: INFO_PAYLOAD_SIZE,
                actual: payload.len(),
            });
        }

        Ok(Self {
            fw_version: u16::from_le_bytes([payload[0], payload[1]]),
            brightness: payload[2],
        })
    }

    pub fn to_bytes(self) -> [u8; INFO_PAYLOAD_SIZE] {
        let [lo, hi] = self.fw_version.to_le_bytes();
        [lo, hi, self.brightness]
    }
}

/// Typed payload, one variant per packet type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Command bytes: `[cmdId:u8][cmdData]`, not interpreted by the codec.
    Cmd(Bytes),
    Frame(FramePayload),
    Info(InfoPayload),
    /// LED strip bytes, consumer-defined.
    Led(Bytes),
}

impl Payload {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Payload::Cmd(_) => PacketType::Cmd,
            Payload::Frame(_) => PacketType::Frame,
            Payload::Info(_) => PacketType::Info,
            Payload::Led(_) => PacketType::Led,
        }
    }

    /// Split a CMD payload into its command id and data.
    ///
    /// Returns `None` for other packet types and for an empty command.
    pub fn command(&self) -> Option<(u8, &[u8])> {
        match self {
            Payload::Cmd(bytes) => bytes.split_first().map(|(id, data)| (*id, data)),
            _ => None,
        }
    }

    /// Interpret an LED payload as a strip frame of `expected_pixels` pixels.
    ///
    /// Returns `None` for other packet types.
    pub fn led_strip_frame(&self, expected_pixels: usize) -> Option<Result<FramePayload>> {
        match self {
            Payload::Led(bytes) => Some(FramePayload::parse(bytes, expected_pixels)),
            _ => None,
        }
    }
}

/// One decoded packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: Header,
    pub payload: Payload,
}

impl Packet {
    pub fn packet_type(&self) -> PacketType {
        self.payload.packet_type()
    }

    pub fn seq(&self) -> u16 {
        self.header.seq
    }

    /// Wire size of the packet as received.
    pub fn wire_size(&self) -> usize {
        self.header.packet_size()
    }
}
