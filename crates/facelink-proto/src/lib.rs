//! Binary packet codec for networked LED face displays.
//!
//! Every packet carries a 9-byte header:
//! - A 2-byte sync marker (`0xAA55`, little-endian) for stream alignment
//! - A protocol version byte and a packet type tag
//! - A 2-byte little-endian payload length and advisory sequence number
//! - A CRC-8 over the preceding eight header bytes
//!
//! Display frames are 128x32 RGB888 and may be run-length encoded when that
//! makes them smaller. All encode and decode functions are pure; the stream
//! adapters only add buffering and sequence counters.

pub mod builder;
#[cfg(feature = "async")]
pub mod codec;
pub mod config;
pub mod crc;
pub mod error;
pub mod parser;
pub mod reader;
pub mod rle;
pub mod types;
pub mod writer;

pub use builder::{
    build_cmd, build_frame, build_info, build_led_strip_frame, build_packet,
    build_packet_with_version, encode_packet,
};
#[cfg(feature = "async")]
pub use codec::PacketCodec;
pub use config::StreamConfig;
pub use crc::crc8;
pub use error::{ProtoError, Result};
pub use parser::{
    decode_packet, parse_frame_payload, parse_header, parse_info_payload, parse_packet,
};
pub use reader::PacketReader;
pub use rle::{rle_decode, rle_decode_report, rle_encode, RleDecoded};
pub use types::{
    FrameFlags, FramePayload, Header, InfoPayload, Packet, PacketType, Payload, CANVAS_BYTES,
    CANVAS_HEIGHT, CANVAS_PIXELS, CANVAS_WIDTH, CMD_BRIGHTNESS, HEADER_SIZE, MAX_PAYLOAD,
    PROTOCOL_VERSION, SYNC_MARKER,
};
pub use writer::PacketWriter;
