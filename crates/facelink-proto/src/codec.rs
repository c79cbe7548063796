//! `tokio_util` codec for packet streams (requires `async` feature).

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{ProtoError, Result};
use crate::parser::decode_packet;
use crate::types::Packet;

/// Decodes [`Packet`]s from, and encodes them to, a framed byte stream.
///
/// Each decoded item is a per-packet result. A rejected packet is yielded as
/// `Some(Err(..))` and the stream continues with the next packet; only I/O failures
/// end a `FramedRead`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketCodec;

impl PacketCodec {
    /// Create a new packet codec.
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for PacketCodec {
    type Item = Result<Packet>;
    type Error = ProtoError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Result<Packet>>> {
        match decode_packet(src) {
            Ok(packet) => Ok(packet.map(Ok)),
            Err(err @ ProtoError::Io(_)) => Err(err),
            Err(err) => Ok(Some(Err(err))),
        }
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = ProtoError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<()> {
        <Self as Encoder<&Packet>>::encode(self, &item, dst)
    }
}

impl Encoder<&Packet> for PacketCodec {
    type Error = ProtoError;

    fn encode(&mut self, item: &Packet, dst: &mut BytesMut) -> Result<()> {
        let wire = item.to_wire()?;
        dst.extend_from_slice(&wire);
        Ok(())
    }
}
