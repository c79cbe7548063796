use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::trace;

use crate::builder::{build_cmd, build_frame, build_info, build_led_strip_frame, encode_packet};
use crate::config::StreamConfig;
use crate::error::{ProtoError, Result};
use crate::types::{Packet, PacketType, CMD_BRIGHTNESS, PROTOCOL_VERSION};

const INITIAL_BUFFER_CAPACITY: usize = 16 * 1024;

/// Writes complete packets to any `Write` stream.
///
/// Keeps the advisory sequence counters a sender owns: one shared by display frames,
/// commands and info packets, and a separate one for LED strip frames. Both wrap at
/// 16 bits. Frame ids follow their counter.
pub struct PacketWriter<T> {
    inner: T,
    buf: BytesMut,
    config: StreamConfig,
    seq: u16,
    led_seq: u16,
}

impl<T: Write> PacketWriter<T> {
    /// Create a new packet writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, StreamConfig::default())
    }

    /// Create a new packet writer with explicit configuration.
    pub fn with_config(inner: T, config: StreamConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            seq: config.initial_seq,
            led_seq: config.initial_seq,
            config,
        }
    }

    /// Send a full display frame of RGB888 pixels.
    pub fn send_frame(&mut self, pixels: &[u8]) -> Result<u16> {
        let seq = self.next_seq();
        let wire = build_frame(seq, pixels, seq, self.config.compress_frames)?;
        self.write_all(&wire)?;
        Ok(seq)
    }

    /// Send an LED strip frame of RGB888 pixels.
    pub fn send_led_strip_frame(&mut self, pixels: &[u8]) -> Result<u16> {
        let seq = self.led_seq;
        self.led_seq = self.led_seq.wrapping_add(1);
        let wire = build_led_strip_frame(seq, pixels, seq, self.config.compress_frames)?;
        self.write_all(&wire)?;
        Ok(seq)
    }

    /// Send a command.
    pub fn send_cmd(&mut self, cmd_id: u8, cmd_data: &[u8]) -> Result<u16> {
        let seq = self.next_seq();
        let wire = build_cmd(cmd_id, cmd_data, seq)?;
        self.write_all(&wire)?;
        Ok(seq)
    }

    /// Ask the display to change brightness.
    pub fn set_brightness(&mut self, level: u8) -> Result<u16> {
        self.send_cmd(CMD_BRIGHTNESS, &[level])
    }

    /// Send device information.
    pub fn send_info(&mut self, fw_version: u16, brightness: u8) -> Result<u16> {
        let seq = self.next_seq();
        let wire = build_info(fw_version, brightness, seq)?;
        self.write_all(&wire)?;
        Ok(seq)
    }

    /// Send an already-typed payload with the next sequence number.
    pub fn send(&mut self, packet_type: PacketType, payload: &[u8]) -> Result<u16> {
        let seq = self.next_seq();
        self.buf.clear();
        encode_packet(packet_type, PROTOCOL_VERSION, seq, payload, &mut self.buf)?;
        let wire = self.buf.split().freeze();
        self.write_all(&wire)?;
        Ok(seq)
    }

    /// Forward a decoded packet unchanged, sequence number included.
    pub fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        let wire = packet.to_wire()?;
        self.write_all(&wire)
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(ProtoError::Io(err)),
            }
        }
    }

    /// Sequence number the next frame, command or info packet will carry.
    pub fn seq(&self) -> u16 {
        self.seq
    }

    /// Get the current configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the underlying stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn next_seq(&mut self) -> u16 {
        let seq = self.seq;
        self.seq = self.seq.wrapping_add(1);
        seq
    }

    fn write_all(&mut self, wire: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < wire.len() {
            match self.inner.write(&wire[offset..]) {
                Ok(0) => return Err(ProtoError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(ProtoError::Io(err)),
            }
        }
        trace!(bytes = wire.len(), "packet written");

        self.flush()
    }
}
