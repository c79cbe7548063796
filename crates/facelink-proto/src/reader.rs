use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::warn;

use crate::error::{ProtoError, Result};
use crate::parser::decode_packet;
use crate::types::Packet;

const INITIAL_BUFFER_CAPACITY: usize = 16 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete packets from any `Read` stream.
///
/// Handles partial reads internally. A rejected packet is reported once and skipped,
/// so the next call picks up with the packet after it.
pub struct PacketReader<T> {
    inner: T,
    buf: BytesMut,
    finished: bool,
}

impl<T: Read> PacketReader<T> {
    /// Create a new packet reader.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            finished: false,
        }
    }

    /// Read the next complete packet (blocking).
    ///
    /// Returns `Err(ProtoError::ConnectionClosed)` when EOF is reached.
    pub fn read_packet(&mut self) -> Result<Packet> {
        loop {
            if let Some(packet) = decode_packet(&mut self.buf)? {
                return Ok(packet);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ProtoError::Io(err)),
            };

            if read == 0 {
                if !self.buf.is_empty() {
                    warn!(leftover = self.buf.len(), "stream ended mid-packet");
                }
                return Err(ProtoError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Bytes received but not yet consumed as a packet.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the underlying stream.
    ///
    /// Buffered bytes not yet decoded are discarded.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read> Iterator for PacketReader<T> {
    type Item = Result<Packet>;

    /// Yields packets and per-packet errors until the stream closes.
    ///
    /// An I/O error is yielded once and ends the iteration.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_packet() {
            Err(ProtoError::ConnectionClosed) => {
                self.finished = true;
                None
            }
            Err(err @ ProtoError::Io(_)) => {
                self.finished = true;
                Some(Err(err))
            }
            other => Some(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::builder::{build_cmd, build_frame, build_info};
    use crate::types::{Payload, CANVAS_BYTES};

    fn wire(parts: &[bytes::Bytes]) -> Vec<u8> {
        parts.iter().flat_map(|p| p.iter().copied()).collect()
    }

    #[test]
    fn read_multiple_packets() {
        let bytes = wire(&[
            build_cmd(1, &[2], 0).unwrap(),
            build_info(3, 4, 1).unwrap(),
            build_frame(5, &vec![0x20; CANVAS_BYTES], 2, true).unwrap(),
        ]);
        let mut reader = PacketReader::new(Cursor::new(bytes));

        assert_eq!(reader.read_packet().unwrap().seq(), 0);
        assert_eq!(reader.read_packet().unwrap().seq(), 1);
        let frame = reader.read_packet().unwrap();
        assert!(matches!(frame.payload, Payload::Frame(ref f) if f.frame_id == 5));
        assert!(matches!(
            reader.read_packet(),
            Err(ProtoError::ConnectionClosed)
        ));
    }

    #[test]
    fn partial_read_handling() {
        let bytes = build_info(0x0102, 200, 5).unwrap().to_vec();
        let mut reader = PacketReader::new(ByteByByteReader { bytes, pos: 0 });

        let packet = reader.read_packet().unwrap();
        assert_eq!(packet.seq(), 5);
    }

    #[test]
    fn connection_closed_mid_packet() {
        let bytes = build_cmd(1, &[1, 2, 3, 4], 0).unwrap();
        let mut reader = PacketReader::new(Cursor::new(bytes[..11].to_vec()));
        assert!(matches!(
            reader.read_packet(),
            Err(ProtoError::ConnectionClosed)
        ));
        assert_eq!(reader.buffered(), 11);
    }

    #[test]
    fn corrupted_packet_is_skipped() {
        let mut bad = build_cmd(9, &[9], 7).unwrap().to_vec();
        bad[4] ^= 0xFF;
        let mut bytes = bad;
        bytes.extend_from_slice(&build_info(1, 1, 8).unwrap());

        let results: Vec<_> = PacketReader::new(Cursor::new(bytes)).collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(
            results[0],
            Err(ProtoError::ChecksumMismatch { .. })
        ));
        assert_eq!(results[1].as_ref().unwrap().seq(), 8);
    }

    #[test]
    fn interrupted_read_retries() {
        let bytes = build_cmd(4, &[], 3).unwrap().to_vec();
        let mut reader = PacketReader::new(InterruptedThenData {
            interrupted: false,
            inner: Cursor::new(bytes),
        });
        assert_eq!(reader.read_packet().unwrap().seq(), 3);
    }

    #[test]
    fn iteration_stops_after_io_error() {
        let mut reader = PacketReader::new(AlwaysFails);
        assert!(matches!(reader.next(), Some(Err(ProtoError::Io(_)))));
        assert!(reader.next().is_none());
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut reader = PacketReader::new(Cursor::new(Vec::<u8>::new()));
        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _inner = reader.into_inner();
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct AlwaysFails;

    impl Read for AlwaysFails {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }
}
