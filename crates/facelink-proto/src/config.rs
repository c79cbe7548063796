/// Configuration for a [`PacketWriter`](crate::PacketWriter).
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// RLE-compress frame pixels when that makes them smaller. Default: true.
    pub compress_frames: bool,
    /// First sequence number handed out. Default: 0.
    pub initial_seq: u16,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            compress_frames: true,
            initial_seq: 0,
        }
    }
}
