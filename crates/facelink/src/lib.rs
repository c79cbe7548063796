//! Streaming protocol codec and tooling for networked LED face displays.
//!
//! # Crate Structure
//!
//! - [`proto`]: packet framing with a CRC-8 header checksum, RLE frame
//!   compression and blocking stream adapters
//!
//! The `facelink` binary (behind the `cli` feature) decodes captured packets and
//! encodes test packets from the command line.

/// Re-export codec types.
pub mod proto {
    pub use facelink_proto::*;
}
