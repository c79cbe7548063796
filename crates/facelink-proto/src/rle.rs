//! Run-length coding for RGB888 pixel buffers.
//!
//! Token stream format:
//! ```text
//! ┌─────────────┬──────────────────────────────────────────────┐
//! │ control (1B)│ body                                         │
//! ├─────────────┼──────────────────────────────────────────────┤
//! │ 1nnnnnnn    │ run: one RGB pixel, repeated n + 1 times (3B) │
//! │ 0nnnnnnn    │ literal: n + 1 raw RGB pixels ((n + 1) * 3B)  │
//! └─────────────┴──────────────────────────────────────────────┘
//! ```

use tracing::debug;

/// Bytes per RGB888 pixel.
pub const BYTES_PER_PIXEL: usize = 3;

/// Longest run or literal block a single token can describe.
pub const MAX_TOKEN_PIXELS: usize = 128;

/// Shortest run worth emitting as a run token.
pub const MIN_RUN: usize = 3;

const RUN_BIT: u8 = 0x80;
const COUNT_MASK: u8 = 0x7F;

/// Result of [`rle_decode_report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RleDecoded {
    /// Pixels decoded before the stream ended or the target size was reached.
    pub pixels: Vec<u8>,
    /// Set when a trailing token declared more bytes than the input held.
    pub truncated: bool,
}

/// Compress an RGB888 buffer.
///
/// Buffers that are empty or not a whole number of pixels are returned unchanged.
pub fn rle_encode(pixels: &[u8]) -> Vec<u8> {
    if pixels.is_empty() || pixels.len() % BYTES_PER_PIXEL != 0 {
        return pixels.to_vec();
    }

    let pixel_count = pixels.len() / BYTES_PER_PIXEL;
    let mut out = Vec::with_capacity(pixels.len() / 2);
    let mut i = 0usize;

    while i < pixel_count {
        let run = run_length(pixels, i, pixel_count);
        if run >= MIN_RUN {
            out.push(RUN_BIT | (run - 1) as u8);
            out.extend_from_slice(pixel_at(pixels, i));
            i += run;
            continue;
        }

        let literal_start = i;
        let mut literal_count = 0usize;
        while i < pixel_count && literal_count < MAX_TOKEN_PIXELS {
            if literal_count > 0 && run_length(pixels, i, pixel_count) >= MIN_RUN {
                break;
            }
            literal_count += 1;
            i += 1;
        }

        out.push((literal_count - 1) as u8);
        let start = literal_start * BYTES_PER_PIXEL;
        let end = (literal_start + literal_count) * BYTES_PER_PIXEL;
        out.extend_from_slice(&pixels[start..end]);
    }

    out
}

/// Expand a token stream into `expected_pixels` pixels, or fewer if the input runs out.
///
/// An incomplete trailing token is dropped silently; use [`rle_decode_report`] to
/// find out whether that happened.
pub fn rle_decode(data: &[u8], expected_pixels: usize) -> Vec<u8> {
    rle_decode_report(data, expected_pixels).pixels
}

/// Like [`rle_decode`], but reports whether the stream ended mid-token.
///
/// Decoding stops once the output holds `expected_pixels * 3` bytes; a final run
/// token may overshoot that target, exactly as it was encoded.
pub fn rle_decode_report(data: &[u8], expected_pixels: usize) -> RleDecoded {
    let expected_bytes = expected_pixels.saturating_mul(BYTES_PER_PIXEL);
    let mut pixels = Vec::with_capacity(expected_bytes);
    let mut offset = 0usize;
    let mut truncated = false;

    while offset < data.len() && pixels.len() < expected_bytes {
        let control = data[offset];
        offset += 1;
        let count = usize::from(control & COUNT_MASK) + 1;

        if control & RUN_BIT != 0 {
            let Some(pixel) = data.get(offset..offset + BYTES_PER_PIXEL) else {
                truncated = true;
                break;
            };
            for _ in 0..count {
                pixels.extend_from_slice(pixel);
            }
            offset += BYTES_PER_PIXEL;
        } else {
            let len = count * BYTES_PER_PIXEL;
            let Some(block) = data.get(offset..offset + len) else {
                truncated = true;
                break;
            };
            pixels.extend_from_slice(block);
            offset += len;
        }
    }

    if truncated {
        debug!(
            decoded = pixels.len() / BYTES_PER_PIXEL,
            expected = expected_pixels,
            "rle stream ended mid-token"
        );
    }

    RleDecoded { pixels, truncated }
}

fn pixel_at(pixels: &[u8], index: usize) -> &[u8] {
    &pixels[index * BYTES_PER_PIXEL..(index + 1) * BYTES_PER_PIXEL]
}

/// Number of identical pixels starting at `start`, capped at [`MAX_TOKEN_PIXELS`].
fn run_length(pixels: &[u8], start: usize, pixel_count: usize) -> usize {
    let first = pixel_at(pixels, start);
    let mut run = 1usize;
    while start + run < pixel_count
        && run < MAX_TOKEN_PIXELS
        && pixel_at(pixels, start + run) == first
    {
        run += 1;
    }
    run
}
