//! Compression port applied to binary payloads.
//!
//! The connector compresses every outbound binary frame and the default
//! receive pipeline decompresses every inbound one. Implementations are
//! pure: they hold no per-message state and may be shared across tasks.

use std::io::{Read, Write};

use flate2::{Compression, read::GzDecoder, write::GzEncoder};

use crate::error::CompressionError;

/// Transform applied to binary payloads before send and after receive.
pub trait Compressor: Send + Sync {
    /// Compress an outbound payload.
    ///
    /// # Errors
    ///
    /// Returns [`CompressionError::Compress`] if the payload cannot be
    /// encoded.
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>, CompressionError>;

    /// Decompress an inbound payload.
    ///
    /// # Errors
    ///
    /// Returns [`CompressionError::Decompress`] if `bytes` is not valid
    /// compressed input.
    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>, CompressionError>;
}

/// Gzip compressor backed by `flate2`.
///
/// # Examples
///
/// ```
/// use socketlink::compression::{Compressor, GzipCompressor};
///
/// let gzip = GzipCompressor::default();
/// let packed = gzip.compress(b"hello hub").expect("compress");
/// assert_eq!(gzip.decompress(&packed).expect("decompress"), b"hello hub");
/// ```
#[derive(Clone, Copy, Debug)]
pub struct GzipCompressor {
    level: Compression,
}

impl GzipCompressor {
    /// Create a compressor using the given `flate2` level (0-9).
    #[must_use]
    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl Default for GzipCompressor {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl Compressor for GzipCompressor {
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let mut encoder = GzEncoder::new(Vec::with_capacity(bytes.len() / 2), self.level);
        encoder.write_all(bytes).map_err(CompressionError::Compress)?;
        encoder.finish().map_err(CompressionError::Compress)
    }

    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let mut decoder = GzDecoder::new(bytes);
        let mut out = Vec::with_capacity(bytes.len().saturating_mul(2));
        decoder
            .read_to_end(&mut out)
            .map_err(CompressionError::Decompress)?;
        Ok(out)
    }
}

/// Pass-through compressor for hubs that exchange raw payloads.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityCompressor;

impl Compressor for IdentityCompressor {
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>, CompressionError> { Ok(bytes.to_vec()) }

    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>, CompressionError> { Ok(bytes.to_vec()) }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::empty(Vec::new())]
    #[case::text(b"ConnectionId=abc".to_vec())]
    #[case::binary((0..=255).collect::<Vec<u8>>())]
    #[case::large(vec![0x5a; 256 * 1024])]
    fn gzip_restores_payload(#[case] payload: Vec<u8>) {
        let gzip = GzipCompressor::default();
        let packed = gzip.compress(&payload).expect("compress");
        let unpacked = gzip.decompress(&packed).expect("decompress");
        assert_eq!(unpacked, payload);
    }

    #[test]
    fn gzip_rejects_malformed_input() {
        let err = GzipCompressor::default()
            .decompress(b"definitely not gzip")
            .expect_err("malformed input must fail");
        assert!(matches!(err, CompressionError::Decompress(_)));
    }

    #[test]
    fn level_is_clamped() {
        let gzip = GzipCompressor::with_level(42);
        assert_eq!(gzip.level.level(), 9);
    }

    #[test]
    fn identity_is_pass_through() {
        let payload = [1_u8, 2, 3];
        assert_eq!(IdentityCompressor.compress(&payload).expect("compress"), payload);
        assert_eq!(IdentityCompressor.decompress(&payload).expect("decompress"), payload);
    }
}
