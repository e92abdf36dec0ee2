//! Payload compression.
//!
//! Payloads are gzip compressed at the best level, but the compressed form
//! is only kept when it is actually smaller than the original.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::trace;

use crate::error::{Result, WifiError};

/// Compresses `data`, returning `Some(compressed)` only when the result is
/// smaller than the input.
pub fn compress(data: &[u8]) -> Result<Option<Vec<u8>>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    let compressed = encoder.finish()?;

    trace!("gzip: {} > {}", data.len(), compressed.len());

    if compressed.len() < data.len() {
        Ok(Some(compressed))
    } else {
        Ok(None)
    }
}

/// Decompresses a gzip payload.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| WifiError::Decompression(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressible_payload_round_trip() {
        let data = vec![b'a'; 4096];
        let compressed = compress(&data).unwrap().expect("should shrink");
        assert!(compressed.len() < data.len());
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_incompressible_payload_is_kept_raw() {
        use rand::RngCore;
        let mut data = vec![0u8; 64];
        rand::thread_rng().fill_bytes(&mut data);
        // random bytes plus gzip framing never beat 64 raw bytes
        assert!(compress(&data).unwrap().is_none());
    }

    #[test]
    fn test_decompress_rejects_garbage() {
        assert!(matches!(
            decompress(b"definitely not gzip"),
            Err(WifiError::Decompression(_))
        ));
    }
}
