//! Error types for frame encoding and decoding.

use thiserror::Error;

/// Errors that can occur while packing or unpacking beacon frames.
#[derive(Debug, Error)]
pub enum WifiError {
    /// The buffer is too short for the radio or management layer it claims
    #[error("truncated frame: {0}")]
    TruncatedFrame(&'static str),

    /// A header field holds a value the codec cannot interpret
    #[error("malformed frame: {0}")]
    Malformed(&'static str),

    /// The frame is not a management beacon
    #[error("not a management beacon frame")]
    NotABeacon,

    /// The trailing frame check sequence does not match the body
    #[error("frame check sequence mismatch")]
    BadFcs,

    /// Gzip decompression of the payload failed
    #[error("error decompressing payload: {0}")]
    Decompression(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, WifiError>;
