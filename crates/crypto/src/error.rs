//! Error types for cryptographic operations.

use thiserror::Error;

/// Errors that can occur in key management, signing and encryption.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key generation failed
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// A PEM file or string could not be decoded or parsed
    #[error("key parse error: {0}")]
    KeyParse(String),

    /// A private-key operation was requested on a public-only identity
    #[error("no private key available for this identity")]
    NoPrivateKey,

    /// Signing failed
    #[error("signing failed: {0}")]
    Signing(String),

    /// Signature verification failed
    #[error("signature verification failed")]
    BadSignature,

    /// Encryption failed
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// A ciphertext declared more bytes than it carries
    #[error("ciphertext buffer too short")]
    Truncated,

    /// RSA-OAEP unwrap of the symmetric key failed
    #[error("failed to unwrap symmetric key: {0}")]
    KeyUnwrap(String),

    /// AES-GCM tag verification failed
    #[error("payload authentication failed")]
    Authentication,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cryptographic operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
