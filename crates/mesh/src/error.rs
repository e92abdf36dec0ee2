//! Error types for Beaconnet mesh operations.
//!
//! Transport failures are fatal to starting a router; protocol violations
//! on individual frames are logged and dropped, never fatal.

use thiserror::Error;

/// Errors that can occur in mesh operations.
#[derive(Debug, Error)]
pub enum MeshError {
    /// Opening or activating the capture interface failed
    #[error("capture error on {iface}: {reason}")]
    Capture { iface: String, reason: String },

    /// Frame injection failed after the bounded retries
    #[error("frame injection failed: {0}")]
    Injection(String),

    /// A shelled-out interface control command failed
    #[error("command failed: {0}")]
    Command(String),

    /// An advertisement with no identity field
    #[error("peer {session} is not advertising any identity")]
    MissingIdentity { session: String },

    /// An advertisement with no public key field
    #[error("peer {fingerprint} is not advertising any public key")]
    MissingPublicKey { fingerprint: String },

    /// An advertisement with no signature field
    #[error("peer {fingerprint} is advertising unsigned data")]
    MissingSignature { fingerprint: String },

    /// The advertised public key does not hash to the claimed identity
    #[error("peer {session} is advertising fingerprint {claimed}, but it should be {actual}")]
    FingerprintMismatch {
        session: String,
        claimed: String,
        actual: String,
    },

    /// The advertisement signature does not verify
    #[error("peer {session} signature is invalid")]
    BadAdvertisementSignature { session: String },

    /// An advertisement field that is present but undecodable
    #[error("invalid advertisement field '{field}': {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    /// Cryptographic errors
    #[error("crypto error: {0}")]
    Crypto(#[from] beaconnet_crypto::CryptoError),

    /// Frame codec errors
    #[error("frame error: {0}")]
    Wifi(#[from] beaconnet_wifi::WifiError),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;
