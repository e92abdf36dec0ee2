//! Cryptographic identity for Beaconnet nodes.
//!
//! Every node owns an RSA keypair whose public PEM hashes to a stable hex
//! fingerprint, the node's identity on the mesh. The keypair signs
//! advertisements (RSA-PSS over SHA-256) and opens or seals end-to-end
//! encrypted messages with a hybrid RSA-OAEP + AES-256-GCM envelope.

pub mod encrypt;
pub mod error;
pub mod keypair;
pub mod sign;

pub use encrypt::{AES_KEY_LEN, NONCE_LEN};
pub use error::{CryptoError, Result};
pub use keypair::{fingerprint_of_pem, KeyPair, DEFAULT_KEY_BITS, PRIVATE_KEY_FILE, PUBLIC_KEY_FILE};
