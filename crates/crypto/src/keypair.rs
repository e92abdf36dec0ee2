//! RSA identity lifecycle: generation, persistence and fingerprinting.
//!
//! The private key lives at `<dir>/id_rsa` as PKCS#1 PEM, the public key at
//! `<dir>/id_rsa.pub` as PKIX PEM. The identity fingerprint is the hex
//! SHA-256 of the canonical public PEM text with trailing newlines removed,
//! so two independent encodings of the same key always agree.

use std::fs;
use std::path::{Path, PathBuf};

use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{CryptoError, Result};

/// Default RSA modulus size in bits.
pub const DEFAULT_KEY_BITS: usize = 4096;

/// File name of the private key inside the keys directory.
pub const PRIVATE_KEY_FILE: &str = "id_rsa";

/// File name of the public key inside the keys directory.
pub const PUBLIC_KEY_FILE: &str = "id_rsa.pub";

/// An RSA identity: the key material, its PEM encodings and the fingerprint.
///
/// Remote peers are represented by public-only keypairs; private operations
/// on them fail with [`CryptoError::NoPrivateKey`].
#[derive(Debug, Clone)]
pub struct KeyPair {
    private: Option<RsaPrivateKey>,
    public: RsaPublicKey,
    public_pem: String,
    fingerprint: String,
}

/// Hex SHA-256 fingerprint of a canonical public key PEM.
///
/// Trailing newlines are stripped before hashing. Callers must pass a PEM
/// produced by this crate's own encoder; [`KeyPair::from_public_pem`]
/// re-encodes foreign PEM text before fingerprinting for this reason.
pub fn fingerprint_of_pem(public_pem: &str) -> String {
    let canonical = public_pem.trim_end_matches('\n');
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

fn encode_public(public: &RsaPublicKey) -> Result<(String, String)> {
    let pem = public
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::KeyParse(format!("failed encoding public key: {}", e)))?;
    let fingerprint = fingerprint_of_pem(&pem);
    Ok((pem, fingerprint))
}

impl KeyPair {
    fn from_private(private: RsaPrivateKey) -> Result<Self> {
        let public = private.to_public_key();
        let (public_pem, fingerprint) = encode_public(&public)?;
        Ok(Self {
            private: Some(private),
            public,
            public_pem,
            fingerprint,
        })
    }

    /// Generates a fresh in-memory identity without persisting it.
    pub fn generate(bits: usize) -> Result<Self> {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        Self::from_private(private)
    }

    /// Loads the identity at `dir`, generating and persisting a fresh
    /// `bits`-sized one when no private key exists yet.
    pub fn load_or_create(dir: &Path, bits: usize) -> Result<Self> {
        let private_path = private_path(dir);
        if private_path.exists() {
            return Self::load(dir);
        }

        if !dir.exists() {
            debug!("creating {}", dir.display());
            fs::create_dir_all(dir)?;
        }

        info!("{} not found, generating keypair ...", private_path.display());
        let pair = Self::generate(bits)?;
        pair.save(dir)?;
        Ok(pair)
    }

    /// Loads an existing identity from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let private_path = private_path(dir);
        debug!("reading {} ...", private_path.display());

        let pem = fs::read_to_string(&private_path)?;
        let private = RsaPrivateKey::from_pkcs1_pem(&pem).map_err(|e| {
            CryptoError::KeyParse(format!("failed parsing {}: {}", private_path.display(), e))
        })?;

        Self::from_private(private)
    }

    /// Builds a public-only identity from PEM text, re-encoding it so the
    /// fingerprint is stable regardless of the sender's formatting.
    pub fn from_public_pem(pem: &str) -> Result<Self> {
        // The decoder is strict about the encapsulation boundaries, so shed
        // any whitespace a sender wrapped around them first.
        let public = RsaPublicKey::from_public_key_pem(pem.trim())
            .map_err(|e| CryptoError::KeyParse(e.to_string()))?;
        let (public_pem, fingerprint) = encode_public(&public)?;
        Ok(Self {
            private: None,
            public,
            public_pem,
            fingerprint,
        })
    }

    /// Persists both PEM files under `dir`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let private = self.private.as_ref().ok_or(CryptoError::NoPrivateKey)?;

        let private_pem = private
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyGeneration(format!("failed encoding private key: {}", e)))?;

        let private_path = private_path(dir);
        fs::write(&private_path, private_pem.as_bytes())?;
        debug!("{} created", private_path.display());

        let public_path = public_path(dir);
        fs::write(&public_path, self.public_pem.as_bytes())?;
        debug!("{} created", public_path.display());

        Ok(())
    }

    /// The identity fingerprint, hex SHA-256 of the public PEM.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// The canonical public key PEM.
    pub fn public_pem(&self) -> &str {
        &self.public_pem
    }

    /// The parsed public key.
    pub fn public(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Whether this identity can sign and decrypt.
    pub fn has_private(&self) -> bool {
        self.private.is_some()
    }

    pub(crate) fn private(&self) -> Option<&RsaPrivateKey> {
        self.private.as_ref()
    }
}

/// Path of the private key file inside a keys directory.
pub fn private_path(dir: &Path) -> PathBuf {
    dir.join(PRIVATE_KEY_FILE)
}

/// Path of the public key file inside a keys directory.
pub fn public_path(dir: &Path) -> PathBuf {
    dir.join(PUBLIC_KEY_FILE)
}
