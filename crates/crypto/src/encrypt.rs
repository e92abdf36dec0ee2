//! Hybrid encryption for arbitrary-length payloads.
//!
//! RSA alone cannot encrypt more than its modulus, so messages are sealed
//! with a random AES-256-GCM key that is itself wrapped with
//! RSA-OAEP(SHA-256) under the recipient's public key. Wire framing:
//!
//! `nonce(12) || keysize(4, LE) || RSA-OAEP(sym key) || AES-GCM(cleartext)`

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use rand::RngCore;
use rsa::{Oaep, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::{CryptoError, Result};
use crate::keypair::KeyPair;

/// Symmetric key length in bytes.
pub const AES_KEY_LEN: usize = 32;

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

impl KeyPair {
    /// Encrypts a single block with RSA-OAEP(SHA-256) under `public`.
    ///
    /// The block must fit the recipient's modulus; [`KeyPair::encrypt_for`]
    /// is the size-unbounded envelope built on top of this.
    pub fn encrypt_block_for(&self, block: &[u8], public: &RsaPublicKey) -> Result<Vec<u8>> {
        let mut rng = rand::thread_rng();
        public
            .encrypt(&mut rng, Oaep::new::<Sha256>(), block)
            .map_err(|e| CryptoError::Encryption(e.to_string()))
    }

    /// Decrypts a single RSA-OAEP(SHA-256) block with the private key.
    pub fn decrypt_block(&self, block: &[u8]) -> Result<Vec<u8>> {
        let private = self.private().ok_or(CryptoError::NoPrivateKey)?;
        private
            .decrypt(Oaep::new::<Sha256>(), block)
            .map_err(|e| CryptoError::KeyUnwrap(e.to_string()))
    }

    /// Seals `cleartext` for the holder of `public`.
    pub fn encrypt_for(&self, cleartext: &[u8], public: &RsaPublicKey) -> Result<Vec<u8>> {
        let mut rng = rand::thread_rng();

        let mut key = [0u8; AES_KEY_LEN];
        rng.fill_bytes(&mut key);

        let wrapped_key = self.encrypt_block_for(&key, public)?;

        let mut nonce = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut nonce);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce), cleartext)
            .map_err(|_| CryptoError::Encryption("AES-GCM seal failed".to_string()))?;
        key.zeroize();

        let mut out = Vec::with_capacity(NONCE_LEN + 4 + wrapped_key.len() + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&(wrapped_key.len() as u32).to_le_bytes());
        out.extend_from_slice(&wrapped_key);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Opens a [`KeyPair::encrypt_for`] envelope addressed to this identity.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < NONCE_LEN + 4 {
            return Err(CryptoError::Truncated);
        }

        let (nonce, rest) = ciphertext.split_at(NONCE_LEN);
        let (key_size_bytes, rest) = rest.split_at(4);
        let key_size = u32::from_le_bytes([
            key_size_bytes[0],
            key_size_bytes[1],
            key_size_bytes[2],
            key_size_bytes[3],
        ]) as usize;

        if rest.len() < key_size {
            return Err(CryptoError::Truncated);
        }
        let (wrapped_key, sealed) = rest.split_at(key_size);

        let mut key = self.decrypt_block(wrapped_key)?;
        if key.len() != AES_KEY_LEN {
            let len = key.len();
            key.zeroize();
            return Err(CryptoError::KeyUnwrap(format!(
                "unwrapped key is {} bytes",
                len
            )));
        }

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        let cleartext = cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::Authentication);
        key.zeroize();

        cleartext
    }
}

#[cfg(test)]
mod tests {
    use super::{AES_KEY_LEN, NONCE_LEN};
    use crate::error::CryptoError;
    use crate::keypair::testutil::{other_keys, test_keys};
    use crate::keypair::KeyPair;

    #[test]
    fn test_round_trip_various_sizes() {
        let keys = test_keys();
        for size in [0usize, 1, 31, 256, 65536] {
            let cleartext: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            let sealed = keys.encrypt_for(&cleartext, keys.public()).unwrap();
            assert_eq!(keys.decrypt(&sealed).unwrap(), cleartext);
        }
    }

    #[test]
    fn test_round_trip_multi_megabyte() {
        let keys = test_keys();
        let cleartext = vec![0xA5u8; 2 * 1024 * 1024];
        let sealed = keys.encrypt_for(&cleartext, keys.public()).unwrap();
        assert_eq!(keys.decrypt(&sealed).unwrap(), cleartext);
    }

    #[test]
    fn test_envelope_framing() {
        let keys = test_keys();
        let sealed = keys.encrypt_for(b"payload", keys.public()).unwrap();
        // nonce || keysize || wrapped key || ciphertext+tag
        let key_size = u32::from_le_bytes([
            sealed[NONCE_LEN],
            sealed[NONCE_LEN + 1],
            sealed[NONCE_LEN + 2],
            sealed[NONCE_LEN + 3],
        ]) as usize;
        assert!(key_size >= AES_KEY_LEN);
        assert!(sealed.len() > NONCE_LEN + 4 + key_size);
    }

    #[test]
    fn test_truncated_ciphertext() {
        let keys = test_keys();
        let sealed = keys.encrypt_for(b"payload", keys.public()).unwrap();

        assert!(matches!(
            keys.decrypt(&sealed[..NONCE_LEN + 2]),
            Err(CryptoError::Truncated)
        ));
        // keysize field claims more bytes than remain
        assert!(matches!(
            keys.decrypt(&sealed[..NONCE_LEN + 4 + 3]),
            Err(CryptoError::Truncated)
        ));
    }

    #[test]
    fn test_tampered_payload_fails_authentication() {
        let keys = test_keys();
        let mut sealed = keys.encrypt_for(b"payload", keys.public()).unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(matches!(
            keys.decrypt(&sealed),
            Err(CryptoError::Authentication)
        ));
    }

    #[test]
    fn test_wrong_recipient_cannot_unwrap() {
        let keys = test_keys();
        let sealed = keys.encrypt_for(b"payload", keys.public()).unwrap();
        assert!(matches!(
            other_keys().decrypt(&sealed),
            Err(CryptoError::KeyUnwrap(_))
        ));
    }

    #[test]
    fn test_public_only_identity_cannot_decrypt() {
        let keys = test_keys();
        let public_only = KeyPair::from_public_pem(keys.public_pem()).unwrap();
        let sealed = keys.encrypt_for(b"payload", keys.public()).unwrap();
        assert!(matches!(
            public_only.decrypt(&sealed),
            Err(CryptoError::NoPrivateKey)
        ));
    }
}
