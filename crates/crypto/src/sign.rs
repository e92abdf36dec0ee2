//! Content signing and verification.
//!
//! Payloads are SHA-256 hashed and signed with RSA-PSS using a fixed
//! 16 byte salt, matching the advertisement protocol on the wire.

use rsa::Pss;
use sha2::{Digest, Sha256};

use crate::error::{CryptoError, Result};
use crate::keypair::KeyPair;

/// PSS salt length in bytes.
const PSS_SALT_LEN: usize = 16;

fn pss() -> Pss {
    Pss::new_with_salt::<Sha256>(PSS_SALT_LEN)
}

impl KeyPair {
    /// Signs `data`: SHA-256 prehash, then RSA-PSS with a 16 byte salt.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let private = self.private().ok_or(CryptoError::NoPrivateKey)?;
        let hashed = Sha256::digest(data);

        let mut rng = rand::thread_rng();
        private
            .sign_with_rng(&mut rng, pss(), &hashed)
            .map_err(|e| CryptoError::Signing(e.to_string()))
    }

    /// Verifies a [`KeyPair::sign`] signature over `data` with this
    /// identity's public key.
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<()> {
        let hashed = Sha256::digest(data);
        self.public()
            .verify(pss(), &hashed, signature)
            .map_err(|_| CryptoError::BadSignature)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CryptoError;
    use crate::keypair::testutil::{other_keys, test_keys};
    use crate::keypair::KeyPair;

    #[test]
    fn test_sign_verify_round_trip() {
        let keys = test_keys();
        for data in [&b""[..], b"hello mesh", &[0u8; 4096]] {
            let signature = keys.sign(data).unwrap();
            keys.verify(data, &signature).unwrap();
        }
    }

    #[test]
    fn test_verify_rejects_flipped_data_bit() {
        let keys = test_keys();
        let data = b"advertisement payload".to_vec();
        let signature = keys.sign(&data).unwrap();

        for i in 0..data.len() {
            let mut tampered = data.clone();
            tampered[i] ^= 0x01;
            assert!(keys.verify(&tampered, &signature).is_err());
        }
    }

    #[test]
    fn test_verify_rejects_flipped_signature_bit() {
        let keys = test_keys();
        let data = b"advertisement payload";
        let mut signature = keys.sign(data).unwrap();
        signature[0] ^= 0x80;
        assert!(matches!(
            keys.verify(data, &signature),
            Err(CryptoError::BadSignature)
        ));
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let keys = test_keys();
        let data = b"advertisement payload";
        let signature = keys.sign(data).unwrap();
        assert!(other_keys().verify(data, &signature).is_err());
    }

    #[test]
    fn test_public_only_identity_cannot_sign() {
        let keys = test_keys();
        let public_only = KeyPair::from_public_pem(keys.public_pem()).unwrap();
        assert!(matches!(
            public_only.sign(b"data"),
            Err(CryptoError::NoPrivateKey)
        ));
    }
}
