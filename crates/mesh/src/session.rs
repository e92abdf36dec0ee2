//! Link-layer session identifiers.

use std::fmt;

use rand::RngCore;

/// A 6 byte link-layer session identifier.
///
/// A peer re-derives its session id whenever its transmit address changes,
/// so the identifier is transient; the crypto fingerprint is the stable
/// identity. Displayed as colon-separated hex for logging and equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId([u8; 6]);

impl SessionId {
    /// Generates a fresh random session identifier.
    pub fn random() -> Self {
        let mut bytes = [0u8; 6];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Wraps the raw address bytes of a captured frame.
    pub fn from_bytes(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// The raw address bytes.
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Parses the colon-hex textual form.
    pub fn parse(text: &str) -> Option<Self> {
        let mut bytes = [0u8; 6];
        let mut parts = text.split(':');
        for byte in bytes.iter_mut() {
            *byte = u8::from_str_radix(parts.next()?, 16).ok()?;
        }
        if parts.next().is_some() {
            return None;
        }
        Some(Self(bytes))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse_round_trip() {
        let id = SessionId::from_bytes([0xde, 0xad, 0xbe, 0xef, 0x00, 0x42]);
        assert_eq!(id.to_string(), "de:ad:be:ef:00:42");
        assert_eq!(SessionId::parse(&id.to_string()), Some(id));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(SessionId::parse("").is_none());
        assert!(SessionId::parse("de:ad:be:ef:00").is_none());
        assert!(SessionId::parse("de:ad:be:ef:00:42:99").is_none());
        assert!(SessionId::parse("zz:ad:be:ef:00:42").is_none());
    }

    #[test]
    fn test_random_ids_differ() {
        assert_ne!(SessionId::random(), SessionId::random());
    }
}
