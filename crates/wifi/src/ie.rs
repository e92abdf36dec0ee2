//! Vendor information elements.
//!
//! The codec claims five element IDs in the 222..=226 range, which no
//! standardized information element occupies, to carry payload chunks, the
//! compression flag, the sender identity, a signature and stream metadata.

/// Element carrying one chunk of the (possibly compressed) payload.
pub const ID_PAYLOAD: u8 = 222;

/// Element flagging that the payload chunks are gzip compressed.
pub const ID_COMPRESSION: u8 = 223;

/// Element carrying the sender's identity fingerprint.
pub const ID_IDENTITY: u8 = 224;

/// Element carrying a signature over the payload.
pub const ID_SIGNATURE: u8 = 225;

/// Element carrying stream reassembly metadata: stream id, sequence number
/// and sequence total as little-endian u64 values.
pub const ID_STREAM_HEADER: u8 = 226;

/// Maximum bytes a single information element can carry (its length field
/// is one byte).
pub const MAX_ELEMENT_LEN: usize = 0xff;

/// A tagged, length-prefixed sub-field of a management frame body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoElement {
    /// Element ID tag.
    pub id: u8,
    /// Element payload, at most [`MAX_ELEMENT_LEN`] bytes.
    pub data: Vec<u8>,
}

impl InfoElement {
    /// Creates an element, truncating `data` to the length a single element
    /// can carry. Callers chunk larger payloads across multiple elements.
    pub fn new(id: u8, data: &[u8]) -> Self {
        let len = data.len().min(MAX_ELEMENT_LEN);
        Self {
            id,
            data: data[..len].to_vec(),
        }
    }

    /// Appends the serialized `id | length | data` form to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.id);
        out.push(self.data.len() as u8);
        out.extend_from_slice(&self.data);
    }
}
