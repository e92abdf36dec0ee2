//! Payload packing into beacon frames, and the inverse.

use std::borrow::Cow;

use crate::compression;
use crate::error::Result;
use crate::frame::{Frame, FC_MGMT_BEACON, SIGNATURE_ADDR};
use crate::ie::{
    InfoElement, ID_COMPRESSION, ID_IDENTITY, ID_PAYLOAD, ID_SIGNATURE, ID_STREAM_HEADER,
    MAX_ELEMENT_LEN,
};

/// Beacon interval advertised in the fixed parameters.
const BEACON_INTERVAL: u16 = 100;

/// Beacon capability flags: ESS + privacy + short slot time.
const BEACON_CAPABILITIES: u16 = 0x0411;

/// Minimal radiotap header for injection: version 0, length 8, no fields.
const RADIOTAP_INJECT_HEADER: [u8; 8] = [0, 0, 8, 0, 0, 0, 0, 0];

/// Packs `payload` into a beacon frame from `from` to `to`, with optional
/// peer identity, signature and stream reassembly elements.
///
/// Payloads larger than a single element are split across successive
/// payload elements in order. When `compress` is set the payload is gzip
/// compressed first and the compressed form kept only if smaller, recorded
/// by a one byte compression element.
#[allow(clippy::too_many_arguments)]
pub fn pack_one_of(
    from: &[u8; 6],
    to: &[u8; 6],
    peer_id: Option<&[u8]>,
    signature: Option<&[u8]>,
    stream_id: u64,
    seq_num: u64,
    seq_tot: u64,
    payload: &[u8],
    compress: bool,
) -> Result<Vec<u8>> {
    let mut elements = Vec::new();

    if let Some(peer_id) = peer_id {
        elements.push(InfoElement::new(ID_IDENTITY, peer_id));
    }
    if let Some(signature) = signature {
        elements.push(InfoElement::new(ID_SIGNATURE, signature));
    }
    if stream_id > 0 {
        let mut stream = Vec::with_capacity(24);
        stream.extend_from_slice(&stream_id.to_le_bytes());
        stream.extend_from_slice(&seq_num.to_le_bytes());
        stream.extend_from_slice(&seq_tot.to_le_bytes());
        elements.push(InfoElement::new(ID_STREAM_HEADER, &stream));
    }

    let mut payload = Cow::Borrowed(payload);
    if compress {
        if let Some(compressed) = compression::compress(&payload)? {
            elements.push(InfoElement::new(ID_COMPRESSION, &[1]));
            payload = Cow::Owned(compressed);
        }
    }

    for chunk in payload.chunks(MAX_ELEMENT_LEN) {
        elements.push(InfoElement::new(ID_PAYLOAD, chunk));
    }

    Ok(serialize(from, to, &elements))
}

/// Packs a plain payload frame with no identity, signature or stream
/// metadata.
pub fn pack(from: &[u8; 6], to: &[u8; 6], payload: &[u8], compress: bool) -> Result<Vec<u8>> {
    pack_one_of(from, to, None, None, 0, 0, 0, payload, compress)
}

/// Extracts the payload of a parsed frame: payload elements concatenated in
/// encounter order, decompressed when a compression element is present.
pub fn unpack(frame: &Frame) -> Result<Vec<u8>> {
    let mut payload = Vec::new();
    let mut compressed = false;

    for element in &frame.elements {
        match element.id {
            ID_PAYLOAD => payload.extend_from_slice(&element.data),
            ID_COMPRESSION => compressed = true,
            _ => {}
        }
    }

    if compressed {
        compression::decompress(&payload)
    } else {
        Ok(payload)
    }
}

fn serialize(from: &[u8; 6], to: &[u8; 6], elements: &[InfoElement]) -> Vec<u8> {
    let body_len: usize = elements.iter().map(|e| 2 + e.data.len()).sum();
    let mut out = Vec::with_capacity(RADIOTAP_INJECT_HEADER.len() + 40 + body_len);

    out.extend_from_slice(&RADIOTAP_INJECT_HEADER);
    let body_start = out.len();

    out.push(FC_MGMT_BEACON);
    out.push(0);
    out.extend_from_slice(&[0, 0]); // duration
    out.extend_from_slice(to); // addr1: receiver
    out.extend_from_slice(&SIGNATURE_ADDR); // addr2: transmitter
    out.extend_from_slice(from); // addr3: source
    out.extend_from_slice(&[0, 0]); // sequence control

    out.extend_from_slice(&[0u8; 8]); // beacon timestamp
    out.extend_from_slice(&BEACON_INTERVAL.to_le_bytes());
    out.extend_from_slice(&BEACON_CAPABILITIES.to_le_bytes());

    for element in elements {
        element.write_to(&mut out);
    }

    let fcs = crc32fast::hash(&out[body_start..]);
    out.extend_from_slice(&fcs.to_le_bytes());
    out
}
