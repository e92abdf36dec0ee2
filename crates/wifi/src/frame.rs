//! Captured frame parsing: radiotap metadata, the management beacon header
//! and the information elements of the body.

use crate::channel::freq_to_channel;
use crate::error::{Result, WifiError};
use crate::ie::InfoElement;

/// Transmitter address marking frames that belong to this protocol; BPF
/// filters select on it so unrelated beacons never reach user space.
pub const SIGNATURE_ADDR: [u8; 6] = [0xde, 0xad, 0xbe, 0xef, 0xde, 0xad];

/// [`SIGNATURE_ADDR`] in the textual form BPF filters use.
pub const SIGNATURE_ADDR_STR: &str = "de:ad:be:ef:de:ad";

/// Link-layer broadcast address.
pub const BROADCAST_ADDR: [u8; 6] = [0xff; 6];

/// Frame control byte of a management beacon (version 0, type 0, subtype 8).
pub(crate) const FC_MGMT_BEACON: u8 = 0x80;

/// Length of the 802.11 management header: frame control, duration, three
/// addresses and sequence control.
pub(crate) const DOT11_HEADER_LEN: usize = 24;

/// Length of the fixed beacon parameters: timestamp, interval, capabilities.
pub(crate) const BEACON_FIXED_LEN: usize = 12;

/// Trailing frame check sequence length.
pub(crate) const FCS_LEN: usize = 4;

// Radiotap field sizes and alignments for the fields the parser walks,
// indexed by present-flag bit.
const RADIOTAP_FIELDS: [(usize, usize); 15] = [
    (8, 8), // TSFT
    (1, 1), // flags
    (1, 1), // rate
    (2, 4), // channel: frequency u16 + flags u16
    (2, 2), // FHSS
    (1, 1), // dBm antenna signal
    (1, 1), // dBm antenna noise
    (2, 2), // lock quality
    (2, 2), // TX attenuation
    (2, 2), // dB TX attenuation
    (1, 1), // dBm TX power
    (1, 1), // antenna
    (1, 1), // dB antenna signal
    (1, 1), // dB antenna noise
    (2, 2), // RX flags
];

const RADIOTAP_CHANNEL_BIT: usize = 3;
const RADIOTAP_SIGNAL_BIT: usize = 5;
const RADIOTAP_EXT_BIT: u32 = 1 << 31;

/// Radio metadata extracted from the radiotap layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RadioInfo {
    /// Channel center frequency in MHz, when the capture reported one.
    pub frequency: Option<u16>,
    /// Received signal strength in dBm, when the capture reported one.
    pub signal_dbm: Option<i8>,
}

impl RadioInfo {
    /// Channel number derived from the frequency, 0 when unknown.
    pub fn channel(&self) -> u32 {
        self.frequency
            .map(|f| freq_to_channel(u32::from(f)))
            .unwrap_or(0)
    }

    /// Signal strength in dBm, 0 when unknown.
    pub fn rssi(&self) -> i32 {
        self.signal_dbm.map(i32::from).unwrap_or(0)
    }
}

/// The addresses of the 802.11 management header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dot11Header {
    /// Address 1, the receiver.
    pub destination: [u8; 6],
    /// Address 2, the transmitter.
    pub transmitter: [u8; 6],
    /// Address 3, the logical source; carries the sender's session id.
    pub source: [u8; 6],
}

/// A parsed management beacon frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Radiotap metadata.
    pub radio: RadioInfo,
    /// Management header addresses.
    pub dot11: Dot11Header,
    /// Information elements of the beacon body, in encounter order.
    pub elements: Vec<InfoElement>,
}

impl Frame {
    /// Parses a captured frame: radiotap header, beacon management header,
    /// frame check sequence, then the information elements.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let (radio, radiotap_len) = parse_radiotap(bytes)?;
        let body = &bytes[radiotap_len..];

        if body.len() < DOT11_HEADER_LEN + BEACON_FIXED_LEN + FCS_LEN {
            return Err(WifiError::TruncatedFrame("management layer too short"));
        }
        if body[0] != FC_MGMT_BEACON {
            return Err(WifiError::NotABeacon);
        }

        let fcs_offset = body.len() - FCS_LEN;
        let declared = u32::from_le_bytes([
            body[fcs_offset],
            body[fcs_offset + 1],
            body[fcs_offset + 2],
            body[fcs_offset + 3],
        ]);
        if crc32fast::hash(&body[..fcs_offset]) != declared {
            return Err(WifiError::BadFcs);
        }

        let addr = |start: usize| -> [u8; 6] {
            let mut out = [0u8; 6];
            out.copy_from_slice(&body[start..start + 6]);
            out
        };
        let dot11 = Dot11Header {
            destination: addr(4),
            transmitter: addr(10),
            source: addr(16),
        };

        let mut elements = Vec::new();
        let mut offset = DOT11_HEADER_LEN + BEACON_FIXED_LEN;
        while offset + 2 <= fcs_offset {
            let id = body[offset];
            let len = body[offset + 1] as usize;
            if offset + 2 + len > fcs_offset {
                // element declares bytes past the body, stop scanning
                break;
            }
            elements.push(InfoElement::new(id, &body[offset + 2..offset + 2 + len]));
            offset += 2 + len;
        }

        Ok(Self {
            radio,
            dot11,
            elements,
        })
    }

    /// Whether the frame is addressed to the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        self.dot11.destination == BROADCAST_ADDR
    }
}

/// Parses the radiotap layer, returning the radio metadata and the offset
/// at which the 802.11 layer begins.
fn parse_radiotap(bytes: &[u8]) -> Result<(RadioInfo, usize)> {
    if bytes.len() < 8 {
        return Err(WifiError::TruncatedFrame("no radiotap layer"));
    }
    if bytes[0] != 0 {
        return Err(WifiError::Malformed("unknown radiotap version"));
    }

    let header_len = u16::from_le_bytes([bytes[2], bytes[3]]) as usize;
    if header_len < 8 || header_len > bytes.len() {
        return Err(WifiError::TruncatedFrame("radiotap header cut short"));
    }

    // present words: bit 31 chains another word
    let mut present_words = Vec::new();
    let mut offset = 4;
    loop {
        if offset + 4 > header_len {
            return Err(WifiError::TruncatedFrame("radiotap present words cut short"));
        }
        let word = u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]);
        present_words.push(word);
        offset += 4;
        if word & RADIOTAP_EXT_BIT == 0 {
            break;
        }
    }

    // Only the first present word is walked; an unknown field has an unknown
    // size, so scanning stops at the first bit past the known table.
    let mut radio = RadioInfo::default();
    let present = present_words[0];
    for bit in 0..31usize {
        if present & (1 << bit) == 0 {
            continue;
        }
        if bit >= RADIOTAP_FIELDS.len() {
            break;
        }
        let (align, size) = RADIOTAP_FIELDS[bit];
        offset = (offset + align - 1) & !(align - 1);
        if offset + size > header_len {
            break;
        }
        match bit {
            RADIOTAP_CHANNEL_BIT => {
                radio.frequency = Some(u16::from_le_bytes([bytes[offset], bytes[offset + 1]]));
            }
            RADIOTAP_SIGNAL_BIT => {
                radio.signal_dbm = Some(bytes[offset] as i8);
            }
            _ => {}
        }
        offset += size;
    }

    Ok((radio, header_len))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Radiotap header advertising channel (bit 3) and antenna signal (bit 5):
    // flags word 0x28, then freq 2437 LE + channel flags, then -42 dBm.
    fn radiotap_with_metadata() -> Vec<u8> {
        let mut header = vec![0u8, 0, 0, 0, 0x28, 0, 0, 0];
        header.extend_from_slice(&2437u16.to_le_bytes()); // frequency
        header.extend_from_slice(&[0, 0]); // channel flags
        header.push((-42i8) as u8); // dBm antenna signal
        let len = header.len() as u16;
        header[2..4].copy_from_slice(&len.to_le_bytes());
        header
    }

    fn beacon_body() -> Vec<u8> {
        let mut body = vec![FC_MGMT_BEACON, 0, 0, 0];
        body.extend_from_slice(&BROADCAST_ADDR);
        body.extend_from_slice(&SIGNATURE_ADDR);
        body.extend_from_slice(&[1, 2, 3, 4, 5, 6]);
        body.extend_from_slice(&[0, 0]); // sequence control
        body.extend_from_slice(&[0u8; 12]); // fixed beacon params
        body.extend_from_slice(&[222, 3, b'x', b'y', b'z']);
        let fcs = crc32fast::hash(&body);
        body.extend_from_slice(&fcs.to_le_bytes());
        body
    }

    #[test]
    fn test_parse_with_radio_metadata() {
        let mut frame = radiotap_with_metadata();
        frame.extend_from_slice(&beacon_body());

        let parsed = Frame::parse(&frame).unwrap();
        assert_eq!(parsed.radio.frequency, Some(2437));
        assert_eq!(parsed.radio.channel(), 6);
        assert_eq!(parsed.radio.rssi(), -42);
        assert_eq!(parsed.dot11.source, [1, 2, 3, 4, 5, 6]);
        assert_eq!(parsed.dot11.transmitter, SIGNATURE_ADDR);
        assert!(parsed.is_broadcast());
        assert_eq!(parsed.elements.len(), 1);
        assert_eq!(parsed.elements[0].data, b"xyz");
    }

    #[test]
    fn test_parse_rejects_short_buffer() {
        assert!(matches!(
            Frame::parse(&[0, 0, 8]),
            Err(WifiError::TruncatedFrame(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_fcs() {
        let mut frame = radiotap_with_metadata();
        let mut body = beacon_body();
        let last = body.len() - 1;
        body[last] ^= 0xff;
        frame.extend_from_slice(&body);

        assert!(matches!(Frame::parse(&frame), Err(WifiError::BadFcs)));
    }

    #[test]
    fn test_parse_rejects_non_beacon() {
        let mut frame = radiotap_with_metadata();
        let mut body = beacon_body();
        body[0] = 0x40; // probe request
        let fcs_offset = body.len() - FCS_LEN;
        let fcs = crc32fast::hash(&body[..fcs_offset]);
        body[fcs_offset..].copy_from_slice(&fcs.to_le_bytes());
        frame.extend_from_slice(&body);

        assert!(matches!(Frame::parse(&frame), Err(WifiError::NotABeacon)));
    }

    #[test]
    fn test_parse_rejects_unknown_radiotap_version() {
        let mut frame = radiotap_with_metadata();
        frame[0] = 9;
        frame.extend_from_slice(&beacon_body());
        assert!(matches!(Frame::parse(&frame), Err(WifiError::Malformed(_))));
    }
}
