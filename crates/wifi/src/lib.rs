//! 802.11 beacon frame codec for Beaconnet.
//!
//! Serializes arbitrary byte payloads into management beacon frames using a
//! reserved range of vendor information elements, and parses them back:
//! chunking across 255 byte elements, optional gzip compression, radiotap
//! metadata extraction and frame check sequence validation.

pub mod channel;
pub mod compression;
pub mod error;
pub mod frame;
pub mod ie;
pub mod pack;

pub use channel::{channel_to_freq, freq_to_channel};
pub use error::{Result, WifiError};
pub use frame::{Dot11Header, Frame, RadioInfo, BROADCAST_ADDR, SIGNATURE_ADDR, SIGNATURE_ADDR_STR};
pub use ie::{
    InfoElement, ID_COMPRESSION, ID_IDENTITY, ID_PAYLOAD, ID_SIGNATURE, ID_STREAM_HEADER,
    MAX_ELEMENT_LEN,
};
pub use pack::{pack, pack_one_of, unpack};
