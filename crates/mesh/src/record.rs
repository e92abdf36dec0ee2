//! Durable projection of a peer, one JSON document per fingerprint.

use beaconnet_core::AdvMap;
use serde::{Deserialize, Serialize};

/// The persisted, cross-restart memory of a peer.
///
/// Timestamps are Unix epoch milliseconds. The encounter counter increases
/// monotonically across the peer's whole history, surviving loss and
/// re-discovery of the live peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerRecord {
    /// Stable identity fingerprint.
    pub fingerprint: String,
    /// When the peer was met for the very first time.
    pub met_at: u64,
    /// When the current live incarnation was first detected.
    pub detected_at: u64,
    /// Last time a beacon was seen.
    pub seen_at: u64,
    /// The `seen_at` of the previous encounter.
    pub prev_seen_at: u64,
    /// Total tracked encounters, saturating.
    pub encounters: u64,
    /// Last known radio channel.
    pub channel: u32,
    /// Last known signal strength in dBm.
    pub rssi: i32,
    /// Last known session identifier, colon-hex.
    pub session_id: String,
    /// Snapshot of the advertisement map.
    pub advertisement: AdvMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_json_round_trip() {
        let mut advertisement = AdvMap::new();
        advertisement.insert("name".to_string(), serde_json::Value::from("unitA"));

        let record = PeerRecord {
            fingerprint: "aa11".to_string(),
            met_at: 1,
            detected_at: 2,
            seen_at: 4,
            prev_seen_at: 3,
            encounters: 7,
            channel: 6,
            rssi: -40,
            session_id: "de:ad:be:ef:00:42".to_string(),
            advertisement,
        };

        let json = serde_json::to_vec(&record).unwrap();
        let reloaded: PeerRecord = serde_json::from_slice(&json).unwrap();
        assert_eq!(reloaded.fingerprint, "aa11");
        assert_eq!(reloaded.encounters, 7);
        assert_eq!(reloaded.advertisement["name"], "unitA");
    }
}
