//! Mesh participants and the advertisement protocol.
//!
//! A [`Peer`] is either the local node or a discovered remote node. Remote
//! peers only come into existence through a signed advertisement whose
//! public key hashes to the claimed identity; the signature covers the
//! canonical JSON of every other advertisement field.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use beaconnet_core::{now_ms, now_secs, AdvMap};
use beaconnet_crypto::KeyPair;
use beaconnet_wifi::{pack, Frame, BROADCAST_ADDR};

use crate::error::{MeshError, Result};
use crate::muxer::PacketMuxer;
use crate::record::PeerRecord;
use crate::session::SessionId;

/// Default self-advertisement period in milliseconds.
pub const DEFAULT_ADV_PERIOD_MS: u64 = 300;

/// Mutable per-peer state, guarded by the peer's own lock.
#[derive(Debug, Clone)]
struct PeerState {
    detected_at: u64,
    seen_at: u64,
    prev_seen_at: u64,
    met_at: u64,
    encounters: u64,
    channel: u32,
    rssi: i32,
    session_id: SessionId,
}

struct Advertiser {
    // kept so the injection handle outlives the task
    _muxer: Arc<PacketMuxer>,
    task: JoinHandle<()>,
}

/// A mesh participant, local or remote.
///
/// Every mutation goes through the peer's own locks, so concurrent updates
/// from different capture workers never race; the advertisement map can be
/// read by the advertiser while API callers write it.
pub struct Peer {
    keys: KeyPair,
    state: RwLock<PeerState>,
    adv: RwLock<AdvMap>,
    adv_period_ms: u64,
    adv_enabled: AtomicBool,
    advertiser: Mutex<Option<Advertiser>>,
}

impl Peer {
    /// Creates the local peer with a fresh session id and the base
    /// advertisement: `name`, `identity`, `session_id`, `version` and the
    /// base64 public key PEM.
    pub fn local(name: &str, keys: KeyPair, adv_period_ms: u64) -> Arc<Self> {
        let now = now_ms();
        let session_id = SessionId::random();

        let mut adv = AdvMap::new();
        adv.insert("name".to_string(), Value::from(name));
        adv.insert("identity".to_string(), Value::from(keys.fingerprint()));
        adv.insert("session_id".to_string(), Value::from(session_id.to_string()));
        adv.insert(
            "version".to_string(),
            Value::from(env!("CARGO_PKG_VERSION")),
        );
        adv.insert(
            "public_key".to_string(),
            Value::from(BASE64.encode(keys.public_pem())),
        );

        for (key, value) in &adv {
            debug!("local.adv.{} = {}", key, value);
        }

        Arc::new(Self {
            keys,
            state: RwLock::new(PeerState {
                detected_at: now,
                seen_at: now,
                prev_seen_at: now,
                met_at: now,
                encounters: 0,
                channel: 0,
                rssi: 0,
                session_id,
            }),
            adv: RwLock::new(adv),
            adv_period_ms,
            adv_enabled: AtomicBool::new(false),
            advertiser: Mutex::new(None),
        })
    }

    /// Builds a remote peer from a captured frame and its decoded
    /// advertisement map.
    ///
    /// The advertisement must carry `identity`, `public_key` and
    /// `signature`; the key must hash to the claimed identity and the
    /// signature must verify. Channel and RSSI come from the frame's radio
    /// metadata, the session id from its source address.
    pub fn from_frame(frame: &Frame, adv: &AdvMap) -> Result<Arc<Self>> {
        let session_id = SessionId::from_bytes(frame.dot11.source);
        let keys = verify_advertisement(&session_id, adv)?;

        let now = now_ms();
        Ok(Arc::new(Self {
            keys,
            state: RwLock::new(PeerState {
                detected_at: now,
                seen_at: now,
                prev_seen_at: now,
                met_at: now,
                encounters: 0,
                channel: frame.radio.channel(),
                rssi: frame.radio.rssi(),
                session_id,
            }),
            adv: RwLock::new(adv.clone()),
            adv_period_ms: DEFAULT_ADV_PERIOD_MS,
            adv_enabled: AtomicBool::new(false),
            advertiser: Mutex::new(None),
        }))
    }

    /// Re-validates and applies a subsequent advertisement from this peer.
    ///
    /// Validation failures leave all previously verified state intact.
    pub fn update(&self, frame: &Frame, adv: &AdvMap) -> Result<()> {
        let session_id = SessionId::from_bytes(frame.dot11.source);
        let keys = verify_advertisement(&session_id, adv)?;

        if keys.fingerprint() != self.keys.fingerprint() {
            return Err(MeshError::FingerprintMismatch {
                session: session_id.to_string(),
                claimed: keys.fingerprint().to_string(),
                actual: self.keys.fingerprint().to_string(),
            });
        }

        {
            let mut state = self.state.write().unwrap();
            state.channel = frame.radio.channel();
            state.rssi = frame.radio.rssi();
            state.seen_at = now_ms();
            if state.session_id != session_id {
                info!(
                    "peer {} changed session id: {} -> {}",
                    self.id(),
                    state.session_id,
                    session_id
                );
                state.session_id = session_id;
            }
        }

        let mut map = self.adv.write().unwrap();
        for (key, value) in adv {
            map.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    /// The peer's crypto identity.
    pub fn keys(&self) -> &KeyPair {
        &self.keys
    }

    /// The identity fingerprint.
    pub fn fingerprint(&self) -> &str {
        self.keys.fingerprint()
    }

    /// `name@fingerprint`, for logging.
    pub fn id(&self) -> String {
        let adv = self.adv.read().unwrap();
        let name = adv
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("???");
        format!("{}@{}", name, self.keys.fingerprint())
    }

    /// Current session identifier.
    pub fn session_id(&self) -> SessionId {
        self.state.read().unwrap().session_id
    }

    /// Seconds since the last beacon from this peer.
    pub fn inactive_for(&self) -> f64 {
        let seen_at = self.state.read().unwrap().seen_at;
        now_ms().saturating_sub(seen_at) as f64 / 1000.0
    }

    /// Merges `data` into the advertisement; a null value removes its key.
    pub fn set_data(&self, data: AdvMap) {
        let mut adv = self.adv.write().unwrap();
        for (key, value) in data {
            if value.is_null() {
                adv.remove(&key);
            } else {
                adv.insert(key, value);
            }
        }
    }

    /// A snapshot of the advertisement map.
    pub fn data(&self) -> AdvMap {
        self.adv.read().unwrap().clone()
    }

    /// Enables or disables periodic self-advertisement.
    pub fn advertise(&self, enabled: bool) {
        let was = self.adv_enabled.swap(enabled, Ordering::SeqCst);
        if was != enabled {
            if enabled {
                info!("peer advertisement enabled");
            } else {
                info!("peer advertisement disabled");
            }
        }
    }

    /// Familiarity score for this peer, combining encounter count and
    /// relationship age.
    ///
    /// `encounters / (days_since_met * 100 * 0.9 + 1.0)`: the denominator
    /// models an expected ~100 encounters per day with 10% statistical
    /// loss, so the score is non-decreasing in encounters and
    /// non-increasing in elapsed time.
    pub fn bond(&self) -> f64 {
        let state = self.state.read().unwrap();
        let days_since_met = now_ms().saturating_sub(state.met_at) as f64 / 86_400_000.0;
        let max_encounters = days_since_met * 100.0 * 0.9;
        state.encounters as f64 / (max_encounters + 1.0)
    }

    /// Builds one signed advertisement frame ready for broadcast: snapshot
    /// the map, add `timestamp`, sign the canonical JSON, append the
    /// signature as its own field, then pack with compression.
    pub fn advertisement_frame(&self) -> Result<Vec<u8>> {
        let mut data = self.data();
        data.insert("timestamp".to_string(), Value::from(now_secs()));

        let unsigned = serde_json::to_vec(&data)?;
        let signature = self.keys.sign(&unsigned)?;
        data.insert(
            "signature".to_string(),
            Value::from(BASE64.encode(signature)),
        );
        let adv = serde_json::to_vec(&data)?;

        let session_id = self.session_id();
        Ok(pack(session_id.as_bytes(), &BROADCAST_ADDR, &adv, true)?)
    }

    /// Opens an injection handle on `iface` and starts the periodic
    /// advertiser task. Broadcasting only happens while enabled via
    /// [`Peer::advertise`]. Must be called from a tokio runtime.
    pub fn start_advertising(self: &Arc<Self>, iface: &str, workers: usize) -> Result<()> {
        let mut slot = self.advertiser.lock().unwrap();
        if slot.is_some() {
            return Ok(());
        }

        let muxer = Arc::new(PacketMuxer::open(iface, "", workers)?);
        let peer = Arc::clone(self);
        let handle = Arc::clone(&muxer);
        let period = Duration::from_millis(self.adv_period_ms);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            debug!("advertiser started with a {:?} period", period);

            loop {
                ticker.tick().await;
                if !peer.adv_enabled.load(Ordering::SeqCst) {
                    continue;
                }
                match peer.advertisement_frame() {
                    Ok(frame) => {
                        if let Err(e) = handle.write(&frame).await {
                            error!(
                                "error sending {} bytes of advertisement frame: {}",
                                frame.len(),
                                e
                            );
                        }
                    }
                    Err(e) => error!("could not build advertisement frame: {}", e),
                }
            }
        });

        *slot = Some(Advertiser {
            _muxer: muxer,
            task,
        });
        Ok(())
    }

    /// Stops the periodic advertiser task.
    pub fn stop_advertising(&self) {
        debug!("stopping advertiser ...");
        if let Some(advertiser) = self.advertiser.lock().unwrap().take() {
            advertiser.task.abort();
        }
    }

    /// The durable projection of this peer.
    pub fn record(&self) -> PeerRecord {
        let state = self.state.read().unwrap();
        PeerRecord {
            fingerprint: self.keys.fingerprint().to_string(),
            met_at: state.met_at,
            detected_at: state.detected_at,
            seen_at: state.seen_at,
            prev_seen_at: state.prev_seen_at,
            encounters: state.encounters,
            channel: state.channel,
            rssi: state.rssi,
            session_id: state.session_id.to_string(),
            advertisement: self.data(),
        }
    }

    /// Applies the outcome of a tracked encounter; called by the storage
    /// layer under its own lock.
    pub(crate) fn apply_encounter(
        &self,
        met_at: u64,
        encounters: u64,
        prev_seen_at: u64,
        seen_at: u64,
    ) {
        let mut state = self.state.write().unwrap();
        state.met_at = met_at;
        state.encounters = encounters;
        state.prev_seen_at = prev_seen_at;
        state.seen_at = seen_at;
    }
}

/// Validates a received advertisement and returns the sender's verified
/// public-only identity.
fn verify_advertisement(session_id: &SessionId, adv: &AdvMap) -> Result<KeyPair> {
    let claimed = adv
        .get("identity")
        .and_then(Value::as_str)
        .ok_or_else(|| MeshError::MissingIdentity {
            session: session_id.to_string(),
        })?;

    let public_key64 = adv
        .get("public_key")
        .and_then(Value::as_str)
        .ok_or_else(|| MeshError::MissingPublicKey {
            fingerprint: claimed.to_string(),
        })?;
    let pem_bytes = BASE64
        .decode(public_key64)
        .map_err(|e| MeshError::InvalidField {
            field: "public_key",
            reason: e.to_string(),
        })?;
    let pem = String::from_utf8(pem_bytes).map_err(|e| MeshError::InvalidField {
        field: "public_key",
        reason: e.to_string(),
    })?;
    let keys = KeyPair::from_public_pem(&pem)?;

    if keys.fingerprint() != claimed {
        return Err(MeshError::FingerprintMismatch {
            session: session_id.to_string(),
            claimed: claimed.to_string(),
            actual: keys.fingerprint().to_string(),
        });
    }

    let signature64 = adv
        .get("signature")
        .and_then(Value::as_str)
        .ok_or_else(|| MeshError::MissingSignature {
            fingerprint: claimed.to_string(),
        })?;
    let signature = BASE64
        .decode(signature64)
        .map_err(|e| MeshError::InvalidField {
            field: "signature",
            reason: e.to_string(),
        })?;

    // The signature covers the advertisement without its own field; map
    // keys serialize sorted, so re-serialization is canonical.
    let mut signed = adv.clone();
    signed.remove("signature");
    let signed_bytes = serde_json::to_vec(&signed)?;

    keys.verify(&signed_bytes, &signature)
        .map_err(|_| MeshError::BadAdvertisementSignature {
            session: session_id.to_string(),
        })?;

    Ok(keys)
}


#[cfg(test)]
mod tests {
    use super::testutil::{advertisement_from, keys_a, keys_b};
    use super::*;
    use beaconnet_wifi::unpack;

    fn decode_adv(frame: &Frame) -> AdvMap {
        serde_json::from_slice(&unpack(frame).unwrap()).unwrap()
    }

    #[test]
    fn test_local_peer_base_advertisement() {
        let peer = Peer::local("unitA", keys_a().clone(), DEFAULT_ADV_PERIOD_MS);
        let data = peer.data();

        assert_eq!(data["name"], "unitA");
        assert_eq!(data["identity"], keys_a().fingerprint());
        assert!(data.contains_key("public_key"));
        assert!(data.contains_key("session_id"));
        assert!(data.contains_key("version"));
    }

    #[test]
    fn test_discovery_from_signed_advertisement() {
        let (sender, frame) = advertisement_from(keys_a(), "unitA");
        let adv = decode_adv(&frame);

        let peer = Peer::from_frame(&frame, &adv).unwrap();
        assert_eq!(peer.fingerprint(), keys_a().fingerprint());
        assert_eq!(peer.session_id(), sender.session_id());
        assert_eq!(peer.data()["name"], "unitA");
        assert!(!peer.keys().has_private());
    }

    #[test]
    fn test_missing_identity_is_rejected() {
        let (_, frame) = advertisement_from(keys_a(), "unitA");
        let mut adv = decode_adv(&frame);
        adv.remove("identity");

        assert!(matches!(
            Peer::from_frame(&frame, &adv),
            Err(MeshError::MissingIdentity { .. })
        ));
    }

    #[test]
    fn test_missing_public_key_is_rejected() {
        let (_, frame) = advertisement_from(keys_a(), "unitA");
        let mut adv = decode_adv(&frame);
        adv.remove("public_key");

        assert!(matches!(
            Peer::from_frame(&frame, &adv),
            Err(MeshError::MissingPublicKey { .. })
        ));
    }

    #[test]
    fn test_missing_signature_is_rejected() {
        let (_, frame) = advertisement_from(keys_a(), "unitA");
        let mut adv = decode_adv(&frame);
        adv.remove("signature");

        assert!(matches!(
            Peer::from_frame(&frame, &adv),
            Err(MeshError::MissingSignature { .. })
        ));
    }

    #[test]
    fn test_fingerprint_mismatch_is_rejected() {
        let (_, frame) = advertisement_from(keys_a(), "unitA");
        let mut adv = decode_adv(&frame);
        adv.insert("identity".to_string(), Value::from("aa11"));

        assert!(matches!(
            Peer::from_frame(&frame, &adv),
            Err(MeshError::FingerprintMismatch { .. })
        ));
    }

    #[test]
    fn test_tampered_advertisement_fails_signature() {
        let (_, frame) = advertisement_from(keys_a(), "unitA");
        let mut adv = decode_adv(&frame);
        // change a signed field after signing
        adv.insert("name".to_string(), Value::from("impostor"));

        assert!(matches!(
            Peer::from_frame(&frame, &adv),
            Err(MeshError::BadAdvertisementSignature { .. })
        ));
    }

    #[test]
    fn test_update_merges_and_tracks_session_change() {
        let (_, first) = advertisement_from(keys_a(), "unitA");
        let peer = Peer::from_frame(&first, &decode_adv(&first)).unwrap();
        let original_session = peer.session_id();

        // same identity, fresh session id and a changed field
        let (sender_b, second) = advertisement_from(keys_a(), "unitA-renamed");
        peer.update(&second, &decode_adv(&second)).unwrap();

        assert_eq!(peer.data()["name"], "unitA-renamed");
        assert_eq!(peer.session_id(), sender_b.session_id());
        assert_ne!(peer.session_id(), original_session);
    }

    #[test]
    fn test_update_rejects_foreign_identity_and_keeps_state() {
        let (_, first) = advertisement_from(keys_a(), "unitA");
        let peer = Peer::from_frame(&first, &decode_adv(&first)).unwrap();

        let (_, foreign) = advertisement_from(keys_b(), "unitB");
        assert!(peer.update(&foreign, &decode_adv(&foreign)).is_err());

        // prior verified state intact
        assert_eq!(peer.fingerprint(), keys_a().fingerprint());
        assert_eq!(peer.data()["name"], "unitA");
    }

    #[test]
    fn test_set_data_null_removes_key() {
        let peer = Peer::local("unitA", keys_a().clone(), DEFAULT_ADV_PERIOD_MS);

        let mut data = AdvMap::new();
        data.insert("mood".to_string(), Value::from("curious"));
        peer.set_data(data);
        assert_eq!(peer.data()["mood"], "curious");

        let mut removal = AdvMap::new();
        removal.insert("mood".to_string(), Value::Null);
        peer.set_data(removal);
        assert!(!peer.data().contains_key("mood"));
    }

    #[test]
    fn test_advertisement_frame_is_signed_and_verifiable() {
        let (_, frame) = advertisement_from(keys_a(), "unitA");
        let adv = decode_adv(&frame);

        assert!(adv.contains_key("timestamp"));
        assert!(adv.contains_key("signature"));
        // a receiver can rebuild the peer from it
        Peer::from_frame(&frame, &adv).unwrap();
    }

    #[test]
    fn test_bond_monotonic_in_encounters() {
        let peer = Peer::local("unitA", keys_a().clone(), DEFAULT_ADV_PERIOD_MS);
        let met_at = now_ms() - 86_400_000; // met a day ago

        peer.apply_encounter(met_at, 5, met_at, now_ms());
        let low = peer.bond();
        peer.apply_encounter(met_at, 50, met_at, now_ms());
        let high = peer.bond();

        assert!(high > low);
    }

    #[test]
    fn test_bond_decays_with_relationship_age() {
        let peer = Peer::local("unitA", keys_a().clone(), DEFAULT_ADV_PERIOD_MS);
        let now = now_ms();

        peer.apply_encounter(now - 86_400_000, 50, now, now);
        let young = peer.bond();
        peer.apply_encounter(now - 10 * 86_400_000, 50, now, now);
        let old = peer.bond();

        assert!(old < young);
    }

    #[test]
    fn test_bond_fresh_peer_is_finite() {
        let peer = Peer::local("unitA", keys_a().clone(), DEFAULT_ADV_PERIOD_MS);
        let now = now_ms();
        peer.apply_encounter(now, 1, now, now);
        assert!(peer.bond() <= 1.0);
        assert!(peer.bond() > 0.0);
    }

    #[test]
    fn test_concurrent_updates_never_tear_the_map() {
        let (_, base) = advertisement_from(keys_a(), "unitA");
        let peer = Peer::from_frame(&base, &decode_adv(&base)).unwrap();

        let (_, frame_x) = advertisement_from(keys_a(), "variant-x");
        let adv_x = decode_adv(&frame_x);
        let (_, frame_y) = advertisement_from(keys_a(), "variant-y");
        let adv_y = decode_adv(&frame_y);

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..25 {
                        peer.update(&frame_x, &adv_x).unwrap();
                        peer.update(&frame_y, &adv_y).unwrap();
                    }
                });
            }
        });

        let name = peer.data()["name"].as_str().unwrap().to_string();
        assert!(name == "variant-x" || name == "variant-y");
    }
}
