//! Discovery router: captures beacons, maintains the live peer table and
//! broadcasts the local advertisement.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use beaconnet_core::AdvMap;
use beaconnet_wifi::{unpack, Frame, SIGNATURE_ADDR_STR};

use crate::error::Result;
use crate::memory::Memory;
use crate::muxer::PacketMuxer;
use crate::peer::Peer;

/// Default live-peer expiry in seconds.
pub const DEFAULT_PEER_TTL_SECS: u64 = 1800;

const PRUNE_PERIOD: Duration = Duration::from_millis(500);

/// Invoked with a peer's fingerprint when it appears or expires.
pub type PeerCallback = Box<dyn Fn(&str, &Arc<Peer>) + Send + Sync>;

/// The mesh discovery engine.
///
/// Frames from peers flow in through the capture pipeline; valid signed
/// advertisements create or refresh entries in the live peer table, are
/// folded into durable [`Memory`], and peers silent for longer than the
/// TTL are pruned.
pub struct Router {
    local: Arc<Peer>,
    memory: Memory,
    peers: RwLock<HashMap<String, Arc<Peer>>>,
    ttl_secs: u64,
    on_new_peer: RwLock<Option<PeerCallback>>,
    on_peer_lost: RwLock<Option<PeerCallback>>,
    muxer: Mutex<Option<Arc<PacketMuxer>>>,
    pruner: Mutex<Option<JoinHandle<()>>>,
}

impl Router {
    /// Creates a transportless router over an opened [`Memory`]; frames
    /// can be fed directly with [`Router::handle_frame`].
    pub fn new(local: Arc<Peer>, memory: Memory, ttl_secs: u64) -> Arc<Self> {
        Arc::new(Self {
            local,
            memory,
            peers: RwLock::new(HashMap::new()),
            ttl_secs,
            on_new_peer: RwLock::new(None),
            on_peer_lost: RwLock::new(None),
            muxer: Mutex::new(None),
            pruner: Mutex::new(None),
        })
    }

    /// Attaches the router to `iface`: starts the beacon capture pipeline,
    /// the stale-peer pruner and the local advertiser. Must be called from
    /// a tokio runtime.
    pub fn start(self: &Arc<Self>, iface: &str, workers: usize) -> Result<()> {
        let filter = format!(
            "type mgt subtype beacon and ether src {}",
            SIGNATURE_ADDR_STR
        );
        let muxer = Arc::new(PacketMuxer::open(iface, &filter, workers)?);

        let router = Arc::clone(self);
        muxer.start(Arc::new(move |data| {
            if let Err(e) = router.handle_frame(&data) {
                debug!("dropping frame: {}", e);
            }
        }));
        *self.muxer.lock().unwrap() = Some(muxer);

        let router = Arc::clone(self);
        let pruner = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(PRUNE_PERIOD);
            loop {
                ticker.tick().await;
                router.prune_stale();
            }
        });
        *self.pruner.lock().unwrap() = Some(pruner);

        self.local.start_advertising(iface, workers)?;
        self.local.advertise(true);

        info!("router started on {} (ttl {}s)", iface, self.ttl_secs);
        Ok(())
    }

    /// Processes one captured frame: parse, drop our own broadcasts and
    /// anything not addressed to everyone, decode the advertisement and
    /// create or update the peer.
    pub fn handle_frame(&self, data: &[u8]) -> Result<()> {
        let frame = Frame::parse(data)?;
        if frame.dot11.source == *self.local.session_id().as_bytes() {
            return Ok(());
        }
        if !frame.is_broadcast() {
            return Ok(());
        }

        let payload = unpack(&frame)?;
        let adv: AdvMap = serde_json::from_slice(&payload)?;

        let existing = adv
            .get("identity")
            .and_then(serde_json::Value::as_str)
            .and_then(|fingerprint| self.peers.read().unwrap().get(fingerprint).cloned());

        match existing {
            Some(peer) => {
                if let Err(e) = peer.update(&frame, &adv) {
                    warn!("error updating peer {}: {}", peer.id(), e);
                }
                Ok(())
            }
            None => {
                let peer = Peer::from_frame(&frame, &adv)?;
                self.register_peer(peer);
                Ok(())
            }
        }
    }

    fn register_peer(&self, peer: Arc<Peer>) {
        info!("detected new peer {}", peer.id());
        if let Err(e) = self.memory.track(&peer) {
            error!("could not persist peer {}: {}", peer.fingerprint(), e);
        }
        self.peers
            .write()
            .unwrap()
            .insert(peer.fingerprint().to_string(), Arc::clone(&peer));

        if let Some(callback) = self.on_new_peer.read().unwrap().as_ref() {
            callback(peer.fingerprint(), &peer);
        }
    }

    /// Removes peers silent for longer than the TTL; returns how many were
    /// dropped.
    pub fn prune_stale(&self) -> usize {
        let stale: Vec<Arc<Peer>> = {
            let peers = self.peers.read().unwrap();
            peers
                .values()
                .filter(|peer| peer.inactive_for() > self.ttl_secs as f64)
                .cloned()
                .collect()
        };
        if stale.is_empty() {
            return 0;
        }

        {
            let mut peers = self.peers.write().unwrap();
            for peer in &stale {
                peers.remove(peer.fingerprint());
            }
        }

        for peer in &stale {
            warn!(
                "peer {} lost after {:.0}s of silence",
                peer.id(),
                peer.inactive_for()
            );
            if let Some(callback) = self.on_peer_lost.read().unwrap().as_ref() {
                callback(peer.fingerprint(), peer);
            }
        }
        stale.len()
    }

    /// Registers the new-peer callback.
    pub fn on_new_peer(&self, callback: PeerCallback) {
        *self.on_new_peer.write().unwrap() = Some(callback);
    }

    /// Registers the peer-lost callback.
    pub fn on_peer_lost(&self, callback: PeerCallback) {
        *self.on_peer_lost.write().unwrap() = Some(callback);
    }

    /// The local peer.
    pub fn local(&self) -> &Arc<Peer> {
        &self.local
    }

    /// The durable store.
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Snapshots the live peer table.
    pub fn peers(&self) -> Vec<Arc<Peer>> {
        self.peers.read().unwrap().values().cloned().collect()
    }

    /// One live peer by fingerprint.
    pub fn peer(&self, fingerprint: &str) -> Option<Arc<Peer>> {
        self.peers.read().unwrap().get(fingerprint).cloned()
    }

    /// Stops the advertiser, the pruner and the capture pipeline.
    pub async fn stop(&self) {
        self.local.advertise(false);
        self.local.stop_advertising();

        if let Some(pruner) = self.pruner.lock().unwrap().take() {
            pruner.abort();
        }

        let muxer = self.muxer.lock().unwrap().take();
        if let Some(muxer) = muxer {
            muxer.stop().await;
        }
        info!("router stopped");
    }
}
