//! Persistent peer memory, one JSON file per fingerprint.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::peer::Peer;
use crate::record::PeerRecord;

/// Durable store of every peer ever tracked.
///
/// Records survive restarts; [`Memory::track`] folds a live sighting into
/// the historical record and pushes the merged history back into the live
/// peer so the encounter counter keeps growing across re-discoveries.
pub struct Memory {
    path: PathBuf,
    peers: Mutex<HashMap<String, PeerRecord>>,
}

impl Memory {
    /// Opens the store at `path`, creating the directory if needed and
    /// loading every `*.json` record. Corrupt records are skipped with a
    /// warning, never fatal.
    pub fn open(path: &Path) -> Result<Self> {
        fs::create_dir_all(path)?;

        let mut peers = HashMap::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let file = entry.path();
            if file.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match fs::read(&file).map_err(|e| e.to_string()).and_then(|raw| {
                serde_json::from_slice::<PeerRecord>(&raw).map_err(|e| e.to_string())
            }) {
                Ok(record) => {
                    peers.insert(record.fingerprint.clone(), record);
                }
                Err(e) => warn!("skipping corrupt peer record {}: {}", file.display(), e),
            }
        }

        info!("loaded {} peer records from {}", peers.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            peers: Mutex::new(peers),
        })
    }

    /// Records an encounter with a live peer and persists the merged
    /// record.
    ///
    /// For a known peer the original `met_at` is carried forward, the
    /// encounter counter keeps increasing and the last `seen_at` becomes
    /// `prev_seen_at`. The merged history is written back into the live
    /// peer before persisting.
    pub fn track(&self, peer: &Peer) -> Result<()> {
        let mut peers = self.peers.lock().unwrap();

        let fresh = peer.record();
        let record = match peers.get(&fresh.fingerprint) {
            Some(known) => {
                debug!(
                    "updating peer {} ({} encounters)",
                    fresh.fingerprint, known.encounters
                );
                peer.apply_encounter(
                    known.met_at,
                    known.encounters.saturating_add(1),
                    known.seen_at,
                    fresh.seen_at,
                );
                peer.record()
            }
            None => {
                debug!("tracking new peer {}", fresh.fingerprint);
                peer.apply_encounter(fresh.seen_at, 1, fresh.seen_at, fresh.seen_at);
                peer.record()
            }
        };

        let file = self.path.join(format!("{}.json", record.fingerprint));
        fs::write(&file, serde_json::to_vec_pretty(&record)?)?;
        peers.insert(record.fingerprint.clone(), record);
        Ok(())
    }

    /// Number of remembered peers.
    pub fn size(&self) -> usize {
        self.peers.lock().unwrap().len()
    }

    /// The record of one peer, if remembered.
    pub fn of(&self, fingerprint: &str) -> Option<PeerRecord> {
        self.peers.lock().unwrap().get(fingerprint).cloned()
    }

    /// Snapshots every remembered record.
    pub fn list(&self) -> Vec<PeerRecord> {
        self.peers.lock().unwrap().values().cloned().collect()
    }
}
