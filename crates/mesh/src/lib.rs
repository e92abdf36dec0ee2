//! Peer-to-peer mesh discovery over raw 802.11 beacon frames.
//!
//! Nodes periodically broadcast beacon frames from a fixed signature
//! transmit address, carrying a signed JSON advertisement in vendor
//! information elements. A [`Router`] captures those beacons in monitor
//! mode, verifies senders against their advertised public key, maintains
//! a TTL-bound live peer table and persists every encounter in [`Memory`].

pub mod error;
pub mod hopping;
pub mod interface;
pub mod memory;
pub mod muxer;
pub mod peer;
pub mod record;
pub mod router;
pub mod session;

pub use error::{MeshError, Result};
pub use hopping::channel_hopper;
pub use memory::Memory;
pub use muxer::{FrameCallback, PacketMuxer};
pub use peer::{Peer, DEFAULT_ADV_PERIOD_MS};
pub use record::PeerRecord;
pub use router::{PeerCallback, Router, DEFAULT_PEER_TTL_SECS};
pub use session::SessionId;
