//! Periodic channel hopping.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::interface;

/// Cycles the interface through `channels` at a fixed period. Returns the
/// hopper task handle; abort it to stop hopping. Must be called from a
/// tokio runtime.
pub fn channel_hopper(iface: &str, channels: Vec<u32>, period_ms: u64) -> JoinHandle<()> {
    let iface = iface.to_string();
    let mut channels = channels;
    channels.sort_unstable();
    channels.dedup();

    tokio::spawn(async move {
        if channels.is_empty() {
            error!("no channels to hop on {}", iface);
            return;
        }
        info!(
            "hopping on {} channels every {}ms on {}",
            channels.len(),
            period_ms,
            iface
        );

        let mut ticker = tokio::time::interval(Duration::from_millis(period_ms));
        for channel in channels.iter().cycle() {
            ticker.tick().await;
            debug!("hopping to channel {}", channel);
            if let Err(e) = interface::set_channel(&iface, *channel) {
                error!("could not set channel {} on {}: {}", channel, iface, e);
            }
        }
    })
}
