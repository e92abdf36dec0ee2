//! Monitor-mode packet capture and injection.
//!
//! A [`PacketMuxer`] owns one pcap handle on a monitor interface. A
//! dedicated OS thread pulls packets off the capture (pcap reads block, so
//! they never sit on the async runtime) and feeds a bounded channel drained
//! by a pool of worker tasks, each invoking the frame callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use pcap::{Active, Capture};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::{MeshError, Result};
use crate::interface;

const SNAP_LEN: i32 = 65536;
const READ_TIMEOUT_MS: i32 = 100;
const WRITE_ATTEMPTS: usize = 5;
const WRITE_BACKOFF: Duration = Duration::from_millis(200);
const QUEUE_DEPTH: usize = 512;

/// Invoked once per captured packet with the raw bytes, radiotap included.
pub type FrameCallback = Arc<dyn Fn(Vec<u8>) + Send + Sync>;

struct Pipeline {
    reader: thread::JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

/// Shared capture/injection handle for one interface.
pub struct PacketMuxer {
    iface: String,
    // pcap handles are Send but not Sync; the short read timeout bounds
    // how long a writer can wait on this lock.
    capture: Arc<Mutex<Capture<Active>>>,
    workers: usize,
    running: Arc<AtomicBool>,
    pipeline: Mutex<Option<Pipeline>>,
}

impl PacketMuxer {
    /// Opens `iface` in monitor mode and attaches `filter` (empty for
    /// none). If activation fails because the interface is down, it is
    /// brought up and the open is retried once.
    pub fn open(iface: &str, filter: &str, workers: usize) -> Result<Self> {
        let mut capture = match Self::activate(iface) {
            Ok(capture) => capture,
            Err(e) if e.to_string().contains("not up") => {
                warn!("interface {} is down, bringing it up", iface);
                interface::activate(iface)?;
                Self::activate(iface).map_err(|e| MeshError::Capture {
                    iface: iface.to_string(),
                    reason: e.to_string(),
                })?
            }
            Err(e) => {
                return Err(MeshError::Capture {
                    iface: iface.to_string(),
                    reason: e.to_string(),
                })
            }
        };

        if !filter.is_empty() {
            debug!("setting '{}' as bpf filter on {}", filter, iface);
            capture
                .filter(filter, true)
                .map_err(|e| MeshError::Capture {
                    iface: iface.to_string(),
                    reason: e.to_string(),
                })?;
        }

        let workers = if workers == 0 {
            std::thread::available_parallelism()
                .map(usize::from)
                .unwrap_or(1)
        } else {
            workers
        };

        Ok(Self {
            iface: iface.to_string(),
            capture: Arc::new(Mutex::new(capture)),
            workers,
            running: Arc::new(AtomicBool::new(false)),
            pipeline: Mutex::new(None),
        })
    }

    fn activate(iface: &str) -> std::result::Result<Capture<Active>, pcap::Error> {
        Capture::from_device(iface)?
            .rfmon(true)
            .snaplen(SNAP_LEN)
            .timeout(READ_TIMEOUT_MS)
            .open()
    }

    /// Injects one raw frame, retrying briefly while the device signals
    /// transient unavailability.
    pub async fn write(&self, data: &[u8]) -> Result<()> {
        for attempt in 1..=WRITE_ATTEMPTS {
            let result = {
                let mut capture = self.capture.lock().unwrap();
                capture.sendpacket(data)
            };
            match result {
                Ok(()) => return Ok(()),
                Err(e) if e.to_string().contains("temporarily unavailable") => {
                    debug!(
                        "{} busy on write attempt {}/{}, retrying",
                        self.iface, attempt, WRITE_ATTEMPTS
                    );
                    tokio::time::sleep(WRITE_BACKOFF).await;
                }
                Err(e) => return Err(MeshError::Injection(e.to_string())),
            }
        }
        Err(MeshError::Injection(format!(
            "{} still unavailable after {} attempts",
            self.iface, WRITE_ATTEMPTS
        )))
    }

    /// Starts the capture pipeline: one reader thread and `workers` tasks
    /// running `callback`. Must be called from a tokio runtime.
    pub fn start(&self, callback: FrameCallback) {
        let mut slot = self.pipeline.lock().unwrap();
        if slot.is_some() {
            return;
        }
        self.running.store(true, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel::<Vec<u8>>(QUEUE_DEPTH);

        let capture = Arc::clone(&self.capture);
        let running = Arc::clone(&self.running);
        let iface = self.iface.clone();
        let reader = thread::spawn(move || {
            debug!("capture reader for {} started", iface);
            while running.load(Ordering::SeqCst) {
                let packet = {
                    let mut capture = capture.lock().unwrap();
                    match capture.next_packet() {
                        Ok(packet) => Some(packet.data.to_vec()),
                        Err(pcap::Error::TimeoutExpired) => None,
                        Err(e) => {
                            error!("capture read error on {}: {}", iface, e);
                            None
                        }
                    }
                };
                if let Some(data) = packet {
                    if tx.blocking_send(data).is_err() {
                        break;
                    }
                }
            }
            debug!("capture reader for {} stopped", iface);
        });

        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let mut workers = Vec::with_capacity(self.workers);
        for n in 0..self.workers {
            let rx = Arc::clone(&rx);
            let callback = Arc::clone(&callback);
            workers.push(tokio::spawn(async move {
                debug!("capture worker {} started", n);
                loop {
                    let data = { rx.lock().await.recv().await };
                    match data {
                        Some(data) => callback(data),
                        None => break,
                    }
                }
                debug!("capture worker {} stopped", n);
            }));
        }

        *slot = Some(Pipeline { reader, workers });
    }

    /// Stops the pipeline and drains it fully before returning.
    pub async fn stop(&self) {
        let pipeline = self.pipeline.lock().unwrap().take();
        let Some(pipeline) = pipeline else { return };

        self.running.store(false, Ordering::SeqCst);
        let reader = pipeline.reader;
        match tokio::task::spawn_blocking(move || reader.join()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => error!("capture reader thread panicked"),
            Err(e) => error!("capture reader join failed: {}", e),
        }
        // the reader dropped its sender; workers exit once the queue drains
        for worker in pipeline.workers {
            if let Err(e) = worker.await {
                if !e.is_cancelled() {
                    error!("capture worker failed: {}", e);
                }
            }
        }
    }

    /// The interface this muxer is bound to.
    pub fn interface(&self) -> &str {
        &self.iface
    }
}
