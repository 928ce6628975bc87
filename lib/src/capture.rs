//! Stream-based sample decoding
//!
//! Raw spectral samples arrive one at a time from the receive path. There
//! are two main ways to work with them:
//!  - Load all of them from a dump file, then process as batch
//!  - Feed them into a `StreamBee`, which decodes them piece by piece on a
//!    background thread and forwards the results to a sink
//!
//! This module implements the latter.

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bilge::prelude::*;

use crate::parser::parse_sample;
use crate::sample::{DecodedSample, RxMetadata, ScanMode};

/// How long the harvester waits for a sample before re-checking the running flag.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A raw sample buffer as delivered by the receive path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSample {
    pub data: Vec<u8>,
    pub header: RxMetadata,
    pub timestamp: u64,
}

/// Shared cell holding the current scan mode.
///
/// Whoever configures the radio writes the mode here; the harvester reads it
/// once per sample and hands the plain value to the parser.
#[derive(Debug, Clone)]
pub struct ScanModeHandle(Arc<AtomicU8>);

impl ScanModeHandle {
    pub fn new(mode: ScanMode) -> Self {
        Self(Arc::new(AtomicU8::new(mode as u8)))
    }

    pub fn get(&self) -> ScanMode {
        ScanMode::from(u2::new(self.0.load(Ordering::SeqCst)))
    }

    pub fn set(&self, mode: ScanMode) {
        log::debug!("Switching spectral scan mode to {:?}", mode);
        self.0.store(mode as u8, Ordering::SeqCst);
    }
}

/// Counters of a harvesting run
#[derive(Debug, Default)]
pub struct HarvestStats {
    decoded: AtomicU64,
    dropped: AtomicU64,
}

impl HarvestStats {
    /// Number of samples decoded and forwarded
    pub fn decoded(&self) -> u64 {
        self.decoded.load(Ordering::Relaxed)
    }

    /// Number of samples that failed to decode
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// A sink to receive honey, i.e. decoded samples
pub enum HoneySink {
    Queue(Sender<DecodedSample>),
    Callback(Box<dyn FnMut(DecodedSample) + Send>),
}

impl HoneySink {
    /// Forward a sample; returns false once the sink can't take any more.
    ///
    /// A full queue is retried until it drains or `running` is cleared.
    fn deliver(&mut self, mut sample: DecodedSample, running: &AtomicBool) -> bool {
        match self {
            HoneySink::Queue(queue) => loop {
                match queue.send_timeout(sample, POLL_INTERVAL) {
                    Ok(()) => return true,
                    Err(SendTimeoutError::Timeout(pending)) => {
                        if !running.load(Ordering::SeqCst) {
                            log::trace!("Harvesting stopped while the sink queue was full");
                            return false;
                        }
                        sample = pending;
                    }
                    Err(SendTimeoutError::Disconnected(_)) => {
                        log::error!("Failed to forward sample to sink; Stopping collection.");
                        return false;
                    }
                }
            },
            HoneySink::Callback(callback) => {
                callback(sample);
                true
            }
        }
    }
}

/// Clears the running flag when the harvester exits, including by panic.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Decodes raw samples from a source queue and forwards them to a sink.
pub struct StreamBee {
    source: Option<Receiver<RawSample>>,
    mode: ScanModeHandle,
    honey_sink: Option<HoneySink>,
    running: Arc<AtomicBool>,
    stats: Arc<HarvestStats>,
    harvester: Option<JoinHandle<()>>,
}

impl StreamBee {
    /// Creates a bee reading raw samples from `source`.
    ///
    /// # Parameters
    /// - `source`: Queue the receive path pushes raw samples into
    /// - `mode`: Handle to the current scan mode
    pub fn new(source: Receiver<RawSample>, mode: ScanModeHandle) -> Self {
        log::trace!("Creating a streaming Bee in mode {:?}", mode.get());
        Self {
            source: Some(source),
            mode,
            honey_sink: None,
            running: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(HarvestStats::default()),
            harvester: None,
        }
    }

    /// Handle to the scan mode used for decoding
    pub fn mode(&self) -> ScanModeHandle {
        self.mode.clone()
    }

    /// Counters of the current harvesting run
    pub fn stats(&self) -> Arc<HarvestStats> {
        Arc::clone(&self.stats)
    }

    /// Whether the harvester thread is still working
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Registers a sink for decoded samples.
    ///
    /// - `HoneySink::Queue`: Samples are sent to an in-process queue for real-time handling.
    /// - `HoneySink::Callback`: Samples are handed to a closure on the harvester thread.
    ///
    /// Returns the sink back if one is already registered.
    pub fn subscribe_for_honey(&mut self, sink: HoneySink) -> Result<(), HoneySink> {
        if self.honey_sink.is_some() {
            return Err(sink);
        }
        self.honey_sink = Some(sink);
        Ok(())
    }

    /// Starts harvesting samples from the source queue
    ///
    /// Each raw sample is decoded with the scan mode current at that point.
    /// Samples that fail to decode are logged, counted and skipped.
    ///
    /// Harvesting continues until:
    /// - The source queue is disconnected and drained,
    /// - The sink hangs up, or
    /// - The `stop()` method is called.
    ///
    /// # Parameters
    /// * `print` - Whether to print decoded samples to stdout.
    pub fn start_harvesting(&mut self, print: bool) {
        let Some(source) = self.source.take() else {
            log::warn!("Harvesting already started; Ignoring.");
            return;
        };

        log::info!("Starting harvesting of spectral samples! εწз");
        self.running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.running);
        let mode = self.mode.clone();
        let stats = Arc::clone(&self.stats);
        let honey_sink = self.honey_sink.take();
        self.harvester = Some(thread::spawn(move || {
            harvest(source, mode, running, stats, honey_sink, print)
        }));
    }

    /// Blocks until the harvester is done, e.g. after the source is exhausted.
    pub fn join(&mut self) {
        if let Some(harvester) = self.harvester.take() {
            if let Err(e) = harvester.join() {
                log::error!("Couldn't join harvester thread. Error: {:?}", e);
            }
        }
    }

    /// Stops harvesting gracefully by setting `running` to `false`.
    ///
    /// # Note
    ///
    /// After invoking this function, the registered sink is dropped.
    pub fn stop(&mut self) {
        log::info!("Stopping harvesting of samples; Resetting sink as well.");
        self.running.store(false, Ordering::SeqCst);
        self.join();
        self.honey_sink = None;
    }
}

impl Drop for StreamBee {
    fn drop(&mut self) {
        if self.harvester.is_some() {
            self.stop();
        }
    }
}

/// Function to constantly read and decode samples
///
/// # Arguments
/// * `source` - Queue to read raw samples from
/// * `mode` - Current scan mode
/// * `running` - A shared flag to signalize harvesting to stop
/// * `stats` - Counters updated for every sample
/// * `honey_sink` - Optional sink for decoded samples
/// * `print` - Flag whether to print decoded samples to `stdout`.
fn harvest(
    source: Receiver<RawSample>,
    mode: ScanModeHandle,
    running: Arc<AtomicBool>,
    stats: Arc<HarvestStats>,
    mut honey_sink: Option<HoneySink>,
    print: bool,
) {
    let _guard = RunningGuard(Arc::clone(&running));

    while running.load(Ordering::SeqCst) {
        let raw = match source.recv_timeout(POLL_INTERVAL) {
            Ok(raw) => raw,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                log::trace!("Sample source disconnected");
                break;
            }
        };

        let sample = match parse_sample(&raw.data, mode.get(), &raw.header, raw.timestamp) {
            Ok(sample) => sample,
            Err(e) => {
                stats.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "Failed to decode sample at tsf {}. Skipping. Error: {}",
                    raw.timestamp,
                    e
                );
                continue;
            }
        };
        stats.decoded.fetch_add(1, Ordering::Relaxed);

        if print {
            println!(
                "Decoded sample:\n - timestamp: {}\n - mode: {:?}\n - max exponent: {}\n - bins: {:?}\n - radar: {:?}",
                sample.timestamp, sample.mode, sample.max_exponent, sample.bins, sample.radar
            );
        }

        if let Some(sink) = &mut honey_sink {
            if !sink.deliver(sample, &running) {
                break;
            }
        }
    }

    log::info!(
        "Sample harvesting completed! Decoded: {}, dropped: {}",
        stats.decoded(),
        stats.dropped()
    );
}
