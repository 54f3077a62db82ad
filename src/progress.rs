//! # Progress — Atomic Search Progress Counters
//!
//! Thread-safe progress tracking shared between the shard search loop and
//! the background status reporter. Counters are atomics; the only Mutex
//! guards the current-shard string, which changes once per shard.
//!
//! The probe rate is far too high for per-point atomic updates, so the
//! search loop adds its point count once per completed shard.
//!
//! ## Background Reporter
//!
//! A dedicated thread prints progress to stderr every 30 seconds: probed
//! points, probe rate, candidates emitted, shards completed. Shuts down
//! cleanly via the `shutdown` atomic flag.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub struct Progress {
    /// Points pushed through the filter chain.
    pub probed: AtomicU64,
    /// Points that survived every filter.
    pub candidates: AtomicU64,
    /// Shards run to completion.
    pub shards: AtomicU64,
    pub current: Mutex<String>,
    start: Instant,
    shutdown: AtomicBool,
}

impl Progress {
    pub fn new() -> Arc<Self> {
        Arc::new(Progress {
            probed: AtomicU64::new(0),
            candidates: AtomicU64::new(0),
            shards: AtomicU64::new(0),
            current: Mutex::new(String::new()),
            start: Instant::now(),
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn set_current(&self, label: &str) {
        *self.current.lock().unwrap() = label.to_string();
    }

    pub fn start_reporter(self: &Arc<Self>) -> thread::JoinHandle<()> {
        let progress = Arc::clone(self);
        thread::spawn(move || loop {
            thread::sleep(Duration::from_secs(30));
            if progress.shutdown.load(Ordering::Relaxed) {
                break;
            }
            progress.print_status();
        })
    }

    pub fn print_status(&self) {
        let elapsed = self.start.elapsed();
        let probed = self.probed.load(Ordering::Relaxed);
        let candidates = self.candidates.load(Ordering::Relaxed);
        let shards = self.shards.load(Ordering::Relaxed);
        let current = self.current.lock().unwrap().clone();
        let rate = if elapsed.as_secs() > 0 {
            probed as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        let h = elapsed.as_secs() / 3600;
        let m = (elapsed.as_secs() % 3600) / 60;
        let s = elapsed.as_secs() % 60;
        eprintln!(
            "[{:02}:{:02}:{:02}] {} | probed: {} | {:.0}/s | candidates: {} | shards done: {}",
            h, m, s, current, probed, rate, candidates, shards
        );
    }

    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}
