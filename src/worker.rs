//! # Worker — Shard Search Loop Over a Bound Filter Chain
//!
//! A worker owns one c^z index per filter prime and reuses them across every
//! shard it runs. The indices dominate the worker's memory (one ~512 MiB
//! bitmap per production modulus) and take minutes to build, so the binding
//! is immutable: `Worker::new` builds the chain once, and the work loop
//! refuses any later configuration that differs.
//!
//! ## Per-Shard Filter
//!
//! For each point (a, x, b, y) from the cursor, and each modulus m in
//! declared order:
//!
//! ```text
//! r = (a^x mod m + b^y mod m) mod m       — two table reads, one subtract
//! reject the point on the first m with no c^z residue equal to r
//! ```
//!
//! A genuine a^x + b^y = c^z satisfies the congruence under every modulus,
//! so the chain never drops a counterexample; a non-solution survives k
//! independent 32-bit filters with probability around 2^(−32k). Survivors
//! are candidates for big-integer verification, nothing more.
//!
//! ## Memory Admission
//!
//! Before building anything, the combined bitmap footprint is checked
//! against the machine's available memory (`sysinfo`); a configuration that
//! does not fit is refused up front, before any shard is claimed.

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use std::sync::atomic::Ordering;
use std::time::Instant;
use sysinfo::System;
use tracing::info;

use crate::cursor::{Point, PointCursor};
use crate::cz_index::CzIndex;
use crate::progress::Progress;
use crate::search_params::SearchConfig;

pub struct Worker {
    config: SearchConfig,
    indices: Vec<CzIndex>,
}

impl Worker {
    /// Build one index per filter prime and bind to `config`.
    ///
    /// Index construction is parallel across primes (one rayon task each);
    /// the shard loop itself stays single-threaded.
    pub fn new(config: &SearchConfig) -> Result<Worker> {
        config.validate()?;
        refuse_if_oversized(config, available_memory_bytes())?;

        let started = Instant::now();
        let indices: Vec<CzIndex> = config
            .primes
            .par_iter()
            .map(|&m| {
                CzIndex::build(config.max_base, config.max_pow, m)
                    .with_context(|| format!("building index for modulus {m}"))
            })
            .collect::<Result<_>>()?;
        info!(
            primes = config.primes.len(),
            max_base = config.max_base,
            max_pow = config.max_pow,
            elapsed_secs = started.elapsed().as_secs(),
            "filter indices built"
        );

        Ok(Worker {
            config: config.clone(),
            indices,
        })
    }

    /// The configuration this worker is bound to.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// True iff every filter accepts the point's residue sum.
    #[inline]
    fn accepts(&self, p: &Point) -> bool {
        self.indices
            .iter()
            .all(|idx| idx.contains(idx.residue_sum(p.a, p.x, p.b, p.y)))
    }

    /// Run one shard to exhaustion and return its candidates in cursor
    /// order. Re-running the same shard yields an identical list.
    pub fn run_shard(&self, a_fixed: u32, progress: Option<&Progress>) -> Vec<Point> {
        let started = Instant::now();
        if let Some(p) = progress {
            p.set_current(&format!("shard {a_fixed}"));
        }

        let mut candidates = Vec::new();
        let mut probed: u64 = 0;
        for point in PointCursor::new(self.config.max_base, self.config.max_pow, a_fixed) {
            probed += 1;
            if self.accepts(&point) {
                candidates.push(point);
            }
        }

        if let Some(p) = progress {
            p.probed.fetch_add(probed, Ordering::Relaxed);
            p.candidates
                .fetch_add(candidates.len() as u64, Ordering::Relaxed);
            p.shards.fetch_add(1, Ordering::Relaxed);
        }
        info!(
            shard = a_fixed,
            probed,
            candidates = candidates.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "shard complete"
        );
        candidates
    }

    /// Witness (c, z) pairs for a candidate under the first filter modulus,
    /// recovered by linear scan. For reporting only.
    pub fn witnesses(&self, p: &Point) -> Vec<(u32, u32)> {
        let idx = &self.indices[0];
        idx.witnesses(idx.residue_sum(p.a, p.x, p.b, p.y))
    }
}

/// Available memory as reported by the OS. 0 means the probe could not
/// tell (containers without a memory controller report nothing useful).
fn available_memory_bytes() -> u64 {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.available_memory()
}

/// Refuse configurations whose bitmaps cannot fit in `available` bytes.
/// An `available` of 0 skips admission rather than refusing everything.
fn refuse_if_oversized(config: &SearchConfig, available: u64) -> Result<()> {
    let need = config.bitmap_total_bytes();
    if available > 0 && need > available {
        bail!(
            "filter indices need {} MiB of bitmaps but only {} MiB is available; \
             use fewer or smaller filter primes",
            need >> 20,
            available >> 20
        );
    }
    Ok(())
}
