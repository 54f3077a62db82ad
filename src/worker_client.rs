//! # Worker Client — HTTP Work Loop Against the Coordinator
//!
//! The worker side of shard coordination: claim a shard, run it to
//! completion, submit the candidates, repeat. Uses `ureq` (blocking HTTP) —
//! the worker is CPU-bound between RPCs and suspends only at the two
//! protocol boundaries.
//!
//! ## Data Flow
//!
//! ```text
//! GET  /api/v1/work    → WorkSpec { config, shard }   (204 = no work)
//! POST /api/v1/result  ← ResultSubmission { shard, candidates }
//! ```
//!
//! ## Configuration Binding
//!
//! The first work spec's configuration is the one the worker builds its
//! filter indices for. Any later spec that differs is a fatal mismatch:
//! rebuilding gigabytes of bitmaps mid-run is never worth it, so the
//! process exits and supervision can rebind it against the right search.
//!
//! ## Exhaustion
//!
//! A 204 means the a-axis is dispensed, not that the search is over —
//! other workers may still be running shards. The loop polls until the
//! queue stays empty through `idle_polls` consecutive polls, then exits 0.
//!
//! Submission is retried until it lands; the coordinator's duplicate check
//! makes redelivery safe.

use anyhow::{Context, Result};
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use crate::coordinator::{ResultSubmission, Shard, StatusResponse, WorkSpec};
use crate::cursor::Point;
use crate::progress::Progress;
use crate::worker::Worker;

/// Raised when the coordinator's configuration differs from the one this
/// worker bound to. Mapped to a dedicated exit code in main.
#[derive(Debug)]
pub struct ConfigMismatch {
    pub bound: String,
    pub offered: String,
}

impl fmt::Display for ConfigMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "coordinator offered a different search configuration \
             (bound: {}, offered: {})",
            self.bound, self.offered
        )
    }
}

impl std::error::Error for ConfigMismatch {}

pub struct CoordinatorClient {
    base_url: String,
    agent: ureq::Agent,
}

impl CoordinatorClient {
    pub fn new(coordinator_url: &str) -> CoordinatorClient {
        let agent = ureq::Agent::new_with_config(
            ureq::config::Config::builder()
                .timeout_connect(Some(Duration::from_secs(5)))
                .timeout_send_request(Some(Duration::from_secs(10)))
                .build(),
        );
        CoordinatorClient {
            base_url: coordinator_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    /// Claim the next shard. `None` when the coordinator answers 204.
    pub fn claim_work(&self) -> Result<Option<WorkSpec>> {
        let url = format!("{}/api/v1/work", self.base_url);
        let mut resp = self.agent.get(&url).call().context("claiming work")?;
        if resp.status() == 204 {
            return Ok(None);
        }
        let spec: WorkSpec = resp
            .body_mut()
            .read_json()
            .context("decoding work assignment")?;
        Ok(Some(spec))
    }

    /// Report a completed shard with its candidates.
    pub fn submit_result(&self, shard: Shard, candidates: &[Point]) -> Result<()> {
        let url = format!("{}/api/v1/result", self.base_url);
        let submission = ResultSubmission {
            shard,
            candidates: candidates.iter().map(|p| [p.a, p.x, p.b, p.y]).collect(),
        };
        self.agent
            .post(&url)
            .send_json(&submission)
            .with_context(|| format!("submitting result for shard {}", shard.a))?;
        Ok(())
    }

    /// Queue totals, for operators and tests.
    pub fn status(&self) -> Result<StatusResponse> {
        let url = format!("{}/api/v1/status", self.base_url);
        let mut resp = self.agent.get(&url).call().context("fetching status")?;
        let status = resp.body_mut().read_json().context("decoding status")?;
        Ok(status)
    }
}

pub struct WorkLoopOptions {
    pub poll_secs: u64,
    pub idle_polls: u32,
}

impl Default for WorkLoopOptions {
    fn default() -> Self {
        WorkLoopOptions {
            poll_secs: 10,
            idle_polls: 3,
        }
    }
}

/// Claim and run shards until the coordinator's queue stays exhausted.
pub fn run_work_loop(
    client: &CoordinatorClient,
    opts: &WorkLoopOptions,
    progress: &Arc<Progress>,
) -> Result<()> {
    let mut worker: Option<Worker> = None;
    let mut idle = 0u32;

    loop {
        let spec = match client.claim_work() {
            Ok(spec) => spec,
            Err(e) => {
                warn!(error = %e, "coordinator unreachable, retrying");
                thread::sleep(Duration::from_secs(opts.poll_secs));
                continue;
            }
        };

        let Some(spec) = spec else {
            idle += 1;
            if idle >= opts.idle_polls {
                info!("work queue exhausted, exiting");
                return Ok(());
            }
            thread::sleep(Duration::from_secs(opts.poll_secs));
            continue;
        };
        idle = 0;

        match &worker {
            Some(w) if w.config() != &spec.config => {
                return Err(ConfigMismatch {
                    bound: format!("{:?}", w.config()),
                    offered: format!("{:?}", spec.config),
                }
                .into());
            }
            Some(_) => {}
            None => {
                info!(
                    max_base = spec.config.max_base,
                    max_pow = spec.config.max_pow,
                    primes = ?spec.config.primes,
                    "binding to search configuration"
                );
                worker = Some(Worker::new(&spec.config)?);
            }
        }
        let bound = worker.as_ref().expect("worker bound for this spec");

        let candidates = bound.run_shard(spec.shard.a, Some(progress.as_ref()));

        // At-least-once: keep resubmitting until the coordinator confirms.
        // A redelivered completion is a no-op on the other side.
        loop {
            match client.submit_result(spec.shard, &candidates) {
                Ok(()) => break,
                Err(e) => {
                    warn!(shard = spec.shard.a, error = %e, "result submission failed, retrying");
                    thread::sleep(Duration::from_secs(opts.poll_secs));
                }
            }
        }
    }
}
