//! # Coordinator — Shard Dispatch and Candidate Collection Hub
//!
//! Runs an Axum HTTP server that partitions the a-axis into single-value
//! shards, hands them to workers, and appends surviving candidates to the
//! append-only result log.
//!
//! ## Architecture
//!
//! ```text
//! Workers ── GET  /api/v1/work ───→ next unassigned shard + search config
//!         ── POST /api/v1/result ─→ shard completion + candidate batch
//! Anyone  ── GET  /api/v1/status ─→ queue totals, for operators
//! ```
//!
//! ## State Management
//!
//! One mutex guards the shard queue and the log handle together; the
//! duplicate-completion check, the log append and the sync happen inside a
//! single critical section, which is what makes `POST /api/v1/result`
//! idempotent under at-least-once delivery. The append fsyncs while the
//! mutex is held, so every handler takes the lock on a `spawn_blocking`
//! thread — a slow disk stalls at most the blocking pool, never the async
//! workers serving other claims.
//!
//! A completion for an already-completed shard is a logged no-op. A failed
//! log write leaves the shard incomplete, answers 500, and shuts the server
//! down — the coordinator aborts rather than silently dropping candidates.
//! When the last shard completes, the server drains and exits 0.

use anyhow::{bail, Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::cursor::Point;
use crate::result_log::ResultLog;
use crate::search_params::SearchConfig;

/// Candidate batches can get large on dense shards.
const MAX_RESULT_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Lock a mutex, recovering from poisoning. If a previous holder panicked,
/// we still get access to the data — the alternative is crashing the server.
fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The a-axis as a work queue: shard i is a_fixed = i, i ∈ [1, max_base].
/// Dispensed in ascending order, each at most once; completions are
/// recorded at most once.
pub struct ShardQueue {
    max_base: u32,
    next: u32,
    dispensed: u32,
    completed: Vec<bool>,
    completed_count: u32,
}

impl ShardQueue {
    pub fn new(max_base: u32) -> ShardQueue {
        ShardQueue {
            max_base,
            next: 1,
            dispensed: 0,
            completed: vec![false; max_base as usize + 1],
            completed_count: 0,
        }
    }

    /// Next unassigned shard, or `None` once the axis is exhausted.
    pub fn dispense(&mut self) -> Option<u32> {
        if self.next > self.max_base {
            return None;
        }
        let a = self.next;
        self.next += 1;
        self.dispensed += 1;
        Some(a)
    }

    pub fn is_completed(&self, a: u32) -> bool {
        a >= 1 && a <= self.max_base && self.completed[a as usize]
    }

    /// Record a completion. Returns false if the shard was already
    /// complete or out of range.
    pub fn complete(&mut self, a: u32) -> bool {
        if a < 1 || a > self.max_base || self.completed[a as usize] {
            return false;
        }
        self.completed[a as usize] = true;
        self.completed_count += 1;
        true
    }

    pub fn all_complete(&self) -> bool {
        self.completed_count == self.max_base
    }

    pub fn totals(&self) -> (u32, u32, u32) {
        (self.max_base, self.dispensed, self.completed_count)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shard {
    pub a: u32,
}

/// Wire shape of `GET /api/v1/work`: the shard plus the full search
/// configuration, carried by value so the worker can check compatibility.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkSpec {
    #[serde(flatten)]
    pub config: SearchConfig,
    pub shard: Shard,
}

/// Wire shape of `POST /api/v1/result`. Candidates travel as bare
/// [a, x, b, y] quadruples.
#[derive(Serialize, Deserialize)]
pub struct ResultSubmission {
    pub shard: Shard,
    pub candidates: Vec<[u32; 4]>,
}

#[derive(Serialize, Deserialize)]
pub struct StatusResponse {
    pub shards_total: u32,
    pub shards_dispensed: u32,
    pub shards_completed: u32,
    pub candidates_logged: u64,
}

struct CoordinatorState {
    queue: ShardQueue,
    log: ResultLog,
    candidates_logged: u64,
}

pub struct AppState {
    config: SearchConfig,
    state: Mutex<CoordinatorState>,
    shutdown_tx: watch::Sender<bool>,
    fatal: AtomicBool,
}

impl AppState {
    pub fn new(config: SearchConfig, log: ResultLog) -> (Arc<AppState>, watch::Receiver<bool>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let queue = ShardQueue::new(config.max_base);
        (
            Arc::new(AppState {
                config,
                state: Mutex::new(CoordinatorState {
                    queue,
                    log,
                    candidates_logged: 0,
                }),
                shutdown_tx,
                fatal: AtomicBool::new(false),
            }),
            shutdown_rx,
        )
    }

    pub fn log_write_failed(&self) -> bool {
        self.fatal.load(Ordering::Relaxed)
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/work", get(handler_work))
        .route("/api/v1/result", post(handler_result))
        .route("/api/v1/status", get(handler_status))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(RequestBodyLimitLayer::new(MAX_RESULT_BODY_BYTES))
        .with_state(state)
}

async fn handler_work(State(state): State<Arc<AppState>>) -> Response {
    // contends on the same mutex the fsync path holds
    let spec = tokio::task::spawn_blocking(move || {
        let mut guard = lock_or_recover(&state.state);
        let a = guard.queue.dispense()?;
        info!(shard = a, "dispensed shard");
        Some(WorkSpec {
            config: state.config.clone(),
            shard: Shard { a },
        })
    })
    .await;
    match spec {
        Ok(Some(spec)) => Json(spec).into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!(error = %e, "work dispatch task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn handler_result(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<ResultSubmission>,
) -> Response {
    let a = submission.shard.a;
    if a < 1 || a > state.config.max_base {
        warn!(shard = a, "completion for shard outside the search range");
        return StatusCode::BAD_REQUEST.into_response();
    }

    let candidates: Vec<Point> = submission
        .candidates
        .iter()
        .map(|&[a, x, b, y]| Point { a, x, b, y })
        .collect();

    // The whole critical section syncs to disk; run it on a blocking thread.
    let total = state.config.max_base;
    let outcome = tokio::task::spawn_blocking(move || {
        let mut guard = lock_or_recover(&state.state);
        if guard.queue.is_completed(a) {
            // at-least-once delivery: a retried completion is a no-op
            info!(shard = a, "duplicate completion ignored");
            return StatusCode::OK;
        }

        // Append before marking complete: a failed write must leave the
        // shard incomplete so a retry can land the candidates.
        if let Err(e) = guard.log.append(&candidates) {
            error!(shard = a, error = %e, "result log write failed, shutting down");
            state.fatal.store(true, Ordering::Relaxed);
            let _ = state.shutdown_tx.send(true);
            return StatusCode::INTERNAL_SERVER_ERROR;
        }

        guard.queue.complete(a);
        guard.candidates_logged += candidates.len() as u64;
        info!(
            shard = a,
            candidates = candidates.len(),
            completed = guard.queue.totals().2,
            total,
            "shard completed"
        );

        if guard.queue.all_complete() {
            info!("all shards complete, shutting down");
            let _ = state.shutdown_tx.send(true);
        }
        StatusCode::OK
    })
    .await;

    match outcome {
        Ok(code) => code.into_response(),
        Err(e) => {
            error!(error = %e, "completion task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn handler_status(State(state): State<Arc<AppState>>) -> Response {
    let status = tokio::task::spawn_blocking(move || {
        let guard = lock_or_recover(&state.state);
        let (total, dispensed, completed) = guard.queue.totals();
        StatusResponse {
            shards_total: total,
            shards_dispensed: dispensed,
            shards_completed: completed,
            candidates_logged: guard.candidates_logged,
        }
    })
    .await;
    match status {
        Ok(status) => Json(status).into_response(),
        Err(e) => {
            error!(error = %e, "status task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Serve the coordinator until the a-axis is exhausted (exit Ok), the
/// process is interrupted (Ok), or a log write fails (Err).
pub async fn run(config: SearchConfig, output: &Path, listen: &str) -> Result<()> {
    config.validate()?;
    let log = ResultLog::open(output)?;
    let (state, mut shutdown_rx) = AppState::new(config.clone(), log);

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("binding coordinator to {listen}"))?;
    info!(
        addr = %listener.local_addr()?,
        shards = config.max_base,
        primes = ?config.primes,
        output = %output.display(),
        "coordinator listening"
    );

    let app = router(Arc::clone(&state));
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received, shutting down");
                }
                _ = shutdown_rx.changed() => {}
            }
        })
        .await
        .context("coordinator server error")?;

    if state.log_write_failed() {
        bail!("aborted: result log write failed; completed shards remain persisted");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispenses_each_shard_once_ascending() {
        let mut q = ShardQueue::new(3);
        assert_eq!(q.dispense(), Some(1));
        assert_eq!(q.dispense(), Some(2));
        assert_eq!(q.dispense(), Some(3));
        assert_eq!(q.dispense(), None);
        assert_eq!(q.dispense(), None);
    }

    #[test]
    fn completion_is_recorded_once() {
        let mut q = ShardQueue::new(3);
        q.dispense();
        assert!(q.complete(1));
        assert!(!q.complete(1));
        assert!(q.is_completed(1));
        assert!(!q.is_completed(2));
    }

    #[test]
    fn out_of_range_completion_is_rejected() {
        let mut q = ShardQueue::new(3);
        assert!(!q.complete(0));
        assert!(!q.complete(4));
        assert!(!q.is_completed(0));
        assert!(!q.is_completed(4));
    }

    #[test]
    fn all_complete_requires_every_shard() {
        let mut q = ShardQueue::new(2);
        assert!(!q.all_complete());
        q.complete(1);
        assert!(!q.all_complete());
        q.complete(2);
        assert!(q.all_complete());
    }

    #[test]
    fn work_spec_wire_shape_is_flat() {
        let spec = WorkSpec {
            config: SearchConfig {
                max_base: 10,
                max_pow: 5,
                primes: vec![97],
            },
            shard: Shard { a: 7 },
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["max_base"], 10);
        assert_eq!(json["max_pow"], 5);
        assert_eq!(json["primes"][0], 97);
        assert_eq!(json["shard"]["a"], 7);
        let back: WorkSpec = serde_json::from_value(json).unwrap();
        assert_eq!(back, spec);
    }
}
