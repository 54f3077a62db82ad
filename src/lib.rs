//! # Bealreach — Core Library
//!
//! Distributed residue-filtered search for counterexamples to Beal's
//! Conjecture: tuples (a, x, b, y, c, z) with x, y, z ≥ 3 and
//! a^x + b^y = c^z where the bases share no prime factor. The search space
//! is far too large for big-integer arithmetic, so the engine replaces
//! exact equality with conjunctive equality of residues under several
//! 32-bit primes and hands the rare survivors to exact verification.
//!
//! ## Module Organization
//!
//! **Engine modules** (the probabilistic search core):
//! - [`arith`] — modular exponentiation, binary GCD, 32-bit Miller–Rabin
//! - [`cz_index`] — per-prime c^z residue table + membership bitmap
//! - [`cursor`] — deterministic enumeration of one shard's (a, x, b, y) points
//! - [`worker`] — the filter chain: one index per prime, short-circuit probing
//!
//! **Infrastructure modules** (coordination, persistence, verification):
//! - [`coordinator`] — Axum server dispensing shards and logging candidates
//! - [`worker_client`] — blocking HTTP work loop against the coordinator
//! - [`result_log`] — append-only `a x b y` candidate log
//! - [`search_params`] — the (max_base, max_pow, primes) contract
//! - [`progress`] — atomic counters + background status reporter
//! - [`verify`] — exact big-integer re-check of logged candidates
//!
//! ## Design Philosophy
//!
//! The pipeline is **enumerate → filter → log → verify**. Filtering is
//! one-sided: a genuine a^x + b^y = c^z satisfies the congruence under
//! every modulus, so no counterexample is ever dropped; false positives
//! are expected at roughly 2^(−32k) for k filter primes and die in the
//! verification pass. Workers are long-lived because their per-prime
//! bitmaps (~512 MiB each) take minutes to build; the a-axis is the unit
//! of distribution and each shard re-runs deterministically.

pub mod arith;
pub mod coordinator;
pub mod cursor;
pub mod cz_index;
pub mod progress;
pub mod result_log;
pub mod search_params;
pub mod verify;
pub mod worker;
pub mod worker_client;
