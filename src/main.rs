//! # Main — CLI Entry Point
//!
//! Routes CLI subcommands to the coordinator server, the worker loop, the
//! standalone single-machine search, and the exact verification pass.
//!
//! ## Subcommands
//!
//! - `coordinate` — serve shards over HTTP and collect candidates.
//! - `work` — claim and run shards against a coordinator endpoint.
//! - `search` — coordinator-less search on one machine (in-process queue).
//! - `verify` — big-integer re-check of a result log.
//!
//! ## Exit Codes
//!
//! 0 on success (including queue exhaustion), 2 when a worker refuses a
//! mismatched search configuration, 1 for everything else fatal —
//! including a coordinator result-log write failure.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use bealreach::coordinator;
use bealreach::progress::Progress;
use bealreach::result_log::ResultLog;
use bealreach::search_params::SearchConfig;
use bealreach::verify;
use bealreach::worker::Worker;
use bealreach::worker_client::{ConfigMismatch, CoordinatorClient, WorkLoopOptions};

#[derive(Parser)]
#[command(
    name = "bealreach",
    about = "Distributed residue-filtered search for Beal's Conjecture counterexamples"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the coordinator: dispense a-shards, collect candidates
    Coordinate {
        /// Largest base for a, b and c
        #[arg(long)]
        max_base: u32,
        /// Largest exponent for x, y and z
        #[arg(long)]
        max_pow: u32,
        /// Filter primes, most discriminating first (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        primes: Vec<u32>,
        /// Append-only candidate log
        #[arg(long, default_value = "candidates.log")]
        output: PathBuf,
        /// Listen address
        #[arg(long, default_value = "0.0.0.0:7101")]
        listen: String,
    },
    /// Run a worker against a coordinator
    Work {
        /// Coordinator endpoint, e.g. http://coordinator:7101
        #[arg(long, env = "BEALREACH_COORDINATOR")]
        coordinator: String,
        /// Seconds between polls when the queue is empty or unreachable
        #[arg(long, default_value_t = 10)]
        poll_secs: u64,
        /// Consecutive empty polls before the worker exits
        #[arg(long, default_value_t = 3)]
        idle_polls: u32,
    },
    /// Run the whole search on this machine, no coordinator
    Search {
        /// Largest base for a, b and c
        #[arg(long)]
        max_base: u32,
        /// Largest exponent for x, y and z
        #[arg(long)]
        max_pow: u32,
        /// Filter primes, most discriminating first (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        primes: Vec<u32>,
        /// Append-only candidate log
        #[arg(long, default_value = "candidates.log")]
        output: PathBuf,
    },
    /// Re-check logged candidates with exact big-integer arithmetic
    Verify {
        /// Result log produced by a search run
        #[arg(long)]
        log: PathBuf,
        /// max_base of the search that produced the log
        #[arg(long)]
        max_base: u32,
        /// max_pow of the search that produced the log
        #[arg(long)]
        max_pow: u32,
    },
}

fn main() -> ExitCode {
    // Structured logging: LOG_FORMAT=json for fleet aggregation,
    // human-readable on stderr otherwise
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt().json().with_target(false).init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.downcast_ref::<ConfigMismatch>().is_some() => {
            error!("{e:#}");
            ExitCode::from(2)
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Coordinate {
            max_base,
            max_pow,
            primes,
            output,
            listen,
        } => {
            let config = SearchConfig::new(max_base, max_pow, primes)?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(coordinator::run(config, &output, &listen))
        }
        Commands::Work {
            coordinator,
            poll_secs,
            idle_polls,
        } => {
            let client = CoordinatorClient::new(&coordinator);
            let opts = WorkLoopOptions {
                poll_secs,
                idle_polls,
            };
            let progress = Progress::new();
            let reporter = progress.start_reporter();
            let result = bealreach::worker_client::run_work_loop(&client, &opts, &progress);
            progress.stop();
            drop(reporter);
            progress.print_status();
            result
        }
        Commands::Search {
            max_base,
            max_pow,
            primes,
            output,
        } => {
            let config = SearchConfig::new(max_base, max_pow, primes)?;
            let mut log = ResultLog::open(&output)?;
            let worker = Worker::new(&config)?;
            let progress = Progress::new();
            let reporter = progress.start_reporter();
            for a in 1..=config.max_base {
                let candidates = worker.run_shard(a, Some(progress.as_ref()));
                log.append(&candidates)?;
            }
            progress.stop();
            drop(reporter);
            progress.print_status();
            Ok(())
        }
        Commands::Verify {
            log,
            max_base,
            max_pow,
        } => {
            let summary = verify::verify_log(&log, max_base, max_pow)?;
            for (p, c, z) in &summary.counterexamples {
                println!("{}^{} + {}^{} = {}^{}", p.a, p.x, p.b, p.y, c, z);
            }
            println!(
                "checked {} candidates: {} coincidences, {} counterexamples",
                summary.checked,
                summary.coincidences,
                summary.counterexamples.len()
            );
            Ok(())
        }
    }
}
