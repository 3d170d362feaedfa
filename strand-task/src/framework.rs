//! Manipulation of the task framework itself.
//!
//! Normally the task module user does not need to care
//! about building the runtime, the entrypoint does it,
//! so we move it to a submodule to avoid overwhelming
//! them.

use anyhow::{Context, Result};
use std::cmp::{max, min};
use std::num::NonZeroUsize;
use tokio::runtime::{Handle, Runtime};

/// Environment variable overriding the worker count.
pub const WORKER_THREADS_ENV: &str = "STRAND_WORKER_THREADS";

/// Configuration for the task framework.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub min_worker_threads: Option<usize>,
    pub max_worker_threads: Option<usize>,
    pub num_worker_threads: Option<usize>,
}

impl Config {
    /// Default configuration, with the worker count
    /// taken from `STRAND_WORKER_THREADS` when set.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        if let Ok(value) = std::env::var(WORKER_THREADS_ENV) {
            let num = value
                .trim()
                .parse::<usize>()
                .with_context(|| format!("invalid {WORKER_THREADS_ENV}: {value:?}"))?;
            cfg.num_worker_threads = Some(num);
        }
        Ok(cfg)
    }

    /// Resolve the worker count against the number
    /// of CPUs available to the process.
    pub fn worker_threads(&self, available: usize) -> usize {
        let mut num_workers = max(1, available);
        if let Some(min_worker_threads) = self.min_worker_threads {
            num_workers = max(min_worker_threads, num_workers);
        }
        if let Some(max_worker_threads) = self.max_worker_threads {
            num_workers = min(max_worker_threads, num_workers);
        }
        if let Some(num_worker_threads) = self.num_worker_threads {
            num_workers = num_worker_threads;
        }
        max(1, num_workers)
    }
}

/// Task framework initialization status.
#[derive(Debug, Clone, Copy)]
pub struct Status {
    worker_threads: usize,
}

impl Status {
    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }
}

/// Initialized framework handle.
///
/// This handle owns the runtime every logical flow
/// of the application is multiplexed on. Dropping it
/// shuts the runtime down, cancelling whatever task
/// is still pending.
pub struct Framework {
    runtime: Runtime,
    status: Status,
}

impl Framework {
    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn handle(&self) -> &Handle {
        self.runtime.handle()
    }

    /// Run a future to completion on the runtime,
    /// blocking the current thread.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// Initialize the task framework.
pub fn initialize(cfg: Config) -> Result<Framework> {
    let available = std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    let worker_threads = cfg.worker_threads(available);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .thread_name("strand-worker")
        .enable_all()
        .build()?;
    tracing::debug!(worker_threads, "task framework initialized");
    Ok(Framework {
        runtime,
        status: Status { worker_threads },
    })
}
