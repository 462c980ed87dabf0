//! Policy Cache driver
//!
//! Runs a concurrent workload against one cache built from the environment
//! and reports the outcome.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use policy_cache::{Cache, Config};

/// Main entry point for the driver.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache (starts the expiration daemon for tlru)
/// 4. Run the workers until they finish or Ctrl+C is received
/// 5. Report cache size, and again after one expiration period if enabled
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "policy_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting policy cache driver");

    let config = Config::from_env();
    info!(
        "Configuration loaded: policy={}, capacity={}, expiration={}ms, workers={}, operations={}",
        config.policy, config.capacity, config.expiration_ms, config.workers, config.operations
    );

    let cache: Arc<Cache<u64, u64>> =
        Arc::new(Cache::from_config(&config).context("failed to build cache")?);
    let key_space = (config.capacity as u64).saturating_mul(2).max(1);

    let started = Instant::now();
    let mut workers = JoinSet::new();
    for worker in 0..config.workers as u64 {
        workers.spawn(run_worker(
            cache.clone(),
            worker,
            config.operations,
            key_space,
        ));
    }

    tokio::select! {
        result = collect_hits(&mut workers) => {
            let hits = result?;
            info!(
                "Workload finished in {:?}: hits={}, len={}, cap={}",
                started.elapsed(),
                hits,
                cache.len().await,
                cache.cap().await
            );
        }
        _ = signal::ctrl_c() => {
            warn!("Received Ctrl+C, aborting workload");
            return Ok(());
        }
    }

    if cache.daemon_started() {
        tokio::time::sleep(cache.expiration() * 2).await;
        info!("After expiration: len={}", cache.len().await);
    }

    Ok(())
}

/// Waits for every worker and sums their hits.
async fn collect_hits(workers: &mut JoinSet<u64>) -> anyhow::Result<u64> {
    let mut hits = 0;
    while let Some(result) = workers.join_next().await {
        hits += result.context("driver worker failed")?;
    }
    Ok(hits)
}

/// Deterministic mix of adds, promoting reads, peeks and removals.
async fn run_worker(
    cache: Arc<Cache<u64, u64>>,
    worker: u64,
    operations: usize,
    key_space: u64,
) -> u64 {
    let mut hits = 0;
    for op in 0..operations as u64 {
        let key = worker
            .wrapping_mul(7919)
            .wrapping_add(op.wrapping_mul(31))
            % key_space;
        match op % 8 {
            0..=3 => {
                cache.add(key, op).await;
            }
            4 | 5 => {
                if cache.get(&key).await.is_some() {
                    hits += 1;
                }
            }
            6 => {
                if cache.peek(&key).await.is_some() {
                    hits += 1;
                }
            }
            _ => {
                cache.remove(&key).await;
            }
        }
    }
    debug!(worker, hits, "Driver worker finished");
    hits
}
