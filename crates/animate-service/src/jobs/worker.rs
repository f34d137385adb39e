//! Background tasks: the render worker pool and the expiry janitor.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, Instrument};

use animate_store::Store;

use super::pipeline::process_job;
use crate::state::AppState;

/// How often expired job progress is purged.
const JANITOR_INTERVAL: Duration = Duration::from_secs(300);

/// Spawn `config.worker_concurrency` workers pulling from the state's queue.
///
/// Workers run until their tasks are aborted. Each holds a state clone, and
/// so a queue sender, which keeps the queue open for as long as they run.
#[must_use]
pub fn spawn_workers(state: &AppState) -> Vec<JoinHandle<()>> {
    let count = state.config.worker_concurrency.max(1);
    info!(workers = count, "starting render workers");

    (0..count)
        .map(|worker| {
            let state = state.clone();
            tokio::spawn(
                async move {
                    while let Some(job) = state.queue.next().await {
                        debug!(job_id = %job.id, "picked up job");
                        process_job(&state, job).await;
                    }
                    debug!("queue closed, worker stopping");
                }
                .instrument(tracing::info_span!("worker", worker)),
            )
        })
        .collect()
}

/// Spawn the task that periodically deletes expired job progress and results.
#[must_use]
pub fn spawn_janitor(state: &AppState) -> JoinHandle<()> {
    let store = state.store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(JANITOR_INTERVAL);
        loop {
            interval.tick().await;
            match store.purge_expired(Utc::now()) {
                Ok(0) => {}
                Ok(purged) => info!(purged, "purged expired job entries"),
                Err(e) => error!(error = %e, "failed to purge expired job entries"),
            }
        }
    })
}
