use std::io::Write;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::config::RunConfiguration;
use crate::metrics::{Collector, FinalReport};
use crate::request::{FetchOutcome, RequestDescriptor};
use crate::worker_pool::{Executable, WorkerPool};

/// Runs `config.requests` fetches through one worker per executor and collects
/// every outcome. Progress lines go to `out`.
#[instrument(
    skip_all,
    fields(url = %config.url, workers = executors.len(), requests = config.requests)
)]
pub async fn run<E, W>(
    config: &RunConfiguration,
    executors: Vec<E>,
    out: W,
) -> anyhow::Result<FinalReport>
where
    E: Executable,
    W: Write,
{
    let start = Instant::now();
    let (intake_tx, intake_rx) = mpsc::channel::<RequestDescriptor>(config.requests);
    let (outtake_tx, mut outtake_rx) = mpsc::channel::<FetchOutcome>(config.requests);

    let pool = WorkerPool::spawn(executors, intake_rx, outtake_tx);
    info!("{} workers started", pool.size());

    // the intake holds every descriptor, so dispatching never waits on a worker
    let descriptor = RequestDescriptor::new(&config.url);
    for _ in 0..config.requests {
        if intake_tx.send(descriptor.clone()).await.is_err() {
            warn!("intake closed before every request was dispatched");
            break;
        }
    }
    drop(intake_tx);

    let mut collector = Collector::new(config.verbosity, config.snapshot_interval, out);
    let mut received = 0;
    while received < config.requests {
        let Some(outcome) = outtake_rx.recv().await else {
            break;
        };
        collector.observe(received, &outcome)?;
        received += 1;
    }
    pool.join().await;

    let observed = collector.statistics().observed();
    if observed != config.requests {
        warn!(observed, expected = config.requests, "some requests produced no result");
    }
    info!("collected {} results in {:?}", observed, start.elapsed());
    Ok(collector
        .into_statistics()
        .final_report(&config.url, config.requests))
}
