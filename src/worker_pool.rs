use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::request::{FetchOutcome, RequestDescriptor};

/// Something that turns a descriptor into exactly one outcome.
#[async_trait]
pub trait Executable: Send + Sync + 'static {
    async fn execute(&self, request: &RequestDescriptor) -> FetchOutcome;
}

/// Receiving end of the intake, shared by every worker.
type Intake = Arc<Mutex<mpsc::Receiver<RequestDescriptor>>>;

struct Worker<E> {
    id: usize,
    executor: E,
    intake: Intake,
    outtake: mpsc::Sender<FetchOutcome>,
}

impl<E: Executable> Worker<E> {
    async fn start(self) {
        info!("starting worker: {}", self.id);
        let mut handled = 0_usize;
        loop {
            // the lock is only held while waiting for the next descriptor
            let next = self.intake.lock().await.recv().await;
            let Some(request) = next else {
                break;
            };
            let outcome = self.executor.execute(&request).await;
            if self.outtake.send(outcome).await.is_err() {
                warn!(worker = self.id, "outtake closed, stopping");
                break;
            }
            handled += 1;
        }
        debug!(worker = self.id, handled, "intake drained");
    }
}

/// A fixed set of fetch loops fed from one intake and draining into one outtake.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns one worker per executor. Workers stop once `intake` is closed and
    /// empty; the outtake closes when the last of them is gone.
    pub fn spawn<E: Executable>(
        executors: Vec<E>,
        intake: mpsc::Receiver<RequestDescriptor>,
        outtake: mpsc::Sender<FetchOutcome>,
    ) -> Self {
        let intake = Arc::new(Mutex::new(intake));
        let handles = executors
            .into_iter()
            .enumerate()
            .map(|(id, executor)| {
                let worker = Worker {
                    id,
                    executor,
                    intake: intake.clone(),
                    outtake: outtake.clone(),
                };
                tokio::spawn(worker.start())
            })
            .collect();
        Self { handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    pub async fn join(self) {
        for (id, result) in join_all(self.handles).await.into_iter().enumerate() {
            if let Err(e) = result {
                warn!(worker = id, error = %e, "worker did not finish cleanly");
            }
        }
    }
}
