//! Advisory Worker - serialized FIFO processing of advisory jobs

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::AdvisoryComposer;
use crate::engine::EngineCommand;
use crate::types::{FleetSnapshot, RequestId};

/// One queued advisory request
#[derive(Debug, Clone)]
pub struct AdvisoryJob {
    pub request_id: RequestId,
    pub text: String,
}

/// Processes advisory jobs one at a time, in submission order.
///
/// Holds only a weak sender to the engine mailbox: the worker never keeps
/// the engine alive, and stops as soon as it notices the engine is gone.
pub struct AdvisoryWorker {
    jobs: mpsc::Receiver<AdvisoryJob>,
    engine: mpsc::WeakSender<EngineCommand>,
    composer: Arc<dyn AdvisoryComposer>,
    latency: Duration,
}

impl AdvisoryWorker {
    pub fn new(
        jobs: mpsc::Receiver<AdvisoryJob>,
        engine: mpsc::WeakSender<EngineCommand>,
        composer: Arc<dyn AdvisoryComposer>,
        latency: Duration,
    ) -> Self {
        Self {
            jobs,
            engine,
            composer,
            latency,
        }
    }

    /// Run until the job queue closes or the engine is torn down.
    pub async fn run(mut self) {
        info!(
            composer = self.composer.composer_name(),
            latency_ms = self.latency.as_millis() as u64,
            "AdvisoryWorker starting"
        );

        while let Some(job) = self.jobs.recv().await {
            let request_id = job.request_id;
            if !self.process(job).await {
                debug!(request = %request_id, "Engine gone, advisory discarded");
                break;
            }
        }

        info!("AdvisoryWorker stopped");
    }

    /// Returns `false` once the engine can no longer be reached.
    async fn process(&self, job: AdvisoryJob) -> bool {
        debug!(request = %job.request_id, "Advisory job started");
        tokio::time::sleep(self.latency).await;

        let Some(snapshot) = self.fetch_snapshot().await else {
            return false;
        };

        let result = self.composer.compose(&job.text, &snapshot).await;
        if let Err(e) = &result {
            warn!(request = %job.request_id, error = %e, "Advisory composition failed");
        }

        let Some(engine) = self.engine.upgrade() else {
            return false;
        };
        engine
            .send(EngineCommand::AdvisoryComplete {
                request_id: job.request_id,
                result,
            })
            .await
            .is_ok()
    }

    /// Fleet snapshot as of now, or `None` if the engine is gone.
    async fn fetch_snapshot(&self) -> Option<Arc<FleetSnapshot>> {
        let engine = self.engine.upgrade()?;
        let (response_tx, response_rx) = oneshot::channel();
        engine
            .send(EngineCommand::Snapshot { response_tx })
            .await
            .ok()?;
        drop(engine);
        response_rx.await.ok()
    }
}
