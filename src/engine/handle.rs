//! Engine Handle - the only way in or out of the engine

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use super::events::{FleetEvent, Subscribers, SubscriptionId};
use super::{EngineCommand, EngineError};
use crate::store::{FleetWrite, StoreError};
use crate::types::{
    AdvisoryMessage, ConnectionStatus, FleetMetric, FleetSnapshot, FleetSummary, Metric, RequestId,
    Unit, UnitId,
};

/// Handle to interact with the FleetEngine.
///
/// Reads are synchronous and served from the last published snapshot. Writes
/// are acknowledged once the engine has applied (or journaled) them.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineCommand>,
    snapshot: Arc<ArcSwap<FleetSnapshot>>,
    subscribers: Arc<Subscribers>,
}

impl EngineHandle {
    pub(super) fn new(
        tx: mpsc::Sender<EngineCommand>,
        snapshot: Arc<ArcSwap<FleetSnapshot>>,
        subscribers: Arc<Subscribers>,
    ) -> Self {
        Self {
            tx,
            snapshot,
            subscribers,
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// The last published snapshot.
    pub fn snapshot(&self) -> Arc<FleetSnapshot> {
        self.snapshot.load_full()
    }

    pub fn list_units(&self) -> Vec<Unit> {
        self.snapshot.load().state.units.clone()
    }

    pub fn get_unit(&self, id: UnitId) -> Result<Unit, EngineError> {
        self.snapshot
            .load()
            .state
            .unit(id)
            .cloned()
            .ok_or(EngineError::Store(StoreError::NotFound(id)))
    }

    pub fn fleet_summary(&self) -> FleetSummary {
        self.snapshot.load().summary.clone()
    }

    /// The advisory log, oldest first.
    pub fn messages(&self) -> Vec<AdvisoryMessage> {
        self.snapshot.load().messages.clone()
    }

    pub fn is_thinking(&self) -> bool {
        self.snapshot.load().thinking
    }

    pub fn is_demo_active(&self) -> bool {
        self.snapshot.load().state.demo_active
    }

    /// Whether the engine is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    // ========================================================================
    // Writes
    // ========================================================================

    pub async fn apply_reading(
        &self,
        unit_id: UnitId,
        metric: Metric,
        value: f64,
        at: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        self.write(FleetWrite::Reading {
            unit_id,
            metric,
            value,
            at,
        })
        .await
    }

    pub async fn set_connection_status(
        &self,
        unit_id: UnitId,
        status: ConnectionStatus,
        at: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        self.write(FleetWrite::ConnectionStatus { unit_id, status, at })
            .await
    }

    pub async fn apply_fleet_reading(&self, metric: FleetMetric, value: f64) -> Result<(), EngineError> {
        self.write(FleetWrite::FleetReading { metric, value }).await
    }

    /// Store a new fleet health score, clamped to [0, 100].
    pub async fn set_health_score(&self, score: f64) -> Result<(), EngineError> {
        self.write(FleetWrite::HealthScore(score)).await
    }

    pub async fn set_financials(&self, revenue: f64, cost: f64) -> Result<(), EngineError> {
        self.write(FleetWrite::Financials { revenue, cost }).await
    }

    pub async fn set_auto_manage_all(&self, enabled: bool) -> Result<(), EngineError> {
        self.write(FleetWrite::AutoManageAll(enabled)).await
    }

    async fn write(&self, write: FleetWrite) -> Result<(), EngineError> {
        self.request(|response_tx| EngineCommand::Write { write, response_tx })
            .await
    }

    /// Flip live/demo. Returns whether demo mode is now active.
    pub async fn toggle_demo_mode(&self) -> Result<bool, EngineError> {
        self.request(|response_tx| EngineCommand::ToggleDemo { response_tx })
            .await
    }

    /// Record a question and queue it. The answer arrives later in the log.
    pub async fn submit_advisory(&self, text: impl Into<String>) -> Result<RequestId, EngineError> {
        let text = text.into();
        self.request(|response_tx| EngineCommand::SubmitAdvisory { text, response_tx })
            .await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<T, EngineError>>) -> EngineCommand,
    ) -> Result<T, EngineError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(command(response_tx))
            .await
            .map_err(|_| EngineError::Closed)?;
        response_rx.await.map_err(|_| EngineError::Closed)?
    }

    /// Stop the engine. Pending advisories are discarded.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        self.tx
            .send(EngineCommand::Shutdown)
            .await
            .map_err(|_| EngineError::Closed)
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Register a callback for every [`FleetEvent`].
    ///
    /// Callbacks run on the engine task and must not block.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&FleetEvent) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(Arc::new(callback))
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }
}
