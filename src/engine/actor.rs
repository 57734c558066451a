//! Fleet Engine actor - single writer for all fleet state

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::events::{FleetEvent, Subscribers};
use super::handle::EngineHandle;
use super::EngineError;
use crate::advisory::{AdvisoryComposer, AdvisoryError, AdvisoryJob, AdvisoryReply, AdvisoryWorker};
use crate::config::{defaults, ClassifierThresholds, DemoOverlayConfig, FarmConfig, InstrumentRanges};
use crate::mode::{Mode, ModeController, WriteOutcome};
use crate::processing::summarize;
use crate::store::{EntityStore, FleetWrite};
use crate::types::{
    AdvisoryMessage, FleetSnapshot, FleetState, MessageId, RequestId, UnitId,
};

// ============================================================================
// Commands
// ============================================================================

/// Commands for FleetEngine
#[derive(Debug)]
pub enum EngineCommand {
    /// Apply (or journal, under the demo overlay) one write
    Write {
        write: FleetWrite,
        response_tx: oneshot::Sender<Result<(), EngineError>>,
    },
    /// Flip between live and demo; responds with the new `demo_active`
    ToggleDemo {
        response_tx: oneshot::Sender<Result<bool, EngineError>>,
    },
    /// Record a question and queue it for the advisory worker
    SubmitAdvisory {
        text: String,
        response_tx: oneshot::Sender<Result<RequestId, EngineError>>,
    },
    /// Current published snapshot
    Snapshot {
        response_tx: oneshot::Sender<Arc<FleetSnapshot>>,
    },
    /// Delivered by the advisory worker, in submission order
    AdvisoryComplete {
        request_id: RequestId,
        result: Result<AdvisoryReply, AdvisoryError>,
    },
    Shutdown,
}

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub ranges: InstrumentRanges,
    pub thresholds: ClassifierThresholds,
    pub overlay: DemoOverlayConfig,
    pub advisory_latency: Duration,
    pub advisory_queue_capacity: usize,
    pub mailbox_capacity: usize,
}

impl EngineSettings {
    pub fn from_config(config: &FarmConfig) -> Self {
        Self {
            ranges: config.instrument_ranges.clone(),
            thresholds: config.thresholds.clone(),
            overlay: config.demo.clone(),
            advisory_latency: Duration::from_millis(config.advisory.latency_ms),
            advisory_queue_capacity: config.advisory.queue_capacity.max(1),
            mailbox_capacity: defaults::ENGINE_MAILBOX_CAPACITY,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&FarmConfig::default())
    }
}

// ============================================================================
// Fleet Engine
// ============================================================================

pub struct FleetEngine {
    rx: mpsc::Receiver<EngineCommand>,
    store: EntityStore,
    mode: ModeController,
    /// Queue feeding the advisory worker
    jobs: mpsc::Sender<AdvisoryJob>,
    job_capacity: usize,
    /// Append-only advisory log
    messages: Vec<AdvisoryMessage>,
    next_message_id: u64,
    next_request_id: u64,
    /// Requests submitted but not yet completed, with the units they mark
    /// `Analyzing`. Non-empty means thinking.
    in_flight: HashMap<RequestId, Vec<UnitId>>,
    /// Outstanding requests per analyzed unit
    analyzing: HashMap<UnitId, usize>,
    published: Arc<ArcSwap<FleetSnapshot>>,
    version: u64,
    subscribers: Arc<Subscribers>,
    /// Events raised since the last publish, delivered right after it
    outbox: Vec<FleetEvent>,
}

impl FleetEngine {
    /// Spawn the engine and its advisory worker with the active configuration.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(state: FleetState, composer: Arc<dyn AdvisoryComposer>) -> EngineHandle {
        Self::spawn_with(state, EngineSettings::from_config(crate::config::current()), composer)
    }

    pub fn spawn_with(
        state: FleetState,
        settings: EngineSettings,
        composer: Arc<dyn AdvisoryComposer>,
    ) -> EngineHandle {
        let (tx, rx) = mpsc::channel(settings.mailbox_capacity.max(1));
        let (job_tx, job_rx) = mpsc::channel(settings.advisory_queue_capacity);

        let worker = AdvisoryWorker::new(job_rx, tx.downgrade(), composer, settings.advisory_latency);

        let greeting = AdvisoryMessage::system_event(MessageId(1), None, defaults::ADVISORY_GREETING);
        let mut store = EntityStore::with_ranges(state, settings.ranges).with_thresholds(settings.thresholds);
        let changed = store.reclassify_all();
        if !changed.is_empty() {
            debug!(changed = changed.len(), "Fleet reclassified with engine thresholds");
        }
        let initial = Arc::new(FleetSnapshot {
            version: 0,
            state: store.state().clone(),
            summary: summarize(store.state(), false),
            thinking: false,
            messages: vec![greeting.clone()],
        });
        let published = Arc::new(ArcSwap::new(initial));
        let subscribers = Arc::new(Subscribers::default());

        let engine = Self {
            rx,
            store,
            mode: ModeController::new(settings.overlay),
            jobs: job_tx,
            job_capacity: settings.advisory_queue_capacity,
            messages: vec![greeting],
            next_message_id: 2,
            next_request_id: 1,
            in_flight: HashMap::new(),
            analyzing: HashMap::new(),
            published: Arc::clone(&published),
            version: 0,
            subscribers: Arc::clone(&subscribers),
            outbox: Vec::new(),
        };

        tokio::spawn(worker.run());
        tokio::spawn(engine.run());

        EngineHandle::new(tx, published, subscribers)
    }

    /// Run the actor loop until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        info!(units = self.store.state().units.len(), "FleetEngine starting");

        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                EngineCommand::Write { write, response_tx } => {
                    let result = self.handle_write(write);
                    let _ = response_tx.send(result);
                }
                EngineCommand::ToggleDemo { response_tx } => {
                    let result = self.handle_toggle();
                    let _ = response_tx.send(result);
                }
                EngineCommand::SubmitAdvisory { text, response_tx } => {
                    let result = self.handle_submit(text);
                    let _ = response_tx.send(result);
                }
                EngineCommand::Snapshot { response_tx } => {
                    let _ = response_tx.send(self.published.load_full());
                }
                EngineCommand::AdvisoryComplete { request_id, result } => {
                    self.handle_completion(request_id, result);
                }
                EngineCommand::Shutdown => {
                    info!("FleetEngine shutdown requested");
                    break;
                }
            }
        }

        info!(
            pending_advisories = self.in_flight.len(),
            messages = self.messages.len(),
            "FleetEngine stopped"
        );
    }

    // ========================================================================
    // Writes & Mode
    // ========================================================================

    fn handle_write(&mut self, write: FleetWrite) -> Result<(), EngineError> {
        let score_before = self.health_score();

        let outcome = self.mode.write(&mut self.store, write.clone())?;
        if let WriteOutcome::Applied(Some(change)) = outcome {
            self.emit(FleetEvent::StatusChanged(change));
        }
        if !matches!(write, FleetWrite::HealthScore(_) | FleetWrite::Reclassify(_)) {
            self.emit(FleetEvent::ReadingApplied(write));
        }
        self.emit_score_change(score_before);

        self.publish();
        Ok(())
    }

    fn handle_toggle(&mut self) -> Result<bool, EngineError> {
        let score_before = self.health_score();

        let transition = self.mode.toggle(&mut self.store)?;
        info!(mode = %transition.mode, replayed = transition.replayed.len(), "Mode changed");

        self.emit(FleetEvent::ModeChanged {
            mode: transition.mode,
        });
        for change in transition.replayed {
            self.emit(FleetEvent::StatusChanged(change));
        }
        self.emit_score_change(score_before);

        self.publish();
        Ok(transition.mode == Mode::Demo)
    }

    fn health_score(&self) -> f64 {
        self.store.state().scalars.health_score
    }

    fn emit_score_change(&mut self, before: f64) {
        let score = self.health_score();
        if score != before {
            self.emit(FleetEvent::HealthScoreChanged { score });
        }
    }

    // ========================================================================
    // Advisory
    // ========================================================================

    fn handle_submit(&mut self, text: String) -> Result<RequestId, EngineError> {
        if text.trim().is_empty() {
            return Err(AdvisoryError::EmptyRequest.into());
        }

        let request_id = RequestId(self.next_request_id);
        let job = AdvisoryJob {
            request_id,
            text: text.clone(),
        };
        match self.jobs.try_send(job) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(capacity = self.job_capacity, "Advisory queue full, request rejected");
                return Err(AdvisoryError::QueueFull(self.job_capacity).into());
            }
            Err(mpsc::error::TrySendError::Closed(_)) => return Err(EngineError::Closed),
        }
        self.next_request_id += 1;

        let message = AdvisoryMessage::user(self.next_message_id(), request_id, text.as_str());
        self.append_message(message);

        let was_thinking = !self.in_flight.is_empty();
        let marked = self.mark_mentioned_units(&text);
        info!(request = %request_id, analyzing = marked.len(), "Advisory request submitted");
        self.in_flight.insert(request_id, marked);
        if !was_thinking {
            self.emit(FleetEvent::ThinkingChanged { thinking: true });
        }

        self.publish();
        Ok(request_id)
    }

    /// Mark every unit named in `text` as `Analyzing`. Live mode only.
    fn mark_mentioned_units(&mut self, text: &str) -> Vec<UnitId> {
        if self.mode.is_demo() {
            return Vec::new();
        }
        let lowered = text.to_lowercase();
        let mentioned: Vec<UnitId> = self
            .store
            .state()
            .units
            .iter()
            .filter(|u| lowered.contains(&u.name.to_lowercase()))
            .map(|u| u.id)
            .collect();

        for &id in &mentioned {
            *self.analyzing.entry(id).or_insert(0) += 1;
            if let Ok(Some(change)) = self.store.mark_analyzing(id) {
                self.emit(FleetEvent::StatusChanged(change));
            }
        }
        mentioned
    }

    fn handle_completion(&mut self, request_id: RequestId, result: Result<AdvisoryReply, AdvisoryError>) {
        let Some(units) = self.in_flight.remove(&request_id) else {
            warn!(request = %request_id, "Completion for unknown advisory request ignored");
            return;
        };

        let id = self.next_message_id();
        let message = match result {
            Ok(reply) => AdvisoryMessage::response(id, request_id, reply.text, reply.reasoning),
            Err(e) => {
                warn!(request = %request_id, error = %e, "Advisory unavailable");
                AdvisoryMessage::system_event(id, Some(request_id), defaults::ADVISORY_UNAVAILABLE)
            }
        };
        self.append_message(message);

        for unit_id in units {
            self.release_analyzing(unit_id);
        }

        info!(request = %request_id, pending = self.in_flight.len(), "Advisory request completed");
        if self.in_flight.is_empty() {
            self.emit(FleetEvent::ThinkingChanged { thinking: false });
        }
        self.publish();
    }

    /// Drop one outstanding request on `unit_id`; the last one reclassifies.
    fn release_analyzing(&mut self, unit_id: UnitId) {
        let remaining = match self.analyzing.get_mut(&unit_id) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => 0,
        };
        if remaining > 0 {
            return;
        }
        self.analyzing.remove(&unit_id);

        match self.mode.write(&mut self.store, FleetWrite::Reclassify(unit_id)) {
            Ok(WriteOutcome::Applied(Some(change))) => self.emit(FleetEvent::StatusChanged(change)),
            Ok(_) => {}
            Err(e) => debug!(unit = %unit_id, error = %e, "Reclassification after analysis skipped"),
        }
    }

    fn next_message_id(&mut self) -> MessageId {
        let id = MessageId(self.next_message_id);
        self.next_message_id += 1;
        id
    }

    fn append_message(&mut self, message: AdvisoryMessage) {
        self.messages.push(message.clone());
        self.emit(FleetEvent::AdvisoryMessage(message));
    }

    // ========================================================================
    // Publication
    // ========================================================================

    /// Queue an event for delivery after the next [`publish`](Self::publish).
    fn emit(&mut self, event: FleetEvent) {
        self.outbox.push(event);
    }

    /// Publish a new snapshot, then notify subscribers of the queued events.
    ///
    /// Callbacks that read through an [`EngineHandle`] see the state the
    /// events describe.
    fn publish(&mut self) {
        self.version += 1;
        let thinking = !self.in_flight.is_empty();
        let state = self.store.state();
        let snapshot = FleetSnapshot {
            version: self.version,
            state: state.clone(),
            summary: summarize(state, thinking),
            thinking,
            messages: self.messages.clone(),
        };
        self.published.store(Arc::new(snapshot));
        debug!(version = self.version, "Snapshot published");

        for event in std::mem::take(&mut self.outbox) {
            self.subscribers.notify(&event);
        }
    }
}
