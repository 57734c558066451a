//! Change notifications and the subscriber registry

use std::sync::{Arc, Mutex, PoisonError};

use crate::mode::Mode;
use crate::store::{FleetWrite, StatusChange};
use crate::types::AdvisoryMessage;

/// Something observable changed inside the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum FleetEvent {
    /// A data write was accepted (reading, link state, fleet reading,
    /// financials or auto-manage flag)
    ReadingApplied(FleetWrite),
    StatusChanged(StatusChange),
    ModeChanged { mode: Mode },
    HealthScoreChanged { score: f64 },
    ThinkingChanged { thinking: bool },
    AdvisoryMessage(AdvisoryMessage),
}

/// Token returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

type Callback = Arc<dyn Fn(&FleetEvent) + Send + Sync>;

#[derive(Default)]
struct Table {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, Callback)>,
}

/// Shared between the actor (which notifies) and every handle (which
/// subscribes).
#[derive(Default)]
pub(crate) struct Subscribers {
    table: Mutex<Table>,
}

impl Subscribers {
    pub(crate) fn subscribe(&self, callback: Callback) -> SubscriptionId {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.next_id += 1;
        let id = SubscriptionId(table.next_id);
        table.callbacks.push((id, callback));
        id
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let before = table.callbacks.len();
        table.callbacks.retain(|(sid, _)| *sid != id);
        table.callbacks.len() != before
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .callbacks
            .len()
    }

    /// Call every subscriber with `event`.
    ///
    /// Callbacks run outside the lock, so a callback may subscribe or
    /// unsubscribe without deadlocking.
    pub(crate) fn notify(&self, event: &FleetEvent) {
        let callbacks: Vec<Callback> = {
            let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            table.callbacks.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        for callback in callbacks {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_subscribe_notify_unsubscribe() {
        let subscribers = Subscribers::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = subscribers.subscribe(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let event = FleetEvent::ThinkingChanged { thinking: true };
        subscribers.notify(&event);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(subscribers.unsubscribe(id));
        assert!(!subscribers.unsubscribe(id));
        subscribers.notify(&event);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(subscribers.len(), 0);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let subscribers = Subscribers::default();
        let a = subscribers.subscribe(Arc::new(|_| {}));
        subscribers.unsubscribe(a);
        let b = subscribers.subscribe(Arc::new(|_| {}));
        assert_ne!(a, b);
    }
}
