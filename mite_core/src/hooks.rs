/**
 * Fault hub — the "fault observed" entry point.
 *
 * Host-runtime hook installation (panic hooks, task supervisors, FFI
 * crash handlers) is a collaborator concern; whatever the host intercepts
 * is raised here as a `FaultEvent`. Subscribers are invoked in
 * registration order and a subscriber can never suppress the event for
 * those registered after it — a panicking subscriber is contained and the
 * dispatch continues.
 *
 * The hub also owns the rejection tracker: a process-wide counter that
 * assigns each rejection-style fault the id correlating it to its origin.
 */
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};

use crate::protocol::types::Fault;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/**
 * Where a fault came from.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOrigin {
    /// An uncaught exception (a panic, in this runtime).
    Exception { is_fatal: bool },

    /// A rejection-style fault: background work whose failure nobody
    /// was left to observe.
    Rejection,
}

/**
 * One observed fault, as delivered to every subscriber.
 */
#[derive(Debug)]
pub struct FaultEvent {
    pub fault: Fault,
    pub origin: FaultOrigin,

    /// Extra context gathered by the hook that raised the event
    /// (thread name, source location, ...). Merged into report metadata.
    pub metadata: Map<String, Value>,
}

pub type FaultObserver = Arc<dyn Fn(&FaultEvent) + Send + Sync>;

// ---------------------------------------------------------------------------
// FaultHub
// ---------------------------------------------------------------------------

pub struct FaultHub {
    observers: RwLock<Vec<FaultObserver>>,
    next_rejection_id: AtomicU64,
}

impl FaultHub {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
            next_rejection_id: AtomicU64::new(1),
        }
    }

    /**
     * Registers an observer. Observers are invoked in registration order
     * on every subsequent `raise`.
     */
    pub fn subscribe(&self, observer: FaultObserver) {
        if let Ok(mut observers) = self.observers.write() {
            observers.push(observer);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().map(|o| o.len()).unwrap_or(0)
    }

    /**
     * Raises an exception-origin fault with no extra metadata.
     */
    pub fn raise_exception(&self, fault: Fault, is_fatal: bool) {
        self.raise(FaultEvent {
            fault,
            origin: FaultOrigin::Exception { is_fatal },
            metadata: Map::new(),
        });
    }

    /**
     * Raises a rejection-origin fault with no extra metadata.
     */
    pub fn raise_rejection(&self, fault: Fault) {
        self.raise(FaultEvent {
            fault,
            origin: FaultOrigin::Rejection,
            metadata: Map::new(),
        });
    }

    /**
     * Dispatches an event to every observer, in registration order.
     */
    pub fn raise(&self, event: FaultEvent) {
        /* Snapshot outside the lock: an observer may subscribe others. */
        let observers: Vec<FaultObserver> = self
            .observers
            .read()
            .map(|o| o.clone())
            .unwrap_or_default();

        for observer in observers {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                observer(&event);
            }));
        }
    }

    /**
     * Hands out the next rejection tracking id. Ids start at 1 and are
     * unique for the lifetime of the hub.
     */
    pub fn next_rejection_id(&self) -> u64 {
        self.next_rejection_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for FaultHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn observers_run_in_registration_order() {
        let hub = FaultHub::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for index in 0..3 {
            let seen = Arc::clone(&seen);
            hub.subscribe(Arc::new(move |_event| {
                seen.lock().unwrap().push(index);
            }));
        }

        hub.raise_exception(Fault::default(), false);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    /**
     * A panicking observer must not suppress the ones after it.
     */
    #[test]
    fn panicking_observer_does_not_break_the_chain() {
        let hub = FaultHub::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        hub.subscribe(Arc::new(|_event| panic!("observer bug")));
        {
            let seen = Arc::clone(&seen);
            hub.subscribe(Arc::new(move |_event| {
                seen.lock().unwrap().push("after");
            }));
        }

        hub.raise_rejection(Fault::message("dropped result"));
        assert_eq!(*seen.lock().unwrap(), vec!["after"]);
    }

    #[test]
    fn rejection_ids_are_monotonic_from_one() {
        let hub = FaultHub::new();
        assert_eq!(hub.next_rejection_id(), 1);
        assert_eq!(hub.next_rejection_id(), 2);
        assert_eq!(hub.next_rejection_id(), 3);
    }
}
