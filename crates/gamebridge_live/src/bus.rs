//! Fan-out registry and subscriber mailboxes.

use parking_lot::RwLock;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::time::Duration;

/// Mailbox capacity per subscriber. When a mailbox is full, further events
/// are dropped for that subscriber only; the observer misses one refresh
/// cycle and catches up on the next signal or its fallback poll.
pub const MAILBOX_CAPACITY: usize = 500;

/// A named event with a JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct BusEvent {
    /// Event name, e.g. `invalidate`.
    pub name: String,
    /// JSON payload.
    pub data: serde_json::Value,
}

struct Mailbox {
    tx: SyncSender<BusEvent>,
    closed: Arc<AtomicBool>,
}

/// A registered observer handle.
///
/// Holds the receiving end of a bounded mailbox. Consumers block on
/// [`Subscriber::poll`]; the `None` timeout sentinel is what the streaming
/// endpoint turns into a protocol keep-alive.
pub struct Subscriber {
    id: u64,
    rx: Receiver<BusEvent>,
    closed: Arc<AtomicBool>,
}

impl Subscriber {
    /// The subscriber's unique id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Blocks up to `timeout` for the next buffered event.
    ///
    /// Returns `None` on timeout, after [`LiveBus::unsubscribe`], or once
    /// the bus is gone.
    pub fn poll(&self, timeout: Duration) -> Option<BusEvent> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber").field("id", &self.id).finish()
    }
}

/// The invalidation bus.
///
/// One instance is owned by the process composition root and passed by
/// handle into every component that publishes; it is not a global
/// singleton. Registry mutation is internally synchronized, and publishing
/// never blocks: enqueue into a full mailbox silently drops the event for
/// that subscriber.
pub struct LiveBus {
    next_id: AtomicU64,
    subs: RwLock<HashMap<u64, Mailbox>>,
}

impl LiveBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subs: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a new subscriber with a bounded mailbox.
    pub fn subscribe(&self) -> Subscriber {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = std::sync::mpsc::sync_channel(MAILBOX_CAPACITY);
        let closed = Arc::new(AtomicBool::new(false));
        self.subs.write().insert(
            id,
            Mailbox {
                tx,
                closed: Arc::clone(&closed),
            },
        );
        Subscriber { id, rx, closed }
    }

    /// Removes and closes a subscriber; buffered events are discarded.
    ///
    /// Unknown ids are ignored.
    pub fn unsubscribe(&self, id: u64) {
        if let Some(mailbox) = self.subs.write().remove(&id) {
            mailbox.closed.store(true, Ordering::Release);
        }
    }

    /// Returns the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subs.read().len()
    }

    /// Publishes an event to every current subscriber.
    ///
    /// Never raises and never blocks. Blank event names are ignored. A
    /// full mailbox drops the event for that subscriber only; a subscriber
    /// whose receiving end is gone is removed from the registry.
    pub fn publish(&self, name: &str, data: serde_json::Value) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        let event = BusEvent {
            name: name.to_string(),
            data,
        };

        let targets: Vec<(u64, SyncSender<BusEvent>)> = self
            .subs
            .read()
            .iter()
            .map(|(id, mailbox)| (*id, mailbox.tx.clone()))
            .collect();

        let mut dead = Vec::new();
        for (id, tx) in targets {
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::trace!(subscriber = id, event = %event.name, "mailbox full, dropped");
                }
                Err(TrySendError::Disconnected(_)) => dead.push(id),
            }
        }
        if !dead.is_empty() {
            let mut subs = self.subs.write();
            for id in dead {
                subs.remove(&id);
            }
        }
    }

    /// Publishes an `invalidate` event naming the changed domains.
    ///
    /// Targets are trimmed, lowercased and deduplicated of blanks before
    /// being placed in the `{"targets": [...]}` payload.
    pub fn publish_invalidate(&self, targets: &[&str]) {
        let cleaned: Vec<String> = targets
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        self.publish("invalidate", json!({ "targets": cleaned }));
    }
}

impl Default for LiveBus {
    fn default() -> Self {
        Self::new()
    }
}
