//! Event relay between the streaming engine and kernel subscribers
//!
//! Listeners are synchronous callbacks keyed by event name. Every emission is
//! also pushed to a broadcast channel for async consumers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::trace;

/// Generic error event name every engine error is re-emitted under
pub const ERROR_EVENT: &str = "error";

/// Broadcast channel capacity
const BROADCAST_CAPACITY: usize = 64;

/// Named events the kernel subscribes to on the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum EngineEvent {
    /// Engine raised an error (network, media, mux, ...)
    Error,
}

impl EngineEvent {
    /// Wire name used by the engine
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineEvent::Error => "hlsError",
        }
    }
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error payload carried by engine ERROR events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    /// Error category, e.g. `networkError` or `mediaError`
    #[serde(rename = "type", default)]
    pub error_type: String,
    /// Engine-specific detail code
    #[serde(default)]
    pub details: String,
    /// Whether the engine considers the error fatal
    #[serde(default)]
    pub fatal: bool,
    /// Any other fields the engine attached
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ErrorData {
    /// Create error data with a category and detail
    pub fn new(error_type: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            details: details.into(),
            ..Default::default()
        }
    }

    /// Error data carrying only a detail
    pub fn with_details(details: impl Into<String>) -> Self {
        Self {
            details: details.into(),
            ..Default::default()
        }
    }

    /// Mark as fatal
    pub fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }

    /// Decode from an arbitrary engine payload
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}

/// Event delivered to async subscribers
#[derive(Debug, Clone, PartialEq)]
pub struct KernelEvent {
    /// Event name (`error` or the engine's own event name)
    pub name: String,
    /// Payload
    pub data: ErrorData,
}

/// Handle returned by [`EventEmitter::on`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listener callback
pub type Listener = Arc<dyn Fn(&ErrorData) + Send + Sync>;

#[derive(Clone)]
struct Entry {
    id: ListenerId,
    once: bool,
    callback: Listener,
}

/// Publish/subscribe hub owned by the kernel
pub struct EventEmitter {
    listeners: Mutex<HashMap<String, Vec<Entry>>>,
    next_id: AtomicU64,
    tx: broadcast::Sender<KernelEvent>,
}

impl EventEmitter {
    /// Create an emitter with no listeners
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Entry>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn add(&self, event: &str, once: bool, callback: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock()
            .entry(event.to_string())
            .or_default()
            .push(Entry { id, once, callback });
        id
    }

    /// Subscribe to an event
    pub fn on<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(&ErrorData) + Send + Sync + 'static,
    {
        self.add(event, false, Arc::new(listener))
    }

    /// Subscribe for a single emission
    pub fn once<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(&ErrorData) + Send + Sync + 'static,
    {
        self.add(event, true, Arc::new(listener))
    }

    /// Unsubscribe. Returns false if the listener was not registered.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        let Some(entries) = listeners.get_mut(event) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            listeners.remove(event);
        }
        removed
    }

    /// Subscribe to every emission as a [`KernelEvent`] stream
    pub fn subscribe(&self) -> broadcast::Receiver<KernelEvent> {
        self.tx.subscribe()
    }

    /// Number of listeners registered for an event
    pub fn listener_count(&self, event: &str) -> usize {
        self.lock().get(event).map_or(0, Vec::len)
    }

    /// Emit an event, returning how many listeners were invoked.
    ///
    /// Listeners run after the registry lock is released, so they may
    /// subscribe or unsubscribe freely.
    pub fn emit(&self, event: &str, data: &ErrorData) -> usize {
        let snapshot = {
            let mut listeners = self.lock();
            match listeners.get_mut(event) {
                Some(entries) => {
                    let snapshot = entries.clone();
                    entries.retain(|entry| !entry.once);
                    if entries.is_empty() {
                        listeners.remove(event);
                    }
                    snapshot
                }
                None => Vec::new(),
            }
        };

        for entry in &snapshot {
            (entry.callback)(data);
        }

        // No receivers is not an error
        let _ = self.tx.send(KernelEvent {
            name: event.to_string(),
            data: data.clone(),
        });

        trace!(event, listeners = snapshot.len(), "Event emitted");
        snapshot.len()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.lock();
        let counts: HashMap<&str, usize> = listeners
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.len()))
            .collect();
        f.debug_struct("EventEmitter").field("listeners", &counts).finish()
    }
}
