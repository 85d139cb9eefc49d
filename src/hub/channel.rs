//! A single named broadcast channel and its listener bookkeeping.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::hub::event::BroadcastEvent;

/// Callback invoked for every event fired on a channel. Returning `false`
/// requests eviction; the listener is never invoked again afterwards.
pub type ListenerFn = dyn Fn(&BroadcastEvent) -> bool + Send + Sync;

struct ListenerEntry {
    token: u64,
    callback: Arc<ListenerFn>,
}

struct ListenerTable {
    next_token: u64,
    entries: Vec<ListenerEntry>,
}

/// A broadcast channel multiple subscribers can listen on concurrently.
///
/// The listener table mutex guards only registration, snapshotting, and
/// eviction; listener callbacks run outside of it, so listeners are free to
/// call back into the channel or the registry without deadlocking.
pub struct BroadcastChannel {
    id: Uuid,
    name: String,
    table: Mutex<ListenerTable>,
    latch: watch::Sender<bool>,
}

impl BroadcastChannel {
    pub fn new(name: impl Into<String>) -> Self {
        let (latch, _) = watch::channel(false);
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            table: Mutex::new(ListenerTable {
                next_token: 0,
                entries: Vec::new(),
            }),
            latch,
        }
    }

    /// Unique id of this channel instance. A channel re-created under the
    /// same name after [`close`](Self::close) gets a fresh id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a listener. Listeners registered on a closed channel are
    /// dropped silently and never invoked. Each registration is distinct:
    /// subscribing the same closure twice delivers every event twice.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&BroadcastEvent) -> bool + Send + Sync + 'static,
    {
        let mut table = self.lock_table();
        if self.is_closed() {
            debug!(channel = %self.name, "channel is closed, listener dropped");
            return;
        }
        let token = table.next_token;
        table.next_token += 1;
        table.entries.push(ListenerEntry {
            token,
            callback: Arc::new(listener),
        });
        debug!(
            channel = %self.name,
            total = table.entries.len(),
            "new listener added to channel"
        );
    }

    /// Deliver `event` to every listener attached at the snapshot instant,
    /// in registration order, then evict listeners that returned `false` or
    /// panicked. A no-op on a closed channel. Never panics outward.
    ///
    /// Listeners registered while a fire is in flight only observe
    /// subsequent fires.
    pub fn fire(&self, event: &BroadcastEvent) {
        let snapshot: Vec<(u64, Arc<ListenerFn>)> = {
            let table = self.lock_table();
            if self.is_closed() {
                debug!(channel = %self.name, "channel is not active, fire ignored");
                return;
            }
            table
                .entries
                .iter()
                .map(|entry| (entry.token, Arc::clone(&entry.callback)))
                .collect()
        };

        debug!(
            channel = %self.name,
            listeners = snapshot.len(),
            "broadcasting to channel listeners"
        );

        let mut evicted = Vec::new();
        for (token, callback) in &snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| (**callback)(event))) {
                Ok(true) => {}
                Ok(false) => {
                    debug!(channel = %self.name, "listener disconnected from channel");
                    evicted.push(*token);
                }
                Err(_) => {
                    warn!(channel = %self.name, "listener panicked during broadcast, evicting");
                    evicted.push(*token);
                }
            }
        }

        if evicted.is_empty() {
            return;
        }

        let mut table = self.lock_table();
        if self.is_closed() {
            return;
        }
        table.entries.retain(|entry| !evicted.contains(&entry.token));
    }

    /// Clear all listeners, mark the channel inactive, and trip the close
    /// latch. Idempotent.
    pub fn close(&self) {
        let mut table = self.lock_table();
        if self.is_closed() {
            return;
        }
        table.entries.clear();
        let _ = self.latch.send(true);
        info!(channel = %self.name, "channel closed");
    }

    /// Wait until [`close`](Self::close) has been called.
    pub async fn closed(&self) {
        let mut rx = self.latch.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.latch.borrow()
    }

    /// Best-effort listener cardinality.
    pub fn listener_count(&self) -> usize {
        self.lock_table().entries.len()
    }

    // Listeners run outside the lock, so a poisoning panic cannot happen
    // while it is held; recover the guard regardless.
    fn lock_table(&self) -> MutexGuard<'_, ListenerTable> {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
