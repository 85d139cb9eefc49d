//! Name-to-channel mapping with linearizable create and serialized removal.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tracing::info;

use crate::hub::channel::BroadcastChannel;

/// Registry of live broadcast channels keyed by channel name.
///
/// Lookups and enumeration go straight through the map; create, remove, and
/// close-all serialize on a write gate so two concurrent creators of the
/// same name always observe the same channel instance.
pub struct ChannelRegistry {
    channels: DashMap<String, Arc<BroadcastChannel>>,
    write_gate: Mutex<()>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            write_gate: Mutex::new(()),
        }
    }

    /// Return the channel registered under `name`, creating and installing
    /// a fresh one when absent.
    pub fn get_or_create(&self, name: &str) -> Arc<BroadcastChannel> {
        let _gate = self.lock_gate();
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| {
                info!(channel = %name, "creating new broadcast channel");
                Arc::new(BroadcastChannel::new(name))
            })
            .clone()
    }

    /// Non-creating lookup.
    pub fn get(&self, name: &str) -> Option<Arc<BroadcastChannel>> {
        self.channels.get(name).map(|entry| entry.value().clone())
    }

    /// Detach the channel from the registry and close it. Idempotent.
    pub fn remove(&self, name: &str) {
        let _gate = self.lock_gate();
        if let Some((_, channel)) = self.channels.remove(name) {
            info!(channel = %name, "closing channel");
            channel.close();
        }
    }

    /// Detach and close every channel, leaving the registry empty.
    pub fn close_all(&self) {
        let _gate = self.lock_gate();
        let drained: Vec<Arc<BroadcastChannel>> = self
            .channels
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        self.channels.clear();
        for channel in drained {
            channel.close();
        }
        info!("all channels closed");
    }

    /// Snapshot of the currently registered channel names.
    pub fn names(&self) -> Vec<String> {
        self.channels.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    fn lock_gate(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_gate
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_returns_the_same_instance_for_a_name() {
        let registry = ChannelRegistry::new();
        let first = registry.get_or_create("device:barrier-01");
        let second = registry.get_or_create("device:barrier-01");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.id(), second.id());
    }

    #[test]
    fn get_does_not_create() {
        let registry = ChannelRegistry::new();
        assert!(registry.get("ghost").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_closes_the_detached_channel() {
        let registry = ChannelRegistry::new();
        let channel = registry.get_or_create("t6");

        registry.remove("t6");

        assert!(channel.is_closed());
        assert!(registry.get("t6").is_none());
    }

    #[test]
    fn recreated_channel_has_a_distinct_id() {
        let registry = ChannelRegistry::new();
        let before = registry.get_or_create("t6");
        registry.remove("t6");

        let after = registry.get_or_create("t6");
        assert_ne!(before.id(), after.id());
        assert!(!after.is_closed());
    }

    #[test]
    fn remove_of_an_absent_name_is_a_no_op() {
        let registry = ChannelRegistry::new();
        registry.remove("never-created");
        assert!(registry.is_empty());
    }

    #[test]
    fn close_all_closes_and_empties() {
        let registry = ChannelRegistry::new();
        let a = registry.get_or_create("a");
        let b = registry.get_or_create("b");

        registry.close_all();

        assert!(a.is_closed());
        assert!(b.is_closed());
        assert!(registry.is_empty());
        assert!(registry.names().is_empty());
    }

    #[test]
    fn names_reports_the_current_key_snapshot() {
        let registry = ChannelRegistry::new();
        registry.get_or_create("alpha");
        registry.get_or_create("beta");

        let mut names = registry.names();
        names.sort();
        assert_eq!(names, vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creators_observe_one_channel_instance() {
        let registry = Arc::new(ChannelRegistry::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.get_or_create("shared").id()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.expect("creator task"));
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(registry.len(), 1);
    }
}
