//! Publish-side façade over the channel registry.

use std::sync::Arc;

use tracing::debug;

use crate::{
    dto::validation::{validate_channel_name, validate_payload},
    error::ServiceError,
    hub::{BroadcastChannel, BroadcastEvent, ChannelRegistry},
};

/// Thread-safe publish and administration façade for the broadcast hub.
///
/// Owns the channel registry; inject one instance into the shared state and
/// build fresh instances in tests.
pub struct BroadcastService {
    registry: ChannelRegistry,
}

impl BroadcastService {
    pub fn new() -> Self {
        Self {
            registry: ChannelRegistry::new(),
        }
    }

    /// Validate `name` and return its channel, creating it when absent.
    pub fn lookup_by_channel_name(
        &self,
        name: &str,
    ) -> Result<Arc<BroadcastChannel>, ServiceError> {
        validate_channel_name(name).map_err(ServiceError::invalid_channel_name)?;
        Ok(self.registry.get_or_create(name))
    }

    /// Broadcast `payload` to every current subscriber of `name`.
    ///
    /// Publishing to a channel nobody has subscribed to is a silent no-op:
    /// the channel is not allocated and the event is discarded.
    pub fn broadcast(&self, name: &str, payload: &str) -> Result<(), ServiceError> {
        validate_channel_name(name).map_err(ServiceError::invalid_channel_name)?;
        validate_payload(payload).map_err(ServiceError::invalid_payload)?;

        let Some(channel) = self.registry.get(name) else {
            debug!(channel = %name, "channel does not exist, event discarded");
            return Ok(());
        };

        channel.fire(&BroadcastEvent::new(payload));
        debug!(
            channel = %name,
            clients = channel.listener_count(),
            "broadcast to channel completed"
        );
        Ok(())
    }

    /// Number of listeners currently attached to `name`, 0 when absent.
    pub fn get_client_count(&self, name: &str) -> usize {
        self.registry
            .get(name)
            .map(|channel| channel.listener_count())
            .unwrap_or(0)
    }

    /// Snapshot of the currently registered channel names.
    pub fn get_active_channels(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Validate `name`, then detach and close its channel if present.
    pub fn close_channel(&self, name: &str) -> Result<(), ServiceError> {
        validate_channel_name(name).map_err(ServiceError::invalid_channel_name)?;
        self.registry.remove(name);
        Ok(())
    }

    /// Close every channel; invoked at process shutdown.
    pub fn close_all_channels(&self) {
        self.registry.close_all();
    }

    pub fn channel_count(&self) -> usize {
        self.registry.len()
    }
}

impl Default for BroadcastService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn broadcast_reaches_a_subscribed_listener() {
        let service = BroadcastService::new();
        let channel = service.lookup_by_channel_name("t1").expect("valid name");
        let received = Arc::new(AtomicUsize::new(0));
        {
            let received = Arc::clone(&received);
            channel.subscribe(move |event| {
                assert_eq!(event.payload(), r#"{"x":1}"#);
                received.fetch_add(1, Ordering::SeqCst);
                true
            });
        }

        service.broadcast("t1", r#"{"x":1}"#).expect("broadcast");

        assert_eq!(received.load(Ordering::SeqCst), 1);
        assert_eq!(service.get_client_count("t1"), 1);
    }

    #[test]
    fn broadcast_to_an_unknown_channel_is_a_no_op() {
        let service = BroadcastService::new();
        service.broadcast("ghost", "x").expect("fire and forget");

        assert!(service.get_active_channels().is_empty());
        assert_eq!(service.get_client_count("ghost"), 0);
    }

    #[test]
    fn broadcast_rejects_invalid_names_and_payloads() {
        let service = BroadcastService::new();

        assert!(matches!(
            service.broadcast("_system.audit", "x"),
            Err(ServiceError::InvalidChannelName(_))
        ));
        assert!(matches!(
            service.broadcast("bad name", "x"),
            Err(ServiceError::InvalidChannelName(_))
        ));
        assert!(matches!(
            service.broadcast("t1", &"x".repeat(64 * 1024 + 1)),
            Err(ServiceError::InvalidPayload(_))
        ));
        // Validation failures never allocate channels.
        assert!(service.get_active_channels().is_empty());
    }

    #[test]
    fn lookup_rejects_invalid_names() {
        let service = BroadcastService::new();
        assert!(matches!(
            service.lookup_by_channel_name("_system"),
            Err(ServiceError::InvalidChannelName(_))
        ));
        assert!(matches!(
            service.lookup_by_channel_name(""),
            Err(ServiceError::InvalidChannelName(_))
        ));
    }

    #[test]
    fn close_channel_invalidates_prior_subscriptions() {
        let service = BroadcastService::new();
        let before = service.lookup_by_channel_name("t6").expect("valid name");
        let hits = Arc::new(AtomicUsize::new(0));
        {
            let hits = Arc::clone(&hits);
            before.subscribe(move |_event| {
                hits.fetch_add(1, Ordering::SeqCst);
                true
            });
        }

        service.close_channel("t6").expect("valid name");
        let after = service.lookup_by_channel_name("t6").expect("valid name");

        assert_ne!(before.id(), after.id());
        service.broadcast("t6", "fresh").expect("broadcast");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn close_all_channels_empties_the_registry() {
        let service = BroadcastService::new();
        service.lookup_by_channel_name("a").expect("valid name");
        service.lookup_by_channel_name("b").expect("valid name");

        service.close_all_channels();

        assert!(service.get_active_channels().is_empty());
        assert_eq!(service.channel_count(), 0);
    }

    #[test]
    fn active_channels_reflect_lookups_not_broadcasts() {
        let service = BroadcastService::new();
        service.lookup_by_channel_name("seen").expect("valid name");
        service.broadcast("unseen", "x").expect("no-op");

        assert_eq!(service.get_active_channels(), vec!["seen".to_string()]);
    }
}
