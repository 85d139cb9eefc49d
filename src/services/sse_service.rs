//! Bridges broadcast channels onto per-connection SSE frame streams.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::{
    dto::sse::{comment_frame, data_frame},
    hub::BroadcastChannel,
    services::admission::IdentityScope,
};

/// Cadence of the comment frames keeping idle connections alive through
/// proxies and browser timeouts.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Small bounded buffer between fan-out and the response body. A subscriber
/// that falls this far behind is dropped rather than queued for.
const FRAME_BUFFER: usize = 8;

/// Register a subscriber on `channel` and return the receiving half of its
/// frame stream; the caller turns it into the response body.
///
/// The first frame is the `: connected` preamble so the response commits
/// before any broadcast can race ahead of it. A channel listener pushes one
/// `data:` frame per broadcast and requests eviction once the client side
/// of the stream is gone or its buffer is full. A spawned companion task
/// owns the heartbeat timer and watches the channel's close latch, so the
/// stream ends promptly on `close_channel`/shutdown and teardown runs
/// exactly once no matter which side disconnects first.
pub fn open_stream(channel: Arc<BroadcastChannel>, scope: IdentityScope) -> Receiver<String> {
    let (tx, rx) = mpsc::channel(FRAME_BUFFER);

    let _ = tx.try_send(comment_frame("connected"));

    let listener_tx = tx.clone();
    channel.subscribe(move |event| listener_tx.try_send(data_frame(event.payload())).is_ok());

    debug!(channel = %channel.name(), "listener registered, connection will remain open");
    tokio::spawn(run_connection(channel, tx, scope));

    rx
}

/// Heartbeat loop and close watcher for one subscriber connection. Holds
/// the identity scope so it drops on the single exit path.
async fn run_connection(channel: Arc<BroadcastChannel>, tx: Sender<String>, scope: IdentityScope) {
    let mut heartbeat = time::interval_at(
        time::Instant::now() + HEARTBEAT_INTERVAL,
        HEARTBEAT_INTERVAL,
    );
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if tx.try_send(comment_frame("heartbeat")).is_err() {
                    debug!(channel = %channel.name(), "heartbeat failed, client stalled or disconnected");
                    break;
                }
            }
            _ = channel.closed() => {
                debug!(channel = %channel.name(), "channel closed, ending stream");
                break;
            }
            _ = tx.closed() => break,
        }
    }

    info!(
        channel = %channel.name(),
        remaining = channel.listener_count(),
        "client disconnected from broadcast channel"
    );
    drop(scope);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::BroadcastEvent;
    use crate::services::admission::Identity;

    fn test_stream(channel: &Arc<BroadcastChannel>) -> Receiver<String> {
        let scope = IdentityScope::open(channel.name().to_string(), Identity::Anonymous);
        open_stream(Arc::clone(channel), scope)
    }

    #[tokio::test]
    async fn stream_starts_with_the_connected_preamble() {
        let channel = Arc::new(BroadcastChannel::new("t1"));
        let mut rx = test_stream(&channel);

        assert_eq!(rx.recv().await.unwrap(), ": connected\n\n");
        assert_eq!(channel.listener_count(), 1);
    }

    #[tokio::test]
    async fn broadcasts_arrive_as_data_frames() {
        let channel = Arc::new(BroadcastChannel::new("t1"));
        let mut rx = test_stream(&channel);
        rx.recv().await.unwrap(); // preamble

        channel.fire(&BroadcastEvent::new(r#"{"x":1}"#));

        assert_eq!(rx.recv().await.unwrap(), "data: {\"x\":1}\n\n");
    }

    #[tokio::test]
    async fn closing_the_channel_ends_the_stream() {
        let channel = Arc::new(BroadcastChannel::new("t6"));
        let mut rx = test_stream(&channel);
        rx.recv().await.unwrap(); // preamble

        channel.close();

        // Both the listener and the companion task drop their senders.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn dropped_client_is_evicted_on_the_next_fire() {
        let channel = Arc::new(BroadcastChannel::new("t3"));
        let rx = test_stream(&channel);
        assert_eq!(channel.listener_count(), 1);

        drop(rx);
        channel.fire(&BroadcastEvent::new("x"));

        assert_eq!(channel.listener_count(), 0);
    }

    #[tokio::test]
    async fn subscriber_that_stops_reading_is_dropped_not_queued() {
        let channel = Arc::new(BroadcastChannel::new("slow"));
        let mut rx = test_stream(&channel);

        // The preamble occupies one buffer slot; the last fire overflows
        // the buffer and evicts the listener instead of queueing.
        for i in 0..FRAME_BUFFER {
            channel.fire(&BroadcastEvent::new(format!("m{i}")));
        }

        assert_eq!(channel.listener_count(), 0);

        // Frames accepted before the overflow are still delivered.
        assert_eq!(rx.recv().await.unwrap(), ": connected\n\n");
        assert_eq!(rx.recv().await.unwrap(), "data: m0\n\n");
    }

    #[tokio::test]
    async fn fanout_reaches_every_connection() {
        let channel = Arc::new(BroadcastChannel::new("t2"));
        let mut streams = vec![
            test_stream(&channel),
            test_stream(&channel),
            test_stream(&channel),
        ];
        for rx in &mut streams {
            rx.recv().await.unwrap(); // preamble
        }
        assert_eq!(channel.listener_count(), 3);

        channel.fire(&BroadcastEvent::new("hello"));

        for rx in &mut streams {
            assert_eq!(rx.recv().await.unwrap(), "data: hello\n\n");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeats_tick_every_fifteen_seconds_when_idle() {
        let channel = Arc::new(BroadcastChannel::new("idle"));
        let mut rx = test_stream(&channel);
        assert_eq!(rx.recv().await.unwrap(), ": connected\n\n");

        // Nothing is due before the first interval elapses.
        time::advance(Duration::from_secs(14)).await;
        assert!(rx.try_recv().is_err());

        time::advance(Duration::from_secs(1)).await;
        assert_eq!(rx.recv().await.unwrap(), ": heartbeat\n\n");

        time::advance(HEARTBEAT_INTERVAL).await;
        assert_eq!(rx.recv().await.unwrap(), ": heartbeat\n\n");
    }
}
