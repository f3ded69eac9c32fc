//! Progress events and their fan-out to live subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;

/// Per-subscriber queue depth. A subscriber that falls this far behind
/// misses events instead of slowing the extraction down.
pub const SUBSCRIBER_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub message: String,
    #[serde(rename = "type")]
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
            timestamp: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }
}

pub type SubscriberId = u64;

pub struct Subscription {
    pub id: SubscriberId,
    pub receiver: mpsc::Receiver<ProgressEvent>,
}

/// Process-wide fan-out. Created once per server and shared by every request.
#[derive(Default)]
pub struct EventBroadcaster {
    subscribers: RwLock<HashMap<SubscriberId, mpsc::Sender<ProgressEvent>>>,
    next_id: AtomicU64,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber that sees every event emitted from now on.
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_BUFFER);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, sender);
        tracing::debug!(subscriber = id, "Subscriber attached");
        Subscription { id, receiver }
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();
        if removed {
            tracing::debug!(subscriber = id, "Subscriber detached");
        }
        removed
    }

    /// Delivers `event` to every subscriber and returns how many accepted it.
    ///
    /// Full or closed subscriber queues are skipped; they never stop delivery
    /// to the rest.
    pub fn emit(&self, event: &ProgressEvent) -> usize {
        let subscribers = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let mut delivered = 0;
        for (id, sender) in subscribers.iter() {
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => tracing::trace!(subscriber = id, error = %e, "Dropped event"),
            }
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Removes its subscription when dropped, e.g. when an SSE client goes away.
pub struct SubscriptionGuard {
    broadcaster: Arc<EventBroadcaster>,
    id: SubscriberId,
}

impl SubscriptionGuard {
    pub fn new(broadcaster: Arc<EventBroadcaster>, id: SubscriberId) -> Self {
        Self { broadcaster, id }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.broadcaster.unsubscribe(self.id);
    }
}

/// Per-request event sink: broadcasts each event, mirrors it into `tracing`
/// and keeps the ordered log returned to the caller.
pub struct ProgressReporter {
    broadcaster: Arc<EventBroadcaster>,
    log: Vec<ProgressEvent>,
}

impl ProgressReporter {
    pub fn new(broadcaster: Arc<EventBroadcaster>) -> Self {
        Self {
            broadcaster,
            log: Vec::new(),
        }
    }

    pub fn report(&mut self, event: ProgressEvent) {
        match event.severity {
            Severity::Info | Severity::Success => tracing::info!("{}", event.message),
            Severity::Warning => tracing::warn!("{}", event.message),
            Severity::Error => tracing::error!("{}", event.message),
        }
        self.broadcaster.emit(&event);
        self.log.push(event);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.report(ProgressEvent::info(message));
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.report(ProgressEvent::success(message));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.report(ProgressEvent::warning(message));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.report(ProgressEvent::error(message));
    }

    pub fn events(&self) -> &[ProgressEvent] {
        &self.log
    }

    pub fn into_events(self) -> Vec<ProgressEvent> {
        self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let event = ProgressEvent::success("Page 1 extracted");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["message"], "Page 1 extracted");
        assert_eq!(json["type"], "success");
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }

    #[tokio::test]
    async fn test_fan_out_in_order() {
        let broadcaster = EventBroadcaster::new();
        let mut a = broadcaster.subscribe();
        let mut b = broadcaster.subscribe();

        broadcaster.emit(&ProgressEvent::info("one"));
        broadcaster.emit(&ProgressEvent::info("two"));

        for sub in [&mut a, &mut b] {
            assert_eq!(sub.receiver.recv().await.unwrap().message, "one");
            assert_eq!(sub.receiver.recv().await.unwrap().message, "two");
        }
    }

    #[tokio::test]
    async fn test_gone_subscriber_does_not_block_others() {
        let broadcaster = EventBroadcaster::new();
        let gone = broadcaster.subscribe();
        let mut healthy = broadcaster.subscribe();
        drop(gone.receiver);

        let delivered = broadcaster.emit(&ProgressEvent::warning("still here"));

        assert_eq!(delivered, 1);
        assert_eq!(healthy.receiver.recv().await.unwrap().message, "still here");
        assert_eq!(broadcaster.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_full_subscriber_does_not_block_others() {
        let broadcaster = EventBroadcaster::new();
        let _stalled = broadcaster.subscribe();
        let mut healthy = broadcaster.subscribe();

        for i in 0..SUBSCRIBER_BUFFER {
            broadcaster.emit(&ProgressEvent::info(format!("fill {}", i)));
            healthy.receiver.recv().await.unwrap();
        }

        let delivered = broadcaster.emit(&ProgressEvent::info("overflow"));
        assert_eq!(delivered, 1);
        assert_eq!(healthy.receiver.recv().await.unwrap().message, "overflow");
    }

    #[tokio::test]
    async fn test_no_replay_for_late_subscriber() {
        let broadcaster = EventBroadcaster::new();
        broadcaster.emit(&ProgressEvent::info("before"));

        let mut late = broadcaster.subscribe();
        broadcaster.emit(&ProgressEvent::info("after"));

        assert_eq!(late.receiver.recv().await.unwrap().message, "after");
        assert!(late.receiver.try_recv().is_err());
    }

    #[test]
    fn test_unsubscribe() {
        let broadcaster = EventBroadcaster::new();
        let sub = broadcaster.subscribe();
        assert!(broadcaster.unsubscribe(sub.id));
        assert!(!broadcaster.unsubscribe(sub.id));
        assert_eq!(broadcaster.emit(&ProgressEvent::info("nobody")), 0);
    }

    #[test]
    fn test_guard_unsubscribes_on_drop() {
        let broadcaster = Arc::new(EventBroadcaster::new());
        let sub = broadcaster.subscribe();
        let guard = SubscriptionGuard::new(broadcaster.clone(), sub.id);
        assert_eq!(broadcaster.subscriber_count(), 1);
        drop(guard);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[test]
    fn test_concurrent_subscribe_unsubscribe() {
        let broadcaster = EventBroadcaster::new();

        std::thread::scope(|s| {
            for _ in 0..4 {
                let broadcaster = &broadcaster;
                s.spawn(move || {
                    for _ in 0..50 {
                        let sub = broadcaster.subscribe();
                        broadcaster.emit(&ProgressEvent::info("tick"));
                        broadcaster.unsubscribe(sub.id);
                    }
                });
            }
        });

        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_reporter_logs_and_broadcasts() {
        let broadcaster = Arc::new(EventBroadcaster::new());
        let mut sub = broadcaster.subscribe();
        let mut reporter = ProgressReporter::new(broadcaster);

        reporter.info("start");
        reporter.error("failed");

        let severities: Vec<Severity> = reporter.events().iter().map(|e| e.severity).collect();
        assert_eq!(severities, vec![Severity::Info, Severity::Error]);
        assert_eq!(sub.receiver.recv().await.unwrap().message, "start");
        assert_eq!(reporter.into_events().len(), 2);
    }
}
