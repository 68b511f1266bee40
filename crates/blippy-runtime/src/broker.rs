//! Per-conversation pub/sub broker with busy-flag tracking.
//!
//! Delivery is non-blocking and lossy: a full mailbox drops the event for
//! that subscriber. Streaming deltas prioritize liveness; the final
//! `MessageDone` carries the authoritative payload, so subscribers that
//! fall behind re-read from the store.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;

use blippy_core::ConversationEvent;

/// Bounded mailbox capacity per subscription.
pub const MAILBOX_CAPACITY: usize = 256;

#[derive(Default)]
struct BrokerInner {
    /// topic → subscription id → mailbox sender.
    subs: RwLock<HashMap<String, HashMap<u64, mpsc::Sender<ConversationEvent>>>>,
    /// Conversations with an in-flight turn.
    busy: Mutex<HashSet<String>>,
    next_id: AtomicU64,
}

impl BrokerInner {
    fn detach(&self, topic: &str, id: u64) {
        let mut subs = self.subs.write();
        if let Some(topic_subs) = subs.get_mut(topic) {
            // Dropping the sender closes the mailbox; removal is idempotent
            // so drop-after-unsubscribe closes exactly once.
            let _ = topic_subs.remove(&id);
            if topic_subs.is_empty() {
                let _ = subs.remove(topic);
            }
        }
    }
}

/// Per-topic event fan-out and turn mutual exclusion.
#[derive(Clone, Default)]
pub struct Broker {
    inner: Arc<BrokerInner>,
}

/// A handle to one subscription's mailbox.
///
/// Receiving `None` means the subscription was closed. Dropping the handle
/// detaches it from the broker.
pub struct Subscription {
    id: u64,
    topic: String,
    receiver: mpsc::Receiver<ConversationEvent>,
    inner: Weak<BrokerInner>,
}

impl Subscription {
    /// Receive the next event; `None` on close.
    pub async fn recv(&mut self) -> Option<ConversationEvent> {
        self.receiver.recv().await
    }

    /// The conversation ID this subscription listens to.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.detach(&self.topic, self.id);
        }
    }
}

impl Broker {
    /// Create a new broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new bounded mailbox under the topic.
    #[must_use]
    pub fn subscribe(&self, topic: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let mut subs = self.inner.subs.write();
        let _ = subs.entry(topic.to_owned()).or_default().insert(id, tx);

        Subscription {
            id,
            topic: topic.to_owned(),
            receiver: rx,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Remove a subscription and close its mailbox.
    pub fn unsubscribe(&self, sub: Subscription) {
        drop(sub);
    }

    /// Deliver an event to every current subscriber of the topic.
    ///
    /// Never blocks: full mailboxes drop the event for that subscriber.
    pub fn publish(&self, topic: &str, event: ConversationEvent) {
        let subs = self.inner.subs.read();
        if let Some(topic_subs) = subs.get(topic) {
            for tx in topic_subs.values() {
                let _ = tx.try_send(event.clone());
            }
        }
    }

    /// Mark a conversation as having an active turn.
    ///
    /// Returns `false` if it was already busy.
    pub fn set_busy(&self, topic: &str) -> bool {
        self.inner.busy.lock().insert(topic.to_owned())
    }

    /// Unmark a conversation as busy.
    pub fn clear_busy(&self, topic: &str) {
        let _ = self.inner.busy.lock().remove(topic);
    }

    /// Whether a conversation has an active turn.
    #[must_use]
    pub fn is_busy(&self, topic: &str) -> bool {
        self.inner.busy.lock().contains(topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(s: &str) -> ConversationEvent {
        ConversationEvent::TextDelta { content: s.into() }
    }

    #[tokio::test]
    async fn publish_reaches_all_subscribers() {
        let broker = Broker::new();
        let mut a = broker.subscribe("conv-1");
        let mut b = broker.subscribe("conv-1");

        broker.publish("conv-1", delta("x"));

        assert_eq!(a.recv().await, Some(delta("x")));
        assert_eq!(b.recv().await, Some(delta("x")));
    }

    #[tokio::test]
    async fn publish_is_topic_scoped() {
        let broker = Broker::new();
        let mut other = broker.subscribe("conv-2");

        broker.publish("conv-1", delta("x"));
        broker.publish("conv-2", delta("y"));

        assert_eq!(other.recv().await, Some(delta("y")));
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let broker = Broker::new();
        let mut sub = broker.subscribe("conv-1");

        for i in 0..10 {
            broker.publish("conv-1", delta(&i.to_string()));
        }
        for i in 0..10 {
            assert_eq!(sub.recv().await, Some(delta(&i.to_string())));
        }
    }

    #[tokio::test]
    async fn slow_subscriber_drops_instead_of_blocking() {
        let broker = Broker::new();
        let mut sub = broker.subscribe("conv-1");

        // Overfill the mailbox; the excess must be dropped silently.
        for i in 0..(MAILBOX_CAPACITY + 50) {
            broker.publish("conv-1", delta(&i.to_string()));
        }

        let mut received = 0;
        while let Ok(event) = sub.receiver.try_recv() {
            let _ = event;
            received += 1;
        }
        assert_eq!(received, MAILBOX_CAPACITY);
    }

    #[tokio::test]
    async fn unsubscribe_closes_mailbox_once() {
        let broker = Broker::new();
        let sub = broker.subscribe("conv-1");
        let mut other = broker.subscribe("conv-1");

        broker.unsubscribe(sub);
        broker.publish("conv-1", delta("after"));

        // The remaining subscriber still receives.
        assert_eq!(other.recv().await, Some(delta("after")));
    }

    #[tokio::test]
    async fn dropped_subscription_sees_end_of_stream() {
        let broker = Broker::new();
        let mut sub = broker.subscribe("conv-1");

        // Detach by reaching in the same way Drop does.
        let sub2 = broker.subscribe("conv-1");
        broker.unsubscribe(sub2);

        broker.publish("conv-1", delta("one"));
        assert_eq!(sub.recv().await, Some(delta("one")));
    }

    #[test]
    fn busy_gate_is_mutually_exclusive() {
        let broker = Broker::new();
        assert!(!broker.is_busy("conv-1"));
        assert!(broker.set_busy("conv-1"));
        assert!(broker.is_busy("conv-1"));
        assert!(!broker.set_busy("conv-1"), "second start must be rejected");

        broker.clear_busy("conv-1");
        assert!(!broker.is_busy("conv-1"));
        assert!(broker.set_busy("conv-1"), "busy can be re-acquired after clear");
    }

    #[test]
    fn busy_flags_are_per_topic() {
        let broker = Broker::new();
        assert!(broker.set_busy("conv-1"));
        assert!(broker.set_busy("conv-2"));
        broker.clear_busy("conv-1");
        assert!(broker.is_busy("conv-2"));
    }

    #[tokio::test]
    async fn concurrent_publishers_do_not_panic() {
        let broker = Broker::new();
        let mut sub = broker.subscribe("conv-1");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let broker = broker.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    broker.publish("conv-1", delta("x"));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(sub.recv().await.is_some());
    }
}
