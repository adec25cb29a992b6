//! Publishing side of a change channel
//!
//! Tracks the live subscriptions of one table and fans every committed change
//! out to each of them. Stores call [`ChangeHub::publish`] while still holding
//! their commit guard, which keeps delivery order equal to commit order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

use super::{ChangeEvent, Subscription};
use crate::models::Record;

type Senders<T> = HashMap<u64, mpsc::UnboundedSender<ChangeEvent<T>>>;

/// Subscriber registry for one table
pub struct ChangeHub<T> {
    subscribers: Arc<Mutex<Senders<T>>>,
    next_id: AtomicU64,
}

fn lock<T>(subscribers: &Mutex<Senders<T>>) -> MutexGuard<'_, Senders<T>> {
    subscribers.lock().unwrap_or_else(|e| e.into_inner())
}

impl<T: Record> ChangeHub<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.subscribers).insert(id, tx);
        tracing::debug!("Opened {} subscription #{}", T::TABLE, id);

        let registry = Arc::downgrade(&self.subscribers);
        Subscription::new(T::TABLE, rx, move || {
            if let Some(registry) = registry.upgrade() {
                lock(&registry).remove(&id);
            }
        })
    }

    /// Deliver an event to every live subscriber.
    ///
    /// Subscribers whose receiver is gone are pruned. Returns the number of
    /// subscribers the event reached.
    pub fn publish(&self, event: ChangeEvent<T>) -> usize {
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|_, tx| tx.send(event.clone()).is_ok());
        tracing::trace!(
            "Published {} {} #{} to {} subscriber(s)",
            T::TABLE,
            event.kind(),
            event.id(),
            subscribers.len()
        );
        subscribers.len()
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }
}

impl<T: Record> Default for ChangeHub<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ChangeHub<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeHub")
            .field("subscribers", &lock(&self.subscribers).len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Comment;
    use chrono::Utc;
    use futures::StreamExt;

    fn comment(id: i64, post_id: i64) -> Comment {
        Comment {
            id,
            post_id,
            author: "You".to_string(),
            content: format!("comment {}", id),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_delivers_in_publish_order() {
        let hub = ChangeHub::<Comment>::new();
        let mut sub = hub.subscribe();

        hub.publish(ChangeEvent::Inserted(comment(1, 1)));
        hub.publish(ChangeEvent::Updated(comment(1, 1)));
        hub.publish(ChangeEvent::Deleted { id: 1 });

        assert_eq!(sub.recv().await.map(|e| e.kind()), Some("inserted"));
        assert_eq!(sub.recv().await.map(|e| e.kind()), Some("updated"));
        assert_eq!(sub.recv().await.map(|e| e.kind()), Some("deleted"));
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_table_scope_reaches_every_subscriber() {
        let hub = ChangeHub::<Comment>::new();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        let reached = hub.publish(ChangeEvent::Inserted(comment(5, 42)));

        assert_eq!(reached, 2);
        assert_eq!(a.try_recv().map(|e| e.id()), Some(5));
        assert_eq!(b.try_recv().map(|e| e.id()), Some(5));
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_registration() {
        let hub = ChangeHub::<Comment>::new();
        let sub = hub.subscribe();
        let _other = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        sub.unsubscribe();
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(hub.publish(ChangeEvent::Deleted { id: 1 }), 1);
    }

    #[tokio::test]
    async fn test_dropped_subscription_stops_delivery() {
        let hub = ChangeHub::<Comment>::new();
        {
            let _sub = hub.subscribe();
        }
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.publish(ChangeEvent::Deleted { id: 1 }), 0);
    }

    #[tokio::test]
    async fn test_subscription_outliving_hub() {
        let hub = ChangeHub::<Comment>::new();
        let mut sub = hub.subscribe();
        drop(hub);

        assert!(sub.recv().await.is_none());
        sub.unsubscribe();
    }

    #[test]
    fn test_recv_pending_until_publish() {
        let hub = ChangeHub::<Comment>::new();
        let mut sub = hub.subscribe();

        let mut next = tokio_test::task::spawn(sub.recv());
        tokio_test::assert_pending!(next.poll());

        hub.publish(ChangeEvent::Inserted(comment(2, 1)));
        assert!(next.is_woken());
        let event = tokio_test::assert_ready!(next.poll());
        assert_eq!(event.map(|e| e.id()), Some(2));
    }

    #[tokio::test]
    async fn test_stream_interface() {
        let hub = ChangeHub::<Comment>::new();
        let sub = hub.subscribe();

        hub.publish(ChangeEvent::Inserted(comment(1, 1)));
        hub.publish(ChangeEvent::Inserted(comment(2, 1)));
        drop(hub);

        let ids: Vec<i64> = sub.map(|e| e.id()).collect().await;
        assert_eq!(ids, vec![1, 2]);
    }
}
