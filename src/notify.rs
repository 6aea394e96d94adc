//! Change notification
//!
//! Subscribers register on a topic: the whole collection or one item.
//! A change to an item is delivered to that item's topic and then to the
//! collection topic, once each. Delivery is synchronous and happens after
//! the store has committed; a subscriber that fails or panics is logged
//! and skipped, and never affects the committed write or other subscribers.

use crate::uri::{ResourceTarget, ResourceUri};
use crossbeam::channel::{self, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// What kind of mutation happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Inserted,
    Updated,
    Deleted,
}

/// A committed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Resource that changed: the new item for inserts, otherwise the URI
    /// the mutation was addressed to
    pub uri: ResourceUri,
    pub kind: ChangeKind,
    /// Rows affected
    pub rows: usize,
}

impl Change {
    /// Topics this change is delivered to, most specific first
    pub fn topics(&self) -> Vec<ResourceTarget> {
        match self.uri.target {
            ResourceTarget::Item(id) => vec![ResourceTarget::Item(id), ResourceTarget::Collection],
            ResourceTarget::Collection => vec![ResourceTarget::Collection],
        }
    }
}

/// Receives change notifications.
///
/// Closures of the form `Fn(&Change) -> anyhow::Result<()>` implement this.
pub trait Subscriber: Send + Sync {
    fn on_change(&self, change: &Change) -> anyhow::Result<()>;
}

impl<F> Subscriber for F
where
    F: Fn(&Change) -> anyhow::Result<()> + Send + Sync,
{
    fn on_change(&self, change: &Change) -> anyhow::Result<()> {
        self(change)
    }
}

/// Handle returned by subscribe calls, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Clone)]
enum Sink {
    Callback(Arc<dyn Subscriber>),
    Channel(Sender<Change>),
}

struct Subscription {
    id: SubscriptionId,
    topic: ResourceTarget,
    sink: Sink,
}

/// Publish/subscribe registry for committed mutations.
#[derive(Default)]
pub struct ChangeNotifier {
    next_id: AtomicU64,
    subscriptions: RwLock<Vec<Subscription>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback subscriber on `topic`
    pub fn subscribe(&self, topic: ResourceTarget, subscriber: impl Subscriber + 'static) -> SubscriptionId {
        self.register(topic, Sink::Callback(Arc::new(subscriber)))
    }

    /// Register a channel subscriber on `topic`.
    ///
    /// The subscription is dropped automatically once the receiver is gone.
    pub fn subscribe_channel(&self, topic: ResourceTarget) -> (SubscriptionId, Receiver<Change>) {
        let (tx, rx) = channel::unbounded();
        let id = self.register(topic, Sink::Channel(tx));
        (id, rx)
    }

    fn register(&self, topic: ResourceTarget, sink: Sink) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Subscription { id, topic, sink });
        tracing::debug!("Subscribed {:?} to {:?}", id, topic);
        id
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscriptions.write().unwrap_or_else(|e| e.into_inner());
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Deliver `change` to every subscriber of its topics.
    ///
    /// Returns the number of successful deliveries. The registry lock is
    /// not held while subscribers run, so they may subscribe or
    /// unsubscribe from inside a callback.
    pub fn notify(&self, change: &Change) -> usize {
        let mut delivered = 0;
        let mut disconnected = Vec::new();

        for topic in change.topics() {
            let sinks: Vec<(SubscriptionId, Sink)> = self
                .subscriptions
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .iter()
                .filter(|s| s.topic == topic)
                .map(|s| (s.id, s.sink.clone()))
                .collect();

            for (id, sink) in sinks {
                match sink {
                    Sink::Callback(subscriber) => {
                        match catch_unwind(AssertUnwindSafe(|| subscriber.on_change(change))) {
                            Ok(Ok(())) => delivered += 1,
                            Ok(Err(e)) => {
                                tracing::warn!("Subscriber {:?} failed on {}: {}", id, change.uri, e);
                            }
                            Err(_) => {
                                tracing::warn!("Subscriber {:?} panicked on {}", id, change.uri);
                            }
                        }
                    }
                    Sink::Channel(tx) => {
                        if tx.send(change.clone()).is_ok() {
                            delivered += 1;
                        } else {
                            disconnected.push(id);
                        }
                    }
                }
            }
        }

        if !disconnected.is_empty() {
            self.subscriptions
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .retain(|s| !disconnected.contains(&s.id));
            tracing::debug!("Pruned {} disconnected subscriber(s)", disconnected.len());
        }

        delivered
    }
}
