//! Contracts for the two record sources feeding a merged view.
//!
//! The engine consumes, and does not itself define, the local persistence
//! layer and the remote realtime store. Both are reached through narrow
//! traits: the local source hands over its current collection as a raw
//! JSON array; the remote source delivers change batches for a named
//! collection through a [`Subscription`], the scoped listener resource.
//! Batches travel over an unbounded channel and are drained without
//! blocking, matching the cooperative event model of the host view layer.

use crate::error::{Error, Result};
use crate::CollectionName;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// The on-device cache of records, refreshed independently of the remote
/// store.
pub trait LocalSource {
    /// Current contents of the locally cached collection, as a raw JSON
    /// array.
    fn snapshot(&self) -> Result<Value>;
}

/// The cloud-hosted realtime store that pushes change batches to
/// subscribers.
pub trait RemoteSource {
    /// Start listening for change batches on a named collection.
    ///
    /// At most one listener may be active per collection name.
    fn subscribe(&self, collection: &str) -> Result<Subscription>;
}

/// An active listener on one remote collection.
///
/// Holds the receiving end of the batch channel plus a release hook that
/// runs on drop, so a view that goes away stops receiving updates. Stop
/// listening is keyed by the same collection name used to subscribe.
pub struct Subscription {
    collection: CollectionName,
    batches: mpsc::UnboundedReceiver<Value>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Build a subscription from a batch receiver and a release hook.
    ///
    /// Intended for [`RemoteSource`] implementations.
    pub fn new(
        collection: impl Into<CollectionName>,
        batches: mpsc::UnboundedReceiver<Value>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            collection: collection.into(),
            batches,
            release: Some(Box::new(release)),
        }
    }

    /// Collection this subscription listens on.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Take the next pending batch, if one has been delivered.
    ///
    /// Never blocks; returns `None` when the queue is empty or the
    /// remote side has gone away.
    pub fn try_next(&mut self) -> Option<Value> {
        self.batches.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

type ListenerMap = HashMap<CollectionName, mpsc::UnboundedSender<Value>>;

/// In-memory [`RemoteSource`] backed by channels.
///
/// Used by tests and by embedders that bridge a real transport: the
/// transport side calls [`push`](ChannelRemote::push) with each change
/// batch, and subscribers drain them through their [`Subscription`].
#[derive(Debug, Clone, Default)]
pub struct ChannelRemote {
    listeners: Arc<Mutex<ListenerMap>>,
}

impl ChannelRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a batch to the active listener, if any.
    ///
    /// Returns `true` when a listener received the batch. A listener
    /// whose subscription was leaked rather than dropped is pruned here.
    pub fn push(&self, collection: &str, batch: Value) -> bool {
        let mut listeners = self.lock();
        if let Some(sender) = listeners.get(collection) {
            if sender.send(batch).is_ok() {
                return true;
            }
            listeners.remove(collection);
        }
        false
    }

    /// Number of collections with an active listener.
    pub fn listener_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ListenerMap> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RemoteSource for ChannelRemote {
    fn subscribe(&self, collection: &str) -> Result<Subscription> {
        let mut listeners = self.lock();
        if let Some(existing) = listeners.get(collection) {
            if !existing.is_closed() {
                return Err(Error::AlreadySubscribed(collection.to_string()));
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        listeners.insert(collection.to_string(), tx);
        drop(listeners);

        tracing::debug!(collection, "remote listener registered");

        let registry = Arc::clone(&self.listeners);
        let name = collection.to_string();
        Ok(Subscription::new(collection, rx, move || {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&name);
            tracing::debug!(collection = %name, "remote listener released");
        }))
    }
}
