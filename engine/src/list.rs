//! Host-side wiring of a merged view to its two sources.
//!
//! `SyncedList` plays the role of the list screen in the host
//! application: it owns the [`MergedView`], holds the remote
//! [`Subscription`] for the entity's collection, and reacts to the two
//! asynchronous triggers - a local-store-changed notification
//! ([`refresh_local`](SyncedList::refresh_local)) and pending remote
//! pushes ([`pump`](SyncedList::pump)). Both triggers may fire in any
//! order; each runs to completion before the next, so the view never
//! sees a partial merge.
//!
//! Source failures stop here: they are logged and treated as an empty
//! refresh, never surfaced through the view.

use crate::error::Result;
use crate::record::Entity;
use crate::source::{LocalSource, RemoteSource, Subscription};
use crate::view::{MergeOutcome, MergedView};
use chrono::Utc;

/// A live, deduplicated list of one synced collection.
#[derive(Debug)]
pub struct SyncedList<R: Entity> {
    view: MergedView<R>,
    subscription: Option<Subscription>,
}

impl<R: Entity> SyncedList<R> {
    /// Start a list wired to the remote store.
    ///
    /// Acquires the listener for `R::COLLECTION`; the listener is
    /// released when the list is dropped or [`stop`](SyncedList::stop)ped.
    pub fn subscribe(remote: &dyn RemoteSource) -> Result<Self> {
        let subscription = remote.subscribe(R::COLLECTION)?;
        Ok(Self {
            view: MergedView::new(),
            subscription: Some(subscription),
        })
    }

    /// Build a list with no remote listener (local cache only).
    pub fn detached() -> Self {
        Self {
            view: MergedView::new(),
            subscription: None,
        }
    }

    /// React to a local-store change: re-read the cache and fold it in.
    ///
    /// Local records never displace entries already in the view. A
    /// failed read is logged and treated as an empty refresh.
    pub fn refresh_local(&mut self, local: &dyn LocalSource) -> MergeOutcome {
        let batch = match local.snapshot() {
            Ok(batch) => batch,
            Err(err) => {
                tracing::warn!(collection = R::COLLECTION, error = %err, "local refresh failed");
                return MergeOutcome::default();
            }
        };
        self.view.merge_local(&batch, Utc::now())
    }

    /// Drain every remote batch delivered since the last pump.
    ///
    /// Returns the number of batches folded in. Malformed (non-array)
    /// payloads are no-ops inside the merge, so a bad push can never
    /// corrupt the view.
    pub fn pump(&mut self) -> usize {
        let Some(subscription) = self.subscription.as_mut() else {
            return 0;
        };
        let mut applied = 0;
        while let Some(batch) = subscription.try_next() {
            self.view.merge_remote(&batch, Utc::now());
            applied += 1;
        }
        applied
    }

    /// Explicit local deletion: the only way an entry leaves the view.
    pub fn delete(&mut self, id: &str) -> Option<R> {
        self.view.remove(id)
    }

    /// The owned merged view.
    pub fn view(&self) -> &MergedView<R> {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut MergedView<R> {
        &mut self.view
    }

    /// Whether a remote listener is currently held.
    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }

    /// Release the remote listener early, keeping the view contents.
    pub fn stop(&mut self) {
        self.subscription = None;
    }
}
