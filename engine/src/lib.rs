//! # Arkive Engine
//!
//! A deterministic merge engine for offline-first record views.
//!
//! This crate provides the core logic behind Arkive's synced list
//! screens: it combines the locally cached copy of a collection with the
//! realtime stream pushed by the remote store into a single
//! deduplicated, normalized, date-sorted view.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine has no knowledge of files, network, or platform
//! - **Total coercion**: malformed input never errors, it coerces to a
//!   documented fallback
//! - **Single owner**: the merged view is an explicit state object the
//!   caller owns between invocations - no globals, no locks
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! Each synced collection has a canonical record type ([`Receipt`],
//! [`Client`], [`Employee`], [`Task`]) produced from raw JSON by a total
//! per-entity coercion function. A record is only rejected when its
//! identifier is missing; invalid dates fall back to "now" and invalid
//! amounts to 0.
//!
//! ### The merged view
//!
//! [`MergedView`] folds batches from the two sources into one collection
//! keyed by record id. Remote records overwrite unconditionally; local
//! records only fill vacant ids, so remote precedence is sticky across
//! repeated local refreshes. After every merge the view is sorted by
//! date descending.
//!
//! ### Sources
//!
//! [`LocalSource`] and [`RemoteSource`] are the contracts to the
//! on-device cache and the realtime store. A [`Subscription`] is the
//! scoped listener resource: dropping it stops delivery. [`SyncedList`]
//! wires all three together the way the host view layer does.
//!
//! ## Quick Start
//!
//! ```rust
//! use arkive_engine::{MergedView, Receipt};
//! use chrono::Utc;
//! use serde_json::json;
//!
//! let now = Utc::now();
//! let mut view = MergedView::<Receipt>::new();
//!
//! // The local cache lands first...
//! view.merge_local(
//!     &json!([{"id": "r1", "clientName": "Areeba", "amount": "PKR 12,345", "date": "2024-03-01"}]),
//!     now,
//! );
//! assert_eq!(view.get("r1").unwrap().amount, 12_345);
//!
//! // ...then a remote push for the same id wins unconditionally.
//! view.merge_remote(
//!     &json!([{"id": "r1", "clientName": "Areeba", "amount": 20_000, "date": "2024-03-02"}]),
//!     now,
//! );
//!
//! assert_eq!(view.len(), 1);
//! assert_eq!(view.get("r1").unwrap().amount, 20_000);
//! ```

pub mod error;
pub mod list;
pub mod normalize;
pub mod record;
pub mod source;
pub mod view;

// Re-export main types at crate root
pub use error::Error;
pub use list::SyncedList;
pub use record::{
    Client, ClientKind, Employee, EmployeeRole, EmployeeStatus, Entity, PaymentMethod, Receipt,
    Task, TaskPriority, TaskStatus,
};
pub use source::{ChannelRemote, LocalSource, RemoteSource, Subscription};
pub use view::{MergeOutcome, MergedView, Query};

/// Type aliases for clarity
pub type RecordId = String;
pub type CollectionName = String;
