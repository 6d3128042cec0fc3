//! Error types for the Arkive engine.
//!
//! Coercion and merging are total and never fail; only the source
//! contracts have failure paths, and the host layer catches and logs
//! those instead of letting them reach a merge.

use crate::CollectionName;
use thiserror::Error;

/// All possible errors from the Arkive engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("failed to read local store: {0}")]
    LocalRead(String),

    #[error("failed to subscribe to collection '{collection}': {reason}")]
    Subscribe {
        collection: CollectionName,
        reason: String,
    },

    #[error("listener already active for collection: {0}")]
    AlreadySubscribed(CollectionName),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
