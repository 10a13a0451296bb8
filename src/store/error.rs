//! Storage error types.

use derive_more::{Display, Error};

/// Error raised by a document store implementation.
#[derive(Debug, Clone, Display, Error)]
pub enum StoreError {
    /// The addressed document does not exist.
    #[display("document '{id}' not found in collection '{collection}'")]
    NotFound {
        /// Collection that was addressed.
        collection: String,
        /// Document id that was addressed.
        id: String,
    },
    /// A concurrent writer won the transaction; transient, safe to retry
    /// (every core operation revalidates against the fresh snapshot).
    #[display("transaction conflict on '{id}' in '{collection}'")]
    Conflict {
        /// Collection that was addressed.
        collection: String,
        /// Document id that was addressed.
        id: String,
    },
    /// The transaction closure aborted the write.
    #[display("transaction aborted: {reason}")]
    Aborted {
        /// Abort reason supplied by the closure.
        reason: String,
    },
    /// A document failed to encode or decode.
    #[display("serialization failure: {message}")]
    Serialization {
        /// Underlying serde message.
        message: String,
    },
    /// The store or subscription channel has shut down.
    #[display("store is closed")]
    Closed,
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}
