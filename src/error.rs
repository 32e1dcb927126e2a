use thiserror::Error;

/// Unified error type for every `PersistenceService` operation.
///
/// "Not found" is never represented here — a missing row is a `None`/empty
/// return from the relevant `Get*` call, not an `Err`.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Open failed, the underlying file is unreadable, or a migration failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// `AddRatchetInfo` referenced a `bundle_id` present in neither the
    /// private nor the public bundle table.
    #[error("no bundle found for bundle_id {bundle_id}")]
    BundleNotFound { bundle_id: String },

    /// Field-level AEAD or key-derivation failure.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// An underlying SQL failure during a write or read.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl PersistenceError {
    pub(crate) fn crypto(msg: impl Into<String>) -> Self {
        Self::Crypto(msg.into())
    }
}
