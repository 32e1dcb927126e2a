//! prekey-store — persistence core for a multi-device pre-key / ratchet key
//! store.
//!
//! This crate owns the storage of pre-key bundles, the installation
//! registry, and per-session ratchet initialization state. It does not
//! generate keys, perform Diffie-Hellman, sign anything, or run a ratchet —
//! those stay with the caller's own crypto layer. What's here is the
//! durable, encrypted-at-rest bookkeeping those operations need to survive
//! a restart and fan out across a user's devices.
//!
//! # Encryption strategy
//! SQLite does not natively encrypt. Secret columns (private pre-key halves,
//! ratchet symmetric keys) are stored as XChaCha20-Poly1305 ciphertext,
//! base64-encoded; everything else (identities, installation ids,
//! timestamps, versions) stays plaintext so it remains indexable. The vault
//! key is derived from an open-time passphrase via Argon2id and held in
//! memory for the lifetime of the [`Store`] handle — see [`crypto`].
//!
//! # Migrations
//! sqlx migrations under `migrations/` run on every [`Store::open`]; running
//! them twice against an already-current schema is a no-op.

pub mod crypto;
pub mod error;
pub mod identity;
mod installations;
pub mod models;
mod private_bundles;
mod public_bundles;
mod ratchet_info;
pub mod service;
pub mod sqlite;
pub mod store;

pub use error::PersistenceError;
pub use identity::Identity;
pub use service::{Bundle, BundleContainer, PersistenceService, PrivateBundleEntry, RatchetInfo, SignedPreKey};
pub use sqlite::SqlitePersistence;
pub use store::Store;
