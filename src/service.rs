//! The abstract `PersistenceService` contract and its associated domain
//! types. `SqlitePersistence` (see [`crate::sqlite`]) is the one implementer
//! in this crate, but callers should code against this trait so a different
//! realization (e.g. an in-memory store for tests) can be substituted.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::PersistenceError;
use crate::identity::Identity;

/// One installation's published pre-key record, as it appears inside a
/// [`Bundle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPreKey {
    pub signed_pre_key: Vec<u8>,
    pub version: i64,
    /// Opaque accompanying signature bytes (never interpreted here).
    pub signature: Vec<u8>,
}

/// A published pre-key bundle for an identity, covering one or more
/// installations. Returned by `GetPublicBundle` / `GetAnyPrivateBundle`,
/// and accepted by `AddPublicBundle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub identity: Identity,
    /// Opaque identity signature, carried verbatim (e.g. over the bundle's
    /// own public key), never interpreted by this crate.
    pub identity_sig: Vec<u8>,
    /// installation_id -> that installation's current signed pre-key record.
    pub signed_pre_keys: BTreeMap<String, SignedPreKey>,
}

/// One installation's material inside a [`BundleContainer`] — the shape
/// produced by the (out-of-scope) `NewBundleContainer` crypto-collaborator
/// helper when publishing one's own bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateBundleEntry {
    pub installation_id: String,
    pub signed_pre_key: Vec<u8>,
    pub private_signed_pre_key: Vec<u8>,
    /// Opaque self-signature over `signed_pre_key`, carried into the
    /// corresponding public-bundle row verbatim.
    pub signature: Vec<u8>,
    pub timestamp: i64,
}

/// Input to `AddPrivateBundle`: the local user's own bundle, containing the
/// private halves needed to complete inbound sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleContainer {
    pub identity: Identity,
    pub identity_sig: Vec<u8>,
    pub entries: Vec<PrivateBundleEntry>,
}

impl BundleContainer {
    /// The installation's signed pre-key value doubles as `bundle_id`
    /// (it is globally unique per installation-generation).
    pub fn bundle_id_for(entry: &PrivateBundleEntry) -> Vec<u8> {
        entry.signed_pre_key.clone()
    }
}

/// Per-session ratchet initialization state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatchetInfo {
    /// System-assigned, non-empty on every returned row.
    pub id: Vec<u8>,
    pub identity: Identity,
    pub bundle_id: Vec<u8>,
    /// Present iff the bundle that initiated this session was a private
    /// (own) bundle rather than a peer's public bundle.
    pub private_key: Option<Vec<u8>>,
    pub symmetric_key: Vec<u8>,
    pub ephemeral_public_key: Vec<u8>,
    pub installation_id: String,
}

/// The abstract persistence contract. All operations are `async`, but every
/// method still behaves as synchronous from the caller's perspective — none
/// return before their write has committed or their read has completed.
#[async_trait]
pub trait PersistenceService: Send + Sync {
    async fn add_private_bundle(&self, container: &BundleContainer) -> Result<(), PersistenceError>;

    async fn get_private_key_bundle(
        &self,
        bundle_id: &[u8],
    ) -> Result<Option<Vec<u8>>, PersistenceError>;

    async fn get_any_private_bundle(
        &self,
        identity: &Identity,
        installation_ids: &[String],
    ) -> Result<Option<Bundle>, PersistenceError>;

    async fn add_public_bundle(&self, bundle: &Bundle) -> Result<(), PersistenceError>;

    async fn get_public_bundle(
        &self,
        identity: &Identity,
        installation_ids: &[String],
    ) -> Result<Option<Bundle>, PersistenceError>;

    async fn add_ratchet_info(
        &self,
        symmetric_key: &[u8],
        their_identity: &Identity,
        bundle_id: &[u8],
        ephemeral_public_key: &[u8],
        installation_id: &str,
    ) -> Result<(), PersistenceError>;

    async fn get_ratchet_info(
        &self,
        bundle_id: &[u8],
        their_identity: &Identity,
        installation_id: &str,
    ) -> Result<Option<RatchetInfo>, PersistenceError>;

    async fn get_any_ratchet_info(
        &self,
        their_identity: &Identity,
        installation_id: &str,
    ) -> Result<Option<RatchetInfo>, PersistenceError>;

    async fn add_installations(
        &self,
        identity: &Identity,
        timestamp: i64,
        installation_ids: &[String],
        enabled: bool,
    ) -> Result<(), PersistenceError>;

    async fn get_active_installations(
        &self,
        max_installations: u32,
        identity: &Identity,
    ) -> Result<Vec<String>, PersistenceError>;

    async fn enable_installation(
        &self,
        identity: &Identity,
        installation_id: &str,
    ) -> Result<(), PersistenceError>;

    async fn disable_installation(
        &self,
        identity: &Identity,
        installation_id: &str,
    ) -> Result<(), PersistenceError>;
}
