//! `SqlitePersistence`: the concrete [`PersistenceService`] implementation
//! wired to a [`Store`], delegating each method to its repository module.

use std::path::Path;

use async_trait::async_trait;

use crate::error::PersistenceError;
use crate::identity::Identity;
use crate::service::{Bundle, BundleContainer, PersistenceService, RatchetInfo};
use crate::store::Store;
use crate::{installations, private_bundles, public_bundles, ratchet_info};

/// SQLite-backed realization of the persistence core.
#[derive(Clone)]
pub struct SqlitePersistence {
    store: Store,
}

impl SqlitePersistence {
    pub async fn open(db_path: &Path, passphrase: &str) -> Result<Self, PersistenceError> {
        let store = Store::open(db_path, passphrase).await?;
        Ok(Self { store })
    }
}

#[async_trait]
impl PersistenceService for SqlitePersistence {
    async fn add_private_bundle(&self, container: &BundleContainer) -> Result<(), PersistenceError> {
        private_bundles::add_private_bundle(&self.store, container).await
    }

    async fn get_private_key_bundle(
        &self,
        bundle_id: &[u8],
    ) -> Result<Option<Vec<u8>>, PersistenceError> {
        private_bundles::get_private_key_bundle(&self.store, bundle_id).await
    }

    async fn get_any_private_bundle(
        &self,
        identity: &Identity,
        installation_ids: &[String],
    ) -> Result<Option<Bundle>, PersistenceError> {
        private_bundles::get_any_private_bundle(&self.store, identity, installation_ids).await
    }

    async fn add_public_bundle(&self, bundle: &Bundle) -> Result<(), PersistenceError> {
        public_bundles::add_public_bundle(&self.store, bundle).await
    }

    async fn get_public_bundle(
        &self,
        identity: &Identity,
        installation_ids: &[String],
    ) -> Result<Option<Bundle>, PersistenceError> {
        public_bundles::get_public_bundle(&self.store, identity, installation_ids).await
    }

    async fn add_ratchet_info(
        &self,
        symmetric_key: &[u8],
        their_identity: &Identity,
        bundle_id: &[u8],
        ephemeral_public_key: &[u8],
        installation_id: &str,
    ) -> Result<(), PersistenceError> {
        ratchet_info::add_ratchet_info(
            &self.store,
            symmetric_key,
            their_identity,
            bundle_id,
            ephemeral_public_key,
            installation_id,
        )
        .await
    }

    async fn get_ratchet_info(
        &self,
        bundle_id: &[u8],
        their_identity: &Identity,
        installation_id: &str,
    ) -> Result<Option<RatchetInfo>, PersistenceError> {
        ratchet_info::get_ratchet_info(&self.store, bundle_id, their_identity, installation_id)
            .await
    }

    async fn get_any_ratchet_info(
        &self,
        their_identity: &Identity,
        installation_id: &str,
    ) -> Result<Option<RatchetInfo>, PersistenceError> {
        ratchet_info::get_any_ratchet_info(&self.store, their_identity, installation_id).await
    }

    async fn add_installations(
        &self,
        identity: &Identity,
        timestamp: i64,
        installation_ids: &[String],
        enabled: bool,
    ) -> Result<(), PersistenceError> {
        installations::add_installations(&self.store, identity, timestamp, installation_ids, enabled)
            .await
    }

    async fn get_active_installations(
        &self,
        max_installations: u32,
        identity: &Identity,
    ) -> Result<Vec<String>, PersistenceError> {
        installations::get_active_installations(&self.store, max_installations, identity).await
    }

    async fn enable_installation(
        &self,
        identity: &Identity,
        installation_id: &str,
    ) -> Result<(), PersistenceError> {
        installations::enable_installation(&self.store, identity, installation_id).await
    }

    async fn disable_installation(
        &self,
        identity: &Identity,
        installation_id: &str,
    ) -> Result<(), PersistenceError> {
        installations::disable_installation(&self.store, identity, installation_id).await
    }
}
