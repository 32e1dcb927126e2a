//! Ratchet info repository (C6): per-session ratchet initialization state.

use crate::error::PersistenceError;
use crate::identity::Identity;
use crate::models::RatchetInfoRow;
use crate::service::RatchetInfo;
use crate::store::Store;

/// Derive the deterministic, idempotent id for a (bundle_id, identity,
/// installation_id) triple. Domain-separated so this hash can never collide
/// with a hash computed for an unrelated purpose elsewhere in the crate.
fn derive_id(bundle_id: &[u8], identity: &[u8], installation_id: &str) -> Vec<u8> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"prekey-store.ratchet-info.id\0");
    hasher.update(&(bundle_id.len() as u64).to_le_bytes());
    hasher.update(bundle_id);
    hasher.update(&(identity.len() as u64).to_le_bytes());
    hasher.update(identity);
    hasher.update(installation_id.as_bytes());
    hasher.finalize().as_bytes().to_vec()
}

/// Resolve whether `bundle_id` belongs to one of our own private bundles
/// (in which case the ratchet was initiated with our private key material)
/// or a peer's public bundle. Returns `Err(BundleNotFound)` if it is in
/// neither table — `AddRatchetInfo` must not create dangling references.
async fn resolve_bundle_origin(
    store: &Store,
    bundle_id: &[u8],
) -> Result<bool, PersistenceError> {
    let is_private: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM private_bundles WHERE bundle_id = ?")
            .bind(bundle_id)
            .fetch_optional(store.pool())
            .await?;
    if is_private.is_some() {
        return Ok(true);
    }

    let is_public: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM public_bundles WHERE signed_pre_key = ? LIMIT 1")
            .bind(bundle_id)
            .fetch_optional(store.pool())
            .await?;
    if is_public.is_some() {
        return Ok(false);
    }

    let bundle_id_hex = hex::encode(bundle_id);
    tracing::warn!(bundle_id = %bundle_id_hex, "ratchet info rejected — bundle_id not found in private or public bundles");
    Err(PersistenceError::BundleNotFound {
        bundle_id: bundle_id_hex,
    })
}

pub(crate) async fn add_ratchet_info(
    store: &Store,
    symmetric_key: &[u8],
    their_identity: &Identity,
    bundle_id: &[u8],
    ephemeral_public_key: &[u8],
    installation_id: &str,
) -> Result<(), PersistenceError> {
    let is_own_bundle = resolve_bundle_origin(store, bundle_id).await?;

    let private_key_enc = if is_own_bundle {
        let private_key = crate::private_bundles::get_private_key_bundle(store, bundle_id)
            .await?
            .ok_or_else(|| PersistenceError::BundleNotFound {
                bundle_id: hex::encode(bundle_id),
            })?;
        Some(store.encrypt_field(&private_key)?)
    } else {
        None
    };

    let id = derive_id(bundle_id, their_identity.as_bytes(), installation_id);
    let symmetric_key_enc = store.encrypt_field(symmetric_key)?;

    sqlx::query(
        "INSERT INTO ratchet_info
            (id, identity, bundle_id, private_key_enc, symmetric_key_enc,
             ephemeral_public_key, installation_id)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            symmetric_key_enc = excluded.symmetric_key_enc,
            ephemeral_public_key = excluded.ephemeral_public_key",
    )
    .bind(&id)
    .bind(their_identity.as_bytes())
    .bind(bundle_id)
    .bind(&private_key_enc)
    .bind(&symmetric_key_enc)
    .bind(ephemeral_public_key)
    .bind(installation_id)
    .execute(store.pool())
    .await?;

    tracing::info!(
        identity = %their_identity,
        installation_id,
        own_bundle = is_own_bundle,
        "added ratchet info"
    );
    Ok(())
}

fn row_to_ratchet_info(
    store: &Store,
    row: RatchetInfoRow,
) -> Result<RatchetInfo, PersistenceError> {
    let private_key = row
        .private_key_enc
        .as_deref()
        .map(|enc| store.decrypt_field(enc))
        .transpose()?;
    let symmetric_key = store.decrypt_field(&row.symmetric_key_enc)?;

    Ok(RatchetInfo {
        id: row.id,
        identity: Identity::from_public_key(&row.identity)?,
        bundle_id: row.bundle_id,
        private_key,
        symmetric_key,
        ephemeral_public_key: row.ephemeral_public_key,
        installation_id: row.installation_id,
    })
}

pub(crate) async fn get_ratchet_info(
    store: &Store,
    bundle_id: &[u8],
    their_identity: &Identity,
    installation_id: &str,
) -> Result<Option<RatchetInfo>, PersistenceError> {
    let id = derive_id(bundle_id, their_identity.as_bytes(), installation_id);

    let row: Option<RatchetInfoRow> = sqlx::query_as(
        "SELECT id, identity, bundle_id, private_key_enc, symmetric_key_enc,
                ephemeral_public_key, installation_id
         FROM ratchet_info WHERE id = ?",
    )
    .bind(&id)
    .fetch_optional(store.pool())
    .await?;

    row.map(|row| row_to_ratchet_info(store, row)).transpose()
}

pub(crate) async fn get_any_ratchet_info(
    store: &Store,
    their_identity: &Identity,
    installation_id: &str,
) -> Result<Option<RatchetInfo>, PersistenceError> {
    let row: Option<RatchetInfoRow> = sqlx::query_as(
        "SELECT id, identity, bundle_id, private_key_enc, symmetric_key_enc,
                ephemeral_public_key, installation_id
         FROM ratchet_info
         WHERE identity = ? AND installation_id = ?
         ORDER BY rowid DESC
         LIMIT 1",
    )
    .bind(their_identity.as_bytes())
    .bind(installation_id)
    .fetch_optional(store.pool())
    .await?;

    row.map(|row| row_to_ratchet_info(store, row)).transpose()
}
