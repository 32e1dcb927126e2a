//! Public bundle repository (C5): peers' published pre-key bundles,
//! versioned per (identity, installation_id).

use std::collections::BTreeMap;

use sqlx::{Sqlite, Transaction};

use crate::error::PersistenceError;
use crate::identity::Identity;
use crate::models::PublicBundleRow;
use crate::service::{Bundle, SignedPreKey};
use crate::store::Store;

/// Upsert one installation's signed pre-key record into `public_bundles`,
/// and register the installation as active. Shared by `AddPublicBundle`
/// and the public-row side effect of `AddPrivateBundle`.
///
/// Re-inserting a row with an identical (identity, installation_id,
/// version, signed_pre_key) is a no-op; a different version always lands
/// as its own row regardless of whether it is numerically higher or lower
/// than what is already stored — `GetPublicBundle` is what picks the
/// maximum version back out, not this insert.
pub(crate) async fn upsert_entry(
    tx: &mut Transaction<'_, Sqlite>,
    identity: &[u8],
    installation_id: &str,
    version: i64,
    signed_pre_key: &[u8],
    signature: &[u8],
    identity_sig: &[u8],
    timestamp: i64,
) -> Result<(), PersistenceError> {
    sqlx::query(
        "INSERT INTO public_bundles
            (identity, installation_id, version, signed_pre_key, signature, identity_sig, timestamp)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(identity, installation_id, version) DO NOTHING",
    )
    .bind(identity)
    .bind(installation_id)
    .bind(version)
    .bind(signed_pre_key)
    .bind(signature)
    .bind(identity_sig)
    .bind(timestamp)
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        "INSERT INTO installations (identity, installation_id, enabled, timestamp)
         VALUES (?, ?, 1, ?)
         ON CONFLICT(identity, installation_id)
         DO UPDATE SET enabled = 1, timestamp = excluded.timestamp",
    )
    .bind(identity)
    .bind(installation_id)
    .bind(timestamp)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub(crate) async fn add_public_bundle(
    store: &Store,
    bundle: &Bundle,
) -> Result<(), PersistenceError> {
    let identity_bytes = bundle.identity.as_bytes();
    let mut tx = store.begin().await?;

    for (installation_id, record) in &bundle.signed_pre_keys {
        upsert_entry(
            &mut tx,
            identity_bytes,
            installation_id,
            record.version,
            &record.signed_pre_key,
            &record.signature,
            &bundle.identity_sig,
            current_timestamp(),
        )
        .await?;
    }

    tx.commit().await?;
    tracing::info!(
        identity = %bundle.identity,
        installations = bundle.signed_pre_keys.len(),
        "added public bundle"
    );
    Ok(())
}

pub(crate) async fn get_public_bundle(
    store: &Store,
    identity: &Identity,
    installation_ids: &[String],
) -> Result<Option<Bundle>, PersistenceError> {
    if installation_ids.is_empty() {
        return Ok(None);
    }

    let mut signed_pre_keys = BTreeMap::new();
    let mut identity_sig = Vec::new();

    for installation_id in installation_ids {
        let row: Option<PublicBundleRow> = sqlx::query_as(
            "SELECT identity, installation_id, version, signed_pre_key, signature, identity_sig, timestamp
             FROM public_bundles
             WHERE identity = ? AND installation_id = ?
             ORDER BY version DESC, timestamp DESC, rowid DESC
             LIMIT 1",
        )
        .bind(identity.as_bytes())
        .bind(installation_id)
        .fetch_optional(store.pool())
        .await?;

        if let Some(row) = row {
            identity_sig = row.identity_sig.clone();
            signed_pre_keys.insert(
                installation_id.clone(),
                SignedPreKey {
                    signed_pre_key: row.signed_pre_key,
                    version: row.version,
                    signature: row.signature,
                },
            );
        }
    }

    if signed_pre_keys.is_empty() {
        return Ok(None);
    }

    Ok(Some(Bundle {
        identity: identity.clone(),
        identity_sig,
        signed_pre_keys,
    }))
}

fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
