//! Private bundle repository (C4): the local user's own pre-key bundles.

use crate::error::PersistenceError;
use crate::identity::Identity;
use crate::models::{PrivateBundleRow, PublicBundleRow};
use crate::public_bundles;
use crate::service::{Bundle, BundleContainer, SignedPreKey};
use crate::store::Store;

pub(crate) async fn add_private_bundle(
    store: &Store,
    container: &BundleContainer,
) -> Result<(), PersistenceError> {
    let identity_bytes = container.identity.as_bytes();
    let mut tx = store.begin().await?;

    for entry in &container.entries {
        let bundle_id = BundleContainer::bundle_id_for(entry);
        let private_enc = store.encrypt_field(&entry.private_signed_pre_key)?;

        let inserted = sqlx::query(
            "INSERT INTO private_bundles
                (bundle_id, identity, installation_id, signed_pre_key,
                 private_signed_pre_key_enc, timestamp)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(bundle_id) DO NOTHING",
        )
        .bind(&bundle_id)
        .bind(identity_bytes)
        .bind(&entry.installation_id)
        .bind(&entry.signed_pre_key)
        .bind(&private_enc)
        .bind(entry.timestamp)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if !inserted {
            // Already present — repeated submission of the same bundle_id
            // is idempotent, including the derived public row.
            continue;
        }

        // A freshly rotated signed pre-key is the newest generation for
        // this installation; no caller-supplied version exists for a
        // private bundle entry, so this crate assigns the next one.
        let next_version: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(version) + 1, 0) FROM public_bundles
             WHERE identity = ? AND installation_id = ?",
        )
        .bind(identity_bytes)
        .bind(&entry.installation_id)
        .fetch_one(&mut *tx)
        .await?;

        public_bundles::upsert_entry(
            &mut tx,
            identity_bytes,
            &entry.installation_id,
            next_version,
            &entry.signed_pre_key,
            &entry.signature,
            &container.identity_sig,
            entry.timestamp,
        )
        .await?;
    }

    tx.commit().await?;
    tracing::info!(
        identity = %container.identity,
        installations = container.entries.len(),
        "added private bundle"
    );
    Ok(())
}

pub(crate) async fn get_private_key_bundle(
    store: &Store,
    bundle_id: &[u8],
) -> Result<Option<Vec<u8>>, PersistenceError> {
    let row: Option<PrivateBundleRow> = sqlx::query_as(
        "SELECT bundle_id, identity, installation_id, signed_pre_key,
                private_signed_pre_key_enc, timestamp
         FROM private_bundles WHERE bundle_id = ?",
    )
    .bind(bundle_id)
    .fetch_optional(store.pool())
    .await?;

    match row {
        Some(row) => Ok(Some(store.decrypt_field(&row.private_signed_pre_key_enc)?)),
        None => Ok(None),
    }
}

pub(crate) async fn get_any_private_bundle(
    store: &Store,
    identity: &Identity,
    installation_ids: &[String],
) -> Result<Option<Bundle>, PersistenceError> {
    if installation_ids.is_empty() {
        return Ok(None);
    }

    // Placeholders for the IN (...) clause — installation ids are plain
    // strings under our own control server-side, but bind them positionally
    // regardless of content.
    let placeholders = installation_ids
        .iter()
        .map(|_| "?")
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT bundle_id, identity, installation_id, signed_pre_key,
                private_signed_pre_key_enc, timestamp
         FROM private_bundles
         WHERE identity = ? AND installation_id IN ({placeholders})
         ORDER BY timestamp DESC, rowid DESC
         LIMIT 1"
    );

    let mut query = sqlx::query_as::<_, PrivateBundleRow>(&sql).bind(identity.as_bytes());
    for installation_id in installation_ids {
        query = query.bind(installation_id);
    }

    let row = query.fetch_optional(store.pool()).await?;

    let Some(row) = row else {
        return Ok(None);
    };

    // AddPrivateBundle always writes the matching public row in the same
    // transaction (see above), so the public representation — version,
    // signature, identity_sig — lives in public_bundles, keyed by the same
    // signed_pre_key. Join it back out rather than fabricating placeholders.
    let public_row: Option<PublicBundleRow> = sqlx::query_as(
        "SELECT identity, installation_id, version, signed_pre_key, signature, identity_sig, timestamp
         FROM public_bundles
         WHERE identity = ? AND installation_id = ? AND signed_pre_key = ?",
    )
    .bind(identity.as_bytes())
    .bind(&row.installation_id)
    .bind(&row.signed_pre_key)
    .fetch_optional(store.pool())
    .await?;

    let (version, signature, identity_sig) = match public_row {
        Some(public_row) => (public_row.version, public_row.signature, public_row.identity_sig),
        None => (0, Vec::new(), Vec::new()),
    };

    let mut signed_pre_keys = std::collections::BTreeMap::new();
    signed_pre_keys.insert(
        row.installation_id.clone(),
        SignedPreKey {
            signed_pre_key: row.signed_pre_key,
            version,
            signature,
        },
    );

    Ok(Some(Bundle {
        identity: identity.clone(),
        identity_sig,
        signed_pre_keys,
    }))
}
