//! Installation registry (C7): active/inactive tracking per identity.

use crate::error::PersistenceError;
use crate::identity::Identity;
use crate::store::Store;

pub(crate) async fn add_installations(
    store: &Store,
    identity: &Identity,
    timestamp: i64,
    installation_ids: &[String],
    enabled: bool,
) -> Result<(), PersistenceError> {
    let mut tx = store.begin().await?;

    for installation_id in installation_ids {
        // A previously-disabled installation must stay disabled if it is
        // merely re-announced (e.g. re-seen in a contact's bundle) rather
        // than explicitly re-enabled; only a brand new row takes the
        // caller-supplied `enabled` flag outright.
        let existing: Option<bool> = sqlx::query_scalar(
            "SELECT enabled FROM installations WHERE identity = ? AND installation_id = ?",
        )
        .bind(identity.as_bytes())
        .bind(installation_id)
        .fetch_optional(&mut *tx)
        .await?;

        let enabled = existing.unwrap_or(enabled);

        sqlx::query(
            "INSERT INTO installations (identity, installation_id, enabled, timestamp)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(identity, installation_id)
             DO UPDATE SET timestamp = excluded.timestamp",
        )
        .bind(identity.as_bytes())
        .bind(installation_id)
        .bind(enabled)
        .bind(timestamp)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::info!(
        identity = %identity,
        count = installation_ids.len(),
        enabled,
        "added installations"
    );
    Ok(())
}

pub(crate) async fn get_active_installations(
    store: &Store,
    max_installations: u32,
    identity: &Identity,
) -> Result<Vec<String>, PersistenceError> {
    let mut rows: Vec<String> = sqlx::query_scalar(
        "SELECT installation_id FROM installations
         WHERE identity = ? AND enabled = 1
         ORDER BY timestamp DESC, installation_id ASC
         LIMIT ?",
    )
    .bind(identity.as_bytes())
    .bind(max_installations as i64)
    .fetch_all(store.pool())
    .await?;

    let enabled_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM installations WHERE identity = ? AND enabled = 1")
            .bind(identity.as_bytes())
            .fetch_one(store.pool())
            .await?;
    if enabled_count > rows.len() as i64 {
        tracing::warn!(
            identity = %identity,
            enabled_count,
            cap = max_installations,
            "active installation cap evicted older installations from this read"
        );
    }

    rows.sort();
    Ok(rows)
}

pub(crate) async fn enable_installation(
    store: &Store,
    identity: &Identity,
    installation_id: &str,
) -> Result<(), PersistenceError> {
    set_enabled(store, identity, installation_id, true).await
}

pub(crate) async fn disable_installation(
    store: &Store,
    identity: &Identity,
    installation_id: &str,
) -> Result<(), PersistenceError> {
    set_enabled(store, identity, installation_id, false).await
}

async fn set_enabled(
    store: &Store,
    identity: &Identity,
    installation_id: &str,
    enabled: bool,
) -> Result<(), PersistenceError> {
    sqlx::query("UPDATE installations SET enabled = ? WHERE identity = ? AND installation_id = ?")
        .bind(enabled)
        .bind(identity.as_bytes())
        .bind(installation_id)
        .execute(store.pool())
        .await?;

    tracing::info!(identity = %identity, installation_id, enabled, "set installation state");
    Ok(())
}
