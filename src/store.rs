//! Database abstraction over SQLite via sqlx (C1).

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use sqlx::{Sqlite, Transaction};

use crate::crypto::{self, VaultKey};
use crate::error::PersistenceError;

/// Central store handle. Cheap to clone — the pool is internally `Arc`'d;
/// the vault key is clone-and-zeroize-on-drop, so dropping the last handle
/// zeroes it out of memory.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    vault_key: VaultKey,
}

impl Store {
    /// Open (or create) the SQLite database at `db_path`, deriving the
    /// vault key from `passphrase` via Argon2id.
    ///
    /// Idempotent: opening an existing file with the same passphrase and an
    /// already-applied schema is a no-op beyond connecting — sqlx's
    /// migration bookkeeping table is what makes repeated opens cheap and
    /// safe.
    ///
    /// WAL journal mode and foreign-key enforcement are configured at
    /// connection time here, NOT inside a migration — SQLite forbids
    /// changing `journal_mode` inside a transaction, and sqlx wraps every
    /// migration in one.
    pub async fn open(db_path: &Path, passphrase: &str) -> Result<Self, PersistenceError> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(opts)
            .await
            .map_err(|e| PersistenceError::StoreUnavailable(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| PersistenceError::StoreUnavailable(format!("migration failed: {e}")))?;

        let salt = vault_salt(&pool).await?;
        let vault_key = crypto::vault_key_from_passphrase(passphrase, &salt)?;

        tracing::info!(path = %db_path.display(), "opened persistence store");

        Ok(Self { pool, vault_key })
    }

    /// Begin a scoped atomic update. Every public write operation runs
    /// inside exactly one of these; it commits in full or not at all.
    pub(crate) async fn begin(&self) -> Result<Transaction<'_, Sqlite>, PersistenceError> {
        Ok(self.pool.begin().await?)
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Encrypt a secret column value with the vault key.
    pub(crate) fn encrypt_field(&self, plaintext: &[u8]) -> Result<String, PersistenceError> {
        crypto::encrypt_field(&self.vault_key, plaintext)
    }

    /// Decrypt a vault-encrypted secret column value.
    pub(crate) fn decrypt_field(&self, b64: &str) -> Result<Vec<u8>, PersistenceError> {
        crypto::decrypt_field(&self.vault_key, b64)
    }
}

/// Fetch the store's vault salt, generating and persisting one on first
/// open. The salt is not secret — only the key it derives is.
async fn vault_salt(pool: &SqlitePool) -> Result<[u8; 16], PersistenceError> {
    if let Some(row) =
        sqlx::query_scalar::<_, String>("SELECT salt_hex FROM vault_meta WHERE id = 1")
            .fetch_optional(pool)
            .await?
    {
        let bytes = hex::decode(&row)
            .map_err(|e| PersistenceError::crypto(format!("bad stored salt: {e}")))?;
        return bytes
            .try_into()
            .map(|arr: [u8; 16]| arr)
            .map_err(|_| PersistenceError::crypto("stored salt has wrong length"));
    }

    let salt = crypto::generate_salt();
    sqlx::query("INSERT INTO vault_meta (id, salt_hex) VALUES (1, ?)")
        .bind(hex::encode(salt))
        .execute(pool)
        .await?;
    Ok(salt)
}
