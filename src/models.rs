//! Database row models — these map to/from SQL rows. Columns suffixed
//! `_enc` hold base64 XChaCha20-Poly1305 ciphertext; see [`crate::crypto`].

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PrivateBundleRow {
    pub bundle_id: Vec<u8>,
    pub identity: Vec<u8>,
    pub installation_id: String,
    pub signed_pre_key: Vec<u8>,
    /// Encrypted (vault) private half of `signed_pre_key`.
    pub private_signed_pre_key_enc: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PublicBundleRow {
    pub identity: Vec<u8>,
    pub installation_id: String,
    pub version: i64,
    pub signed_pre_key: Vec<u8>,
    pub signature: Vec<u8>,
    pub identity_sig: Vec<u8>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InstallationRow {
    pub identity: Vec<u8>,
    pub installation_id: String,
    pub enabled: bool,
    pub timestamp: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RatchetInfoRow {
    pub id: Vec<u8>,
    pub identity: Vec<u8>,
    pub bundle_id: Vec<u8>,
    /// Encrypted (vault) private key, present iff the bundle was our own.
    pub private_key_enc: Option<String>,
    /// Encrypted (vault) ratchet root key.
    pub symmetric_key_enc: String,
    pub ephemeral_public_key: Vec<u8>,
    pub installation_id: String,
}
