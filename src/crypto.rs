//! At-rest column encryption for secret fields.
//!
//! SQLite has no native page encryption here, so secret columns
//! (`private_signed_pre_key`, `symmetric_key`, `private_key`) are encrypted
//! individually with XChaCha20-Poly1305, keyed by a vault key derived from
//! the open-time passphrase via Argon2id. Non-secret columns (identities,
//! timestamps, installation ids, the ephemeral ratchet public key) stay
//! plaintext so they remain indexable.
//!
//! Ciphertext wire format: `nonce (24 bytes) || ciphertext+tag`, base64-encoded
//! for storage in a `TEXT` column.

use base64::{engine::general_purpose::STANDARD, Engine};
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng as AeadOsRng},
    XChaCha20Poly1305,
};
use zeroize::ZeroizeOnDrop;

use crate::error::PersistenceError;

/// 32-byte vault key, held in memory only, zeroized on drop.
#[derive(Clone, ZeroizeOnDrop)]
pub struct VaultKey(pub [u8; 32]);

/// Argon2id parameters tuned for interactive desktop use.
fn argon2_params() -> argon2::Params {
    argon2::Params::new(19 * 1024, 2, 1, Some(32)).expect("static argon2 params are valid")
}

/// Generate a fresh random 16-byte salt. Store it alongside the database —
/// it is not secret, only the derived key is.
pub fn generate_salt() -> [u8; 16] {
    use rand::RngCore;
    let mut salt = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

/// Derive the 32-byte vault key from the caller-supplied passphrase.
pub fn vault_key_from_passphrase(
    passphrase: &str,
    salt: &[u8; 16],
) -> Result<VaultKey, PersistenceError> {
    let argon2 = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2_params(),
    );
    let mut out = [0u8; 32];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut out)
        .map_err(|e| PersistenceError::StoreUnavailable(format!("key derivation failed: {e}")))?;
    Ok(VaultKey(out))
}

/// Encrypt a secret column value; returns base64 ciphertext for storage.
pub fn encrypt_field(key: &VaultKey, plaintext: &[u8]) -> Result<String, PersistenceError> {
    let cipher = XChaCha20Poly1305::new_from_slice(&key.0)
        .map_err(|_| PersistenceError::crypto("bad vault key length"))?;
    let nonce = XChaCha20Poly1305::generate_nonce(&mut AeadOsRng);
    let ct = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| PersistenceError::crypto("field encryption failed"))?;
    let mut out = Vec::with_capacity(24 + ct.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ct);
    Ok(STANDARD.encode(out))
}

/// Decrypt a secret column value previously produced by [`encrypt_field`].
pub fn decrypt_field(key: &VaultKey, b64: &str) -> Result<Vec<u8>, PersistenceError> {
    let data = STANDARD
        .decode(b64)
        .map_err(|e| PersistenceError::crypto(format!("bad ciphertext encoding: {e}")))?;
    if data.len() < 24 {
        return Err(PersistenceError::crypto("ciphertext too short"));
    }
    let (nonce_bytes, ct) = data.split_at(24);
    let nonce = chacha20poly1305::XNonce::from_slice(nonce_bytes);
    let cipher = XChaCha20Poly1305::new_from_slice(&key.0)
        .map_err(|_| PersistenceError::crypto("bad vault key length"))?;
    cipher
        .decrypt(nonce, ct)
        .map_err(|_| PersistenceError::crypto("field decryption failed — wrong key or tampering"))
}
