//! Identity codec (C3).
//!
//! Key generation and point compression belong to the crypto collaborator
//! this crate consumes, not to the persistence core. `Identity` only wraps
//! the already-compressed public-key bytes the caller hands in, so that the
//! same bytes always collide to the same foreign key everywhere in the
//! store. The one piece of validation owned here is rejecting the wrong
//! byte length.

use std::fmt;

use crate::error::PersistenceError;

/// Canonical byte identity for a user, used as a foreign key across every
/// table in the store. Two `Identity` values are equal iff their underlying
/// compressed public-key bytes are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(Vec<u8>);

/// Compressed public keys in this protocol family are 32 bytes
/// (Curve25519-family points, per the crypto collaborator's convention).
pub const IDENTITY_LEN: usize = 32;

impl Identity {
    /// Wrap already-compressed public-key bytes as a canonical identity.
    pub fn from_public_key(bytes: &[u8]) -> Result<Self, PersistenceError> {
        if bytes.len() != IDENTITY_LEN {
            return Err(PersistenceError::crypto(format!(
                "identity must be {IDENTITY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Raw bytes, e.g. for storing as a SQL `BLOB`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl From<Identity> for Vec<u8> {
    fn from(id: Identity) -> Self {
        id.0
    }
}
