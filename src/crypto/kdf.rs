//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! Every successful derivation returns a [`DerivedKey`] that carries the
//! key material together with the salt, round count and length that
//! produced it, so the exact same key can be re-derived later (see
//! [`verify_password`]).
//!
//! Round count and key length are caller-controlled.  Nothing here
//! clamps them; only values PBKDF2 cannot run with (zero rounds, zero
//! output length) are rejected.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::Hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::random::random_bytes;
use crate::errors::{CryptoError, Result};

/// Default number of PBKDF2 iterations.
pub const DEFAULT_ROUNDS: u32 = 4000;

/// Default length of a derived key in bytes.
pub const DEFAULT_DERIVED_KEY_LENGTH: usize = 128;

/// Default length of a generated salt in bytes.
pub const DEFAULT_SALT_LENGTH: usize = 32;

/// PBKDF2 tuning parameters used when the salt is generated for you.
///
/// `Default` yields the process-wide defaults: 4000 rounds, a 128-byte
/// key and a 32-byte salt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pbkdf2Params {
    /// Number of PBKDF2 iterations (default: 4000).
    pub rounds: u32,
    /// Derived key length in bytes (default: 128).
    pub key_length: usize,
    /// Generated salt length in bytes (default: 32).
    pub salt_length: usize,
}

impl Default for Pbkdf2Params {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
            key_length: DEFAULT_DERIVED_KEY_LENGTH,
            salt_length: DEFAULT_SALT_LENGTH,
        }
    }
}

/// Key material plus the parameters that produced it.
///
/// Invariant: `key().len() == derived_key_length()`.  Key and salt are
/// wiped from memory when the value is dropped, and `==` compares in
/// constant time.
///
/// In human-readable serde formats `key` and `salt` are base64 strings.
/// Deserializing re-checks the invariant.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(try_from = "DerivedKeyRecord")]
pub struct DerivedKey {
    #[serde(serialize_with = "base64_encode")]
    key: Vec<u8>,

    #[serde(serialize_with = "base64_encode")]
    salt: Vec<u8>,

    rounds: u32,

    derived_key_length: usize,
}

impl DerivedKey {
    /// The derived key bytes.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// The salt the key was derived with.
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// The PBKDF2 iteration count.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// The requested (and produced) key length in bytes.
    pub fn derived_key_length(&self) -> usize {
        self.derived_key_length
    }
}

impl PartialEq for DerivedKey {
    fn eq(&self, other: &Self) -> bool {
        self.rounds == other.rounds
            && self.derived_key_length == other.derived_key_length
            && bool::from(self.salt.ct_eq(&other.salt) & self.key.ct_eq(&other.key))
    }
}

impl Eq for DerivedKey {}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"<redacted>")
            .field("salt_len", &self.salt.len())
            .field("rounds", &self.rounds)
            .field("derived_key_length", &self.derived_key_length)
            .finish()
    }
}

/// Derive a key from `password` with a fresh random salt and the
/// default parameters.
///
/// Calling this twice with the same password gives two different salts,
/// and therefore two different keys.
pub fn derive_default(password: &str) -> Result<DerivedKey> {
    derive_with_params(password, &Pbkdf2Params::default())
}

/// Derive a key from `password` with a fresh random salt of
/// `params.salt_length` bytes.
pub fn derive_with_params(password: &str, params: &Pbkdf2Params) -> Result<DerivedKey> {
    let salt = random_bytes(params.salt_length)?;
    derive(password, &salt, params.rounds, params.key_length)
}

/// Run PBKDF2-HMAC-SHA256 over the UTF-8 bytes of `password`.
///
/// The same password, salt, rounds and length always produce the same
/// key.  The returned key is exactly `key_length` bytes long.  An empty
/// password is allowed.
pub fn derive(password: &str, salt: &[u8], rounds: u32, key_length: usize) -> Result<DerivedKey> {
    if rounds == 0 {
        tracing::warn!(key_length, "PBKDF2 rejected zero rounds");
        return Err(CryptoError::DerivationFailure(
            "PBKDF2 rounds must be at least 1".into(),
        ));
    }
    if key_length == 0 {
        tracing::warn!(rounds, "PBKDF2 rejected zero-length output");
        return Err(CryptoError::DerivationFailure(
            "derived key length must be at least 1".into(),
        ));
    }

    // Held in a zeroizing buffer until the whole derivation succeeds.
    let mut key = Zeroizing::new(vec![0u8; key_length]);
    pbkdf2::pbkdf2::<Hmac<Sha256>>(password.as_bytes(), salt, rounds, &mut key).map_err(|e| {
        tracing::warn!(rounds, key_length, error = %e, "PBKDF2 derivation failed");
        CryptoError::DerivationFailure(format!("PBKDF2-HMAC-SHA256 failed: {e}"))
    })?;

    tracing::debug!(rounds, key_length, salt_len = salt.len(), "derived PBKDF2 key");

    Ok(DerivedKey {
        key: std::mem::take(&mut *key),
        salt: salt.to_vec(),
        rounds,
        derived_key_length: key_length,
    })
}

/// Check `password` against a previously derived key.
///
/// Re-derives with the stored salt, rounds and length, then compares the
/// key bytes in constant time.
pub fn verify_password(password: &str, expected: &DerivedKey) -> Result<bool> {
    let candidate = derive(
        password,
        &expected.salt,
        expected.rounds,
        expected.derived_key_length,
    )?;
    Ok(bool::from(candidate.key.ct_eq(&expected.key)))
}

// ---------------------------------------------------------------------------
// Deserialization
// ---------------------------------------------------------------------------

/// Wire shape of a [`DerivedKey`] before its invariant has been checked.
#[derive(Deserialize, Zeroize, ZeroizeOnDrop)]
struct DerivedKeyRecord {
    #[serde(deserialize_with = "base64_decode")]
    key: Vec<u8>,

    #[serde(deserialize_with = "base64_decode")]
    salt: Vec<u8>,

    rounds: u32,

    derived_key_length: usize,
}

impl TryFrom<DerivedKeyRecord> for DerivedKey {
    type Error = CryptoError;

    fn try_from(mut record: DerivedKeyRecord) -> Result<Self> {
        if record.rounds == 0 {
            return Err(CryptoError::Serialization(
                "derived key record has zero rounds".into(),
            ));
        }
        if record.derived_key_length == 0 {
            return Err(CryptoError::Serialization(
                "derived key record has zero key length".into(),
            ));
        }
        if record.key.len() != record.derived_key_length {
            return Err(CryptoError::Serialization(format!(
                "derived key is {} bytes but record says {}",
                record.key.len(),
                record.derived_key_length
            )));
        }

        Ok(DerivedKey {
            key: std::mem::take(&mut record.key),
            salt: std::mem::take(&mut record.salt),
            rounds: record.rounds,
            derived_key_length: record.derived_key_length,
        })
    }
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = BASE64.encode(data);
    serializer.serialize_str(&encoded)
}

fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = Zeroizing::new(String::deserialize(deserializer)?);
    BASE64.decode(s.as_bytes()).map_err(serde::de::Error::custom)
}
