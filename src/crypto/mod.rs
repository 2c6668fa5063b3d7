//! Cryptographic primitives for symcrypt.
//!
//! This module provides:
//! - OS-backed secure random bytes (`random`)
//! - PBKDF2-HMAC-SHA256 password-based key derivation (`kdf`)
//! - AES-128/256-CBC encryption with PKCS7 padding (`cipher`)

pub mod cipher;
pub mod kdf;
pub mod random;

// Re-export the most commonly used items so callers can write:
//   use symcrypt::crypto::{aes256_encrypt, derive_default, random_bytes, ...};
pub use cipher::{
    aes128_decrypt, aes128_encrypt, aes256_decrypt, aes256_encrypt, execute, normalize,
    Direction, KeySize, AES_BLOCK_SIZE,
};
pub use kdf::{
    derive, derive_default, derive_with_params, verify_password, DerivedKey, Pbkdf2Params,
    DEFAULT_DERIVED_KEY_LENGTH, DEFAULT_ROUNDS, DEFAULT_SALT_LENGTH,
};
pub use random::{fill_random, random_bytes};
