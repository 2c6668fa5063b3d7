use thiserror::Error;

/// All errors that can occur in symcrypt.
#[derive(Debug, Error)]
pub enum CryptoError {
    // --- Cipher errors ---
    #[error("Invalid key — no key was supplied")]
    InvalidKey,

    #[error("Cipher setup failed: {0}")]
    CipherSetupFailure(String),

    #[error("Cipher execution failed: {0}")]
    CipherExecutionFailure(String),

    // --- Key derivation errors ---
    #[error("Key derivation failed: {0}")]
    DerivationFailure(String),

    // --- Randomness errors ---
    #[error("Secure random source unavailable: {0}")]
    RandomSourceFailure(String),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Convenience type alias for symcrypt results.
pub type Result<T> = std::result::Result<T, CryptoError>;
