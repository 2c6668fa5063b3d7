pub mod crypto;
pub mod errors;

pub use errors::{CryptoError, Result};
