//! Cryptographically secure random bytes.
//!
//! Everything here reads from the operating system's CSPRNG through
//! `rand::rngs::OsRng`.  A failing OS source is reported as an error
//! instead of handing back an all-zero buffer, since these bytes end
//! up as salts and keys.

use rand::rngs::OsRng;
use rand::TryRngCore;

use crate::errors::{CryptoError, Result};

/// Return exactly `length` random bytes from the OS CSPRNG.
///
/// `length == 0` yields an empty vector.
pub fn random_bytes(length: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; length];
    fill_random(&mut bytes)?;
    Ok(bytes)
}

/// Fill `buf` in place with random bytes from the OS CSPRNG.
pub fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng.try_fill_bytes(buf).map_err(|e| {
        tracing::warn!(len = buf.len(), error = %e, "OS random source failed");
        CryptoError::RandomSourceFailure(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_is_empty() {
        assert!(random_bytes(0).unwrap().is_empty());
    }

    #[test]
    fn fill_random_overwrites_buffer() {
        let mut buf = [0u8; 64];
        fill_random(&mut buf).unwrap();
        // 64 zero bytes from a CSPRNG is not a realistic outcome.
        assert_ne!(buf, [0u8; 64]);
    }
}
