//! AES-CBC encryption and decryption with PKCS7 padding.
//!
//! Four entry points cover the two key strengths:
//!
//! | operation         | key length |
//! |-------------------|------------|
//! | `aes128_encrypt`  | 16 bytes   |
//! | `aes128_decrypt`  | 16 bytes   |
//! | `aes256_encrypt`  | 32 bytes   |
//! | `aes256_decrypt`  | 32 bytes   |
//!
//! All four go through [`execute`], which runs the cipher as a stream:
//! one `update` over the whole input followed by a `finalize` that
//! appends (encrypt) or checks and strips (decrypt) the padding.
//!
//! Keys and IVs of the wrong length are **not** rejected.  They are
//! truncated or zero-padded by [`normalize`], which keeps ciphertext
//! compatible with existing callers.  Do not rely on this for new data:
//! a short key is padded with predictable zero bytes.

use aes::{Aes128, Aes256};
use cbc::cipher::block_padding::{Padding, Pkcs7};
use cbc::cipher::consts::U16;
use cbc::cipher::generic_array::GenericArray;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, BlockSizeUser, KeyIvInit};
use zeroize::Zeroizing;

use crate::errors::{CryptoError, Result};

/// AES block size in bytes.  CBC IVs are always this long.
pub const AES_BLOCK_SIZE: usize = 16;

/// AES key strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySize {
    /// AES-128, 16-byte key.
    Aes128,
    /// AES-256, 32-byte key.
    Aes256,
}

impl KeySize {
    /// Key length in bytes.
    pub fn key_len(self) -> usize {
        match self {
            KeySize::Aes128 => 16,
            KeySize::Aes256 => 32,
        }
    }
}

/// Which way the cipher runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Plaintext in, padded ciphertext out.
    Encrypt,
    /// Ciphertext in, unpadded plaintext out.
    Decrypt,
}

/// Encrypt `data` with AES-128-CBC and PKCS7 padding.
pub fn aes128_encrypt(data: &[u8], key: Option<&[u8]>, iv: &[u8]) -> Result<Vec<u8>> {
    execute(Direction::Encrypt, KeySize::Aes128, data, key, iv)
}

/// Decrypt AES-128-CBC ciphertext and strip its PKCS7 padding.
pub fn aes128_decrypt(data: &[u8], key: Option<&[u8]>, iv: &[u8]) -> Result<Vec<u8>> {
    execute(Direction::Decrypt, KeySize::Aes128, data, key, iv)
}

/// Encrypt `data` with AES-256-CBC and PKCS7 padding.
pub fn aes256_encrypt(data: &[u8], key: Option<&[u8]>, iv: &[u8]) -> Result<Vec<u8>> {
    execute(Direction::Encrypt, KeySize::Aes256, data, key, iv)
}

/// Decrypt AES-256-CBC ciphertext and strip its PKCS7 padding.
pub fn aes256_decrypt(data: &[u8], key: Option<&[u8]>, iv: &[u8]) -> Result<Vec<u8>> {
    execute(Direction::Decrypt, KeySize::Aes256, data, key, iv)
}

/// Copy `bytes` into a buffer of exactly `len` bytes.
///
/// Longer input is truncated, shorter input is zero-padded on the right.
/// This is legacy behavior kept for compatibility; a new design would
/// reject a key of the wrong length instead.
pub fn normalize(bytes: &[u8], len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    let n = bytes.len().min(len);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

/// Largest output a padded CBC run can produce for `input_len` bytes.
pub fn max_output_len(input_len: usize) -> usize {
    (input_len / AES_BLOCK_SIZE + 1) * AES_BLOCK_SIZE
}

/// Run AES-CBC/PKCS7 in `direction` over `data`.
///
/// `key` is normalized to `key_size.key_len()` bytes and `iv` to
/// [`AES_BLOCK_SIZE`] bytes before the cipher is built.  A missing key
/// fails with [`CryptoError::InvalidKey`] before any cipher exists.
/// Bad padding and misaligned ciphertext both surface as
/// [`CryptoError::CipherExecutionFailure`].
pub fn execute(
    direction: Direction,
    key_size: KeySize,
    data: &[u8],
    key: Option<&[u8]>,
    iv: &[u8],
) -> Result<Vec<u8>> {
    let Some(key) = key else {
        tracing::warn!(?direction, ?key_size, "no key supplied to AES-CBC");
        return Err(CryptoError::InvalidKey);
    };

    let key = Zeroizing::new(normalize(key, key_size.key_len()));
    let iv = Zeroizing::new(normalize(iv, AES_BLOCK_SIZE));

    let result = match (direction, key_size) {
        (Direction::Encrypt, KeySize::Aes128) => {
            cbc::Encryptor::<Aes128>::new_from_slices(&key, &iv)
                .map_err(setup_error)
                .and_then(|mode| run(Encrypting::new(mode), data))
        }
        (Direction::Encrypt, KeySize::Aes256) => {
            cbc::Encryptor::<Aes256>::new_from_slices(&key, &iv)
                .map_err(setup_error)
                .and_then(|mode| run(Encrypting::new(mode), data))
        }
        (Direction::Decrypt, KeySize::Aes128) => {
            cbc::Decryptor::<Aes128>::new_from_slices(&key, &iv)
                .map_err(setup_error)
                .and_then(|mode| run(Decrypting::new(mode), data))
        }
        (Direction::Decrypt, KeySize::Aes256) => {
            cbc::Decryptor::<Aes256>::new_from_slices(&key, &iv)
                .map_err(setup_error)
                .and_then(|mode| run(Decrypting::new(mode), data))
        }
    };

    match &result {
        Ok(out) => tracing::debug!(
            ?direction,
            ?key_size,
            input_len = data.len(),
            output_len = out.len(),
            "AES-CBC operation complete"
        ),
        Err(e) => tracing::warn!(
            ?direction,
            ?key_size,
            input_len = data.len(),
            error = %e,
            "AES-CBC operation failed"
        ),
    }

    result
}

fn setup_error(e: impl std::fmt::Display) -> CryptoError {
    CryptoError::CipherSetupFailure(format!("cannot build AES-CBC context: {e}"))
}

// ---------------------------------------------------------------------------
// Streaming execution
// ---------------------------------------------------------------------------

/// A one-shot cipher run split into an update phase and a final phase.
trait CipherStream {
    /// Feed `input`, writing every byte that is ready into `out`.
    /// Returns how many bytes were written.
    fn update(&mut self, input: &[u8], out: &mut [u8]) -> Result<usize>;

    /// Flush the buffered tail into `out`.  Returns how many bytes were
    /// written.
    fn finalize(self, out: &mut [u8]) -> Result<usize>;
}

/// Drive `stream` over `data` and return exactly the bytes produced.
///
/// The working buffer is sized with [`max_output_len`] and is wiped
/// whether or not the run succeeds.
fn run<S: CipherStream>(mut stream: S, data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Zeroizing::new(vec![0u8; max_output_len(data.len())]);

    let written = stream.update(data, &mut out)?;
    let tail = stream.finalize(&mut out[written..])?;

    out.truncate(written + tail);
    Ok(std::mem::take(&mut *out))
}

type Block = GenericArray<u8, U16>;

/// Encrypt side: emits every complete block on update and the padded
/// final block on finalize.
struct Encrypting<E> {
    mode: E,
    pending: Zeroizing<Vec<u8>>,
}

impl<E> Encrypting<E> {
    fn new(mode: E) -> Self {
        Self {
            mode,
            pending: Zeroizing::new(Vec::with_capacity(AES_BLOCK_SIZE)),
        }
    }
}

impl<E> CipherStream for Encrypting<E>
where
    E: BlockEncryptMut + BlockSizeUser<BlockSize = U16>,
{
    fn update(&mut self, input: &[u8], out: &mut [u8]) -> Result<usize> {
        self.pending.extend_from_slice(input);
        let ready = self.pending.len() / AES_BLOCK_SIZE * AES_BLOCK_SIZE;
        let dest = out.get_mut(..ready).ok_or_else(|| short_buffer(ready))?;

        dest.copy_from_slice(&self.pending[..ready]);
        for chunk in dest.chunks_exact_mut(AES_BLOCK_SIZE) {
            self.mode.encrypt_block_mut(Block::from_mut_slice(chunk));
        }
        self.pending.drain(..ready);
        Ok(ready)
    }

    fn finalize(mut self, out: &mut [u8]) -> Result<usize> {
        let dest = out
            .get_mut(..AES_BLOCK_SIZE)
            .ok_or_else(|| short_buffer(AES_BLOCK_SIZE))?;

        let used = self.pending.len();
        let mut block = Block::default();
        block[..used].copy_from_slice(&self.pending);
        Pkcs7::pad(&mut block, used);
        self.mode.encrypt_block_mut(&mut block);

        dest.copy_from_slice(&block);
        block.fill(0);
        Ok(AES_BLOCK_SIZE)
    }
}

/// Decrypt side: holds back the last block on update, since only the
/// final block carries padding.
struct Decrypting<D> {
    mode: D,
    pending: Zeroizing<Vec<u8>>,
}

impl<D> Decrypting<D> {
    fn new(mode: D) -> Self {
        Self {
            mode,
            pending: Zeroizing::new(Vec::with_capacity(AES_BLOCK_SIZE)),
        }
    }
}

impl<D> CipherStream for Decrypting<D>
where
    D: BlockDecryptMut + BlockSizeUser<BlockSize = U16>,
{
    fn update(&mut self, input: &[u8], out: &mut [u8]) -> Result<usize> {
        self.pending.extend_from_slice(input);
        if self.pending.len() <= AES_BLOCK_SIZE {
            return Ok(0);
        }

        let ready = (self.pending.len() - 1) / AES_BLOCK_SIZE * AES_BLOCK_SIZE;
        let dest = out.get_mut(..ready).ok_or_else(|| short_buffer(ready))?;

        dest.copy_from_slice(&self.pending[..ready]);
        for chunk in dest.chunks_exact_mut(AES_BLOCK_SIZE) {
            self.mode.decrypt_block_mut(Block::from_mut_slice(chunk));
        }
        self.pending.drain(..ready);
        Ok(ready)
    }

    fn finalize(mut self, out: &mut [u8]) -> Result<usize> {
        if self.pending.len() != AES_BLOCK_SIZE {
            return Err(CryptoError::CipherExecutionFailure(format!(
                "ciphertext is not a whole number of {AES_BLOCK_SIZE}-byte blocks"
            )));
        }

        let mut block = Zeroizing::new([0u8; AES_BLOCK_SIZE]);
        block.copy_from_slice(&self.pending);
        self.mode.decrypt_block_mut(Block::from_mut_slice(&mut block[..]));

        let plain = Pkcs7::unpad(Block::from_slice(&block[..])).map_err(|_| {
            CryptoError::CipherExecutionFailure("invalid padding or corrupted ciphertext".into())
        })?;
        let dest = out
            .get_mut(..plain.len())
            .ok_or_else(|| short_buffer(plain.len()))?;

        dest.copy_from_slice(plain);
        Ok(plain.len())
    }
}

fn short_buffer(needed: usize) -> CryptoError {
    CryptoError::CipherExecutionFailure(format!("output buffer too small for {needed} bytes"))
}
