//! Salted one-way hashes for credentials.
//!
//! Hashes are stored as `salt:key`, both parts in the configured [`Encoding`].
//! The key is scrypt (r = 8, p = 1, 64 bytes) over the password, salted with
//! the encoded salt text, so hashes written by other services using the same
//! layout verify here.

use crate::digest::random_bytes;
use crate::encoding::Encoding;
use crate::error::{CryptoError, CryptoResult};
use scrypt::{Params, scrypt};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Length of the derived key in bytes.
pub const KEY_LENGTH: usize = 64;

/// Default scrypt cost as log2(N), i.e. N = 16384.
pub const DEFAULT_COST: u8 = 14;

const BLOCK_SIZE: u32 = 8;
const PARALLELISM: u32 = 1;

/// Parameters shared by [`generate_hash`] and [`verify_hash`].
///
/// A hash must be verified with the same cost and encoding it was
/// generated with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashOptions {
    /// Number of random salt bytes (default: 10)
    pub salt_len: usize,
    /// scrypt cost as log2(N) (default: 14)
    pub cost: u8,
    /// Encoding of the stored salt and key (default: hex)
    pub encoding: Encoding,
}

impl Default for HashOptions {
    fn default() -> Self {
        Self {
            salt_len: 10,
            cost: DEFAULT_COST,
            encoding: Encoding::Hex,
        }
    }
}

impl HashOptions {
    /// Set the salt length in bytes.
    #[must_use]
    pub const fn with_salt_len(mut self, salt_len: usize) -> Self {
        self.salt_len = salt_len;
        self
    }

    /// Set the scrypt cost as log2(N).
    #[must_use]
    pub const fn with_cost(mut self, cost: u8) -> Self {
        self.cost = cost;
        self
    }

    /// Set the textual encoding.
    #[must_use]
    pub const fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    fn params(&self) -> CryptoResult<Params> {
        Params::new(self.cost, BLOCK_SIZE, PARALLELISM, KEY_LENGTH)
            .map_err(|e| CryptoError::InvalidParams(e.to_string()))
    }
}

fn derive_key(
    text: &str,
    salt: &str,
    params: &Params,
) -> CryptoResult<Zeroizing<[u8; KEY_LENGTH]>> {
    let mut key = Zeroizing::new([0u8; KEY_LENGTH]);
    scrypt(text.as_bytes(), salt.as_bytes(), params, &mut key[..])
        .map_err(|e| CryptoError::InvalidParams(e.to_string()))?;
    Ok(key)
}

/// Generate a salted hash of `text`.
///
/// # Examples
///
/// ```
/// use sdk_crypto::{HashOptions, generate_hash, verify_hash};
///
/// let options = HashOptions::default().with_cost(10);
/// let hash = generate_hash("s3cret", &options).unwrap();
/// assert!(verify_hash("s3cret", &hash, &options).unwrap());
/// ```
///
/// # Errors
///
/// Returns [`CryptoError::InvalidParams`] if the cost is out of range.
pub fn generate_hash(text: &str, options: &HashOptions) -> CryptoResult<String> {
    let params = options.params()?;
    let salt = options.encoding.encode(random_bytes(options.salt_len));
    let key = derive_key(text, &salt, &params)?;
    Ok(format!("{salt}:{}", options.encoding.encode(&key[..])))
}

/// Verify `text` against a hash produced by [`generate_hash`].
///
/// The key comparison runs in constant time.
///
/// # Errors
///
/// Returns [`CryptoError::MalformedHash`] if `hash` is not `salt:key`,
/// [`CryptoError::Decoding`] if the key is not valid for the encoding, or
/// [`CryptoError::InvalidParams`] if the cost is out of range.
pub fn verify_hash(text: &str, hash: &str, options: &HashOptions) -> CryptoResult<bool> {
    let (salt, key) = hash
        .split_once(':')
        .ok_or_else(|| CryptoError::malformed("expected 'salt:key'"))?;
    if salt.is_empty() || key.is_empty() {
        return Err(CryptoError::malformed("empty salt or key"));
    }

    let expected = Zeroizing::new(options.encoding.decode(key)?);
    let derived = derive_key(text, salt, &options.params()?)?;

    Ok(derived[..].ct_eq(&expected[..]).into())
}
