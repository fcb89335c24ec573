//! Content digests, HMAC signatures and random material.

use crate::encoding::Encoding;
use crate::error::{CryptoError, CryptoResult};
use hmac::{Hmac, Mac};
use md5::Md5;
use rand::RngCore;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Generate `size` cryptographically random bytes.
#[must_use]
pub fn random_bytes(size: usize) -> Vec<u8> {
    let mut buf = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

fn encoded_digest<D: Digest>(content: &[u8], encoding: Encoding) -> String {
    encoding.encode(D::digest(content))
}

/// Compute a SHA-256 digest of `content`.
#[must_use]
pub fn compute_sha256_hash(content: impl AsRef<[u8]>, encoding: Encoding) -> String {
    encoded_digest::<Sha256>(content.as_ref(), encoding)
}

/// Compute an MD5 digest of `content`.
///
/// Only for checksums and cache keys; MD5 is not collision resistant.
#[must_use]
pub fn compute_md5_hash(content: impl AsRef<[u8]>, encoding: Encoding) -> String {
    encoded_digest::<Md5>(content.as_ref(), encoding)
}

/// Compute an HMAC-SHA256 signature.
///
/// `key` is the base64 encoded HMAC key.
///
/// # Errors
///
/// Returns [`CryptoError::Decoding`] if `key` is not valid base64.
pub fn compute_sha256_hmac(
    key: &str,
    string_to_sign: &str,
    encoding: Encoding,
) -> CryptoResult<String> {
    let decoded = Zeroizing::new(Encoding::Base64.decode(key)?);
    let mut mac = HmacSha256::new_from_slice(&decoded)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    mac.update(string_to_sign.as_bytes());
    Ok(encoding.encode(mac.finalize().into_bytes()))
}

/// Generate a random SHA-256 digest from `size` random bytes.
#[must_use]
pub fn generate_sha256_hash(size: usize, encoding: Encoding) -> String {
    compute_sha256_hash(random_bytes(size), encoding)
}

/// Generate a random SHA-1 digest from `size` random bytes.
#[must_use]
pub fn generate_sha1_hash(size: usize, encoding: Encoding) -> String {
    encoded_digest::<Sha1>(&random_bytes(size), encoding)
}
