//! Credential hashing and digest helpers.
//!
//! Thin wrappers over RustCrypto primitives:
//! - Salted one-way password hashes (`salt:key`) with constant-time verification
//! - SHA-256 and MD5 digests, HMAC-SHA256 signatures
//! - Random SHA-1/SHA-256 digests and random bytes

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod digest;
pub mod encoding;
pub mod error;
pub mod hash;

pub use digest::{
    compute_md5_hash, compute_sha256_hash, compute_sha256_hmac, generate_sha1_hash,
    generate_sha256_hash, random_bytes,
};
pub use encoding::Encoding;
pub use error::{CryptoError, CryptoResult};
pub use hash::{HashOptions, generate_hash, verify_hash};
