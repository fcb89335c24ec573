//! Textual encodings for hashes and digests.

use crate::error::{CryptoError, CryptoResult};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

/// Textual encoding applied to binary output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    /// Lowercase hexadecimal
    #[default]
    Hex,
    /// Standard base64 with padding
    Base64,
}

impl Encoding {
    /// Encode bytes into text.
    #[must_use]
    pub fn encode(self, bytes: impl AsRef<[u8]>) -> String {
        match self {
            Self::Hex => hex::encode(bytes),
            Self::Base64 => BASE64.encode(bytes),
        }
    }

    /// Decode text produced by [`Encoding::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Decoding`] if the text is not valid for this encoding.
    pub fn decode(self, text: &str) -> CryptoResult<Vec<u8>> {
        match self {
            Self::Hex => hex::decode(text).map_err(|e| CryptoError::decoding(e.to_string())),
            Self::Base64 => BASE64
                .decode(text)
                .map_err(|e| CryptoError::decoding(e.to_string())),
        }
    }
}
