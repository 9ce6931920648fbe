//! Base64 wire encoding of digests.
//!
//! The gateway transports signatures in the `DIGEST` and `DIGEST1` parameters
//! as standard, padded base64. [`DigestValue`] keeps the encoded text exactly
//! as sent or received.

use std::fmt::{self, Display, Formatter};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as b64;
use serde::{Deserialize, Serialize};

/// A base64-encoded digest as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DigestValue(String);

impl DigestValue {
    /// Decodes the base64 text to the raw signature bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        b64.decode(self.0.as_bytes())
    }

    /// Encodes raw signature bytes.
    pub fn encode<T: AsRef<[u8]>>(input: T) -> Self {
        Self(b64.encode(input.as_ref()))
    }

    /// Returns the encoded text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DigestValue {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for DigestValue {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl AsRef<str> for DigestValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for DigestValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_uses_padded_standard_alphabet() {
        let value = DigestValue::encode([0xfb_u8, 0xff]);
        assert_eq!(value.as_str(), "+/8=");
        assert_eq!(value.decode().unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let value = DigestValue::from("not base64!");
        assert!(value.decode().is_err());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let value = DigestValue::from("QUJD");
        assert_eq!(serde_json::to_string(&value).unwrap(), "\"QUJD\"");
    }
}
