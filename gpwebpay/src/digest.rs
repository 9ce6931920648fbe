//! Digest computation, signing and verification.
//!
//! A digest is an RSA signature (PKCS#1 v1.5, SHA-1) over the values of a fixed
//! list of fields joined with `|`. Fields that are absent or empty are left
//! out entirely, never represented as empty segments.
//!
//! Signing and verification sit behind the [`DigestSigner`] and
//! [`DigestVerifier`] traits so request building and response checking do not
//! depend on where keys live. [`RsaDigestSigner`] is the implementation backed
//! by a [`KeyStore`].

use std::fmt;
use std::sync::Arc;

use rsa::pkcs1v15::Signature;
use rsa::signature::{SignatureEncoding, Signer, Verifier};

use crate::encoding::DigestValue;
use crate::error::DigestError;
use crate::keys::KeyStore;

/// Separator placed between field values.
pub const SEPARATOR: char = '|';

/// The exact text a digest is computed over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestText(String);

impl DigestText {
    /// Joins values in the given order, skipping empty ones.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut text = Self::default();
        for value in values {
            text.push(value.as_ref());
        }
        text
    }

    /// Appends a value; empty values are ignored.
    pub fn push(&mut self, value: &str) {
        if value.is_empty() {
            return;
        }
        if !self.0.is_empty() {
            self.0.push(SEPARATOR);
        }
        self.0.push_str(value);
    }

    /// Builder-style variant of [`Self::push`].
    #[must_use]
    pub fn with_value(mut self, value: &str) -> Self {
        self.push(value);
        self
    }

    /// Returns the joined text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the bytes that are signed.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for DigestText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Produces digests with the merchant's private key.
pub trait DigestSigner {
    /// Signs the text and returns the raw signature.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError`] if the key is unavailable or signing fails.
    fn sign(&self, text: &DigestText) -> Result<Vec<u8>, DigestError>;

    /// Signs the text and returns the base64 wire form.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError`] if the key is unavailable or signing fails.
    fn sign_encoded(&self, text: &DigestText) -> Result<DigestValue, DigestError> {
        self.sign(text).map(DigestValue::encode)
    }
}

/// Checks digests with the gateway's public key.
pub trait DigestVerifier {
    /// Returns whether `signature` is a valid signature of `text`.
    ///
    /// A mismatching signature yields `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError`] only if the key is unavailable.
    fn verify(&self, text: &DigestText, signature: &[u8]) -> Result<bool, DigestError>;

    /// Like [`Self::verify`], taking the base64 wire form.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::SignatureEncoding`] if the digest is not base64,
    /// or any error of [`Self::verify`].
    fn verify_encoded(&self, text: &DigestText, digest: &DigestValue) -> Result<bool, DigestError> {
        let signature = digest.decode()?;
        self.verify(text, &signature)
    }
}

/// RSA-SHA1 digest signer backed by a [`KeyStore`].
#[derive(Debug, Clone)]
pub struct RsaDigestSigner {
    keys: Arc<KeyStore>,
}

impl RsaDigestSigner {
    /// Creates a signer over shared key material.
    #[must_use]
    pub const fn new(keys: Arc<KeyStore>) -> Self {
        Self { keys }
    }

    /// Returns the underlying key store.
    #[must_use]
    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }
}

impl DigestSigner for RsaDigestSigner {
    fn sign(&self, text: &DigestText) -> Result<Vec<u8>, DigestError> {
        let key = self.keys.signing_key()?;
        let signature: Signature = key
            .try_sign(text.as_bytes())
            .map_err(|e| DigestError::Signing(e.to_string()))?;
        let bytes = signature.to_vec();
        if bytes.is_empty() {
            return Err(DigestError::Signing("empty signature".to_owned()));
        }
        Ok(bytes)
    }
}

impl DigestVerifier for RsaDigestSigner {
    fn verify(&self, text: &DigestText, signature: &[u8]) -> Result<bool, DigestError> {
        let key = self.keys.verifying_key()?;
        let Ok(signature) = Signature::try_from(signature) else {
            return Ok(false);
        };
        let verified = key.verify(text.as_bytes(), &signature).is_ok();
        #[cfg(feature = "telemetry")]
        tracing::debug!(verified, "Checked digest");
        Ok(verified)
    }
}
