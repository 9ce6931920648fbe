//! Error types for the GP WebPay protocol.
//!
//! Every failure the crate can produce is a distinct type so callers can
//! separate integration bugs (bad keys, malformed callbacks, forged digests)
//! from business outcomes reported by the gateway ([`GatewayError`]).

use std::fmt;
use std::path::PathBuf;

use crate::codes::ErrorCatalog;
use crate::request::RequestField;
use crate::response::ResponseField;

/// Base error type for GP WebPay operations.
///
/// Only request building returns it directly. The settings, callback and
/// verification variants let callers collect the narrower errors of
/// [`Provider`](crate::provider::Provider) under one type with `?`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Merchant settings are missing or invalid.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// The operation cannot be turned into a request.
    #[error(transparent)]
    InvalidOperation(#[from] InvalidOperation),

    /// Key material could not be loaded or a digest could not be computed.
    #[error(transparent)]
    Digest(#[from] DigestError),

    /// The gateway callback is missing fields or carries unparsable values.
    #[error(transparent)]
    MalformedResponse(#[from] MalformedResponse),

    /// The gateway callback failed verification or reports a declined payment.
    #[error(transparent)]
    Verification(#[from] VerificationError),
}

impl From<KeyError> for Error {
    fn from(value: KeyError) -> Self {
        Self::Digest(DigestError::Key(value))
    }
}

impl From<GatewayError> for Error {
    fn from(value: GatewayError) -> Self {
        Self::Verification(VerificationError::Gateway(value))
    }
}

/// Invalid or incomplete merchant settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SettingsError {
    /// A mandatory setting is empty.
    #[error("setting '{0}' must be set")]
    MissingField(&'static str),
    /// Merchant numbers are assigned by the gateway and never zero.
    #[error("merchant number must be a positive integer")]
    InvalidMerchantNumber,
    /// The deposit flag accepts only `0` and `1`.
    #[error("deposit flag must be 0 or 1, got {0}")]
    InvalidDepositFlag(u8),
    /// The gateway URL is not an `http`/`https` URL.
    #[error("gateway url '{0}' must use http or https")]
    InvalidGatewayUrl(String),
}

/// Reasons an [`Operation`](crate::operation::Operation) cannot be built into a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum InvalidOperation {
    /// The response URL was never set or is empty.
    #[error("Response URL in Operation must be set")]
    MissingResponseUrl,
    /// The response URL is not an absolute URL.
    #[error("Response URL '{0}' is not an absolute URL")]
    InvalidResponseUrl(String),
    /// A numeric field must be greater than zero.
    #[error("{0} must be a positive integer")]
    NotPositive(RequestField),
    /// A field accepts digits only.
    #[error("{0} must contain digits only")]
    NotNumeric(RequestField),
    /// A field exceeds the length the gateway accepts.
    #[error("{field} exceeds {max} characters")]
    TooLong {
        /// The offending field.
        field: RequestField,
        /// Maximal accepted length.
        max: usize,
    },
    /// The e-mail address is not of the `local@domain` shape.
    #[error("EMAIL '{0}' is not a valid e-mail address")]
    InvalidEmail(String),
    /// A signed field contains the `|` digest separator.
    #[error("{0} must not contain '|'")]
    ContainsSeparator(RequestField),
}

/// Which key a [`KeyError`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// The merchant's private signing key.
    Private,
    /// The gateway's public verification key.
    Public,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private => f.write_str("private"),
            Self::Public => f.write_str("public"),
        }
    }
}

/// Key material could not be loaded.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum KeyError {
    /// The key file could not be read.
    #[error("{kind} key file '{path}' can not be read: {source}")]
    Unreadable {
        /// Which key was being read.
        kind: KeyKind,
        /// Location of the key file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The private key is encrypted but no passphrase was configured.
    #[error("private key is encrypted and requires a passphrase")]
    PassphraseRequired,
    /// The private key could not be decrypted with the configured passphrase.
    #[error("private key can not be decrypted with the given passphrase: {0}")]
    BadPassphrase(String),
    /// The PEM uses an encryption scheme that is not supported.
    #[error("private key uses legacy PEM encryption; convert it to encrypted PKCS#8")]
    UnsupportedEncryption,
    /// The key is not a valid RSA key in a supported PEM format.
    #[error("{kind} key is malformed: {reason}")]
    Malformed {
        /// Which key was being parsed.
        kind: KeyKind,
        /// Parser diagnostics.
        reason: String,
    },
}

impl KeyError {
    pub(crate) fn malformed(kind: KeyKind, reason: impl fmt::Display) -> Self {
        Self::Malformed {
            kind,
            reason: reason.to_string(),
        }
    }
}

/// Failure while signing or checking a digest.
///
/// A signature that simply does not match is not an error; verification
/// returns `false` for it.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DigestError {
    /// Key material is unavailable.
    #[error(transparent)]
    Key(#[from] KeyError),
    /// The signature primitive failed.
    #[error("digest can not be signed: {0}")]
    Signing(String),
    /// A digest received from the gateway is not valid base64.
    #[error("digest is not valid base64: {0}")]
    SignatureEncoding(#[from] base64::DecodeError),
}

/// The gateway callback parameters can not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum MalformedResponse {
    /// A mandatory parameter is absent or empty.
    #[error("response is missing {0}")]
    MissingField(ResponseField),
    /// A parameter appears more than once.
    #[error("response carries {0} more than once")]
    DuplicateField(ResponseField),
    /// A numeric parameter is not a non-negative integer in range.
    #[error("response {field} '{value}' is not a valid number")]
    InvalidNumber {
        /// The offending field.
        field: ResponseField,
        /// The raw value as received.
        value: String,
    },
}

/// Which of the two response digests failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestKind {
    /// `DIGEST`, over the response fields.
    Digest,
    /// `DIGEST1`, over the response fields and the merchant number.
    Digest1,
}

impl fmt::Display for DigestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Digest => f.write_str("DIGEST"),
            Self::Digest1 => f.write_str("DIGEST1"),
        }
    }
}

/// Outcome of a response verification that did not yield a trusted success.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum VerificationError {
    /// A response digest does not match; the callback must not be trusted.
    #[error("response {0} does not match, the response can not be trusted")]
    DigestMismatch(DigestKind),
    /// Digest checking could not be performed.
    #[error(transparent)]
    Digest(#[from] DigestError),
    /// The response is authentic and the gateway reports a failed payment.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl VerificationError {
    /// Returns the gateway-reported error, if this is a business outcome
    /// rather than an integration or security failure.
    #[must_use]
    pub const fn as_gateway(&self) -> Option<&GatewayError> {
        match self {
            Self::Gateway(e) => Some(e),
            _ => None,
        }
    }

    /// Returns `true` if the response was forged, tampered with, or signed for
    /// another merchant.
    #[must_use]
    pub const fn is_untrusted(&self) -> bool {
        matches!(self, Self::DigestMismatch(_))
    }
}

impl From<KeyError> for VerificationError {
    fn from(value: KeyError) -> Self {
        Self::Digest(DigestError::Key(value))
    }
}

/// A verified gateway response with a non-success result code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    /// Primary result code (`PRCODE`).
    pub pr_code: u32,
    /// Secondary result code (`SRCODE`).
    pub sr_code: u32,
    /// Raw `RESULTTEXT` sent by the gateway, if any.
    pub result_text: Option<String>,
}

impl GatewayError {
    /// Creates a new gateway error.
    #[must_use]
    pub const fn new(pr_code: u32, sr_code: u32) -> Self {
        Self {
            pr_code,
            sr_code,
            result_text: None,
        }
    }

    /// Sets the raw result text.
    #[must_use]
    pub fn with_result_text(mut self, text: impl Into<String>) -> Self {
        self.result_text = Some(text.into());
        self
    }

    /// Localized explanation of the result codes.
    ///
    /// Unknown codes and languages degrade to the catalog's generic strings.
    #[must_use]
    pub fn translate(&self, catalog: &ErrorCatalog, language: &str) -> &'static str {
        catalog.translate(self.pr_code, self.sr_code, language)
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GP WebPay response has an error: PRCODE {}, SRCODE {}",
            self.pr_code, self.sr_code
        )?;
        if let Some(text) = &self.result_text {
            write!(f, " ({text})")?;
        }
        Ok(())
    }
}

impl std::error::Error for GatewayError {}

/// An alphabetic or numeric currency code that is not supported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown currency '{0}'")]
pub struct UnknownCurrency(pub String);

/// A payment method code that is not supported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown payment method '{0}'")]
pub struct UnknownPayMethod(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_display_with_text() {
        let err = GatewayError::new(30, 1002).with_result_text("Declined");
        assert_eq!(
            err.to_string(),
            "GP WebPay response has an error: PRCODE 30, SRCODE 1002 (Declined)"
        );
    }

    #[test]
    fn test_gateway_error_display_without_text() {
        let err = GatewayError::new(1000, 0);
        assert_eq!(
            err.to_string(),
            "GP WebPay response has an error: PRCODE 1000, SRCODE 0"
        );
    }

    #[test]
    fn test_verification_error_classification() {
        let declined = VerificationError::from(GatewayError::new(28, 3000));
        assert!(declined.as_gateway().is_some());
        assert!(!declined.is_untrusted());

        let forged = VerificationError::DigestMismatch(DigestKind::Digest1);
        assert!(forged.as_gateway().is_none());
        assert!(forged.is_untrusted());
        assert_eq!(
            forged.to_string(),
            "response DIGEST1 does not match, the response can not be trusted"
        );
    }

    #[test]
    fn test_key_error_converts_into_crate_error() {
        let err: Error = KeyError::PassphraseRequired.into();
        assert!(matches!(err, Error::Digest(DigestError::Key(_))));
    }

    #[test]
    fn test_provider_errors_unify_with_question_mark() {
        fn unify<E>(result: Result<(), E>) -> Result<(), Error>
        where
            Error: From<E>,
        {
            Ok(result?)
        }
        assert!(matches!(
            unify(Err(SettingsError::InvalidMerchantNumber)),
            Err(Error::Settings(_))
        ));
        assert!(matches!(
            unify(Err(MalformedResponse::MissingField(ResponseField::PrCode))),
            Err(Error::MalformedResponse(_))
        ));
        assert!(matches!(
            unify(Err(GatewayError::new(30, 1002))),
            Err(Error::Verification(VerificationError::Gateway(_)))
        ));
    }

    #[test]
    fn test_invalid_operation_names_wire_field() {
        let err = InvalidOperation::TooLong {
            field: RequestField::Description,
            max: 255,
        };
        assert_eq!(err.to_string(), "DESCRIPTION exceeds 255 characters");
    }
}
