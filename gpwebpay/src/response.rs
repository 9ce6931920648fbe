//! Inbound gateway callback.
//!
//! The gateway redirects the cardholder back to the response URL with the
//! outcome as query (or POST) parameters. [`CardPayResponse`] parses them, and
//! [`CardPayResponse::verify`] checks both digests before the result code is
//! looked at:
//!
//! 1. `DIGEST` over [`RESPONSE_DIGEST_ORDER`],
//! 2. `DIGEST1` over the same values followed by the merchant number.
//!
//! Result codes are reachable only through the [`VerifiedResponse`] returned
//! on success, or the [`GatewayError`] returned for a verified decline.

use std::collections::HashMap;
use std::fmt;

use serde::ser::{Serialize, SerializeStruct, Serializer};
use url::form_urlencoded;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::digest::{DigestText, DigestVerifier};
use crate::encoding::DigestValue;
use crate::error::{DigestKind, GatewayError, MalformedResponse, VerificationError};

/// Response parameter names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseField {
    /// `OPERATION`
    Operation,
    /// `ORDERNUMBER`
    OrderNumber,
    /// `MERORDERNUM`
    MerOrderNum,
    /// `MD`
    Md,
    /// `PRCODE`
    PrCode,
    /// `SRCODE`
    SrCode,
    /// `RESULTTEXT`
    ResultText,
    /// `DIGEST`
    Digest,
    /// `DIGEST1`
    Digest1,
}

impl ResponseField {
    /// Every field, in wire order.
    pub const ALL: [Self; 9] = [
        Self::Operation,
        Self::OrderNumber,
        Self::MerOrderNum,
        Self::Md,
        Self::PrCode,
        Self::SrCode,
        Self::ResultText,
        Self::Digest,
        Self::Digest1,
    ];

    /// Returns the case-sensitive wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Operation => "OPERATION",
            Self::OrderNumber => "ORDERNUMBER",
            Self::MerOrderNum => "MERORDERNUM",
            Self::Md => "MD",
            Self::PrCode => "PRCODE",
            Self::SrCode => "SRCODE",
            Self::ResultText => "RESULTTEXT",
            Self::Digest => "DIGEST",
            Self::Digest1 => "DIGEST1",
        }
    }

    /// Looks up a field by its wire name.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

impl fmt::Display for ResponseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields covered by `DIGEST`, in signing order. `DIGEST1` covers the same
/// list followed by the merchant number.
pub const RESPONSE_DIGEST_ORDER: [ResponseField; 7] = [
    ResponseField::Operation,
    ResponseField::OrderNumber,
    ResponseField::MerOrderNum,
    ResponseField::Md,
    ResponseField::PrCode,
    ResponseField::SrCode,
    ResponseField::ResultText,
];

/// Parses a non-negative decimal integer, rejecting signs, blanks and
/// values out of range.
fn parse_number<T: std::str::FromStr>(
    field: ResponseField,
    value: &str,
) -> Result<T, MalformedResponse> {
    let invalid = || MalformedResponse::InvalidNumber {
        field,
        value: value.to_owned(),
    };
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    value.parse().map_err(|_| invalid())
}

/// A parsed but not yet trusted gateway callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardPayResponse {
    /// Non-empty values as received, keyed by field.
    raw: HashMap<ResponseField, String>,
    order_number: Option<u64>,
    pr_code: u32,
    sr_code: u32,
    digest: DigestValue,
    digest1: DigestValue,
}

impl CardPayResponse {
    /// Parses callback parameters.
    ///
    /// Unknown keys are ignored and empty values count as absent. `OPERATION`,
    /// `PRCODE`, `SRCODE`, `DIGEST` and `DIGEST1` are mandatory.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedResponse`] if a mandatory field is missing, a known
    /// field is repeated, or a numeric field is not a plain in-range integer.
    pub fn from_params<I, K, V>(params: I) -> Result<Self, MalformedResponse>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut seen = Vec::with_capacity(ResponseField::ALL.len());
        let mut raw = HashMap::with_capacity(ResponseField::ALL.len());
        for (name, value) in params {
            let Some(field) = ResponseField::from_wire(name.as_ref()) else {
                continue;
            };
            if seen.contains(&field) {
                return Err(MalformedResponse::DuplicateField(field));
            }
            seen.push(field);
            let value = value.as_ref();
            if !value.is_empty() {
                raw.insert(field, value.to_owned());
            }
        }

        let required = |field: ResponseField| {
            raw.get(&field)
                .map(String::as_str)
                .ok_or(MalformedResponse::MissingField(field))
        };
        required(ResponseField::Operation)?;
        let pr_code = parse_number(ResponseField::PrCode, required(ResponseField::PrCode)?)?;
        let sr_code = parse_number(ResponseField::SrCode, required(ResponseField::SrCode)?)?;
        let digest = DigestValue::from(required(ResponseField::Digest)?);
        let digest1 = DigestValue::from(required(ResponseField::Digest1)?);
        let order_number = raw
            .get(&ResponseField::OrderNumber)
            .map(|v| parse_number(ResponseField::OrderNumber, v))
            .transpose()?;

        Ok(Self {
            raw,
            order_number,
            pr_code,
            sr_code,
            digest,
            digest1,
        })
    }

    /// Parses a query string or form body, with or without a leading `?`.
    ///
    /// # Errors
    ///
    /// See [`Self::from_params`].
    pub fn from_query(query: &str) -> Result<Self, MalformedResponse> {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_params(form_urlencoded::parse(query.as_bytes()))
    }

    /// Raw value of a field as received, if present.
    #[must_use]
    pub fn raw(&self, field: ResponseField) -> Option<&str> {
        self.raw.get(&field).map(String::as_str)
    }

    /// `OPERATION` echoed by the gateway.
    #[must_use]
    pub fn operation(&self) -> &str {
        self.raw(ResponseField::Operation).unwrap_or_default()
    }

    /// `ORDERNUMBER`, used to find the order the callback belongs to.
    #[must_use]
    pub const fn order_number(&self) -> Option<u64> {
        self.order_number
    }

    /// `MERORDERNUM`.
    #[must_use]
    pub fn merchant_order_number(&self) -> Option<&str> {
        self.raw(ResponseField::MerOrderNum)
    }

    /// `MD`.
    #[must_use]
    pub fn md(&self) -> Option<&str> {
        self.raw(ResponseField::Md)
    }

    /// The `DIGEST` parameter.
    #[must_use]
    pub const fn digest(&self) -> &DigestValue {
        &self.digest
    }

    /// The `DIGEST1` parameter.
    #[must_use]
    pub const fn digest1(&self) -> &DigestValue {
        &self.digest1
    }

    /// The exact text `DIGEST` is checked against.
    #[must_use]
    pub fn digest_text(&self) -> DigestText {
        DigestText::from_values(RESPONSE_DIGEST_ORDER.iter().filter_map(|f| self.raw(*f)))
    }

    /// The exact text `DIGEST1` is checked against for a merchant.
    #[must_use]
    pub fn digest1_text(&self, merchant_number: u64) -> DigestText {
        self.digest_text()
            .with_value(&merchant_number.to_string())
    }

    /// Checks both digests, then the result code.
    ///
    /// # Errors
    ///
    /// - [`VerificationError::DigestMismatch`] if either digest does not match;
    ///   the result code is not inspected in that case.
    /// - [`VerificationError::Digest`] if the public key is unavailable or a
    ///   digest is not base64.
    /// - [`VerificationError::Gateway`] if the response is authentic and
    ///   reports a failed payment.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "gpwebpay.response.verify",
            skip_all,
            fields(order_number = self.order_number),
            err
        )
    )]
    pub fn verify<V: DigestVerifier + ?Sized>(
        &self,
        merchant_number: u64,
        verifier: &V,
    ) -> Result<VerifiedResponse<'_>, VerificationError> {
        let text = self.digest_text();
        if !verifier.verify_encoded(&text, &self.digest)? {
            return Err(untrusted(DigestKind::Digest));
        }
        let text1 = text.with_value(&merchant_number.to_string());
        if !verifier.verify_encoded(&text1, &self.digest1)? {
            return Err(untrusted(DigestKind::Digest1));
        }

        if self.pr_code != 0 {
            let mut error = GatewayError::new(self.pr_code, self.sr_code);
            if let Some(text) = self.raw(ResponseField::ResultText) {
                error = error.with_result_text(text);
            }
            return Err(error.into());
        }

        #[cfg(feature = "telemetry")]
        tracing::debug!("Response verified");

        Ok(VerifiedResponse { response: self })
    }
}

fn untrusted(kind: DigestKind) -> VerificationError {
    #[cfg(feature = "telemetry")]
    tracing::warn!(digest = %kind, "Response digest does not match");
    VerificationError::DigestMismatch(kind)
}

/// A response whose digests both match and whose result code reports success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedResponse<'a> {
    response: &'a CardPayResponse,
}

impl VerifiedResponse<'_> {
    /// `OPERATION` echoed by the gateway.
    #[must_use]
    pub fn operation(&self) -> &str {
        self.response.operation()
    }

    /// `ORDERNUMBER`.
    #[must_use]
    pub const fn order_number(&self) -> Option<u64> {
        self.response.order_number
    }

    /// `MERORDERNUM`.
    #[must_use]
    pub fn merchant_order_number(&self) -> Option<&str> {
        self.response.merchant_order_number()
    }

    /// `MD`.
    #[must_use]
    pub fn md(&self) -> Option<&str> {
        self.response.md()
    }

    /// `PRCODE`, always `0` here.
    #[must_use]
    pub const fn pr_code(&self) -> u32 {
        self.response.pr_code
    }

    /// `SRCODE`.
    #[must_use]
    pub const fn sr_code(&self) -> u32 {
        self.response.sr_code
    }

    /// `RESULTTEXT`.
    #[must_use]
    pub fn result_text(&self) -> Option<&str> {
        self.response.raw(ResponseField::ResultText)
    }

    /// Returns `true` if the gateway reports success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.response.pr_code == 0
    }
}

impl Serialize for VerifiedResponse<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("VerifiedResponse", 7)?;
        state.serialize_field("operation", self.operation())?;
        state.serialize_field("order_number", &self.order_number())?;
        state.serialize_field("merchant_order_number", &self.merchant_order_number())?;
        state.serialize_field("md", &self.md())?;
        state.serialize_field("pr_code", &self.pr_code())?;
        state.serialize_field("sr_code", &self.sr_code())?;
        state.serialize_field("result_text", &self.result_text())?;
        state.end()
    }
}
