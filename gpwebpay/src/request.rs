//! Outbound `CREATE_ORDER` request.
//!
//! [`CardPayRequest::build`] turns an [`Operation`] and the merchant's account
//! values into the parameter set the gateway expects. The request is kept as a
//! typed structure and rendered to the ordered string form only at the
//! boundary, via [`CardPayRequest::params`], its [`Serialize`] impl, or
//! [`CardPayRequest::redirect_url`].
//!
//! The `DIGEST` parameter is computed last, over [`DIGEST_ORDER`], once every
//! other field is populated. `LANG` is sent but not signed.

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};
use url::Url;
use url::form_urlencoded;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::digest::{DigestSigner, DigestText, DigestVerifier};
use crate::encoding::DigestValue;
use crate::error::{DigestError, Error};
use crate::operation::Operation;
use crate::settings::DepositFlag;

/// The only operation this client initiates.
pub const CREATE_ORDER: &str = "CREATE_ORDER";

/// Request parameter names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestField {
    /// `MERCHANTNUMBER`
    MerchantNumber,
    /// `OPERATION`
    Operation,
    /// `ORDERNUMBER`
    OrderNumber,
    /// `AMOUNT`
    Amount,
    /// `CURRENCY`
    Currency,
    /// `DEPOSITFLAG`
    DepositFlag,
    /// `MERORDERNUM`
    MerOrderNum,
    /// `URL`
    Url,
    /// `DESCRIPTION`
    Description,
    /// `MD`
    Md,
    /// `LANG`
    Lang,
    /// `USERPARAM1`
    UserParam1,
    /// `PAYMETHOD`
    PayMethod,
    /// `DISABLEPAYMETHOD`
    DisablePayMethod,
    /// `PAYMETHODS`
    PayMethods,
    /// `EMAIL`
    Email,
    /// `REFERENCENUMBER`
    ReferenceNumber,
    /// `FASTPAYID`
    FastPayId,
    /// `ADDINFO`
    AddInfo,
    /// `DIGEST`
    Digest,
}

impl RequestField {
    /// Returns the case-sensitive wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MerchantNumber => "MERCHANTNUMBER",
            Self::Operation => "OPERATION",
            Self::OrderNumber => "ORDERNUMBER",
            Self::Amount => "AMOUNT",
            Self::Currency => "CURRENCY",
            Self::DepositFlag => "DEPOSITFLAG",
            Self::MerOrderNum => "MERORDERNUM",
            Self::Url => "URL",
            Self::Description => "DESCRIPTION",
            Self::Md => "MD",
            Self::Lang => "LANG",
            Self::UserParam1 => "USERPARAM1",
            Self::PayMethod => "PAYMETHOD",
            Self::DisablePayMethod => "DISABLEPAYMETHOD",
            Self::PayMethods => "PAYMETHODS",
            Self::Email => "EMAIL",
            Self::ReferenceNumber => "REFERENCENUMBER",
            Self::FastPayId => "FASTPAYID",
            Self::AddInfo => "ADDINFO",
            Self::Digest => "DIGEST",
        }
    }
}

impl fmt::Display for RequestField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order in which parameters are emitted, `DIGEST` excluded.
pub const PARAMETER_ORDER: [RequestField; 19] = [
    RequestField::MerchantNumber,
    RequestField::Operation,
    RequestField::OrderNumber,
    RequestField::Amount,
    RequestField::Currency,
    RequestField::DepositFlag,
    RequestField::MerOrderNum,
    RequestField::Url,
    RequestField::Description,
    RequestField::Md,
    RequestField::Lang,
    RequestField::UserParam1,
    RequestField::PayMethod,
    RequestField::DisablePayMethod,
    RequestField::PayMethods,
    RequestField::Email,
    RequestField::ReferenceNumber,
    RequestField::FastPayId,
    RequestField::AddInfo,
];

/// Fields covered by `DIGEST`, in signing order.
pub const DIGEST_ORDER: [RequestField; 18] = [
    RequestField::MerchantNumber,
    RequestField::Operation,
    RequestField::OrderNumber,
    RequestField::Amount,
    RequestField::Currency,
    RequestField::DepositFlag,
    RequestField::MerOrderNum,
    RequestField::Url,
    RequestField::Description,
    RequestField::Md,
    RequestField::UserParam1,
    RequestField::FastPayId,
    RequestField::PayMethod,
    RequestField::DisablePayMethod,
    RequestField::PayMethods,
    RequestField::Email,
    RequestField::ReferenceNumber,
    RequestField::AddInfo,
];

/// Everything but the digest.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Payload {
    merchant_number: u64,
    deposit_flag: DepositFlag,
    operation: Operation,
}

impl Payload {
    fn value(&self, field: RequestField) -> Option<String> {
        let op = &self.operation;
        match field {
            RequestField::MerchantNumber => Some(self.merchant_number.to_string()),
            RequestField::Operation => Some(CREATE_ORDER.to_owned()),
            RequestField::OrderNumber => Some(op.order_number().to_string()),
            RequestField::Amount => Some(op.amount().to_string()),
            RequestField::Currency => Some(op.currency().code().to_string()),
            RequestField::DepositFlag => Some(self.deposit_flag.to_string()),
            RequestField::MerOrderNum => op.merchant_order_number().map(str::to_owned),
            RequestField::Url => op.response_url().map(str::to_owned),
            RequestField::Description => op.description().map(str::to_owned),
            RequestField::Md => op.md().map(str::to_owned),
            RequestField::Lang => op.lang().map(str::to_owned),
            RequestField::UserParam1 => op.user_param1().map(str::to_owned),
            RequestField::PayMethod => op.pay_method().map(|m| m.as_str().to_owned()),
            RequestField::DisablePayMethod => {
                op.disable_pay_method().map(|m| m.as_str().to_owned())
            }
            RequestField::PayMethods => {
                let methods = op.pay_methods();
                (!methods.is_empty()).then(|| {
                    methods
                        .iter()
                        .map(|m| m.as_str())
                        .collect::<Vec<_>>()
                        .join(",")
                })
            }
            RequestField::Email => op.email().map(str::to_owned),
            RequestField::ReferenceNumber => op.reference_number().map(str::to_owned),
            RequestField::FastPayId => op.fast_pay_id().map(|id| id.to_string()),
            RequestField::AddInfo => op.add_info().map(str::to_owned),
            RequestField::Digest => None,
        }
    }

    fn digest_text(&self) -> DigestText {
        DigestText::from_values(DIGEST_ORDER.iter().filter_map(|f| self.value(*f)))
    }
}

/// A signed `CREATE_ORDER` request, ready for transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardPayRequest {
    payload: Payload,
    digest: DigestValue,
}

impl CardPayRequest {
    /// Builds and signs the request for one operation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the operation has no response URL
    /// or breaks a field rule, and [`Error::Digest`] if signing fails.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "gpwebpay.request.build",
            skip_all,
            fields(order_number = operation.order_number()),
            err
        )
    )]
    pub fn build<S: DigestSigner + ?Sized>(
        operation: &Operation,
        merchant_number: u64,
        deposit_flag: DepositFlag,
        signer: &S,
    ) -> Result<Self, Error> {
        operation.validate()?;
        let payload = Payload {
            merchant_number,
            deposit_flag,
            operation: operation.clone(),
        };
        let digest = signer.sign_encoded(&payload.digest_text())?;

        #[cfg(feature = "telemetry")]
        tracing::debug!("Signed CREATE_ORDER request");

        Ok(Self { payload, digest })
    }

    /// Value of one parameter, or `None` if it is not sent.
    #[must_use]
    pub fn value(&self, field: RequestField) -> Option<String> {
        match field {
            RequestField::Digest => Some(self.digest.to_string()),
            _ => self.payload.value(field),
        }
    }

    /// The operation this request was built from.
    #[must_use]
    pub const fn operation(&self) -> &Operation {
        &self.payload.operation
    }

    /// The `DIGEST` parameter.
    #[must_use]
    pub const fn digest(&self) -> &DigestValue {
        &self.digest
    }

    /// The ordered parameter set, `DIGEST` last.
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        PARAMETER_ORDER
            .iter()
            .filter_map(|f| self.payload.value(*f).map(|v| (f.as_str(), v)))
            .chain(std::iter::once((
                RequestField::Digest.as_str(),
                self.digest.to_string(),
            )))
            .collect()
    }

    /// The parameters covered by `DIGEST`, in signing order.
    #[must_use]
    pub fn digest_params(&self) -> Vec<(&'static str, String)> {
        DIGEST_ORDER
            .iter()
            .filter_map(|f| self.payload.value(*f).map(|v| (f.as_str(), v)))
            .collect()
    }

    /// The exact text `DIGEST` signs.
    #[must_use]
    pub fn digest_text(&self) -> DigestText {
        self.payload.digest_text()
    }

    /// Checks the stored digest against the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError`] if the verifier's key is unavailable or the
    /// stored digest is not base64.
    pub fn verify_digest<V: DigestVerifier + ?Sized>(&self, verifier: &V) -> Result<bool, DigestError> {
        verifier.verify_encoded(&self.digest_text(), &self.digest)
    }

    /// `application/x-www-form-urlencoded` body for a direct POST.
    #[must_use]
    pub fn to_form_body(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params())
            .finish()
    }

    /// Gateway URL with the parameters appended as query, for redirects.
    #[must_use]
    pub fn redirect_url(&self, gateway_url: &Url) -> Url {
        let mut url = gateway_url.clone();
        url.query_pairs_mut().extend_pairs(self.params());
        url
    }
}

impl Serialize for CardPayRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let params = self.params();
        let mut map = serializer.serialize_map(Some(params.len()))?;
        for (name, value) in &params {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvalidOperation;
    use crate::operation::{Currency, PayMethod};
    use crate::testing;

    const MERCHANT: u64 = 1_234_567_890;

    fn operation() -> Operation {
        Operation::new(123_456, 100, Currency::Czk).with_response_url("http://test.com")
    }

    fn names(request: &CardPayRequest) -> Vec<&'static str> {
        request.params().into_iter().map(|(name, _)| name).collect()
    }

    #[test]
    fn test_builds_mandatory_fields() {
        let request =
            CardPayRequest::build(&operation(), MERCHANT, DepositFlag::Immediate, &testing::signer())
                .unwrap();
        let params = request.params();
        assert_eq!(
            names(&request),
            vec![
                "MERCHANTNUMBER",
                "OPERATION",
                "ORDERNUMBER",
                "AMOUNT",
                "CURRENCY",
                "DEPOSITFLAG",
                "URL",
                "DIGEST"
            ]
        );
        assert_eq!(params[0].1, "1234567890");
        assert_eq!(params[1].1, "CREATE_ORDER");
        assert_eq!(params[2].1, "123456");
        assert_eq!(params[3].1, "100");
        assert_eq!(params[4].1, "203");
        assert_eq!(params[5].1, "1");
        assert_eq!(params[6].1, "http://test.com");
        assert_eq!(params[7].1, request.digest().as_str());
    }

    #[test]
    fn test_digest_verifies_against_params() {
        let signer = testing::signer();
        let request =
            CardPayRequest::build(&operation(), MERCHANT, DepositFlag::Deferred, &signer).unwrap();
        assert_eq!(
            request.digest_text().as_str(),
            "1234567890|CREATE_ORDER|123456|100|203|0|http://test.com"
        );
        assert!(request.verify_digest(&signer).unwrap());

        let recomputed = DigestText::from_values(request.digest_params().iter().map(|(_, v)| v));
        let digest = request.value(RequestField::Digest).unwrap();
        assert!(
            signer
                .verify_encoded(&recomputed, &DigestValue::from(digest))
                .unwrap()
        );
    }

    #[test]
    fn test_missing_response_url_produces_no_request() {
        let operation = Operation::new(123_456, 100, Currency::Czk);
        let result =
            CardPayRequest::build(&operation, MERCHANT, DepositFlag::Immediate, &testing::signer());
        assert!(matches!(
            result,
            Err(Error::InvalidOperation(InvalidOperation::MissingResponseUrl))
        ));
    }

    #[test]
    fn test_signing_failure_produces_no_request() {
        let result = CardPayRequest::build(
            &operation(),
            MERCHANT,
            DepositFlag::Immediate,
            &testing::undersized_signer(),
        );
        assert!(matches!(
            result,
            Err(Error::Digest(DigestError::Signing(_)))
        ));
    }

    #[test]
    fn test_optional_fields_order_and_digest_subset() {
        let operation = operation()
            .with_merchant_order_number("777")
            .with_description("Books")
            .with_md("session=1")
            .with_lang("cs")
            .with_user_param1("U1")
            .with_pay_method(PayMethod::Card)
            .with_disable_pay_method(PayMethod::MasterPass)
            .with_pay_methods([PayMethod::Card, PayMethod::GooglePay])
            .with_email("buyer@example.com")
            .with_reference_number("REF1")
            .with_fast_pay_id(55)
            .with_add_info("<info/>");
        let request =
            CardPayRequest::build(&operation, MERCHANT, DepositFlag::Immediate, &testing::signer())
                .unwrap();

        assert_eq!(
            names(&request),
            vec![
                "MERCHANTNUMBER",
                "OPERATION",
                "ORDERNUMBER",
                "AMOUNT",
                "CURRENCY",
                "DEPOSITFLAG",
                "MERORDERNUM",
                "URL",
                "DESCRIPTION",
                "MD",
                "LANG",
                "USERPARAM1",
                "PAYMETHOD",
                "DISABLEPAYMETHOD",
                "PAYMETHODS",
                "EMAIL",
                "REFERENCENUMBER",
                "FASTPAYID",
                "ADDINFO",
                "DIGEST"
            ]
        );
        assert_eq!(
            request.digest_text().as_str(),
            "1234567890|CREATE_ORDER|123456|100|203|1|777|http://test.com|Books|session=1|U1|55|CRD|MPS|CRD,GPAY|buyer@example.com|REF1|<info/>"
        );
        assert!(request.verify_digest(&testing::signer()).unwrap());
    }

    #[test]
    fn test_unset_optional_fields_never_appear() {
        let operation = operation().with_description("").with_md("");
        let request =
            CardPayRequest::build(&operation, MERCHANT, DepositFlag::Immediate, &testing::signer())
                .unwrap();
        let names = names(&request);
        assert!(!names.contains(&"DESCRIPTION"));
        assert!(!names.contains(&"MD"));
        assert!(!names.contains(&"LANG"));
        assert!(request.params().iter().all(|(_, v)| !v.is_empty()));
    }

    #[test]
    fn test_lang_is_sent_but_not_signed() {
        let signer = testing::signer();
        let plain = CardPayRequest::build(&operation(), MERCHANT, DepositFlag::Immediate, &signer)
            .unwrap();
        let with_lang = CardPayRequest::build(
            &operation().with_lang("en"),
            MERCHANT,
            DepositFlag::Immediate,
            &signer,
        )
        .unwrap();
        assert_eq!(with_lang.value(RequestField::Lang).as_deref(), Some("en"));
        assert_eq!(plain.digest(), with_lang.digest());
    }

    #[test]
    fn test_tampered_param_fails_digest() {
        let signer = testing::signer();
        let request =
            CardPayRequest::build(&operation(), MERCHANT, DepositFlag::Immediate, &signer).unwrap();
        let tampered: Vec<String> = request
            .digest_params()
            .into_iter()
            .map(|(name, value)| if name == "AMOUNT" { "1".to_owned() } else { value })
            .collect();
        assert!(
            !signer
                .verify_encoded(&DigestText::from_values(&tampered), request.digest())
                .unwrap()
        );
    }

    #[test]
    fn test_redirect_url_and_form_body() {
        let request = CardPayRequest::build(
            &operation().with_description("a b&c"),
            MERCHANT,
            DepositFlag::Immediate,
            &testing::signer(),
        )
        .unwrap();
        let gateway = Url::parse("https://test.3dsecure.gpwebpay.com/pgw/order.do").unwrap();
        let url = request.redirect_url(&gateway);
        assert_eq!(url.path(), "/pgw/order.do");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let expected: Vec<(String, String)> = request
            .params()
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect();
        assert_eq!(pairs, expected);

        let body = request.to_form_body();
        assert!(body.starts_with("MERCHANTNUMBER=1234567890&OPERATION=CREATE_ORDER"));
        assert!(body.contains("DESCRIPTION=a+b%26c"));
    }

    #[test]
    fn test_serializes_as_ordered_map() {
        let request =
            CardPayRequest::build(&operation(), MERCHANT, DepositFlag::Immediate, &testing::signer())
                .unwrap();
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.starts_with("{\"MERCHANTNUMBER\":\"1234567890\",\"OPERATION\":\"CREATE_ORDER\""));
        assert!(json.contains("\"DIGEST\":"));
    }
}
