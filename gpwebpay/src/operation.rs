//! Payment intent passed to the request builder.
//!
//! An [`Operation`] is built once with [`Operation::new`] and the `with_*`
//! setters, then handed to
//! [`CardPayRequest::build`](crate::request::CardPayRequest::build). Setting an
//! optional field to an empty value leaves it unset; unset fields are omitted
//! from the wire, never sent as empty strings.
//!
//! ```rust
//! use gpwebpay::operation::{Currency, Operation, PayMethod};
//!
//! let operation = Operation::new(123_456, 100, Currency::Czk)
//!     .with_response_url("https://shop.example/gpwebpay/callback")
//!     .with_description("Order 123456")
//!     .with_pay_method(PayMethod::Card);
//! assert!(operation.validate().is_ok());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::digest::SEPARATOR;
use crate::error::{InvalidOperation, UnknownCurrency, UnknownPayMethod};
use crate::request::RequestField;

const MAX_ORDER_NUMBER_DIGITS: usize = 15;
const MAX_URL_LENGTH: usize = 300;
const MAX_MERCHANT_ORDER_NUMBER_DIGITS: usize = 30;
const MAX_FAST_PAY_ID_DIGITS: usize = 15;
const MAX_TEXT_LENGTH: usize = 255;
const MAX_REFERENCE_NUMBER_LENGTH: usize = 20;

/// Currencies accepted by the gateway, with their ISO 4217 numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum), value(rename_all = "UPPER"))]
pub enum Currency {
    /// Czech koruna.
    Czk,
    /// Euro.
    Eur,
    /// Pound sterling.
    Gbp,
    /// United States dollar.
    Usd,
    /// Hungarian forint.
    Huf,
    /// Polish zloty.
    Pln,
    /// Croatian kuna.
    Hrk,
    /// Russian ruble.
    Rub,
    /// Norwegian krone.
    Nok,
    /// Swedish krona.
    Sek,
}

impl Currency {
    /// All supported currencies.
    pub const ALL: [Self; 10] = [
        Self::Czk,
        Self::Eur,
        Self::Gbp,
        Self::Usd,
        Self::Huf,
        Self::Pln,
        Self::Hrk,
        Self::Rub,
        Self::Nok,
        Self::Sek,
    ];

    /// ISO 4217 numeric code, the value sent as `CURRENCY`.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Czk => 203,
            Self::Eur => 978,
            Self::Gbp => 826,
            Self::Usd => 840,
            Self::Huf => 348,
            Self::Pln => 985,
            Self::Hrk => 191,
            Self::Rub => 643,
            Self::Nok => 578,
            Self::Sek => 752,
        }
    }

    /// ISO 4217 alphabetic code.
    #[must_use]
    pub const fn alpha(self) -> &'static str {
        match self {
            Self::Czk => "CZK",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Usd => "USD",
            Self::Huf => "HUF",
            Self::Pln => "PLN",
            Self::Hrk => "HRK",
            Self::Rub => "RUB",
            Self::Nok => "NOK",
            Self::Sek => "SEK",
        }
    }

    /// Looks a currency up by its numeric code.
    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }
}

impl FromStr for Currency {
    type Err = UnknownCurrency;

    /// Accepts the alphabetic code in any case, or the numeric code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let found = match s.parse::<u16>() {
            Ok(code) => Self::from_code(code),
            Err(_) => Self::ALL
                .into_iter()
                .find(|c| c.alpha().eq_ignore_ascii_case(s)),
        };
        found.ok_or_else(|| UnknownCurrency(s.to_owned()))
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alpha())
    }
}

/// Payment methods that can be preferred, disabled or offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum PayMethod {
    /// Payment card.
    #[serde(rename = "CRD")]
    #[cfg_attr(feature = "cli", value(name = "CRD"))]
    Card,
    /// MasterCard Mobile.
    #[serde(rename = "MCM")]
    #[cfg_attr(feature = "cli", value(name = "MCM"))]
    MasterCardMobile,
    /// MasterPass wallet.
    #[serde(rename = "MPS")]
    #[cfg_attr(feature = "cli", value(name = "MPS"))]
    MasterPass,
    /// PLATBA 24 bank button.
    #[serde(rename = "BTNCS")]
    #[cfg_attr(feature = "cli", value(name = "BTNCS"))]
    Platba24,
    /// Google Pay.
    #[serde(rename = "GPAY")]
    #[cfg_attr(feature = "cli", value(name = "GPAY"))]
    GooglePay,
    /// Apple Pay.
    #[serde(rename = "APAY")]
    #[cfg_attr(feature = "cli", value(name = "APAY"))]
    ApplePay,
}

impl PayMethod {
    /// All supported payment methods.
    pub const ALL: [Self; 6] = [
        Self::Card,
        Self::MasterCardMobile,
        Self::MasterPass,
        Self::Platba24,
        Self::GooglePay,
        Self::ApplePay,
    ];

    /// Wire code of the payment method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Card => "CRD",
            Self::MasterCardMobile => "MCM",
            Self::MasterPass => "MPS",
            Self::Platba24 => "BTNCS",
            Self::GooglePay => "GPAY",
            Self::ApplePay => "APAY",
        }
    }
}

impl FromStr for PayMethod {
    type Err = UnknownPayMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownPayMethod(s.to_owned()))
    }
}

impl fmt::Display for PayMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One payment intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    order_number: u64,
    amount: u64,
    currency: Currency,
    response_url: Option<String>,
    merchant_order_number: Option<String>,
    description: Option<String>,
    md: Option<String>,
    lang: Option<String>,
    user_param1: Option<String>,
    pay_method: Option<PayMethod>,
    disable_pay_method: Option<PayMethod>,
    pay_methods: Vec<PayMethod>,
    email: Option<String>,
    reference_number: Option<String>,
    fast_pay_id: Option<u64>,
    add_info: Option<String>,
}

fn non_empty(value: impl Into<String>) -> Option<String> {
    Some(value.into()).filter(|v| !v.is_empty())
}

impl Operation {
    /// Creates an operation with the mandatory payment values.
    ///
    /// `amount` is in minor currency units. The response URL must still be set
    /// with [`Self::with_response_url`] before a request can be built.
    #[must_use]
    pub const fn new(order_number: u64, amount: u64, currency: Currency) -> Self {
        Self {
            order_number,
            amount,
            currency,
            response_url: None,
            merchant_order_number: None,
            description: None,
            md: None,
            lang: None,
            user_param1: None,
            pay_method: None,
            disable_pay_method: None,
            pay_methods: Vec::new(),
            email: None,
            reference_number: None,
            fast_pay_id: None,
            add_info: None,
        }
    }

    /// Sets the URL the gateway redirects the cardholder back to.
    #[must_use]
    pub fn with_response_url(mut self, url: impl Into<String>) -> Self {
        self.response_url = non_empty(url);
        self
    }

    /// Sets the merchant's own order number (`MERORDERNUM`).
    #[must_use]
    pub fn with_merchant_order_number(mut self, number: impl Into<String>) -> Self {
        self.merchant_order_number = non_empty(number);
        self
    }

    /// Sets the order description shown to the cardholder.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = non_empty(description);
        self
    }

    /// Sets merchant data (`MD`) returned unchanged in the callback.
    #[must_use]
    pub fn with_md(mut self, md: impl Into<String>) -> Self {
        self.md = non_empty(md);
        self
    }

    /// Sets the language of the payment page.
    #[must_use]
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = non_empty(lang);
        self
    }

    /// Sets `USERPARAM1`.
    #[must_use]
    pub fn with_user_param1(mut self, param: impl Into<String>) -> Self {
        self.user_param1 = non_empty(param);
        self
    }

    /// Sets the preferred payment method.
    #[must_use]
    pub fn with_pay_method(mut self, method: PayMethod) -> Self {
        self.pay_method = Some(method);
        self
    }

    /// Sets a payment method that must not be offered.
    #[must_use]
    pub fn with_disable_pay_method(mut self, method: PayMethod) -> Self {
        self.disable_pay_method = Some(method);
        self
    }

    /// Restricts the offered payment methods.
    #[must_use]
    pub fn with_pay_methods(mut self, methods: impl IntoIterator<Item = PayMethod>) -> Self {
        self.pay_methods = methods.into_iter().collect();
        self
    }

    /// Sets the cardholder's e-mail.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = non_empty(email);
        self
    }

    /// Sets the merchant's reference number.
    #[must_use]
    pub fn with_reference_number(mut self, number: impl Into<String>) -> Self {
        self.reference_number = non_empty(number);
        self
    }

    /// Sets the identifier of a previous payment for a FastPay transaction.
    #[must_use]
    pub fn with_fast_pay_id(mut self, id: u64) -> Self {
        self.fast_pay_id = Some(id);
        self
    }

    /// Sets the `ADDINFO` XML document, sent verbatim.
    #[must_use]
    pub fn with_add_info(mut self, xml: impl Into<String>) -> Self {
        self.add_info = non_empty(xml);
        self
    }

    /// Gateway order number.
    #[must_use]
    pub const fn order_number(&self) -> u64 {
        self.order_number
    }

    /// Amount in minor currency units.
    #[must_use]
    pub const fn amount(&self) -> u64 {
        self.amount
    }

    /// Currency of the amount.
    #[must_use]
    pub const fn currency(&self) -> Currency {
        self.currency
    }

    /// Response URL, if set.
    #[must_use]
    pub fn response_url(&self) -> Option<&str> {
        self.response_url.as_deref()
    }

    /// Merchant order number, if set.
    #[must_use]
    pub fn merchant_order_number(&self) -> Option<&str> {
        self.merchant_order_number.as_deref()
    }

    /// Description, if set.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Merchant data, if set.
    #[must_use]
    pub fn md(&self) -> Option<&str> {
        self.md.as_deref()
    }

    /// Payment page language, if set.
    #[must_use]
    pub fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }

    /// `USERPARAM1`, if set.
    #[must_use]
    pub fn user_param1(&self) -> Option<&str> {
        self.user_param1.as_deref()
    }

    /// Preferred payment method, if set.
    #[must_use]
    pub const fn pay_method(&self) -> Option<PayMethod> {
        self.pay_method
    }

    /// Disabled payment method, if set.
    #[must_use]
    pub const fn disable_pay_method(&self) -> Option<PayMethod> {
        self.disable_pay_method
    }

    /// Offered payment methods; empty when unrestricted.
    #[must_use]
    pub fn pay_methods(&self) -> &[PayMethod] {
        &self.pay_methods
    }

    /// Cardholder e-mail, if set.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Reference number, if set.
    #[must_use]
    pub fn reference_number(&self) -> Option<&str> {
        self.reference_number.as_deref()
    }

    /// FastPay identifier, if set.
    #[must_use]
    pub const fn fast_pay_id(&self) -> Option<u64> {
        self.fast_pay_id
    }

    /// `ADDINFO` document, if set.
    #[must_use]
    pub fn add_info(&self) -> Option<&str> {
        self.add_info.as_deref()
    }

    /// Checks the operation against the gateway's field rules.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvalidOperation`] found; a missing response URL is
    /// reported before anything else. Free-text fields must not contain the
    /// `|` digest separator, since the signed text could then be split at a
    /// different field boundary.
    pub fn validate(&self) -> Result<(), InvalidOperation> {
        let url = self
            .response_url
            .as_deref()
            .ok_or(InvalidOperation::MissingResponseUrl)?;
        if Url::parse(url).is_err() {
            return Err(InvalidOperation::InvalidResponseUrl(url.to_owned()));
        }
        check_length(RequestField::Url, url, MAX_URL_LENGTH)?;

        if self.order_number == 0 {
            return Err(InvalidOperation::NotPositive(RequestField::OrderNumber));
        }
        check_length(
            RequestField::OrderNumber,
            &self.order_number.to_string(),
            MAX_ORDER_NUMBER_DIGITS,
        )?;
        if self.amount == 0 {
            return Err(InvalidOperation::NotPositive(RequestField::Amount));
        }

        if let Some(number) = &self.merchant_order_number {
            check_digits(RequestField::MerOrderNum, number)?;
            check_length(
                RequestField::MerOrderNum,
                number,
                MAX_MERCHANT_ORDER_NUMBER_DIGITS,
            )?;
        }
        if let Some(id) = self.fast_pay_id {
            if id == 0 {
                return Err(InvalidOperation::NotPositive(RequestField::FastPayId));
            }
            check_length(
                RequestField::FastPayId,
                &id.to_string(),
                MAX_FAST_PAY_ID_DIGITS,
            )?;
        }

        let texts = [
            (RequestField::Description, &self.description),
            (RequestField::Md, &self.md),
            (RequestField::UserParam1, &self.user_param1),
            (RequestField::Email, &self.email),
        ];
        for (field, value) in texts {
            if let Some(value) = value {
                check_length(field, value, MAX_TEXT_LENGTH)?;
            }
        }
        if let Some(number) = &self.reference_number {
            check_length(
                RequestField::ReferenceNumber,
                number,
                MAX_REFERENCE_NUMBER_LENGTH,
            )?;
        }
        if let Some(email) = &self.email {
            check_email(email)?;
        }

        let signed = [
            (RequestField::Url, self.response_url.as_ref()),
            (RequestField::Description, self.description.as_ref()),
            (RequestField::Md, self.md.as_ref()),
            (RequestField::UserParam1, self.user_param1.as_ref()),
            (RequestField::Email, self.email.as_ref()),
            (RequestField::ReferenceNumber, self.reference_number.as_ref()),
            (RequestField::AddInfo, self.add_info.as_ref()),
        ];
        for (field, value) in signed {
            if value.is_some_and(|v| v.contains(SEPARATOR)) {
                return Err(InvalidOperation::ContainsSeparator(field));
            }
        }
        Ok(())
    }
}

fn check_length(field: RequestField, value: &str, max: usize) -> Result<(), InvalidOperation> {
    if value.chars().count() > max {
        return Err(InvalidOperation::TooLong { field, max });
    }
    Ok(())
}

fn check_digits(field: RequestField, value: &str) -> Result<(), InvalidOperation> {
    if value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(InvalidOperation::NotNumeric(field))
    }
}

fn check_email(email: &str) -> Result<(), InvalidOperation> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(())
    } else {
        Err(InvalidOperation::InvalidEmail(email.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Operation {
        Operation::new(123_456, 100, Currency::Czk).with_response_url("http://test.com")
    }

    #[test]
    fn test_currency_codes() {
        assert_eq!(Currency::Czk.code(), 203);
        assert_eq!(Currency::Eur.code(), 978);
        assert_eq!(Currency::from_code(840), Some(Currency::Usd));
        assert_eq!(Currency::from_code(1), None);
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("czk".parse::<Currency>().unwrap(), Currency::Czk);
        assert_eq!("EUR".parse::<Currency>().unwrap(), Currency::Eur);
        assert_eq!("826".parse::<Currency>().unwrap(), Currency::Gbp);
        assert_eq!(
            "XYZ".parse::<Currency>(),
            Err(UnknownCurrency("XYZ".to_owned()))
        );
    }

    #[test]
    fn test_pay_method_wire_codes() {
        assert_eq!(PayMethod::Platba24.as_str(), "BTNCS");
        assert_eq!("gpay".parse::<PayMethod>().unwrap(), PayMethod::GooglePay);
        assert_eq!(
            serde_json::to_string(&PayMethod::Card).unwrap(),
            "\"CRD\""
        );
    }

    #[test]
    fn test_empty_values_stay_unset() {
        let operation = valid().with_description("").with_md("").with_email("");
        assert_eq!(operation.description(), None);
        assert_eq!(operation.md(), None);
        assert_eq!(operation.email(), None);
    }

    #[test]
    fn test_valid_operation() {
        let operation = valid()
            .with_merchant_order_number("42")
            .with_email("buyer@example.com")
            .with_fast_pay_id(999);
        assert!(operation.validate().is_ok());
    }

    #[test]
    fn test_missing_response_url() {
        let operation = Operation::new(1, 1, Currency::Czk);
        assert_eq!(
            operation.validate(),
            Err(InvalidOperation::MissingResponseUrl)
        );
        let operation = operation.with_response_url("");
        assert_eq!(
            operation.validate(),
            Err(InvalidOperation::MissingResponseUrl)
        );
    }

    #[test]
    fn test_relative_response_url() {
        let operation = Operation::new(1, 1, Currency::Czk).with_response_url("/callback");
        assert_eq!(
            operation.validate(),
            Err(InvalidOperation::InvalidResponseUrl("/callback".to_owned()))
        );
    }

    #[test]
    fn test_zero_values_rejected() {
        let operation = Operation::new(0, 1, Currency::Czk).with_response_url("http://test.com");
        assert_eq!(
            operation.validate(),
            Err(InvalidOperation::NotPositive(RequestField::OrderNumber))
        );
        let operation = Operation::new(1, 0, Currency::Czk).with_response_url("http://test.com");
        assert_eq!(
            operation.validate(),
            Err(InvalidOperation::NotPositive(RequestField::Amount))
        );
    }

    #[test]
    fn test_order_number_length() {
        let operation =
            Operation::new(1_000_000_000_000_000, 1, Currency::Czk).with_response_url("http://test.com");
        assert_eq!(
            operation.validate(),
            Err(InvalidOperation::TooLong {
                field: RequestField::OrderNumber,
                max: 15
            })
        );
    }

    #[test]
    fn test_merchant_order_number_must_be_digits() {
        let operation = valid().with_merchant_order_number("A-1");
        assert_eq!(
            operation.validate(),
            Err(InvalidOperation::NotNumeric(RequestField::MerOrderNum))
        );
    }

    #[test]
    fn test_description_too_long() {
        let operation = valid().with_description("x".repeat(256));
        assert_eq!(
            operation.validate(),
            Err(InvalidOperation::TooLong {
                field: RequestField::Description,
                max: 255
            })
        );
    }

    #[test]
    fn test_zero_fast_pay_id_rejected() {
        let operation = valid().with_fast_pay_id(0);
        assert_eq!(
            operation.validate(),
            Err(InvalidOperation::NotPositive(RequestField::FastPayId))
        );
    }

    #[test]
    fn test_separator_in_signed_text_rejected() {
        assert_eq!(
            valid().with_description("a|b").validate(),
            Err(InvalidOperation::ContainsSeparator(RequestField::Description))
        );
        assert_eq!(
            valid().with_md("1|2").validate(),
            Err(InvalidOperation::ContainsSeparator(RequestField::Md))
        );
        assert_eq!(
            Operation::new(1, 1, Currency::Czk)
                .with_response_url("http://test.com/?a=|")
                .validate(),
            Err(InvalidOperation::ContainsSeparator(RequestField::Url))
        );
    }

    #[test]
    fn test_invalid_email() {
        let operation = valid().with_email("nobody");
        assert_eq!(
            operation.validate(),
            Err(InvalidOperation::InvalidEmail("nobody".to_owned()))
        );
    }
}
