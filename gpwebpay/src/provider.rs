//! Merchant-facing entry point.
//!
//! A [`Provider`] bundles one merchant account's settings, its digest signer
//! and the result-code catalog. It is built once at startup and shared by
//! reference; every method takes `&self`.

use std::sync::Arc;

use url::Url;

use crate::codes::ErrorCatalog;
use crate::digest::{DigestSigner, DigestVerifier, RsaDigestSigner};
use crate::error::{Error, GatewayError, MalformedResponse, SettingsError, VerificationError};
use crate::operation::Operation;
use crate::request::CardPayRequest;
use crate::response::{CardPayResponse, VerifiedResponse};
use crate::settings::MerchantSettings;

/// Builds requests and verifies callbacks for one merchant account.
#[derive(Debug, Clone)]
pub struct Provider<S = RsaDigestSigner> {
    settings: MerchantSettings,
    signer: S,
    catalog: ErrorCatalog,
}

impl Provider {
    /// Creates a provider reading the key files named in `settings`.
    ///
    /// Keys are loaded on first use; see [`crate::keys::KeyStore::preload`].
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the settings are invalid.
    pub fn new(settings: MerchantSettings) -> Result<Self, SettingsError> {
        let signer = RsaDigestSigner::new(Arc::new(settings.key_store()));
        Self::with_signer(settings, signer)
    }
}

impl<S> Provider<S> {
    /// Creates a provider with a custom signer.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the settings are invalid.
    pub fn with_signer(settings: MerchantSettings, signer: S) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self {
            settings,
            signer,
            catalog: ErrorCatalog::builtin(),
        })
    }

    /// Replaces the result-code catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: ErrorCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// The merchant settings.
    #[must_use]
    pub const fn settings(&self) -> &MerchantSettings {
        &self.settings
    }

    /// The digest signer.
    #[must_use]
    pub const fn signer(&self) -> &S {
        &self.signer
    }

    /// The result-code catalog.
    #[must_use]
    pub const fn catalog(&self) -> &ErrorCatalog {
        &self.catalog
    }

    /// Parses callback parameters.
    ///
    /// # Errors
    ///
    /// See [`CardPayResponse::from_params`].
    pub fn create_response<I, K, V>(&self, params: I) -> Result<CardPayResponse, MalformedResponse>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        CardPayResponse::from_params(params)
    }

    /// Gateway URL carrying the request as query parameters.
    #[must_use]
    pub fn redirect_url(&self, request: &CardPayRequest) -> Url {
        request.redirect_url(&self.settings.url)
    }

    /// Localized message for a verified decline.
    #[must_use]
    pub fn translate(&self, error: &GatewayError, language: &str) -> &'static str {
        error.translate(&self.catalog, language)
    }
}

impl<S: DigestSigner> Provider<S> {
    /// Builds and signs the request for an operation.
    ///
    /// # Errors
    ///
    /// See [`CardPayRequest::build`].
    pub fn create_request(&self, operation: &Operation) -> Result<CardPayRequest, Error> {
        CardPayRequest::build(
            operation,
            self.settings.merchant_number,
            self.settings.deposit_flag,
            &self.signer,
        )
    }
}

impl<S: DigestVerifier> Provider<S> {
    /// Verifies both digests of a callback against this merchant.
    ///
    /// # Errors
    ///
    /// See [`CardPayResponse::verify`].
    pub fn verify_response<'r>(
        &self,
        response: &'r CardPayResponse,
    ) -> Result<VerifiedResponse<'r>, VerificationError> {
        response.verify(self.settings.merchant_number, &self.signer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::DigestText;
    use crate::error::{DigestError, KeyError};
    use crate::operation::Currency;
    use crate::settings::DepositFlag;
    use crate::testing;

    fn settings() -> MerchantSettings {
        MerchantSettings::new(
            1_234_567_890,
            Url::parse("https://test.3dsecure.gpwebpay.com/pgw/order.do").unwrap(),
            "/nonexistent/merchant.pem",
            "/nonexistent/gpwebpay.pem",
        )
        .with_deposit_flag(DepositFlag::Deferred)
    }

    fn provider() -> Provider {
        Provider::with_signer(settings(), testing::signer()).unwrap()
    }

    fn operation() -> Operation {
        Operation::new(123_456, 100, Currency::Czk).with_response_url("http://test.com")
    }

    #[test]
    fn test_rejects_invalid_settings() {
        let mut bad = settings();
        bad.merchant_number = 0;
        assert!(matches!(
            Provider::new(bad),
            Err(SettingsError::InvalidMerchantNumber)
        ));
    }

    #[test]
    fn test_request_uses_merchant_settings() {
        let provider = provider();
        let request = provider.create_request(&operation()).unwrap();
        let params = request.params();
        assert!(params.contains(&("MERCHANTNUMBER", "1234567890".to_owned())));
        assert!(params.contains(&("DEPOSITFLAG", "0".to_owned())));
        assert!(request.verify_digest(provider.signer()).unwrap());

        let url = provider.redirect_url(&request);
        assert!(url.as_str().starts_with(
            "https://test.3dsecure.gpwebpay.com/pgw/order.do?MERCHANTNUMBER=1234567890&"
        ));
    }

    #[test]
    fn test_missing_key_file_surfaces_on_first_use() {
        let provider = Provider::new(settings()).unwrap();
        let result = provider.create_request(&operation());
        assert!(matches!(
            result,
            Err(Error::Digest(DigestError::Key(KeyError::Unreadable { .. })))
        ));
    }

    #[test]
    fn test_verify_and_translate_decline() {
        let provider = provider();
        let text = DigestText::from_values(["CREATE_ORDER", "123456", "28", "3002"]);
        let digest = provider.signer().sign_encoded(&text).unwrap();
        let digest1 = provider
            .signer()
            .sign_encoded(&text.with_value("1234567890"))
            .unwrap();
        let params = [
            ("OPERATION", "CREATE_ORDER"),
            ("ORDERNUMBER", "123456"),
            ("PRCODE", "28"),
            ("SRCODE", "3002"),
            ("DIGEST", digest.as_str()),
            ("DIGEST1", digest1.as_str()),
        ];
        let response = provider.create_response(params).unwrap();
        let err = provider.verify_response(&response).unwrap_err();
        let gateway = err.as_gateway().unwrap();
        assert_eq!(
            provider.translate(gateway, "en"),
            "Not Authenticated in 3D. Issuer or Cardholder not participating in 3D."
        );
        assert_eq!(provider.translate(gateway, "de"), "unsupported language");
    }

    #[test]
    fn test_custom_catalog() {
        let provider = provider().with_catalog(ErrorCatalog::new());
        assert!(provider.catalog().is_empty());
        assert_eq!(
            provider.translate(&GatewayError::new(30, 1002), "en"),
            "unsupported language"
        );
    }

    #[test]
    fn test_public_types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Provider>();
        assert_send_sync::<crate::keys::KeyStore>();
        assert_send_sync::<ErrorCatalog>();
        assert_send_sync::<CardPayRequest>();
        assert_send_sync::<CardPayResponse>();
        assert_send_sync::<VerifiedResponse<'_>>();
    }
}
