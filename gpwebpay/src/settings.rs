//! Merchant account settings.
//!
//! Settings are loaded once at startup by the embedding application (see the
//! `gpwebpay-cli` crate for a TOML loader) and are read-only afterwards.
//!
//! # Example
//!
//! ```rust
//! use gpwebpay::settings::{DepositFlag, MerchantSettings};
//!
//! let settings: MerchantSettings = serde_json::from_str(r#"{
//!     "merchant_number": 1234567890,
//!     "url": "https://test.3dsecure.gpwebpay.com/pgw/order.do",
//!     "private_key": "keys/merchant.pem",
//!     "public_key": "keys/gpwebpay.pem"
//! }"#).unwrap();
//! assert_eq!(settings.deposit_flag, DepositFlag::Immediate);
//! assert_eq!(settings.gateway_key, "czk");
//! assert!(settings.validate().is_ok());
//! ```

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::SettingsError;
use crate::keys::KeyStore;

/// Whether authorized funds are captured immediately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DepositFlag {
    /// Funds are only authorized; settlement happens separately (`0`).
    Deferred,
    /// Funds are captured right away (`1`).
    #[default]
    Immediate,
}

impl TryFrom<u8> for DepositFlag {
    type Error = SettingsError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Deferred),
            1 => Ok(Self::Immediate),
            other => Err(SettingsError::InvalidDepositFlag(other)),
        }
    }
}

impl From<DepositFlag> for u8 {
    fn from(value: DepositFlag) -> Self {
        match value {
            DepositFlag::Deferred => 0,
            DepositFlag::Immediate => 1,
        }
    }
}

impl fmt::Display for DepositFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

fn default_gateway_key() -> String {
    "czk".to_owned()
}

/// Settings of one merchant account at one gateway.
#[derive(Clone, Serialize, Deserialize)]
pub struct MerchantSettings {
    /// Merchant number assigned by the gateway.
    pub merchant_number: u64,

    /// Capture mode (default: immediate).
    #[serde(default)]
    pub deposit_flag: DepositFlag,

    /// Routing key for multi-currency setups (default: `czk`).
    #[serde(default = "default_gateway_key")]
    pub gateway_key: String,

    /// Gateway endpoint the cardholder is sent to.
    pub url: Url,

    /// Merchant private key (PEM).
    pub private_key: PathBuf,

    /// Passphrase of the private key, if it is encrypted.
    #[serde(default, skip_serializing)]
    pub private_key_password: Option<String>,

    /// Gateway public key (PEM).
    pub public_key: PathBuf,
}

impl fmt::Debug for MerchantSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerchantSettings")
            .field("merchant_number", &self.merchant_number)
            .field("deposit_flag", &self.deposit_flag)
            .field("gateway_key", &self.gateway_key)
            .field("url", &self.url.as_str())
            .field("private_key", &self.private_key)
            .field(
                "private_key_password",
                &self.private_key_password.as_ref().map(|_| "***"),
            )
            .field("public_key", &self.public_key)
            .finish()
    }
}

impl MerchantSettings {
    /// Creates settings with default deposit flag and gateway key.
    #[must_use]
    pub fn new(
        merchant_number: u64,
        url: Url,
        private_key: impl Into<PathBuf>,
        public_key: impl Into<PathBuf>,
    ) -> Self {
        Self {
            merchant_number,
            deposit_flag: DepositFlag::default(),
            gateway_key: default_gateway_key(),
            url,
            private_key: private_key.into(),
            private_key_password: None,
            public_key: public_key.into(),
        }
    }

    /// Sets the capture mode.
    #[must_use]
    pub fn with_deposit_flag(mut self, flag: DepositFlag) -> Self {
        self.deposit_flag = flag;
        self
    }

    /// Sets the gateway routing key.
    #[must_use]
    pub fn with_gateway_key(mut self, key: impl Into<String>) -> Self {
        self.gateway_key = key.into();
        self
    }

    /// Sets the private key passphrase.
    #[must_use]
    pub fn with_private_key_password(mut self, password: impl Into<String>) -> Self {
        self.private_key_password = Some(password.into());
        self
    }

    /// Checks that every mandatory setting is present and sane.
    ///
    /// # Errors
    ///
    /// Returns the first [`SettingsError`] found.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.merchant_number == 0 {
            return Err(SettingsError::InvalidMerchantNumber);
        }
        if self.gateway_key.trim().is_empty() {
            return Err(SettingsError::MissingField("gateway_key"));
        }
        if !matches!(self.url.scheme(), "http" | "https") {
            return Err(SettingsError::InvalidGatewayUrl(self.url.to_string()));
        }
        if self.private_key.as_os_str().is_empty() {
            return Err(SettingsError::MissingField("private_key"));
        }
        if self.public_key.as_os_str().is_empty() {
            return Err(SettingsError::MissingField("public_key"));
        }
        Ok(())
    }

    /// Key store reading the configured key files.
    #[must_use]
    pub fn key_store(&self) -> KeyStore {
        KeyStore::from_files(
            &self.private_key,
            self.private_key_password.clone(),
            &self.public_key,
        )
    }
}
