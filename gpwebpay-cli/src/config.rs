//! Command-line configuration.
//!
//! Loads merchant accounts from a TOML file with support for environment
//! variable expansion in string values. Variables use `$VAR` or `${VAR}`
//! syntax, which keeps key passphrases out of the file.
//!
//! # Example Configuration
//!
//! ```toml
//! default_gateway = "czk"
//!
//! [gateways.czk]
//! merchant_number = 1234567890
//! deposit_flag = 1
//! url = "https://test.3dsecure.gpwebpay.com/pgw/order.do"
//! private_key = "keys/merchant.pem"
//! private_key_password = "$GPWEBPAY_KEY_PASSWORD"
//! public_key = "keys/gpwebpay.pem"
//!
//! [gateways.eur]
//! merchant_number = 1234567891
//! url = "https://test.3dsecure.gpwebpay.com/pgw/order.do"
//! private_key = "keys/merchant-eur.pem"
//! public_key = "keys/gpwebpay.pem"
//! ```
//!
//! Each table under `gateways` is one merchant account; its name is the
//! account's gateway key.
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to configuration file (default: `gpwebpay.toml`)
//! - Key passphrases referenced by `$VAR` in the config file

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use gpwebpay::error::SettingsError;
use gpwebpay::settings::MerchantSettings;
use serde::{Deserialize, Serialize};

/// Default configuration file name.
pub const DEFAULT_CONFIG: &str = "gpwebpay.toml";

/// Errors raised while loading or querying the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("config file '{path}' can not be read: {source}")]
    Read {
        /// Location of the file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML or does not match the schema.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A merchant account has invalid settings.
    #[error("gateway '{gateway}': {source}")]
    Settings {
        /// Gateway key of the account.
        gateway: String,
        /// What is wrong with it.
        #[source]
        source: SettingsError,
    },

    /// No merchant account with the requested key.
    #[error("gateway '{0}' is not configured")]
    UnknownGateway(String),

    /// No account was requested and none is the default.
    #[error("several gateways are configured; pick one with --gateway or set default_gateway")]
    AmbiguousGateway,

    /// The configuration holds no merchant accounts.
    #[error("no gateways are configured")]
    NoGateways,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Gateway used when none is requested explicitly.
    #[serde(default)]
    pub default_gateway: Option<String>,

    /// Merchant accounts keyed by gateway key.
    #[serde(default)]
    pub gateways: BTreeMap<String, MerchantSettings>,
}

impl CliConfig {
    /// Loads configuration from a file.
    ///
    /// `$VAR` / `${VAR}` references are expanded from the process environment
    /// before parsing. Every account is validated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed or holds an
    /// invalid account.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the text cannot be parsed or holds an
    /// invalid account.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(content);
        let mut config: Self = toml::from_str(&expanded)?;

        for (key, settings) in &mut config.gateways {
            settings.gateway_key.clone_from(key);
            settings
                .validate()
                .map_err(|source| ConfigError::Settings {
                    gateway: key.clone(),
                    source,
                })?;
        }
        Ok(config)
    }

    /// Selects a merchant account.
    ///
    /// Resolution order: the requested key, `default_gateway`, then the only
    /// configured account.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if no account matches.
    pub fn gateway(&self, key: Option<&str>) -> Result<&MerchantSettings, ConfigError> {
        if let Some(key) = key.or(self.default_gateway.as_deref()) {
            return self
                .gateways
                .get(key)
                .ok_or_else(|| ConfigError::UnknownGateway(key.to_owned()));
        }
        let mut accounts = self.gateways.values();
        match (accounts.next(), accounts.next()) {
            (Some(only), None) => Ok(only),
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousGateway),
            (None, _) => Err(ConfigError::NoGateways),
        }
    }
}

/// Expands `$VAR` and `${VAR}` patterns in a string from environment variables.
///
/// Unresolved variables are left as-is.
fn expand_env_vars(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        let braced = chars.next_if_eq(&'{').is_some();
        let mut name = String::new();
        let mut closed = false;
        while let Some(&c) = chars.peek() {
            if braced && c == '}' {
                chars.next();
                closed = true;
                break;
            }
            if !braced && !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            name.push(c);
            chars.next();
        }

        let unterminated = braced && !closed;
        match lookup(&name).filter(|_| !name.is_empty() && !unterminated) {
            Some(value) => result.push_str(&value),
            None => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&name);
                if closed {
                    result.push('}');
                }
            }
        }
    }

    result
}
