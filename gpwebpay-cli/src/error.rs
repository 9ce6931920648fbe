//! Error types for the command-line tool.

use gpwebpay::error::{
    Error, GatewayError, KeyError, MalformedResponse, SettingsError, VerificationError,
};

use crate::config::ConfigError;

/// Errors that end a command.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The selected account has invalid settings.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Key material could not be loaded.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// The request could not be built.
    #[error(transparent)]
    Request(#[from] Error),

    /// The callback could not be parsed.
    #[error(transparent)]
    MalformedResponse(#[from] MalformedResponse),

    /// The callback is not trustworthy or could not be checked.
    #[error(transparent)]
    Verification(VerificationError),

    /// The callback is authentic and reports a failed payment.
    #[error("payment declined: {message} ({source})")]
    Declined {
        /// Localized explanation of the result codes.
        message: &'static str,
        /// Result codes as reported by the gateway.
        #[source]
        source: GatewayError,
    },

    /// Output could not be rendered.
    #[error("output can not be rendered: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code: `2` for a declined payment, `1` for anything else.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Declined { .. } => 2,
            _ => 1,
        }
    }
}
