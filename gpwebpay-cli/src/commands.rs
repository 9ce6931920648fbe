//! Command-line interface definition and command handlers.
//!
//! Handlers return the text to print so they can run without a terminal.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use gpwebpay::codes::ErrorCatalog;
use gpwebpay::error::VerificationError;
use gpwebpay::operation::{Currency, Operation, PayMethod};
use gpwebpay::provider::Provider;
use gpwebpay::request::CardPayRequest;
use gpwebpay::response::CardPayResponse;
use serde::Serialize;
use url::Url;

use crate::config::{CliConfig, DEFAULT_CONFIG};
use crate::error::CliError;

/// Signs GP WebPay payment requests and verifies gateway callbacks.
#[derive(Debug, Parser)]
#[command(name = "gpwebpay", version, about)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "CONFIG", default_value = DEFAULT_CONFIG, global = true)]
    pub config: PathBuf,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build and sign a CREATE_ORDER request.
    Request(RequestArgs),
    /// Verify a gateway callback.
    Verify(VerifyArgs),
    /// Explain a PRCODE/SRCODE pair.
    Translate(TranslateArgs),
}

/// How a signed request is printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Gateway URL with the parameters as query.
    #[default]
    Url,
    /// Gateway URL and ordered parameters as JSON.
    Json,
}

/// Arguments of `gpwebpay request`.
#[derive(Debug, Args)]
pub struct RequestArgs {
    /// Gateway order number.
    #[arg(long)]
    pub order_number: u64,
    /// Amount in minor currency units.
    #[arg(long)]
    pub amount: u64,
    /// Currency code.
    #[arg(long, value_enum, ignore_case = true)]
    pub currency: Currency,
    /// URL the gateway returns the cardholder to.
    #[arg(long)]
    pub response_url: String,
    /// Merchant's own order number (MERORDERNUM).
    #[arg(long)]
    pub merchant_order_number: Option<String>,
    /// Order description.
    #[arg(long)]
    pub description: Option<String>,
    /// Merchant data echoed back in the callback.
    #[arg(long)]
    pub md: Option<String>,
    /// Language of the payment page.
    #[arg(long)]
    pub lang: Option<String>,
    /// Free-form merchant parameter.
    #[arg(long)]
    pub user_param1: Option<String>,
    /// Preferred payment method.
    #[arg(long, value_enum, ignore_case = true)]
    pub pay_method: Option<PayMethod>,
    /// Payment method to hide.
    #[arg(long, value_enum, ignore_case = true)]
    pub disable_pay_method: Option<PayMethod>,
    /// Offered payment methods, comma separated.
    #[arg(long, value_enum, ignore_case = true, value_delimiter = ',')]
    pub pay_methods: Vec<PayMethod>,
    /// Cardholder e-mail.
    #[arg(long)]
    pub email: Option<String>,
    /// Payer reference number.
    #[arg(long)]
    pub reference_number: Option<String>,
    /// Identifier of a stored card for fast payment.
    #[arg(long)]
    pub fast_pay_id: Option<u64>,
    /// ADDINFO XML, passed through verbatim.
    #[arg(long)]
    pub add_info: Option<String>,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Url)]
    pub format: OutputFormat,
    /// Gateway key of the merchant account.
    #[arg(long)]
    pub gateway: Option<String>,
}

/// Arguments of `gpwebpay verify`.
#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Callback query string or form body.
    #[arg(long)]
    pub query: String,
    /// Language of the decline message.
    #[arg(long, default_value = "en")]
    pub lang: String,
    /// Gateway key of the merchant account.
    #[arg(long)]
    pub gateway: Option<String>,
}

/// Arguments of `gpwebpay translate`.
#[derive(Debug, Args)]
pub struct TranslateArgs {
    /// Primary result code.
    pub pr_code: u32,
    /// Secondary result code.
    pub sr_code: u32,
    /// Language of the message.
    #[arg(long, default_value = "en")]
    pub lang: String,
}

#[derive(Serialize)]
struct RequestOutput<'a> {
    url: &'a Url,
    params: &'a CardPayRequest,
}

impl Cli {
    /// Runs the selected command and returns its output.
    ///
    /// # Errors
    ///
    /// Returns [`CliError`] if the command fails; a verified decline is
    /// [`CliError::Declined`].
    pub fn run(&self) -> Result<String, CliError> {
        match &self.command {
            Command::Request(args) => {
                let provider = load_provider(&self.config, args.gateway.as_deref())?;
                args.run(&provider)
            }
            Command::Verify(args) => {
                let provider = load_provider(&self.config, args.gateway.as_deref())?;
                args.run(&provider)
            }
            Command::Translate(args) => Ok(args.run(&ErrorCatalog::builtin())),
        }
    }
}

/// Builds the provider for one account and loads its keys.
fn load_provider(config: &Path, gateway: Option<&str>) -> Result<Provider, CliError> {
    let config = CliConfig::load_from(config)?;
    let settings = config.gateway(gateway)?.clone();
    tracing::info!(
        gateway = %settings.gateway_key,
        merchant_number = settings.merchant_number,
        "Loaded merchant settings"
    );
    let provider = Provider::new(settings)?;
    provider.signer().keys().preload()?;
    Ok(provider)
}

impl RequestArgs {
    fn operation(&self) -> Operation {
        let mut operation = Operation::new(self.order_number, self.amount, self.currency)
            .with_response_url(&self.response_url)
            .with_pay_methods(self.pay_methods.iter().copied());
        if let Some(number) = &self.merchant_order_number {
            operation = operation.with_merchant_order_number(number);
        }
        if let Some(description) = &self.description {
            operation = operation.with_description(description);
        }
        if let Some(md) = &self.md {
            operation = operation.with_md(md);
        }
        if let Some(lang) = &self.lang {
            operation = operation.with_lang(lang);
        }
        if let Some(param) = &self.user_param1 {
            operation = operation.with_user_param1(param);
        }
        if let Some(method) = self.pay_method {
            operation = operation.with_pay_method(method);
        }
        if let Some(method) = self.disable_pay_method {
            operation = operation.with_disable_pay_method(method);
        }
        if let Some(email) = &self.email {
            operation = operation.with_email(email);
        }
        if let Some(number) = &self.reference_number {
            operation = operation.with_reference_number(number);
        }
        if let Some(id) = self.fast_pay_id {
            operation = operation.with_fast_pay_id(id);
        }
        if let Some(xml) = &self.add_info {
            operation = operation.with_add_info(xml);
        }
        operation
    }

    fn run(&self, provider: &Provider) -> Result<String, CliError> {
        let request = provider.create_request(&self.operation())?;
        tracing::info!(order_number = self.order_number, "Signed request");
        match self.format {
            OutputFormat::Url => Ok(provider.redirect_url(&request).into()),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&RequestOutput {
                url: &provider.settings().url,
                params: &request,
            })?),
        }
    }
}

impl VerifyArgs {
    fn run(&self, provider: &Provider) -> Result<String, CliError> {
        let response = CardPayResponse::from_query(&self.query)?;
        match provider.verify_response(&response) {
            Ok(verified) => {
                tracing::info!(order_number = ?verified.order_number(), "Callback verified");
                Ok(serde_json::to_string_pretty(&verified)?)
            }
            Err(VerificationError::Gateway(source)) => Err(CliError::Declined {
                message: provider.translate(&source, &self.lang),
                source,
            }),
            Err(other) => Err(CliError::Verification(other)),
        }
    }
}

impl TranslateArgs {
    fn run(&self, catalog: &ErrorCatalog) -> String {
        catalog
            .translate(self.pr_code, self.sr_code, &self.lang)
            .to_owned()
    }
}
