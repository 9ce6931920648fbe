//! `gpwebpay` command-line tool.
//!
//! # Usage
//!
//! ```bash
//! # Sign a request and print the redirect URL
//! gpwebpay request --order-number 123456 --amount 100 --currency CZK \
//!     --response-url https://shop.example/return
//!
//! # Verify a callback received on the response URL
//! gpwebpay verify --query 'OPERATION=CREATE_ORDER&ORDERNUMBER=123456&...'
//!
//! # Explain result codes
//! gpwebpay translate 30 1002 --lang cz
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to TOML configuration file (default: `gpwebpay.toml`)
//! - `RUST_LOG` - Log level filter (default: `info`)
//!
//! Variables from a `.env` file in the working directory are loaded first.
//! Logs go to stderr; command output goes to stdout.
//!
//! # Exit Codes
//!
//! - `0` - success
//! - `1` - configuration, key, request or verification failure
//! - `2` - the callback is authentic and reports a declined payment

use std::io::Write;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gpwebpay_cli::Cli;

fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.run() {
        Ok(output) => {
            if let Err(e) = writeln!(std::io::stdout().lock(), "{output}") {
                tracing::error!("Output can not be written: {e}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(e.exit_code());
        }
    }
}
