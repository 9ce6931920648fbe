//! GP WebPay command-line tool.
//!
//! Wraps the `gpwebpay` crate with configuration loading and logging so
//! requests can be signed and callbacks verified from a shell.
//!
//! # Modules
//!
//! - [`commands`] - Argument parsing and command handlers
//! - [`config`] - Merchant accounts from TOML with environment variable expansion
//! - [`error`] - Command-line error types

pub mod commands;
pub mod config;
pub mod error;

pub use commands::Cli;
