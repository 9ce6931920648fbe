#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Client side of the GP WebPay card payment protocol.
//!
//! This crate builds signed payment-initiation requests and verifies the
//! signed callbacks the gateway sends back. It performs no network I/O: the
//! caller delivers the request (redirect or form POST) and hands the callback
//! parameters back in.
//!
//! # Overview
//!
//! A merchant describes a payment as an [`Operation`](operation::Operation).
//! [`Provider::create_request`](provider::Provider::create_request) turns it
//! into a [`CardPayRequest`](request::CardPayRequest) whose `DIGEST` is an
//! RSA-SHA1 signature over a fixed subset of its fields. When the cardholder
//! returns, [`Provider::verify_response`](provider::Provider::verify_response)
//! checks the callback's `DIGEST` and `DIGEST1` with the gateway's public key
//! before the result code is trusted. Declines surface as
//! [`GatewayError`](error::GatewayError)s that translate to localized messages
//! through an [`ErrorCatalog`](codes::ErrorCatalog).
//!
//! # Modules
//!
//! - [`codes`] - Localized result-code catalog
//! - [`digest`] - Digest text assembly, signing and verification
//! - [`encoding`] - Base64 wire form of digests
//! - [`error`] - Error types
//! - [`keys`] - Merchant and gateway key material
//! - [`operation`] - Payment description, currencies and payment methods
//! - [`provider`] - Per-merchant entry point
//! - [`request`] - Outbound `CREATE_ORDER` request
//! - [`response`] - Inbound callback parsing and verification
//! - [`settings`] - Merchant account settings
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation for debugging and monitoring
//! - `cli` - Derives `clap::ValueEnum` for enums used on the command line

pub mod codes;
pub mod digest;
pub mod encoding;
pub mod error;
pub mod keys;
pub mod operation;
pub mod provider;
pub mod request;
pub mod response;
pub mod settings;

#[cfg(test)]
mod testing;
