//! Shared RSA fixtures for unit tests.
//!
//! Key generation is slow, so each test binary generates its pairs once.

use std::sync::{Arc, OnceLock};

use rsa::RsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::rand_core::OsRng;

use crate::digest::RsaDigestSigner;
use crate::keys::{KeySource, KeyStore};

const KEY_BITS: usize = 1024;

pub(crate) fn private_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, KEY_BITS).unwrap())
}

pub(crate) fn other_private_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, KEY_BITS).unwrap())
}

pub(crate) fn private_pem() -> String {
    pem_of(private_key())
}

pub(crate) fn public_pem() -> String {
    public_pem_of(private_key())
}

fn pem_of(key: &RsaPrivateKey) -> String {
    key.to_pkcs8_pem(LineEnding::LF).unwrap().as_str().to_owned()
}

fn public_pem_of(key: &RsaPrivateKey) -> String {
    key.to_public_key().to_public_key_pem(LineEnding::LF).unwrap()
}

/// Signs with the primary key and verifies with its own public half, so a
/// single store plays both merchant and gateway.
pub(crate) fn key_store() -> KeyStore {
    KeyStore::new(
        KeySource::Pem(private_pem()),
        None,
        KeySource::Pem(public_pem()),
    )
}

pub(crate) fn signer() -> RsaDigestSigner {
    RsaDigestSigner::new(Arc::new(key_store()))
}

/// Signs with an unrelated key but verifies with the primary public key.
pub(crate) fn foreign_signer() -> RsaDigestSigner {
    RsaDigestSigner::new(Arc::new(KeyStore::new(
        KeySource::Pem(pem_of(other_private_key())),
        None,
        KeySource::Pem(public_pem()),
    )))
}

/// Signs with a 256-bit key, too short for a PKCS#1 v1.5 SHA-1 signature.
pub(crate) fn undersized_signer() -> RsaDigestSigner {
    let key = RsaPrivateKey::new(&mut OsRng, 256).unwrap();
    RsaDigestSigner::new(Arc::new(KeyStore::new(
        KeySource::Pem(pem_of(&key)),
        None,
        KeySource::Pem(public_pem()),
    )))
}
