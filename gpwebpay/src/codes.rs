//! Localized result-code catalog.
//!
//! The gateway reports failures as a primary code (`PRCODE`) and a secondary
//! code (`SRCODE`). This module maps such pairs to human-readable messages,
//! partitioned by language.
//!
//! Built-in partitions are [`CZECH`] (`cz`) and [`ENGLISH`] (`en`). Additional
//! languages are plain `static` [`LanguageTable`]s registered into an
//! [`ErrorCatalog`] at startup.
//!
//! # Example
//!
//! ```rust
//! use gpwebpay::codes::ErrorCatalog;
//!
//! let catalog = ErrorCatalog::builtin();
//! assert_eq!(catalog.translate(30, 1002, "en"), "Declined in AC, Declined");
//! assert_eq!(catalog.translate(1000, 7, "fr"), "unsupported language");
//! ```

use std::collections::HashMap;

/// Returned when no partition exists for the requested language.
pub const UNSUPPORTED_LANGUAGE: &str = "unsupported language";

/// Messages for one primary code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryEntry {
    /// Primary result code.
    pub pr_code: u32,
    /// Message used when the secondary code has no entry of its own.
    pub message: &'static str,
    /// Secondary code specific messages. Empty for primaries that carry a
    /// single message regardless of `SRCODE`.
    pub secondary: &'static [(u32, &'static str)],
}

impl PrimaryEntry {
    /// Message for the given secondary code.
    #[must_use]
    pub fn message_for(&self, sr_code: u32) -> &'static str {
        self.secondary
            .iter()
            .find(|(code, _)| *code == sr_code)
            .map_or(self.message, |(_, message)| *message)
    }
}

/// All messages of one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageTable {
    /// Language key callers pass to [`ErrorCatalog::translate`].
    pub language: &'static str,
    /// Message for primary codes missing from [`Self::primaries`].
    pub fallback: &'static str,
    /// Known primary codes.
    pub primaries: &'static [PrimaryEntry],
}

impl LanguageTable {
    /// Message for a code pair in this language.
    #[must_use]
    pub fn translate(&self, pr_code: u32, sr_code: u32) -> &'static str {
        self.primaries
            .iter()
            .find(|entry| entry.pr_code == pr_code)
            .map_or(self.fallback, |entry| entry.message_for(sr_code))
    }
}

/// Czech messages.
pub static CZECH: LanguageTable = LanguageTable {
    language: "cz",
    fallback: "Technický problém v systému, kontaktujete obchodníka",
    primaries: &[
        PrimaryEntry {
            pr_code: 28,
            message: "Zamítnuto v 3D",
            secondary: &[
                (
                    3000,
                    "Neověřeno v 3D. Vydavatel karty není zapojen do 3D nebo karta nebyla aktivována",
                ),
                (
                    3002,
                    "Neověřeno v 3D. Vydavatel karty nebo karta není zapojena do 3D",
                ),
                (
                    3004,
                    "Neověřeno v 3D. Vydavatel karty není zapojen do 3D nebo karta nebyla aktivována",
                ),
                (
                    3005,
                    "Zamítnuto v 3D. Technický problém při ověření držitele karty",
                ),
                (
                    3006,
                    "Zamítnuto v 3D. Technický problém při ověření držitele karty",
                ),
                (
                    3007,
                    "Zamítnuto v 3D. Technický problém v systému zůčtující banky. Kontaktujte obchodníka",
                ),
                (
                    3008,
                    "Zamítnuto v 3D. Použit nepodoporavný katetní produkt",
                ),
            ],
        },
        PrimaryEntry {
            pr_code: 30,
            message: "Zamitnuto v autorizacnim centru",
            secondary: &[
                (1001, "Zamitnuto v autorizacnim centru, katra blokována"),
                (1002, "Zamitnuto v autorizacnim centru, autorizace zamítnuta"),
                (1003, "Zamitnuto v autorizacnim centru, problém karty"),
                (1004, "Zamitnuto v autorizacnim centru, technický problém"),
                (1005, "Zamitnuto v autorizacnim centru, Problém ctu"),
            ],
        },
        PrimaryEntry {
            pr_code: 1000,
            message: "Technický problém",
            secondary: &[],
        },
    ],
};

/// English messages.
pub static ENGLISH: LanguageTable = LanguageTable {
    language: "en",
    fallback: "Technical problem in system, contact the merchant.",
    primaries: &[
        PrimaryEntry {
            pr_code: 28,
            message: "Declined in 3D",
            secondary: &[
                (3000, "Not Authenticated in 3D. Cardholder not authenticated in 3D."),
                (
                    3002,
                    "Not Authenticated in 3D. Issuer or Cardholder not participating in 3D.",
                ),
                (
                    3004,
                    "Not Authenticated in 3D. Issuer not participating or Cardholder not enrolled.",
                ),
                (
                    3005,
                    "Declined in 3D. Technical problem during Cardholder authentication.",
                ),
                (
                    3006,
                    "Declined in 3D. Technical problem during Cardholder authentication.",
                ),
                (
                    3007,
                    "Declined in 3D. Acquirer technical problem. Contact the merchant.",
                ),
                (3008, "Declined in 3D. Unsupported card product."),
            ],
        },
        PrimaryEntry {
            pr_code: 30,
            message: "Declined in AC",
            secondary: &[
                (1001, "Declined in AC, Card blocked"),
                (1002, "Declined in AC, Declined"),
                (1003, "Declined in AC, Card problem"),
                (1004, "Declined in AC, Technical problem in authorization process"),
                (1005, "Declined in AC, Account problem"),
            ],
        },
        PrimaryEntry {
            pr_code: 1000,
            message: "Technical problem",
            secondary: &[],
        },
    ],
};

/// Language-keyed collection of [`LanguageTable`]s.
///
/// Lookups never fail: unknown codes degrade to the language's fallback
/// message and unknown languages to [`UNSUPPORTED_LANGUAGE`].
#[derive(Debug, Clone)]
pub struct ErrorCatalog {
    languages: HashMap<&'static str, &'static LanguageTable>,
}

impl ErrorCatalog {
    /// Creates an empty catalog.
    ///
    /// Unlike [`Default`], which yields [`Self::builtin`], no language is
    /// registered; use this to assemble a catalog from custom tables only.
    #[must_use]
    pub fn new() -> Self {
        Self {
            languages: HashMap::new(),
        }
    }

    /// Creates a catalog from a set of tables.
    #[must_use]
    pub fn from_tables(tables: &[&'static LanguageTable]) -> Self {
        let mut catalog = Self {
            languages: HashMap::with_capacity(tables.len()),
        };
        for table in tables {
            catalog.register(table);
        }
        catalog
    }

    /// Catalog with the Czech and English partitions.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_tables(&[&CZECH, &ENGLISH])
    }

    /// Registers a language, replacing any table with the same key.
    pub fn register(&mut self, table: &'static LanguageTable) {
        self.languages.insert(table.language, table);
    }

    /// Builder-style variant of [`Self::register`].
    #[must_use]
    pub fn with_language(mut self, table: &'static LanguageTable) -> Self {
        self.register(table);
        self
    }

    /// Returns `true` if the language has a partition.
    #[must_use]
    pub fn supports(&self, language: &str) -> bool {
        self.languages.contains_key(language)
    }

    /// Returns the number of registered languages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.languages.len()
    }

    /// Returns `true` if no languages are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }

    /// Localized message for a code pair.
    #[must_use]
    pub fn translate(&self, pr_code: u32, sr_code: u32, language: &str) -> &'static str {
        self.languages
            .get(language)
            .map_or(UNSUPPORTED_LANGUAGE, |table| table.translate(pr_code, sr_code))
    }
}

/// The default catalog is [`ErrorCatalog::builtin`], not the empty
/// [`ErrorCatalog::new`].
impl Default for ErrorCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
