//! Company and product identifiers attached to footprints.
//!
//! Identifier formats are fixed by the partner protocol; this module only
//! checks codes against them. Validation is a pure function: it never panics
//! and an unrecognised scheme simply yields `false`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static UUID_LOWER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[1-4][0-9a-f]{3}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("lower-case UUID pattern compiles")
});

static UUID_UPPER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-F]{8}-[0-9A-F]{4}-[1-4][0-9A-F]{3}-[0-9A-F]{4}-[0-9A-F]{12}$")
        .expect("upper-case UUID pattern compiles")
});

/// 13 or 14 digit GTIN followed by a 1-20 digit serial.
static SGTIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{13}|[0-9]{14})[0-9]{1,20}$").expect("SGTIN pattern compiles")
});

/// 13 digit GLN followed by a 1-20 digit extension.
static SGLN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{13}[0-9]{1,20}$").expect("SGLN pattern compiles"));

static LEI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{20}$").expect("LEI pattern compiles"));

/// The identifier schemes understood by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierScheme {
    Uuid,
    Sgtin,
    Sgln,
    Lei,
    SupplierSpecific,
    BuyerSpecific,
}

impl IdentifierScheme {
    pub const ALL: [IdentifierScheme; 6] = [
        IdentifierScheme::Uuid,
        IdentifierScheme::Sgtin,
        IdentifierScheme::Sgln,
        IdentifierScheme::Lei,
        IdentifierScheme::SupplierSpecific,
        IdentifierScheme::BuyerSpecific,
    ];

    /// Resolves the wire tag (`"UUID"`, `"SGTIN"`, ...) to a scheme.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|scheme| scheme.tag() == tag)
    }

    pub fn tag(&self) -> &'static str {
        match self {
            IdentifierScheme::Uuid => "UUID",
            IdentifierScheme::Sgtin => "SGTIN",
            IdentifierScheme::Sgln => "SGLN",
            IdentifierScheme::Lei => "LEI",
            IdentifierScheme::SupplierSpecific => "SupplierSpecific",
            IdentifierScheme::BuyerSpecific => "BuyerSpecific",
        }
    }

    /// Checks `code` against the format of this scheme.
    pub fn is_valid(&self, code: &str) -> bool {
        match self {
            IdentifierScheme::Uuid => UUID_LOWER_RE.is_match(code) || UUID_UPPER_RE.is_match(code),
            IdentifierScheme::Sgtin => SGTIN_RE.is_match(code),
            IdentifierScheme::Sgln => SGLN_RE.is_match(code),
            IdentifierScheme::Lei => LEI_RE.is_match(code),
            // Free-form, owned by the trading partners.
            IdentifierScheme::SupplierSpecific | IdentifierScheme::BuyerSpecific => true,
        }
    }
}

impl fmt::Display for IdentifierScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Validates `code` against the scheme named by `scheme`.
///
/// Unknown schemes are invalid.
pub fn validate(scheme: &str, code: &str) -> bool {
    IdentifierScheme::from_tag(scheme).is_some_and(|s| s.is_valid(code))
}

/// A `(scheme, code)` pair as carried in `companyIds` / `productIds`.
///
/// The scheme is kept as the raw wire tag so that records naming a scheme we
/// do not know still deserialize and can be reported as invalid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub scheme: String,
    pub code: String,
}

impl Identifier {
    pub fn new(scheme: IdentifierScheme, code: impl Into<String>) -> Self {
        Self {
            scheme: scheme.tag().to_string(),
            code: code.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        validate(&self.scheme, &self.code)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.code)
    }
}
