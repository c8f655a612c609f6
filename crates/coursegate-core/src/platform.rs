//! Checkout platforms.
//!
//! The set is closed: adding a platform means adding a variant here and a
//! normalizer in `coursegate-purchases`.

use crate::error::CoursegateError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A third-party checkout platform that sends purchase webhooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    ProviderA,
    ProviderB,
    ProviderC,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::ProviderA, Platform::ProviderB, Platform::ProviderC];

    /// Value stored in the `platform` columns.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::ProviderA => "provider_a",
            Platform::ProviderB => "provider_b",
            Platform::ProviderC => "provider_c",
        }
    }

    /// Segment used in webhook URLs (`/webhooks/{tenant}/{segment}`).
    #[must_use]
    pub fn path_segment(&self) -> &'static str {
        match self {
            Platform::ProviderA => "provider-a",
            Platform::ProviderB => "provider-b",
            Platform::ProviderC => "provider-c",
        }
    }

    /// Whether the platform exposes a transaction history API that the
    /// reconciliation sweep can query.
    #[must_use]
    pub fn supports_reconciliation(&self) -> bool {
        matches!(self, Platform::ProviderB)
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts both the column form (`provider_b`) and the URL form
/// (`provider-b`), case-insensitively.
impl FromStr for Platform {
    type Err = CoursegateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "provider_a" => Ok(Platform::ProviderA),
            "provider_b" => Ok(Platform::ProviderB),
            "provider_c" => Ok(Platform::ProviderC),
            _ => Err(CoursegateError::UnknownPlatform(s.to_string())),
        }
    }
}
