//! Payload normalization.
//!
//! Each checkout platform speaks its own JSON dialect. A delivery is first
//! parsed into the matching [`ProviderPayload`] variant, then reduced by a
//! pure per-variant function to either a canonical [`PurchaseEvent`] or an
//! explicit [`Normalized::Ignored`] verdict. No I/O happens here.
//!
//! ```
//! use coursegate_core::Platform;
//! use coursegate_purchases::normalize::{Normalized, ProviderPayload};
//! use serde_json::json;
//!
//! let body = json!({
//!     "customer": { "email": "ana@example.com", "name": "Ana" },
//!     "products": [ { "id": 42 } ]
//! });
//! let normalized = ProviderPayload::parse(Platform::ProviderA, &body)
//!     .and_then(ProviderPayload::normalize)
//!     .unwrap();
//!
//! match normalized {
//!     Normalized::Actionable(event) => assert_eq!(event.external_product_ids, ["42"]),
//!     Normalized::Ignored { .. } => unreachable!(),
//! }
//! ```

pub mod fields;
pub mod provider_a;
pub mod provider_b;
pub mod provider_c;

pub use provider_a::ProviderAPayload;
pub use provider_b::{is_approved_status, line_product_id, ProviderBPayload, APPROVED_STATUSES};
pub use provider_c::ProviderCPayload;

use coursegate_core::Platform;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Why a delivery could not be turned into a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    /// The body is JSON but not in the platform's format (wrong types,
    /// not an object).
    #[error("payload does not match the {platform} format: {reason}")]
    InvalidShape { platform: Platform, reason: String },

    #[error("customer email is missing from the payload")]
    MissingEmail,

    #[error("payload contains no product ids")]
    NoProducts,
}

/// Canonical purchase extracted from any platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseEvent {
    /// As sent by the platform; provisioning normalizes case and whitespace.
    pub email: String,
    pub display_name: Option<String>,
    pub approval_status: String,
    /// Non-empty, duplicates removed, in payload order.
    pub external_product_ids: Vec<String>,
    pub raw_event_name: String,
}

/// Result of normalizing one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Actionable(PurchaseEvent),
    /// A well-formed delivery that does not grant access (unpaid status,
    /// irrelevant event type). Acknowledged so the platform stops retrying.
    Ignored { event_name: String, reason: String },
}

/// A delivery parsed into its platform's typed shape.
#[derive(Debug, Clone)]
pub enum ProviderPayload {
    ProviderA(ProviderAPayload),
    ProviderB(ProviderBPayload),
    ProviderC(ProviderCPayload),
}

impl ProviderPayload {
    pub fn parse(platform: Platform, payload: &Value) -> Result<Self, NormalizationError> {
        if !payload.is_object() {
            return Err(NormalizationError::InvalidShape {
                platform,
                reason: "expected a JSON object".to_string(),
            });
        }

        let invalid = |e: serde_json::Error| NormalizationError::InvalidShape {
            platform,
            reason: e.to_string(),
        };

        Ok(match platform {
            Platform::ProviderA => {
                Self::ProviderA(serde_json::from_value(payload.clone()).map_err(invalid)?)
            }
            Platform::ProviderB => {
                Self::ProviderB(serde_json::from_value(payload.clone()).map_err(invalid)?)
            }
            Platform::ProviderC => {
                Self::ProviderC(serde_json::from_value(payload.clone()).map_err(invalid)?)
            }
        })
    }

    pub fn platform(&self) -> Platform {
        match self {
            Self::ProviderA(_) => Platform::ProviderA,
            Self::ProviderB(_) => Platform::ProviderB,
            Self::ProviderC(_) => Platform::ProviderC,
        }
    }

    pub fn event_name(&self) -> String {
        match self {
            Self::ProviderA(p) => p.event_name(),
            Self::ProviderB(p) => p.event_name(),
            Self::ProviderC(p) => p.event_name(),
        }
    }

    pub fn normalize(self) -> Result<Normalized, NormalizationError> {
        match self {
            Self::ProviderA(p) => p.normalize(),
            Self::ProviderB(p) => p.normalize(),
            Self::ProviderC(p) => p.normalize(),
        }
    }
}

/// Event name for the log row, read before the body is validated.
///
/// Falls back to a generic name when the body does not parse as the
/// platform's shape.
pub fn peek_event_name(platform: Platform, payload: &Value) -> String {
    match ProviderPayload::parse(platform, payload) {
        Ok(parsed) => parsed.event_name(),
        Err(_) => payload
            .get("event")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("unparsed")
            .to_string(),
    }
}
