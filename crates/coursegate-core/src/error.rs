//! Shared error type.
//!
//! Variants here are the conditions every coursegate crate can raise without
//! knowing about HTTP or SQL. Crate-specific errors wrap or convert into it.
//!
//! ```
//! use coursegate_core::{CoursegateError, Result};
//!
//! fn tenant_by_slug(slug: &str) -> Result<String> {
//!     if slug.is_empty() {
//!         return Err(CoursegateError::NotFound {
//!             resource: "Tenant".to_string(),
//!             id: None,
//!         });
//!     }
//!     Ok(slug.to_string())
//! }
//!
//! assert!(tenant_by_slug("").is_err());
//! ```

use crate::ids::TenantId;
use serde::Serialize;
use thiserror::Error;

/// Errors shared across the workspace.
///
/// Each variant corresponds to one HTTP status in the API layer:
/// `Unauthorized` 401, `NotFound` 404, `TenantMismatch` 403,
/// `ValidationError` 400, `UnknownPlatform` 404.
#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoursegateError {
    /// Missing or invalid session credentials.
    #[error("Unauthorized{}", message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    Unauthorized {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// A lookup returned nothing.
    #[error("{resource} not found{}", id.as_ref().map(|i| format!(": {i}")).unwrap_or_default())]
    NotFound {
        /// Kind of resource, e.g. "Tenant" or "WebhookLog".
        resource: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// A record of one tenant was about to be touched on behalf of another.
    #[error("Tenant mismatch: expected {expected}, got {actual}")]
    TenantMismatch { expected: TenantId, actual: TenantId },

    /// Input failed validation.
    #[error("Validation error on field '{field}': {message}")]
    ValidationError { field: String, message: String },

    /// A platform identifier that is not one of the supported checkout
    /// platforms.
    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),
}

impl CoursegateError {
    /// Shorthand for a `NotFound` with an identifier.
    pub fn not_found(resource: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: Some(id.to_string()),
        }
    }
}

/// Result alias using [`CoursegateError`].
pub type Result<T> = std::result::Result<T, CoursegateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_display() {
        assert_eq!(
            CoursegateError::Unauthorized { message: None }.to_string(),
            "Unauthorized"
        );
        let err = CoursegateError::Unauthorized {
            message: Some("expired session".to_string()),
        };
        assert_eq!(err.to_string(), "Unauthorized: expired session");
    }

    #[test]
    fn test_not_found_helper_includes_id() {
        let err = CoursegateError::not_found("Tenant", "acme");
        assert_eq!(err.to_string(), "Tenant not found: acme");
    }

    #[test]
    fn test_not_found_without_id() {
        let err = CoursegateError::NotFound {
            resource: "Course".to_string(),
            id: None,
        };
        assert_eq!(err.to_string(), "Course not found");
    }

    #[test]
    fn test_tenant_mismatch_mentions_both_tenants() {
        let expected = TenantId::new();
        let actual = TenantId::new();
        let msg = CoursegateError::TenantMismatch { expected, actual }.to_string();
        assert!(msg.contains(&expected.to_string()));
        assert!(msg.contains(&actual.to_string()));
    }

    #[test]
    fn test_serializes_with_type_tag() {
        let err = CoursegateError::ValidationError {
            field: "email".to_string(),
            message: "must not be empty".to_string(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "validation_error");
        assert_eq!(json["field"], "email");
    }

    #[test]
    fn test_unknown_platform_display() {
        let err = CoursegateError::UnknownPlatform("provider-z".to_string());
        assert_eq!(err.to_string(), "Unknown platform: provider-z");
    }
}
