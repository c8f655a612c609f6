//! coursegate Core Library
//!
//! Shared types for the purchase-to-access engine.
//!
//! # Modules
//!
//! - [`ids`] - Strongly typed identifiers (TenantId, UserId, CourseId, ...)
//! - [`platform`] - The closed set of supported checkout platforms
//! - [`traits`] - Multi-tenant traits (TenantAware)
//! - [`error`] - Standardized error types (CoursegateError)
//!
//! # Example
//!
//! ```
//! use coursegate_core::{Platform, TenantId, UserId};
//!
//! let tenant_id = TenantId::new();
//! let user_id = UserId::new();
//! let platform: Platform = "provider-b".parse().unwrap();
//! assert_eq!(platform, Platform::ProviderB);
//! ```

pub mod error;
pub mod ids;
pub mod platform;
pub mod traits;

pub use error::{CoursegateError, Result};
pub use ids::{
    CourseId, EnrollmentId, IntegrationId, ParseIdError, ProductMappingId, TenantId, UserId,
    WebhookLogId,
};
pub use platform::Platform;
pub use traits::{ensure_same_tenant, TenantAware};
