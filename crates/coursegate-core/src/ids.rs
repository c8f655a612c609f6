//! Strongly Typed Identifiers
//!
//! Newtype wrappers around UUIDs so that a course id can never be passed
//! where a user id is expected.
//!
//! # Example
//!
//! ```
//! use coursegate_core::{CourseId, UserId};
//!
//! fn grant(user: UserId, course: CourseId) -> String {
//!     format!("{user} -> {course}")
//! }
//!
//! let line = grant(UserId::new(), CourseId::new());
//! assert!(line.contains("->"));
//! // grant(CourseId::new(), UserId::new()); // does not compile
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Error type for ID parsing failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse
    pub id_type: &'static str,
    /// The underlying UUID parse error message
    pub message: String,
}

impl Display for ParseIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse {}: {}", self.id_type, self.message)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to define a strongly-typed ID type
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random ID using UUID v4.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns a reference to the underlying UUID.
            #[must_use]
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Consumes the ID and returns the underlying UUID.
            #[must_use]
            pub fn into_uuid(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        message: e.to_string(),
                    })
            }
        }
    };
}

define_id!(
    /// Identifier of a tenant (the isolation boundary owning users,
    /// courses and integrations).
    TenantId
);

define_id!(
    /// Identifier of a user account, unique per tenant by email.
    UserId
);

define_id!(
    /// Identifier of an internal course.
    CourseId
);

define_id!(
    /// Identifier of a tenant's connection to one checkout platform.
    IntegrationId
);

define_id!(
    /// Identifier of a product mapping row.
    ProductMappingId
);

define_id!(
    /// Identifier of an enrollment (a user's access grant to a course).
    EnrollmentId
);

define_id!(
    /// Identifier of a webhook log entry.
    ///
    /// Also used as the `source_id` back-reference on enrollments created
    /// while processing that delivery.
    WebhookLogId
);
