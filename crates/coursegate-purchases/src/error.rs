//! Error types for the purchase engine.

use crate::client::ClientError;
use crate::identity::IdentityError;
use crate::store::StoreError;
use coursegate_core::CoursegateError;
use thiserror::Error;

/// Failures that stop an ingestion or replay.
///
/// Normalization problems and unmapped products are not errors at this
/// level: they are recorded on the webhook log and reported through the
/// ingestion outcome.
#[derive(Debug, Error)]
pub enum PurchaseError {
    #[error(transparent)]
    Core(#[from] CoursegateError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Provider API error: {0}")]
    Provider(#[from] ClientError),

    /// Processing panicked or was otherwise cut short.
    #[error("Processing aborted: {0}")]
    Aborted(String),
}

impl PurchaseError {
    /// Whether the caller could not be matched to a tenant or record.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, PurchaseError::Core(CoursegateError::NotFound { .. }))
    }
}

pub type Result<T> = std::result::Result<T, PurchaseError>;
