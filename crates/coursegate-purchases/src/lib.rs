//! # Purchase-to-access engine
//!
//! Turns checkout-platform purchases into course enrollments.
//!
//! ```text
//! webhook ──► normalize ──► provision buyer ──► resolve products ──► grant courses
//!                │                                                       │
//!                └──────────── webhook log (PENDING → SUCCESS/FAILED) ◄──┘
//!
//! login / manual sync ──► provider transaction API ──► resolve ──► grant missing
//! ```
//!
//! - [`normalize`]: per-platform payload parsing into one [`PurchaseEvent`]
//! - [`services`]: provisioning, mapping resolution, enrollment, ingestion,
//!   reconciliation
//! - [`store`]: persistence traits with Postgres and in-memory backends
//! - [`identity`], [`notify`], [`client`]: external collaborators
//! - [`context`]: wiring for the HTTP layer
//!
//! Duplicate, out-of-order and concurrent deliveries are all expected.
//! Idempotency comes from existence checks backed by database uniqueness
//! (one account per tenant and email, one active enrollment per user and
//! course).

pub mod client;
pub mod context;
pub mod error;
pub mod identity;
pub mod normalize;
pub mod notify;
pub mod services;
pub mod store;

pub use client::{
    ClientError, HttpTransactionClient, ProviderCredentials, Transaction, TransactionClient,
    TransactionPage,
};
pub use context::{Collaborators, PurchaseContext, PurchaseSettings};
pub use error::{PurchaseError, Result};
pub use identity::{
    ExternalIdentity, HttpIdentityProvider, IdentityError, IdentityProvider,
    InMemoryIdentityProvider,
};
pub use normalize::{NormalizationError, Normalized, ProviderPayload, PurchaseEvent};
pub use notify::{
    EmailMessage, EmailSender, HttpEmailSender, MockEmailSender, NotificationDispatcher,
    NotificationError, WelcomeEmail,
};
pub use services::{
    EnrollmentSummary, EnrollmentWriter, Grant, IngestionOutcome, IngestionService,
    IngestionStatus, MappingResolver, PasswordPolicy, ProvisionedUser, ProvisioningService,
    ReconcileReport, ReconciliationService, ReconciliationSettings, Resolution,
};
pub use store::{
    InMemoryPurchaseStore, PgPurchaseStore, PurchaseStore, StoreError, StoreResult,
};
