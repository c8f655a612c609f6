//! Engine services, leaf first: writer and resolver, then the provisioner,
//! then the two entry points (ingestion and reconciliation).

pub mod enrollment;
pub mod ingestion;
pub mod provisioning;
pub mod reconciliation;
pub mod resolver;

pub use enrollment::{EnrollmentWriter, Grant};
pub use ingestion::{EnrollmentSummary, IngestionOutcome, IngestionService, IngestionStatus};
pub use provisioning::{
    generate_temporary_password, PasswordPolicy, ProvisionedUser, ProvisioningService,
};
pub use reconciliation::{
    ReconcileReport, ReconciliationService, ReconciliationSettings, RECONCILIATION_EVENT,
};
pub use resolver::{MappingResolver, Resolution};
