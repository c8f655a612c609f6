//! Wiring of the engine's services over one store.

use crate::client::TransactionClient;
use crate::identity::IdentityProvider;
use crate::notify::{EmailSender, NotificationDispatcher};
use crate::services::{
    EnrollmentWriter, IngestionService, MappingResolver, ProvisioningService,
    ReconciliationService, ReconciliationSettings,
};
use crate::store::{IdentityStore, PurchaseStore, TenantStore, WebhookLogStore};
use std::sync::Arc;
use std::time::Duration;

/// Tunables shared by the services.
#[derive(Debug, Clone)]
pub struct PurchaseSettings {
    /// Timeout for each identity, transaction API and email call.
    pub external_call_timeout: Duration,
    /// Upper bound on a detached login sweep.
    pub login_sweep_timeout: Duration,
    pub reconciliation_page_cap: u32,
    /// Sign-in URL included in welcome emails.
    pub login_url: String,
}

impl Default for PurchaseSettings {
    fn default() -> Self {
        Self {
            external_call_timeout: Duration::from_secs(10),
            login_sweep_timeout: Duration::from_secs(60),
            reconciliation_page_cap: 10,
            login_url: "http://localhost:3000/login".to_string(),
        }
    }
}

/// External collaborators the engine calls out to.
pub struct Collaborators {
    pub identity_provider: Arc<dyn IdentityProvider>,
    pub transaction_client: Arc<dyn TransactionClient>,
    /// `None` disables welcome emails.
    pub email_sender: Option<Arc<dyn EmailSender>>,
}

/// Everything the HTTP layer needs, built once at startup.
#[derive(Clone)]
pub struct PurchaseContext {
    pub ingestion: Arc<IngestionService>,
    pub reconciliation: Arc<ReconciliationService>,
    pub tenants: Arc<dyn TenantStore>,
    pub identities: Arc<dyn IdentityStore>,
    pub logs: Arc<dyn WebhookLogStore>,
    pub settings: PurchaseSettings,
}

impl PurchaseContext {
    pub fn new<S>(store: Arc<S>, collaborators: Collaborators, settings: PurchaseSettings) -> Self
    where
        S: PurchaseStore + 'static,
    {
        let writer = EnrollmentWriter::new(store.clone());
        let resolver = MappingResolver::new(store.clone());
        let provisioner = ProvisioningService::new(
            store.clone(),
            store.clone(),
            writer.clone(),
            collaborators.identity_provider,
            settings.external_call_timeout,
        );
        let notifier = collaborators.email_sender.map(|sender| {
            Arc::new(NotificationDispatcher::new(
                sender,
                settings.login_url.clone(),
                settings.external_call_timeout,
            ))
        });

        let ingestion = IngestionService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            provisioner,
            resolver.clone(),
            writer.clone(),
            notifier,
        );
        let reconciliation = ReconciliationService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            resolver,
            writer,
            collaborators.transaction_client,
            ReconciliationSettings {
                page_cap: settings.reconciliation_page_cap,
                call_timeout: settings.external_call_timeout,
            },
        );

        Self {
            ingestion: Arc::new(ingestion),
            reconciliation: Arc::new(reconciliation),
            tenants: store.clone(),
            identities: store.clone(),
            logs: store,
            settings,
        }
    }
}
