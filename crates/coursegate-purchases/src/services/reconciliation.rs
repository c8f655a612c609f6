//! Pull-based reconciliation.
//!
//! Webhooks get lost. On login (and on demand) the sweep asks the
//! reconciliation-capable platform for the user's transaction history and
//! grants any approved, mapped course the user is missing. It reuses the
//! resolver and the enrollment writer, so it converges with webhook
//! processing instead of racing it.

use crate::client::{ClientError, ProviderCredentials, TransactionClient};
use crate::error::{PurchaseError, Result};
use crate::services::enrollment::EnrollmentWriter;
use crate::services::resolver::{MappingResolver, Resolution};
use crate::store::{EnrollmentStore, IdentityStore, IntegrationStore, WebhookLogStore};
use coursegate_core::{CourseId, Platform, TenantId, UserId};
use coursegate_db::{CreateWebhookLog, EnrollmentSource, WebhookLogStatus};
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, info_span, instrument, warn, Instrument};

/// Event name of the audit row written when a sweep grants access.
pub const RECONCILIATION_EVENT: &str = "reconciliation.sync";

const RECONCILIATION_PLATFORM: Platform = Platform::ProviderB;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub success: bool,
    pub new_enrollments: usize,
    pub message: String,
}

impl ReconcileReport {
    fn ok(new_enrollments: usize, message: impl Into<String>) -> Self {
        Self {
            success: true,
            new_enrollments,
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            new_enrollments: 0,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconciliationSettings {
    /// Upper bound on transaction pages fetched per sweep.
    pub page_cap: u32,
    /// Timeout for each provider API call.
    pub call_timeout: Duration,
}

impl Default for ReconciliationSettings {
    fn default() -> Self {
        Self {
            page_cap: 10,
            call_timeout: Duration::from_secs(10),
        }
    }
}

pub struct ReconciliationService {
    identities: Arc<dyn IdentityStore>,
    integrations: Arc<dyn IntegrationStore>,
    enrollments: Arc<dyn EnrollmentStore>,
    logs: Arc<dyn WebhookLogStore>,
    resolver: MappingResolver,
    writer: EnrollmentWriter,
    client: Arc<dyn TransactionClient>,
    settings: ReconciliationSettings,
}

impl ReconciliationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        integrations: Arc<dyn IntegrationStore>,
        enrollments: Arc<dyn EnrollmentStore>,
        logs: Arc<dyn WebhookLogStore>,
        resolver: MappingResolver,
        writer: EnrollmentWriter,
        client: Arc<dyn TransactionClient>,
        settings: ReconciliationSettings,
    ) -> Self {
        Self {
            identities,
            integrations,
            enrollments,
            logs,
            resolver,
            writer,
            client,
            settings,
        }
    }

    /// Run one sweep. Never fails: problems come back as
    /// `success = false` with a message.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, tenant_id: TenantId, user_id: UserId) -> ReconcileReport {
        match self.sweep(tenant_id, user_id).await {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, "Reconciliation sweep failed");
                ReconcileReport::failed(format!("Reconciliation failed: {err}"))
            }
        }
    }

    /// Run a sweep in the background, bounded by `budget`. The returned
    /// handle may be dropped.
    pub fn spawn_login_sweep(
        self: &Arc<Self>,
        tenant_id: TenantId,
        user_id: UserId,
        budget: Duration,
    ) -> JoinHandle<()> {
        let service = Arc::clone(self);
        let span = info_span!("login_sweep", %tenant_id, %user_id);
        tokio::spawn(
            async move {
                match tokio::time::timeout(budget, service.reconcile(tenant_id, user_id)).await {
                    Ok(report) if report.success => {
                        info!(new_enrollments = report.new_enrollments, "Login sweep finished");
                    }
                    Ok(report) => warn!(message = %report.message, "Login sweep unsuccessful"),
                    Err(_) => warn!(?budget, "Login sweep timed out"),
                }
            }
            .instrument(span),
        )
    }

    async fn sweep(&self, tenant_id: TenantId, user_id: UserId) -> Result<ReconcileReport> {
        let Some(user) = self.identities.find_user(tenant_id, user_id).await? else {
            return Ok(ReconcileReport::failed("User not found"));
        };

        let integration = self
            .integrations
            .find_integration(tenant_id, RECONCILIATION_PLATFORM)
            .await?;
        let credentials = integration.as_ref().filter(|i| i.is_active).and_then(|i| {
            Some(ProviderCredentials {
                api_key: i.api_key()?.to_string(),
                api_base_url: i.api_base_url()?.to_string(),
            })
        });
        let (Some(integration), Some(credentials)) = (integration.as_ref(), credentials) else {
            return Ok(ReconcileReport::ok(0, "No reconciliation-capable integration configured"));
        };

        let mut owned: HashSet<CourseId> = self
            .enrollments
            .active_course_ids(user_id)
            .await?
            .into_iter()
            .collect();
        let mut granted: Vec<CourseId> = Vec::new();
        let mut scanned = 0_usize;

        // Grants already written stay written when a later page fails.
        let mut provider_error: Option<PurchaseError> = None;
        let mut page = 1;
        loop {
            let batch = match self.fetch_page(&credentials, &user.email, page).await {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(page, error = %e, "Transaction page fetch failed");
                    provider_error = Some(e);
                    break;
                }
            };
            scanned += batch.data.len();

            for transaction in batch.data.iter().filter(|t| t.is_approved()) {
                let Some(product_id) = transaction.external_product_id() else {
                    continue;
                };
                let Resolution::Mapped(courses) = self
                    .resolver
                    .resolve(tenant_id, RECONCILIATION_PLATFORM, &product_id)
                    .await?
                else {
                    continue;
                };

                for course in courses {
                    let course_id = CourseId::from_uuid(course.id);
                    if !owned.insert(course_id) {
                        continue;
                    }
                    let grant = self
                        .writer
                        .grant(user_id, course_id, EnrollmentSource::Reconciliation, None)
                        .await?;
                    if grant.created {
                        granted.push(course_id);
                    }
                }
            }

            if !batch.has_more {
                break;
            }
            if page >= self.settings.page_cap {
                warn!(page_cap = self.settings.page_cap, "Stopped at transaction page cap");
                break;
            }
            page += 1;
        }

        if !granted.is_empty() {
            let complete = provider_error.is_none();
            self.record_audit(tenant_id, integration.id, user_id, scanned, &granted, complete)
                .await;
        }

        if let Some(err) = provider_error {
            return Ok(ReconcileReport {
                success: false,
                new_enrollments: granted.len(),
                message: if granted.is_empty() {
                    format!("Reconciliation failed: {err}")
                } else {
                    format!(
                        "Reconciliation failed: {err} ({} new enrollment(s) synchronized before the failure)",
                        granted.len()
                    )
                },
            });
        }

        if granted.is_empty() {
            return Ok(ReconcileReport::ok(0, "Already up to date"));
        }

        info!(new_enrollments = granted.len(), "Reconciliation granted missing courses");
        Ok(ReconcileReport::ok(
            granted.len(),
            format!("Synchronized {} new enrollment(s)", granted.len()),
        ))
    }

    /// Audit row for a sweep that granted access. Failure to write it is
    /// logged only.
    async fn record_audit(
        &self,
        tenant_id: TenantId,
        integration_id: uuid::Uuid,
        user_id: UserId,
        scanned: usize,
        granted: &[CourseId],
        complete: bool,
    ) {
        let audit = CreateWebhookLog {
            tenant_id: tenant_id.into_uuid(),
            integration_id: Some(integration_id),
            platform: RECONCILIATION_PLATFORM.as_str().to_string(),
            event: RECONCILIATION_EVENT.to_string(),
            payload: json!({
                "userId": user_id,
                "transactionsScanned": scanned,
                "grantedCourses": granted,
                "complete": complete,
            }),
        };
        if let Err(e) = self
            .logs
            .create_completed_log(audit, WebhookLogStatus::Success, None, Some(user_id))
            .await
        {
            warn!(error = %e, "Could not record reconciliation audit entry");
        }
    }

    async fn fetch_page(
        &self,
        credentials: &ProviderCredentials,
        email: &str,
        page: u32,
    ) -> Result<crate::client::TransactionPage> {
        let timeout = self.settings.call_timeout;
        tokio::time::timeout(timeout, self.client.list_transactions(credentials, email, page))
            .await
            .map_err(|_| PurchaseError::Provider(ClientError::Timeout(timeout)))?
            .map_err(PurchaseError::from)
    }
}
