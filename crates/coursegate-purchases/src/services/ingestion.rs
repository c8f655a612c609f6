//! Webhook ingestion.
//!
//! Per delivery: count it on the integration, write a PENDING log row with
//! the verbatim body, normalize, provision the buyer, resolve products,
//! grant courses, then finalize the log exactly once. Everything after the
//! log row exists runs under a panic guard so the row never stays PENDING
//! because of a bug.

use crate::error::{PurchaseError, Result};
use crate::normalize::{peek_event_name, Normalized, ProviderPayload, PurchaseEvent};
use crate::notify::{NotificationDispatcher, WelcomeEmail};
use crate::services::enrollment::EnrollmentWriter;
use crate::services::provisioning::{PasswordPolicy, ProvisionedUser, ProvisioningService};
use crate::services::reconciliation::RECONCILIATION_EVENT;
use crate::services::resolver::{MappingResolver, Resolution};
use crate::store::{IntegrationStore, TenantStore, WebhookLogStore};
use coursegate_core::{
    CourseId, CoursegateError, IntegrationId, Platform, TenantId, UserId, WebhookLogId,
};
use coursegate_db::{CreateWebhookLog, EnrollmentSource, Integration, WebhookLogStatus};
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// How a delivery ended, from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStatus {
    /// Every product resolved; log SUCCESS.
    Processed,
    /// Some products resolved, some unmapped; log SUCCESS.
    PartiallyProcessed,
    /// Not an access-granting event; log SUCCESS.
    Ignored,
    /// Valid purchase but no product is mapped; log FAILED.
    Unmapped,
    /// Payload could not be normalized; log FAILED.
    Rejected,
}

impl IngestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::PartiallyProcessed => "partially_processed",
            Self::Ignored => "ignored",
            Self::Unmapped => "unmapped",
            Self::Rejected => "rejected",
        }
    }

    /// Terminal state persisted on the log row.
    pub fn log_status(&self) -> WebhookLogStatus {
        match self {
            Self::Processed | Self::PartiallyProcessed | Self::Ignored => WebhookLogStatus::Success,
            Self::Unmapped | Self::Rejected => WebhookLogStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentSummary {
    pub course_id: CourseId,
    pub course_title: String,
    pub product_id: String,
    /// False when the user already had this course.
    pub created: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestionOutcome {
    pub status: IngestionStatus,
    pub log_id: WebhookLogId,
    pub message: String,
    pub user_id: Option<UserId>,
    pub enrollments: Vec<EnrollmentSummary>,
    pub unmapped_products: Vec<String>,
}

impl IngestionOutcome {
    pub fn new_enrollments(&self) -> usize {
        self.enrollments.iter().filter(|e| e.created).count()
    }
}

/// Result of the processing phase, before the log is finalized.
struct Processed {
    status: IngestionStatus,
    message: String,
    error_message: Option<String>,
    user_id: Option<UserId>,
    enrollments: Vec<EnrollmentSummary>,
    unmapped: Vec<String>,
    welcome: Option<WelcomeEmail>,
}

impl Processed {
    fn without_purchase(status: IngestionStatus, message: String) -> Self {
        Self {
            status,
            error_message: Some(message.clone()),
            message,
            user_id: None,
            enrollments: Vec::new(),
            unmapped: Vec::new(),
            welcome: None,
        }
    }
}

pub struct IngestionService {
    tenants: Arc<dyn TenantStore>,
    integrations: Arc<dyn IntegrationStore>,
    logs: Arc<dyn WebhookLogStore>,
    provisioner: ProvisioningService,
    resolver: MappingResolver,
    writer: EnrollmentWriter,
    notifier: Option<Arc<NotificationDispatcher>>,
}

impl IngestionService {
    pub fn new(
        tenants: Arc<dyn TenantStore>,
        integrations: Arc<dyn IntegrationStore>,
        logs: Arc<dyn WebhookLogStore>,
        provisioner: ProvisioningService,
        resolver: MappingResolver,
        writer: EnrollmentWriter,
        notifier: Option<Arc<NotificationDispatcher>>,
    ) -> Self {
        Self {
            tenants,
            integrations,
            logs,
            provisioner,
            resolver,
            writer,
            notifier,
        }
    }

    /// Handle one delivery addressed to the tenant with `tenant_slug`.
    ///
    /// An unknown tenant fails before anything is written.
    ///
    /// # Errors
    ///
    /// - `Core(NotFound)` if no tenant has `tenant_slug`. Nothing is written.
    /// - `Store` if a store call fails. The log row, once created, is finalized
    ///   FAILED first.
    /// - `Identity` if the buyer's account could not be provisioned.
    /// - `Aborted` if processing panicked.
    ///
    /// Payloads that cannot be normalized are not errors: they come back as
    /// [`IngestionStatus::Rejected`].
    #[instrument(skip(self, payload))]
    pub async fn ingest(
        &self,
        tenant_slug: &str,
        platform: Platform,
        payload: Value,
    ) -> Result<IngestionOutcome> {
        let tenant = self
            .tenants
            .find_tenant_by_slug(tenant_slug)
            .await?
            .ok_or_else(|| CoursegateError::not_found("Tenant", tenant_slug))?;

        self.ingest_for_tenant(TenantId::from_uuid(tenant.id), platform, payload)
            .await
    }

    /// Re-run a stored delivery. Creates a new log row; the original is
    /// left untouched.
    ///
    /// # Errors
    ///
    /// - `Core(NotFound)` if the log does not exist in `tenant_id`.
    /// - `Core(ValidationError)` for reconciliation audit entries.
    /// - Otherwise as for [`IngestionService::ingest`].
    #[instrument(skip(self))]
    pub async fn replay(&self, tenant_id: TenantId, log_id: WebhookLogId) -> Result<IngestionOutcome> {
        let log = self
            .logs
            .find_log(tenant_id, log_id)
            .await?
            .ok_or_else(|| CoursegateError::not_found("WebhookLog", log_id))?;

        if log.event == RECONCILIATION_EVENT {
            return Err(CoursegateError::ValidationError {
                field: "event".to_string(),
                message: "reconciliation audit entries cannot be replayed".to_string(),
            }
            .into());
        }

        let platform: Platform = log.platform.parse()?;
        info!(original_log_id = %log_id, "Replaying webhook delivery");
        self.ingest_for_tenant(tenant_id, platform, log.payload).await
    }

    async fn ingest_for_tenant(
        &self,
        tenant_id: TenantId,
        platform: Platform,
        payload: Value,
    ) -> Result<IngestionOutcome> {
        let integration = self.integrations.record_webhook(tenant_id, platform).await?;
        let integration_id = IntegrationId::from_uuid(integration.id);

        let log = self
            .logs
            .create_pending_log(CreateWebhookLog {
                tenant_id: tenant_id.into_uuid(),
                integration_id: Some(integration.id),
                platform: platform.as_str().to_string(),
                event: peek_event_name(platform, &payload),
                payload,
            })
            .await?;
        let log_id = WebhookLogId::from_uuid(log.id);

        let processing = AssertUnwindSafe(self.process(
            tenant_id,
            platform,
            &integration,
            log_id,
            &log.payload,
        ))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(PurchaseError::Aborted(panic_message(panic.as_ref()))));

        let processed = match processing {
            Ok(processed) => processed,
            Err(err) => {
                error!(log_id = %log_id, error = %err, "Webhook processing failed");
                if let Err(e) = self
                    .finalize(log_id, integration_id, WebhookLogStatus::Failed, Some(err.to_string()), None)
                    .await
                {
                    error!(log_id = %log_id, error = %e, "Could not mark webhook log as failed");
                }
                return Err(err);
            }
        };

        self.finalize(
            log_id,
            integration_id,
            processed.status.log_status(),
            processed.error_message.clone(),
            processed.user_id,
        )
        .await?;

        info!(
            log_id = %log_id,
            status = processed.status.as_str(),
            enrollments = processed.enrollments.len(),
            unmapped = processed.unmapped.len(),
            "Webhook processed"
        );

        if let Some(welcome) = processed.welcome {
            self.notify(welcome).await;
        }

        Ok(IngestionOutcome {
            status: processed.status,
            log_id,
            message: processed.message,
            user_id: processed.user_id,
            enrollments: processed.enrollments,
            unmapped_products: processed.unmapped,
        })
    }

    async fn process(
        &self,
        tenant_id: TenantId,
        platform: Platform,
        integration: &Integration,
        log_id: WebhookLogId,
        payload: &Value,
    ) -> Result<Processed> {
        let normalized = ProviderPayload::parse(platform, payload).and_then(ProviderPayload::normalize);
        let event = match normalized {
            Ok(Normalized::Actionable(event)) => event,
            Ok(Normalized::Ignored { event_name, reason }) => {
                info!(event = %event_name, %reason, "Ignoring non-actionable event");
                return Ok(Processed::without_purchase(
                    IngestionStatus::Ignored,
                    format!("Ignored: {reason}"),
                ));
            }
            Err(err) => {
                warn!(error = %err, "Webhook payload rejected");
                return Ok(Processed::without_purchase(
                    IngestionStatus::Rejected,
                    format!("Invalid payload: {err}"),
                ));
            }
        };

        let policy = PasswordPolicy::from_config(integration.temporary_password());
        let provisioned = self
            .provisioner
            .provision(tenant_id, &event.email, event.display_name.as_deref(), &policy)
            .await?;
        let user_id = provisioned.user_id();

        let mut enrollments = Vec::new();
        let mut unmapped = Vec::new();
        for product_id in &event.external_product_ids {
            match self.resolver.resolve(tenant_id, platform, product_id).await? {
                Resolution::Unmapped => {
                    warn!(product_id = %product_id, "No course mapped for product");
                    unmapped.push(product_id.clone());
                }
                Resolution::Mapped(courses) => {
                    for course in courses {
                        let course_id = CourseId::from_uuid(course.id);
                        let grant = self
                            .writer
                            .grant(user_id, course_id, EnrollmentSource::Webhook, Some(log_id))
                            .await?;
                        enrollments.push(EnrollmentSummary {
                            course_id,
                            course_title: course.title,
                            product_id: product_id.clone(),
                            created: grant.created,
                        });
                    }
                }
            }
        }

        Ok(summarize(&event, &provisioned, enrollments, unmapped))
    }

    async fn finalize(
        &self,
        log_id: WebhookLogId,
        integration_id: IntegrationId,
        status: WebhookLogStatus,
        error_message: Option<String>,
        user_id: Option<UserId>,
    ) -> Result<()> {
        let updated = self
            .logs
            .finalize_log(log_id, status, error_message, user_id)
            .await?;

        if updated.is_none() {
            warn!(log_id = %log_id, "Webhook log was already finalized");
            return Ok(());
        }
        if status == WebhookLogStatus::Failed {
            self.integrations.increment_error_count(integration_id).await?;
        }
        Ok(())
    }

    async fn notify(&self, welcome: WelcomeEmail) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        if let Err(e) = notifier.send_welcome(welcome).await {
            warn!(error = %e, "Welcome email failed; enrollments are unaffected");
        }
    }
}

fn summarize(
    event: &PurchaseEvent,
    provisioned: &ProvisionedUser,
    enrollments: Vec<EnrollmentSummary>,
    unmapped: Vec<String>,
) -> Processed {
    let (status, message, error_message) = if enrollments.is_empty() {
        let message = format!("No course mapped for products: {}", unmapped.join(", "));
        (IngestionStatus::Unmapped, message.clone(), Some(message))
    } else if unmapped.is_empty() {
        let message = format!("Processed {} enrollment(s)", enrollments.len());
        (IngestionStatus::Processed, message, None)
    } else {
        (
            IngestionStatus::PartiallyProcessed,
            format!(
                "Processed {} enrollment(s); {} product(s) unmapped",
                enrollments.len(),
                unmapped.len()
            ),
            Some(format!("Unmapped products: {}", unmapped.join(", "))),
        )
    };

    let new_titles: Vec<String> = enrollments
        .iter()
        .filter(|e| e.created)
        .map(|e| e.course_title.clone())
        .collect();
    let welcome = (!new_titles.is_empty()).then(|| WelcomeEmail {
        to: provisioned.user.email.clone(),
        display_name: event.display_name.clone(),
        course_titles: new_titles,
        temporary_password: provisioned.temporary_password.clone(),
    });

    Processed {
        status,
        message,
        error_message,
        user_id: Some(provisioned.user_id()),
        enrollments,
        unmapped,
        welcome,
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic during webhook processing".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_status_per_outcome() {
        assert_eq!(IngestionStatus::Processed.log_status(), WebhookLogStatus::Success);
        assert_eq!(IngestionStatus::PartiallyProcessed.log_status(), WebhookLogStatus::Success);
        assert_eq!(IngestionStatus::Ignored.log_status(), WebhookLogStatus::Success);
        assert_eq!(IngestionStatus::Unmapped.log_status(), WebhookLogStatus::Failed);
        assert_eq!(IngestionStatus::Rejected.log_status(), WebhookLogStatus::Failed);
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "panic during webhook processing");
    }
}
