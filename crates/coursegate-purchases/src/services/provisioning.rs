//! Account provisioning: find the buyer's account or create it.
//!
//! Creation goes through the external auth provider first (pre-verified
//! identity with a temporary password), then inserts the user row. Two
//! deliveries for the same new buyer may race; the loser's insert hits the
//! (tenant, email) constraint and it re-reads the winner's row.

use crate::error::Result;
use crate::identity::{IdentityError, IdentityProvider};
use crate::services::enrollment::EnrollmentWriter;
use crate::store::{CatalogStore, IdentityStore};
use coursegate_core::{CourseId, TenantId, UserId};
use coursegate_db::{normalize_email, CreateUser, EnrollmentSource, User};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const TEMPORARY_PASSWORD_LEN: usize = 16;

/// How the temporary password of a new account is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PasswordPolicy {
    /// Random alphanumeric password per account.
    #[default]
    Generated,
    /// Tenant-configured password shared by all accounts it creates.
    Fixed(String),
}

impl PasswordPolicy {
    /// `Fixed` when the integration config sets `temporary_password`.
    pub fn from_config(temporary_password: Option<&str>) -> Self {
        match temporary_password {
            Some(password) => PasswordPolicy::Fixed(password.to_string()),
            None => PasswordPolicy::Generated,
        }
    }

    fn password(&self) -> String {
        match self {
            PasswordPolicy::Generated => generate_temporary_password(),
            PasswordPolicy::Fixed(password) => password.clone(),
        }
    }
}

pub fn generate_temporary_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TEMPORARY_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[derive(Debug, Clone)]
pub struct ProvisionedUser {
    pub user: User,
    /// False when the account already existed (including when a concurrent
    /// delivery created it first).
    pub created: bool,
    /// Only for accounts created by this call with a fresh identity.
    pub temporary_password: Option<String>,
    /// Free courses granted on creation.
    pub auto_enrolled: Vec<CourseId>,
}

impl ProvisionedUser {
    pub fn user_id(&self) -> UserId {
        UserId::from_uuid(self.user.id)
    }
}

#[derive(Clone)]
pub struct ProvisioningService {
    identities: Arc<dyn IdentityStore>,
    catalog: Arc<dyn CatalogStore>,
    writer: EnrollmentWriter,
    identity_provider: Arc<dyn IdentityProvider>,
    call_timeout: Duration,
}

impl ProvisioningService {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        catalog: Arc<dyn CatalogStore>,
        writer: EnrollmentWriter,
        identity_provider: Arc<dyn IdentityProvider>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            identities,
            catalog,
            writer,
            identity_provider,
            call_timeout,
        }
    }

    /// Find the tenant's account for `email`, or create it.
    ///
    /// # Arguments
    ///
    /// * `email` - Buyer email; trimmed and lower-cased before lookup.
    /// * `display_name` - Stored only when the account is created.
    /// * `policy` - Temporary password for a new external identity.
    ///
    /// # Errors
    ///
    /// - `Identity` if the auth provider fails or times out. No user row is
    ///   written in that case.
    /// - `Store` on any store failure other than the (tenant, email) race, which
    ///   is recovered by re-reading the winner's row.
    #[instrument(skip(self, email, display_name, policy))]
    pub async fn provision(
        &self,
        tenant_id: TenantId,
        email: &str,
        display_name: Option<&str>,
        policy: &PasswordPolicy,
    ) -> Result<ProvisionedUser> {
        let email = normalize_email(email);

        if let Some(user) = self.identities.find_user_by_email(tenant_id, &email).await? {
            debug!(user_id = %user.id, "Buyer already has an account");
            return Ok(existing(user));
        }

        let password = policy.password();
        let (auth_identity_id, temporary_password) = match self.create_identity(&email, &password).await {
            Ok(identity) => (Some(identity.id), Some(password)),
            Err(IdentityError::AlreadyExists { existing_id, .. }) => {
                info!("Identity already registered at auth provider, linking it");
                (existing_id, None)
            }
            Err(e) => return Err(e.into()),
        };

        let data = CreateUser {
            email: email.clone(),
            display_name: display_name.map(str::to_string),
            auth_identity_id,
        };

        let user = match self.identities.create_user(tenant_id, data).await {
            Ok(user) => user,
            Err(err) if err.is_unique_violation() => {
                debug!("Account created concurrently, using the existing row");
                return match self.identities.find_user_by_email(tenant_id, &email).await? {
                    Some(winner) => Ok(existing(winner)),
                    None => Err(err.into()),
                };
            }
            Err(err) => return Err(err.into()),
        };

        info!(user_id = %user.id, "Created account for buyer");
        let auto_enrolled = self.enroll_free_courses(tenant_id, UserId::from_uuid(user.id)).await;

        Ok(ProvisionedUser {
            user,
            created: true,
            temporary_password,
            auto_enrolled,
        })
    }

    async fn create_identity(
        &self,
        email: &str,
        password: &str,
    ) -> std::result::Result<crate::identity::ExternalIdentity, IdentityError> {
        tokio::time::timeout(
            self.call_timeout,
            self.identity_provider.create_identity(email, password, true),
        )
        .await
        .map_err(|_| {
            IdentityError::Request(format!("timed out after {:?}", self.call_timeout))
        })?
    }

    /// Grant every published free course. Individual failures are logged.
    async fn enroll_free_courses(&self, tenant_id: TenantId, user_id: UserId) -> Vec<CourseId> {
        let courses = match self.catalog.free_published_courses(tenant_id).await {
            Ok(courses) => courses,
            Err(e) => {
                warn!(error = %e, "Could not list free courses for auto-enrollment");
                return Vec::new();
            }
        };

        let mut granted = Vec::new();
        for course in courses {
            let course_id = CourseId::from_uuid(course.id);
            match self
                .writer
                .grant(user_id, course_id, EnrollmentSource::AutoFree, None)
                .await
            {
                Ok(grant) if grant.created => granted.push(course_id),
                Ok(_) => {}
                Err(e) => warn!(course_id = %course_id, error = %e, "Free course auto-enrollment failed"),
            }
        }
        granted
    }
}

fn existing(user: User) -> ProvisionedUser {
    ProvisionedUser {
        user,
        created: false,
        temporary_password: None,
        auto_enrolled: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PurchaseError;
    use crate::identity::InMemoryIdentityProvider;
    use crate::store::InMemoryPurchaseStore;
    use coursegate_db::CourseStatus;

    struct Fixture {
        store: Arc<InMemoryPurchaseStore>,
        identity: Arc<InMemoryIdentityProvider>,
        service: ProvisioningService,
        tenant: TenantId,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryPurchaseStore::new());
        let identity = Arc::new(InMemoryIdentityProvider::new());
        let tenant = TenantId::from_uuid(store.add_tenant("School", "school").await.id);
        let service = ProvisioningService::new(
            store.clone(),
            store.clone(),
            EnrollmentWriter::new(store.clone()),
            identity.clone(),
            Duration::from_secs(1),
        );
        Fixture {
            store,
            identity,
            service,
            tenant,
        }
    }

    #[test]
    fn test_generated_password_shape() {
        let password = generate_temporary_password();
        assert_eq!(password.len(), 16);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(password, generate_temporary_password());
    }

    #[test]
    fn test_policy_from_config() {
        assert_eq!(PasswordPolicy::from_config(None), PasswordPolicy::Generated);
        assert_eq!(
            PasswordPolicy::from_config(Some("Welcome1")),
            PasswordPolicy::Fixed("Welcome1".to_string())
        );
    }

    #[tokio::test]
    async fn test_creates_account_with_verified_identity() {
        let f = fixture().await;
        let provisioned = f
            .service
            .provision(f.tenant, " Ana@Example.com ", Some("Ana"), &PasswordPolicy::Generated)
            .await
            .unwrap();

        assert!(provisioned.created);
        assert_eq!(provisioned.user.email, "ana@example.com");
        assert!(provisioned.user.auth_identity_id.is_some());
        let password = provisioned.temporary_password.expect("fresh account has a password");
        assert_eq!(f.identity.password_for("ana@example.com").await, Some(password));
        assert!(f.identity.is_verified("ana@example.com").await);
    }

    #[tokio::test]
    async fn test_existing_account_is_returned() {
        let f = fixture().await;
        let first = f
            .service
            .provision(f.tenant, "ana@example.com", None, &PasswordPolicy::Generated)
            .await
            .unwrap();
        let second = f
            .service
            .provision(f.tenant, "ANA@example.com", None, &PasswordPolicy::Generated)
            .await
            .unwrap();

        assert!(!second.created);
        assert_eq!(second.user.id, first.user.id);
        assert!(second.temporary_password.is_none());
        assert_eq!(f.identity.count().await, 1);
    }

    #[tokio::test]
    async fn test_fixed_password_policy() {
        let f = fixture().await;
        let provisioned = f
            .service
            .provision(
                f.tenant,
                "bob@example.com",
                None,
                &PasswordPolicy::Fixed("Welcome1".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(provisioned.temporary_password.as_deref(), Some("Welcome1"));
    }

    #[tokio::test]
    async fn test_reuses_identity_known_to_auth_provider() {
        let f = fixture().await;
        let existing = f.identity.insert_existing("carla@example.com").await;

        let provisioned = f
            .service
            .provision(f.tenant, "carla@example.com", None, &PasswordPolicy::Generated)
            .await
            .unwrap();

        assert!(provisioned.created);
        assert_eq!(provisioned.user.auth_identity_id, Some(existing.id));
        assert!(provisioned.temporary_password.is_none());
    }

    #[tokio::test]
    async fn test_new_account_gets_free_published_courses() {
        let f = fixture().await;
        let free = f.store.add_course(f.tenant, "Welcome", true, CourseStatus::Published).await;
        f.store.add_course(f.tenant, "Draft freebie", true, CourseStatus::Draft).await;
        f.store.add_course(f.tenant, "Paid", false, CourseStatus::Published).await;

        let provisioned = f
            .service
            .provision(f.tenant, "dan@example.com", None, &PasswordPolicy::Generated)
            .await
            .unwrap();

        assert_eq!(provisioned.auto_enrolled, vec![CourseId::from_uuid(free.id)]);
        let enrollments = f.store.enrollments_for(provisioned.user_id()).await;
        assert_eq!(enrollments.len(), 1);
        assert_eq!(enrollments[0].source, "auto_free");
    }

    #[tokio::test]
    async fn test_identity_provider_failure_propagates() {
        let store = Arc::new(InMemoryPurchaseStore::new());
        let tenant = TenantId::from_uuid(store.add_tenant("School", "school").await.id);
        let service = ProvisioningService::new(
            store.clone(),
            store.clone(),
            EnrollmentWriter::new(store.clone()),
            Arc::new(InMemoryIdentityProvider::unavailable()),
            Duration::from_secs(1),
        );

        let err = service
            .provision(tenant, "eve@example.com", None, &PasswordPolicy::Generated)
            .await
            .unwrap_err();
        assert!(matches!(err, PurchaseError::Identity(_)));
        assert!(store.users(tenant).await.is_empty());
    }
}
