//! External authentication provider.
//!
//! Credentials live with an external auth service; this engine only asks it
//! to create a pre-verified identity for a new buyer and records the
//! returned id on the user row.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    pub id: String,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    /// The provider already knows this email. `existing_id` is the id the
    /// provider reported for it, when it could be looked up.
    #[error("Identity already exists for {email}")]
    AlreadyExists {
        email: String,
        existing_id: Option<String>,
    },

    #[error("Identity provider request failed: {0}")]
    Request(String),

    #[error("Identity provider rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_identity(
        &self,
        email: &str,
        password: &str,
        email_verified: bool,
    ) -> Result<ExternalIdentity, IdentityError>;

    async fn find_identity(&self, email: &str) -> Result<Option<ExternalIdentity>, IdentityError>;
}

// ============================================================================
// HTTP implementation
// ============================================================================

#[derive(Debug, Serialize)]
struct CreateIdentityRequest<'a> {
    email: &'a str,
    password: &'a str,
    email_confirm: bool,
}

#[derive(Debug, Deserialize)]
struct IdentityRecord {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdentityList {
    #[serde(default)]
    users: Vec<IdentityRecord>,
}

/// Talks to the auth service's admin API with a service key.
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    client: Client,
    base_url: String,
    service_key: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: &str, service_key: &str, timeout: Duration) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        })
    }

    fn users_url(&self) -> String {
        format!("{}/admin/users", self.base_url)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn create_identity(
        &self,
        email: &str,
        password: &str,
        email_verified: bool,
    ) -> Result<ExternalIdentity, IdentityError> {
        let response = self
            .client
            .post(self.users_url())
            .bearer_auth(&self.service_key)
            .json(&CreateIdentityRequest {
                email,
                password,
                email_confirm: email_verified,
            })
            .send()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let record: IdentityRecord = response
                .json()
                .await
                .map_err(|e| IdentityError::Request(e.to_string()))?;
            debug!(identity_id = %record.id, "Created external identity");
            return Ok(ExternalIdentity { id: record.id });
        }

        if status == StatusCode::CONFLICT || status == StatusCode::UNPROCESSABLE_ENTITY {
            let existing_id = match self.find_identity(email).await {
                Ok(found) => found.map(|i| i.id),
                Err(e) => {
                    warn!(error = %e, "Could not look up existing identity");
                    None
                }
            };
            return Err(IdentityError::AlreadyExists {
                email: email.to_string(),
                existing_id,
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(IdentityError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    async fn find_identity(&self, email: &str) -> Result<Option<ExternalIdentity>, IdentityError> {
        let response = self
            .client
            .get(self.users_url())
            .bearer_auth(&self.service_key)
            .query(&[("email", email)])
            .send()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let list: IdentityList = response
            .json()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        Ok(list
            .users
            .into_iter()
            .find(|u| {
                u.email
                    .as_deref()
                    .map_or(true, |e| e.eq_ignore_ascii_case(email))
            })
            .map(|u| ExternalIdentity { id: u.id }))
    }
}

// ============================================================================
// In-memory implementation
// ============================================================================

#[derive(Debug, Clone)]
struct StoredIdentity {
    id: String,
    password: String,
    email_verified: bool,
}

/// Identity provider kept in memory, for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityProvider {
    identities: Arc<RwLock<HashMap<String, StoredIdentity>>>,
    unavailable: bool,
}

impl InMemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose every call fails, to exercise error paths.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Register an identity as if created earlier by another system.
    pub async fn insert_existing(&self, email: &str) -> ExternalIdentity {
        let id = Uuid::new_v4().to_string();
        self.identities.write().await.insert(
            email.to_lowercase(),
            StoredIdentity {
                id: id.clone(),
                password: String::new(),
                email_verified: true,
            },
        );
        ExternalIdentity { id }
    }

    /// Temporary password stored for `email`, if an identity exists.
    pub async fn password_for(&self, email: &str) -> Option<String> {
        self.identities
            .read()
            .await
            .get(&email.to_lowercase())
            .map(|i| i.password.clone())
    }

    pub async fn is_verified(&self, email: &str) -> bool {
        self.identities
            .read()
            .await
            .get(&email.to_lowercase())
            .is_some_and(|i| i.email_verified)
    }

    pub async fn count(&self) -> usize {
        self.identities.read().await.len()
    }
}

#[async_trait::async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn create_identity(
        &self,
        email: &str,
        password: &str,
        email_verified: bool,
    ) -> Result<ExternalIdentity, IdentityError> {
        if self.unavailable {
            return Err(IdentityError::Request("identity provider unavailable".to_string()));
        }

        let mut identities = self.identities.write().await;
        let key = email.to_lowercase();
        if let Some(existing) = identities.get(&key) {
            return Err(IdentityError::AlreadyExists {
                email: email.to_string(),
                existing_id: Some(existing.id.clone()),
            });
        }

        let id = Uuid::new_v4().to_string();
        identities.insert(
            key,
            StoredIdentity {
                id: id.clone(),
                password: password.to_string(),
                email_verified,
            },
        );
        Ok(ExternalIdentity { id })
    }

    async fn find_identity(&self, email: &str) -> Result<Option<ExternalIdentity>, IdentityError> {
        if self.unavailable {
            return Err(IdentityError::Request("identity provider unavailable".to_string()));
        }
        Ok(self
            .identities
            .read()
            .await
            .get(&email.to_lowercase())
            .map(|i| ExternalIdentity { id: i.id.clone() }))
    }
}
