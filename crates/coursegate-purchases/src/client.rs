//! Provider transaction API, used by the reconciliation sweep.
//!
//! `GET {api_base_url}/transactions?customer_email=..&page=N` with a bearer
//! API key answers:
//!
//! ```json
//! { "data": [ { "id": "tx_1", "status": "PAID", "product_id": "P1",
//!               "product": { "id": "P1" }, "item_type": "product" } ],
//!   "has_more": false }
//! ```

use crate::normalize::fields::ExternalId;
use crate::normalize::provider_b::NestedProduct;
use crate::normalize::{is_approved_status, line_product_id};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Transaction API request failed: {0}")]
    Request(String),

    #[error("Transaction API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Transaction API response could not be decoded: {0}")]
    Decode(String),

    #[error("Transaction API timed out after {0:?}")]
    Timeout(Duration),
}

/// Credentials from the integration's config.
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    pub api_base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub id: Option<ExternalId>,
    pub status: Option<String>,
    pub product_id: Option<ExternalId>,
    pub product: Option<NestedProduct>,
    pub item_type: Option<String>,
}

impl Transaction {
    pub fn is_approved(&self) -> bool {
        self.status.as_deref().is_some_and(is_approved_status)
    }

    /// Same order-bump rule as webhook deliveries.
    pub fn external_product_id(&self) -> Option<String> {
        line_product_id(
            self.item_type.as_deref(),
            self.product_id.as_ref(),
            self.product.as_ref().and_then(|p| p.id.as_ref()),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionPage {
    #[serde(default)]
    pub data: Vec<Transaction>,
    #[serde(default)]
    pub has_more: bool,
}

#[async_trait::async_trait]
pub trait TransactionClient: Send + Sync {
    /// One page (1-based) of the customer's transactions.
    async fn list_transactions(
        &self,
        credentials: &ProviderCredentials,
        customer_email: &str,
        page: u32,
    ) -> Result<TransactionPage, ClientError>;
}

#[derive(Debug, Clone)]
pub struct HttpTransactionClient {
    client: Client,
    timeout: Duration,
}

impl HttpTransactionClient {
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ClientError::Request(e.to_string()))?;
        Ok(Self { client, timeout })
    }
}

#[async_trait::async_trait]
impl TransactionClient for HttpTransactionClient {
    async fn list_transactions(
        &self,
        credentials: &ProviderCredentials,
        customer_email: &str,
        page: u32,
    ) -> Result<TransactionPage, ClientError> {
        let url = format!(
            "{}/transactions",
            credentials.api_base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .get(url)
            .bearer_auth(&credentials.api_key)
            .query(&[("customer_email", customer_email.to_string()), ("page", page.to_string())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClientError::Timeout(self.timeout)
                } else {
                    ClientError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}
