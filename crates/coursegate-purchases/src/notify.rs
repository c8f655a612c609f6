//! Welcome notifications.
//!
//! Only the contract "send a welcome email" lives here; templates and
//! delivery belong to the transactional email service behind
//! [`EmailSender`]. Failures are returned to the caller, which logs them and
//! carries on: a purchase that was granted stays granted.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Email configuration error: {0}")]
    Configuration(String),

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Email delivery timed out after {0:?}")]
    Timeout(Duration),
}

pub type NotificationResult<T> = Result<T, NotificationError>;

/// A rendered plain-text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait::async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> NotificationResult<()>;
}

/// Sends through a transactional email HTTP API (JSON body, bearer key).
#[derive(Debug, Clone)]
pub struct HttpEmailSender {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

impl HttpEmailSender {
    pub fn new(
        api_url: &str,
        api_key: &str,
        from: &str,
        timeout: Duration,
    ) -> NotificationResult<Self> {
        if from.trim().is_empty() {
            return Err(NotificationError::Configuration(
                "sender address is empty".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotificationError::Configuration(e.to_string()))?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, message: &EmailMessage) -> NotificationResult<()> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&SendEmailRequest {
                from: &self.from,
                to: [&message.to],
                subject: &message.subject,
                text: &message.text,
            })
            .send()
            .await
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::SendFailed(format!("{status}: {body}")));
        }
        Ok(())
    }
}

/// Records messages instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct MockEmailSender {
    sent: Arc<RwLock<Vec<EmailMessage>>>,
    fail: bool,
}

impl MockEmailSender {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender whose every send fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.read().await.clone()
    }
}

#[async_trait::async_trait]
impl EmailSender for MockEmailSender {
    async fn send(&self, message: &EmailMessage) -> NotificationResult<()> {
        if self.fail {
            return Err(NotificationError::SendFailed("mock failure".to_string()));
        }
        self.sent.write().await.push(message.clone());
        Ok(())
    }
}

/// Input for a welcome message after new enrollments.
#[derive(Debug, Clone)]
pub struct WelcomeEmail {
    pub to: String,
    pub display_name: Option<String>,
    pub course_titles: Vec<String>,
    /// Set only when the account was created by this purchase.
    pub temporary_password: Option<String>,
}

pub struct NotificationDispatcher {
    sender: Arc<dyn EmailSender>,
    login_url: String,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(sender: Arc<dyn EmailSender>, login_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            sender,
            login_url: login_url.into(),
            timeout,
        }
    }

    #[must_use]
    pub fn compose_welcome(&self, email: &WelcomeEmail) -> EmailMessage {
        let greeting = match email.display_name.as_deref() {
            Some(name) => format!("Hi {name},"),
            None => "Hi,".to_string(),
        };
        let courses = email
            .course_titles
            .iter()
            .map(|t| format!("  - {t}"))
            .collect::<Vec<_>>()
            .join("\n");

        let mut text = format!(
            "{greeting}\n\nYour purchase is confirmed. You now have access to:\n{courses}\n\nSign in at {}\n",
            self.login_url
        );
        if let Some(password) = &email.temporary_password {
            text.push_str(&format!(
                "\nYour login is {} and your temporary password is {password}\nPlease change it after your first sign-in.\n",
                email.to
            ));
        }

        let subject = match email.course_titles.as_slice() {
            [only] => format!("Your access to {only} is ready"),
            _ => "Your courses are ready".to_string(),
        };

        EmailMessage {
            to: email.to.clone(),
            subject,
            text,
        }
    }

    /// Compose and send, bounded by the dispatcher timeout.
    ///
    /// # Errors
    ///
    /// - `Timeout` if the sender does not answer within the dispatcher timeout.
    /// - `SendFailed` if the email API rejects the message.
    #[instrument(skip(self, email), fields(courses = email.course_titles.len()))]
    pub async fn send_welcome(&self, email: WelcomeEmail) -> NotificationResult<()> {
        let message = self.compose_welcome(&email);
        tokio::time::timeout(self.timeout, self.sender.send(&message))
            .await
            .map_err(|_| NotificationError::Timeout(self.timeout))??;
        debug!("Welcome email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn welcome(password: Option<&str>) -> WelcomeEmail {
        WelcomeEmail {
            to: "ana@example.com".to_string(),
            display_name: Some("Ana".to_string()),
            course_titles: vec!["Rust Basics".to_string()],
            temporary_password: password.map(str::to_string),
        }
    }

    #[test]
    fn test_compose_includes_password_only_when_given() {
        let sender = Arc::new(MockEmailSender::new());
        let dispatcher = NotificationDispatcher::new(sender, "https://school.test/login", Duration::from_secs(1));

        let with = dispatcher.compose_welcome(&welcome(Some("Tmp-123")));
        assert!(with.text.contains("Tmp-123"));
        assert!(with.text.contains("https://school.test/login"));
        assert_eq!(with.subject, "Your access to Rust Basics is ready");

        let without = dispatcher.compose_welcome(&welcome(None));
        assert!(!without.text.contains("temporary password"));
    }

    #[tokio::test]
    async fn test_send_welcome_records_message() {
        let sender = Arc::new(MockEmailSender::new());
        let dispatcher = NotificationDispatcher::new(sender.clone(), "https://x.test", Duration::from_secs(1));

        dispatcher.send_welcome(welcome(None)).await.unwrap();
        let sent = sender.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ana@example.com");
    }

    #[tokio::test]
    async fn test_failing_sender_surfaces_error() {
        let dispatcher = NotificationDispatcher::new(
            Arc::new(MockEmailSender::failing()),
            "https://x.test",
            Duration::from_secs(1),
        );
        let err = dispatcher.send_welcome(welcome(None)).await.unwrap_err();
        assert!(matches!(err, NotificationError::SendFailed(_)));
    }

    #[tokio::test]
    async fn test_http_sender_posts_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer re_key"))
            .and(body_partial_json(json!({
                "from": "School <noreply@school.test>",
                "to": ["ana@example.com"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "em_1" })))
            .expect(1)
            .mount(&server)
            .await;

        let sender = HttpEmailSender::new(
            &format!("{}/emails", server.uri()),
            "re_key",
            "School <noreply@school.test>",
            Duration::from_secs(2),
        )
        .unwrap();
        let message = EmailMessage {
            to: "ana@example.com".to_string(),
            subject: "hello".to_string(),
            text: "body".to_string(),
        };
        sender.send(&message).await.unwrap();
    }

    #[tokio::test]
    async fn test_http_sender_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let sender =
            HttpEmailSender::new(&server.uri(), "k", "noreply@school.test", Duration::from_secs(2))
                .unwrap();
        let message = EmailMessage {
            to: "a@b.co".to_string(),
            subject: "s".to_string(),
            text: "t".to_string(),
        };
        assert!(sender.send(&message).await.is_err());
    }
}
