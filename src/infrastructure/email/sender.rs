use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use url::Url;
use zeroize::Zeroizing;

use crate::errors::EmailError;
use crate::settings::AppConfig;

const RELAY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Outbound notification channel. One attempt per message, no retries.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Posts messages as JSON to an HTTP mail relay.
pub struct HttpEmailSender {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<Zeroizing<String>>,
}

impl HttpEmailSender {
    pub fn new(endpoint: &str, api_key: Option<Zeroizing<String>>) -> Result<Self, EmailError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| EmailError::Configuration(format!("{endpoint}: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(RELAY_TIMEOUT)
            .build()
            .map_err(|e| EmailError::Configuration(e.to_string()))?;

        Ok(HttpEmailSender { client, endpoint, api_key })
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let mut request = self.client.post(self.endpoint.clone()).json(message);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.as_str());
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(status = status.as_u16(), subject = %message.subject, "Email sent successfully");
        Ok(())
    }
}

/// Writes messages to the log instead of delivering them.
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        tracing::info!(
            from = %message.from,
            to = ?message.to,
            subject = %message.subject,
            "No mail relay configured, logging notification\n{}",
            message.text
        );
        Ok(())
    }
}

pub fn build_email_sender(config: &AppConfig) -> Result<Arc<dyn EmailSender>, EmailError> {
    match &config.mail_api_url {
        Some(url) => Ok(Arc::new(HttpEmailSender::new(url, config.mail_api_key())?)),
        None => {
            tracing::warn!("APP_MAIL_API_URL not set, notifications will only be logged");
            Ok(Arc::new(LogEmailSender))
        }
    }
}
