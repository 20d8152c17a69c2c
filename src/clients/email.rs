//! Outbound email through an HTTP mail API. Send failures are the caller's
//! business to swallow; services log them and move on because the triggering
//! write has already been committed.

use async_trait::async_trait;

use crate::error::{AppError, AppResult};

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> AppResult<()>;
}

pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> AppResult<()> {
        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "from": self.from,
                "to": to,
                "subject": subject,
                "html": html,
            }))
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AppError::Upstream(format!(
                "mail API returned {}",
                resp.status()
            )));
        }

        tracing::info!(to = to, subject = subject, "email sent");
        Ok(())
    }
}

/// Used when no mail API is configured. Logs instead of sending.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> AppResult<()> {
        tracing::debug!(to = to, subject = subject, "email delivery disabled, skipping");
        Ok(())
    }
}
