//! External object storage for product images. Uploads happen client-side;
//! this service only deletes stored objects when a product is removed.

use async_trait::async_trait;

use crate::error::{AppError, AppResult};

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn delete(&self, public_id: &str) -> AppResult<()>;
}

pub struct HttpImageStore {
    client: reqwest::Client,
    api_url: String,
}

impl HttpImageStore {
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
        }
    }
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn delete(&self, public_id: &str) -> AppResult<()> {
        let resp = self
            .client
            .delete(format!("{}/{}", self.api_url, public_id))
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AppError::Upstream(format!(
                "image store returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

/// Used when no image store is configured.
pub struct NoopImageStore;

#[async_trait]
impl ImageStore for NoopImageStore {
    async fn delete(&self, public_id: &str) -> AppResult<()> {
        tracing::debug!(public_id = public_id, "image store disabled, skipping delete");
        Ok(())
    }
}
