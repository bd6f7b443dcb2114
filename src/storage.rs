//! Blob storage collaborator. The core treats storage as an opaque
//! file-accepting service returning a public URL; the concrete client
//! speaks the supabase-storage REST protocol.

use async_trait::async_trait;

use crate::error::{AppError, Result};

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` at `path` inside `bucket` and return the public URL.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String>;
}

/// REST client for a supabase-storage-compatible service.
#[derive(Clone)]
pub struct SupabaseStorage {
    base_url: String,
    service_key: String,
    client: reqwest::Client,
}

impl SupabaseStorage {
    pub fn new(base_url: &str, service_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, path
        )
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .header("content-type", content_type)
            .header("cache-control", "max-age=3600")
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Storage request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, bucket, path, body, "storage upload rejected");
            return Err(AppError::Storage("Upload failed".into()));
        }

        Ok(self.public_url(bucket, path))
    }
}
