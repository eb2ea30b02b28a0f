//! REST client for the hosted object storage
//!
//! Objects are uploaded with `POST /storage/v1/object/{bucket}/{path}` and
//! read back from the same path. Public URLs use the
//! `/storage/v1/object/public/` prefix.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::config::StorageConfig;
use crate::error::{Error, Result};

use super::{encode_path, ObjectStorage};

pub struct SupabaseStorage {
    http_client: reqwest::Client,
    base_url: String,
}

impl SupabaseStorage {
    /// Create a new client from configuration
    pub fn new(config: &StorageConfig) -> Result<Self> {
        config.validate()?;
        let base_url = config
            .url
            .as_deref()
            .ok_or_else(|| Error::Config("storage.url is required".to_string()))?;
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("storage.api_key is required".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(api_key)
                .map_err(|e| Error::Config(format!("invalid storage api key: {}", e)))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| Error::Config(format!("invalid storage api key: {}", e)))?,
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            urlencoding::encode(bucket),
            encode_path(path)
        )
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            urlencoding::encode(bucket),
            encode_path(path)
        )
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let size = bytes.len();
        let response = self
            .http_client
            .post(self.object_url(bucket, path))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(Error::Storage(format!("API error ({}): {}", status, error_text)));
        }

        tracing::info!(bucket = %bucket, path = %path, size, "Uploaded object");
        Ok(())
    }

    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        let response = self
            .http_client
            .get(self.object_url(bucket, path))
            .send()
            .await
            .map_err(|e| Error::Storage(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(Error::Storage(format!("API error ({}): {}", status, error_text)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Storage(format!("failed to read body: {}", e)))?;
        Ok(bytes.to_vec())
    }
}
