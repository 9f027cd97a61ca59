//! GoFile-style object storage client
//!
//! Talks to a directory service that returns a pool of upload servers, then
//! streams staged bytes to the chosen server as a multipart upload and
//! returns the public download page.

use crate::cancel::CancelToken;
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::storage::{Destination, DestinationPool, ObjectStore};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use url::Url;

#[derive(Debug, Deserialize)]
struct DirectoryResponse {
    data: DirectoryData,
}

#[derive(Debug, Deserialize)]
struct DirectoryData {
    servers: Vec<ServerEntry>,
}

#[derive(Debug, Deserialize)]
struct ServerEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    data: UploadData,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    #[serde(rename = "downloadPage")]
    download_page: String,
}

pub struct GofileStoreBuilder {
    directory_url: String,
    upload_url_template: String,
    timeout: Duration,
}

impl GofileStoreBuilder {
    pub fn new(directory_url: String, upload_url_template: String) -> Self {
        Self {
            directory_url,
            upload_url_template,
            timeout: Duration::from_secs(7200),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<GofileStore> {
        let directory_url = Url::parse(&self.directory_url)?;
        Ok(GofileStore {
            client: Client::new(),
            directory_url,
            upload_url_template: self.upload_url_template,
            timeout: self.timeout,
        })
    }
}

pub struct GofileStore {
    client: Client,
    directory_url: Url,
    upload_url_template: String,
    timeout: Duration,
}

impl GofileStore {
    pub fn builder(directory_url: String, upload_url_template: String) -> GofileStoreBuilder {
        GofileStoreBuilder::new(directory_url, upload_url_template)
    }

    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        Self::builder(
            config.directory_url.clone(),
            config.upload_url_template.clone(),
        )
        .with_timeout(Duration::from_secs(config.timeout))
        .build()
    }

    fn upload_url(&self, destination: &Destination) -> String {
        self.upload_url_template
            .replace("{server}", &destination.endpoint)
    }

    /// Fetch the candidate pool from the directory service. Network
    /// failures, non-success statuses, and malformed payloads all surface
    /// as `DirectoryUnavailable`.
    async fn fetch_pool(&self) -> Result<DestinationPool> {
        let response = self
            .client
            .get(self.directory_url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RelayError::DirectoryUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RelayError::DirectoryUnavailable(format!(
                "directory returned status {}",
                response.status()
            )));
        }

        let body: DirectoryResponse = response
            .json()
            .await
            .map_err(|e| RelayError::DirectoryUnavailable(format!("malformed response: {}", e)))?;

        Ok(DestinationPool::new(
            body.data.servers.into_iter().map(|s| s.name).collect(),
        ))
    }
}

#[async_trait]
impl ObjectStore for GofileStore {
    async fn resolve(&self) -> Result<Destination> {
        self.fetch_pool().await?.choose()
    }

    async fn publish(
        &self,
        destination: &Destination,
        staged: &Path,
        file_name: &str,
        token: &CancelToken,
    ) -> Result<String> {
        let url = self.upload_url(destination);
        let file = tokio::fs::File::open(staged).await?;
        let size = file.metadata().await?.len();

        // The body stream polls the token per chunk so a signal aborts the
        // upload instead of waiting for the full response.
        let guard = token.clone();
        let stream = ReaderStream::new(file).map(move |chunk| {
            if guard.is_signaled() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::Interrupted,
                    "transfer cancelled",
                ));
            }
            chunk
        });
        let part = Part::stream_with_length(Body::wrap_stream(stream), size)
            .file_name(file_name.to_string());
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if token.is_signaled() {
                    RelayError::Cancelled
                } else {
                    RelayError::Upload(e.to_string())
                }
            })?;

        if token.is_signaled() {
            return Err(RelayError::Cancelled);
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            let error_msg = match status.as_u16() {
                413 => "File too large for destination".to_string(),
                507 => "Insufficient storage space on destination".to_string(),
                408 | 504 => "Upload timeout".to_string(),
                _ => format!("Upload failed (status {}): {}", status, error_text),
            };
            return Err(RelayError::Upload(error_msg));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| RelayError::Upload(format!("malformed upload response: {}", e)))?;
        Ok(body.data.download_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_url_substitutes_endpoint() {
        let store = GofileStore::builder(
            "https://api.example.com/servers".to_string(),
            "https://{server}.example.com/uploadFile".to_string(),
        )
        .build()
        .unwrap();

        let destination = Destination {
            endpoint: "store4".to_string(),
        };
        assert_eq!(
            store.upload_url(&destination),
            "https://store4.example.com/uploadFile"
        );
    }

    #[test]
    fn test_invalid_directory_url_rejected() {
        let result = GofileStore::builder(
            "not a url".to_string(),
            "https://{server}.example.com/uploadFile".to_string(),
        )
        .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_directory_payload_parses() {
        let payload = r#"{"data":{"servers":[{"name":"store1"},{"name":"store2"}]}}"#;
        let parsed: DirectoryResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.data.servers.len(), 2);
        assert_eq!(parsed.data.servers[0].name, "store1");
    }

    #[test]
    fn test_upload_payload_parses() {
        let payload = r#"{"data":{"downloadPage":"https://gofile.io/d/abc123"}}"#;
        let parsed: UploadResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.data.download_page, "https://gofile.io/d/abc123");
    }
}
