//! services/api/src/adapters/storage.rs
//!
//! This module contains the adapter for the S3-compatible blob store that
//! holds uploaded PDFs and generated audio files. It implements the
//! `ContentStore` port from the `core` crate.

use async_trait::async_trait;
use audiopintar_core::ports::{ContentStore, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `ContentStore` port over an S3-compatible
/// HTTP endpoint. Generated audio lands under the `audio/` prefix; retrieval
/// URLs point straight at the bucket.
#[derive(Clone)]
pub struct BlobStoreAdapter {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    access_key: String,
    secret_key: String,
}

impl BlobStoreAdapter {
    /// Creates a new `BlobStoreAdapter`.
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        bucket: String,
        access_key: String,
        secret_key: String,
    ) -> Self {
        Self {
            client,
            endpoint,
            bucket,
            access_key,
            secret_key,
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }
}

//=========================================================================================
// `ContentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ContentStore for BlobStoreAdapter {
    /// Fetches the raw bytes behind a retrieval URL (the uploaded PDF).
    async fn fetch(&self, url: &str) -> PortResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PortError::upstream("fetch", e.to_string()))?;

        if !response.status().is_success() {
            return Err(PortError::upstream(
                "fetch",
                format!("file URL returned {}", response.status()),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PortError::upstream("fetch", e.to_string()))?;
        Ok(bytes.to_vec())
    }

    /// Uploads one generated audio file and returns its public retrieval URL.
    async fn put_audio(&self, file_name: &str, data: Vec<u8>) -> PortResult<String> {
        let key = format!("audio/{}", file_name);
        let url = self.object_url(&key);

        let response = self
            .client
            .put(&url)
            .basic_auth(&self.access_key, Some(&self.secret_key))
            .header(reqwest::header::CONTENT_TYPE, "audio/mpeg")
            .body(data)
            .send()
            .await
            .map_err(|e| PortError::upstream("storage", e.to_string()))?;

        if !response.status().is_success() {
            return Err(PortError::upstream(
                "storage",
                format!("blob store returned {}", response.status()),
            ));
        }

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_urls_are_bucket_scoped() {
        let adapter = BlobStoreAdapter::new(
            reqwest::Client::new(),
            "https://blobs.example.dev".to_string(),
            "audiopintar".to_string(),
            "ak".to_string(),
            "sk".to_string(),
        );
        assert_eq!(
            adapter.object_url("audio/a-b-1.mp3"),
            "https://blobs.example.dev/audiopintar/audio/a-b-1.mp3"
        );
    }
}
