//! services/api/src/adapters/extraction.rs
//!
//! This module contains the adapter for the LlamaParse cloud parsing API.
//! It implements the `TextExtraction` port from the `core` crate.

use async_trait::async_trait;
use audiopintar_core::ports::{PortError, PortResult, TextExtraction};
use serde::Deserialize;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `TextExtraction` port by sending the raw
/// PDF bytes to the LlamaParse cloud API and reading back the per-page text.
#[derive(Clone)]
pub struct LlamaParseAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LlamaParseAdapter {
    /// Creates a new `LlamaParseAdapter`.
    pub fn new(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }
}

//=========================================================================================
// Wire Format
//=========================================================================================

#[derive(Deserialize)]
struct ParseResponse {
    pages: Vec<ParsedPage>,
}

#[derive(Deserialize)]
struct ParsedPage {
    text: String,
}

//=========================================================================================
// `TextExtraction` Trait Implementation
//=========================================================================================

#[async_trait]
impl TextExtraction for LlamaParseAdapter {
    /// Extracts an ordered sequence of page texts from raw document bytes.
    async fn extract_pages(&self, data: &[u8]) -> PortResult<Vec<String>> {
        let url = format!("{}/api/v1/parsing/parse", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/pdf")
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| PortError::upstream("extraction", e.to_string()))?;

        if !response.status().is_success() {
            return Err(PortError::upstream(
                "extraction",
                format!("parsing service returned {}", response.status()),
            ));
        }

        let parsed: ParseResponse = response
            .json()
            .await
            .map_err(|e| PortError::upstream("extraction", e.to_string()))?;

        Ok(parsed.pages.into_iter().map(|p| p.text).collect())
    }
}
