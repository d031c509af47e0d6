//! services/api/src/adapters/tts.rs
//!
//! This module contains the adapter for the ElevenLabs text-to-speech API.
//! It implements the `SpeechSynthesis` port from the `core` crate.

use async_trait::async_trait;
use audiopintar_core::domain::Voice;
use audiopintar_core::ports::{PortError, PortResult, SpeechSynthesis};
use serde::Deserialize;
use serde_json::json;

const SYNTHESIS_MODEL: &str = "eleven_multilingual_v2";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `SpeechSynthesis` port using the ElevenLabs API.
#[derive(Clone)]
pub struct ElevenLabsAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ElevenLabsAdapter {
    /// Creates a new `ElevenLabsAdapter`.
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
struct VoicesResponse {
    voices: Vec<VoiceRecord>,
}

#[derive(Deserialize)]
struct VoiceRecord {
    voice_id: String,
    name: String,
}

//=========================================================================================
// `SpeechSynthesis` Trait Implementation
//=========================================================================================

#[async_trait]
impl SpeechSynthesis for ElevenLabsAdapter {
    /// Synthesizes one page's text into an MP3 byte stream.
    async fn synthesize(&self, text: &str, voice_id: &str) -> PortResult<Vec<u8>> {
        let url = format!("{}/v1/text-to-speech/{}", self.base_url, voice_id);
        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .json(&json!({
                "text": text,
                "model_id": SYNTHESIS_MODEL,
            }))
            .send()
            .await
            .map_err(|e| PortError::upstream("synthesis", e.to_string()))?;

        if !response.status().is_success() {
            return Err(PortError::upstream(
                "synthesis",
                format!("voice service returned {}", response.status()),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PortError::upstream("synthesis", e.to_string()))?;
        Ok(bytes.to_vec())
    }

    /// Fetches the available voice catalog.
    async fn voices(&self) -> PortResult<Vec<Voice>> {
        let url = format!("{}/v1/voices", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("xi-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| PortError::upstream("synthesis", e.to_string()))?;

        if !response.status().is_success() {
            return Err(PortError::upstream(
                "synthesis",
                format!("voice service returned {}", response.status()),
            ));
        }

        let catalog: VoicesResponse = response
            .json()
            .await
            .map_err(|e| PortError::upstream("synthesis", e.to_string()))?;

        Ok(catalog
            .voices
            .into_iter()
            .map(|v| Voice {
                id: v.voice_id,
                name: v.name,
            })
            .collect())
    }
}
