//! crates/audiopintar_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{AudioFile, AudioJob, Document, DocumentView, Page, Run, Voice};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network)
/// while keeping enough structure for callers to map failures onto user-visible responses.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Missing required configuration: {0}")]
    Config(String),
    #[error("{stage} failure: {message}")]
    Upstream { stage: &'static str, message: String },
    #[error("Operation timed out: {0}")]
    Timeout(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// Wraps an adapter failure with the pipeline stage it occurred in.
    pub fn upstream(stage: &'static str, message: impl Into<String>) -> Self {
        PortError::Upstream {
            stage,
            message: message.into(),
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Persistence port over documents, pages and audio-file records.
///
/// Every read or mutation of a document tree is scoped by the requesting
/// user's ownership of the parent document; cross-user access yields
/// `NotFound`, never another user's data.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    // --- Auth bookkeeping ---

    /// Resolves a session token from the OAuth provider's bookkeeping table
    /// to a user id. Fails closed: unknown or expired tokens are rejected.
    async fn validate_session(&self, token: &str) -> PortResult<Uuid>;

    // --- Document management ---

    /// Lists the owner's documents newest first, pages ascending by page
    /// number, each page carrying its current audio artifacts.
    async fn list_by_owner(&self, owner_id: Uuid) -> PortResult<Vec<DocumentView>>;

    /// Persists a document row plus all of its page rows in one transaction.
    /// If any page insert fails nothing is persisted (all-or-nothing).
    async fn ingest_document(
        &self,
        owner_id: Uuid,
        name: &str,
        pages: &[String],
    ) -> PortResult<DocumentView>;

    /// Deletes a document owned by the caller, removing audio files, then
    /// pages, then the document row as one logical unit. `NotFound` if no
    /// document with that id is owned by the caller.
    async fn delete_document(&self, id: Uuid, owner_id: Uuid) -> PortResult<Document>;

    /// Bumps the document's `updated_at`, used as the completion refresh
    /// after an audio job finishes so listings observe the change.
    async fn touch_document(&self, id: Uuid) -> PortResult<()>;

    // --- Page / audio management ---

    /// Loads the requested pages of a document after verifying the caller
    /// owns it. Page ids not belonging to the document are simply absent
    /// from the result.
    async fn pages_for_generation(
        &self,
        document_id: Uuid,
        owner_id: Uuid,
        page_ids: &[Uuid],
    ) -> PortResult<Vec<Page>>;

    /// Removes any existing audio rows for the page (cleanup before a new
    /// generation job is dispatched).
    async fn clear_audio_for_page(&self, page_id: Uuid) -> PortResult<()>;

    /// Deletes prior audio rows for the page and inserts the new one inside
    /// a single transaction, preserving the at-most-one-live-artifact
    /// invariant even under concurrent regeneration.
    async fn replace_audio_for_page(
        &self,
        page_id: Uuid,
        file_name: &str,
        file_path: &str,
    ) -> PortResult<AudioFile>;
}

/// Port for the cloud PDF-parsing API.
#[async_trait]
pub trait TextExtraction: Send + Sync {
    /// Extracts the ordered per-page texts from raw document bytes.
    async fn extract_pages(&self, data: &[u8]) -> PortResult<Vec<String>>;
}

/// Port for the third-party voice API.
#[async_trait]
pub trait SpeechSynthesis: Send + Sync {
    /// Synthesizes speech for one page's text with the chosen voice.
    async fn synthesize(&self, text: &str, voice_id: &str) -> PortResult<Vec<u8>>;

    /// Returns the available voice catalog.
    async fn voices(&self) -> PortResult<Vec<Voice>>;
}

/// Port for the S3-compatible blob store holding uploads and generated audio.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetches the raw bytes behind a previously issued retrieval URL.
    async fn fetch(&self, url: &str) -> PortResult<Vec<u8>>;

    /// Stores one generated audio file and returns its public retrieval URL.
    async fn put_audio(&self, file_name: &str, data: Vec<u8>) -> PortResult<String>;
}

/// Port for the asynchronous execution backend: submit one unit of work per
/// page, resolve a handle to its current run state. Dispatch never blocks on
/// job completion.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Submits one audio-generation job and returns its run handle.
    async fn submit(&self, job: AudioJob) -> PortResult<String>;

    /// Stateless status lookup; `NotFound` for unknown run ids.
    async fn status(&self, run_id: &str) -> PortResult<Run>;
}
