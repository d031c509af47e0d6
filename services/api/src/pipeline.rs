//! services/api/src/pipeline.rs
//!
//! The request-facing orchestrator tying the ports together: ingest,
//! regenerate, delete, list. All operations are scoped to the calling user.

use audiopintar_core::domain::{AudioJob, Document, DocumentView, PageDispatch, Run, Voice};
use audiopintar_core::ports::{
    ContentStore, DocumentStore, JobRunner, PortError, PortResult, SpeechSynthesis, TextExtraction,
};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// The document-to-audio pipeline. Long-lived adapter clients are injected
/// once at startup; the synthesis adapter is optional because its credential
/// is - requesting audio without it is a checked error, not a crash.
pub struct AudioBookPipeline {
    store: Arc<dyn DocumentStore>,
    extraction: Arc<dyn TextExtraction>,
    synthesis: Option<Arc<dyn SpeechSynthesis>>,
    content: Arc<dyn ContentStore>,
    runner: Arc<dyn JobRunner>,
}

impl AudioBookPipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        extraction: Arc<dyn TextExtraction>,
        synthesis: Option<Arc<dyn SpeechSynthesis>>,
        content: Arc<dyn ContentStore>,
        runner: Arc<dyn JobRunner>,
    ) -> Self {
        Self {
            store,
            extraction,
            synthesis,
            content,
            runner,
        }
    }

    fn synthesis(&self) -> PortResult<&Arc<dyn SpeechSynthesis>> {
        self.synthesis
            .as_ref()
            .ok_or_else(|| PortError::Config("synthesis credentials are not set".to_string()))
    }

    /// Lists the caller's documents newest first, with pages and audio.
    pub async fn list_documents(&self, owner_id: Uuid) -> PortResult<Vec<DocumentView>> {
        self.store.list_by_owner(owner_id).await
    }

    /// Returns the synthesis adapter's voice catalog.
    pub async fn list_voices(&self) -> PortResult<Vec<Voice>> {
        self.synthesis()?.voices().await
    }

    /// Ingests a previously uploaded file: fetch its bytes, extract per-page
    /// text, persist the document and all pages in one transaction. An
    /// extraction failure aborts the whole operation with nothing persisted.
    pub async fn create_document(
        &self,
        owner_id: Uuid,
        name: &str,
        file_url: &str,
    ) -> PortResult<DocumentView> {
        if name.trim().is_empty() {
            return Err(PortError::Validation(
                "document name must not be blank".to_string(),
            ));
        }

        let bytes = self.content.fetch(file_url).await?;
        let pages = self.extraction.extract_pages(&bytes).await?;

        let view = self.store.ingest_document(owner_id, name, &pages).await?;
        info!(
            document_id = %view.document.id,
            pages = view.pages.len(),
            "document ingested"
        );
        Ok(view)
    }

    /// Deletes a document the caller owns, cascading to pages and audio.
    pub async fn delete_document(&self, owner_id: Uuid, id: Uuid) -> PortResult<Document> {
        let document = self.store.delete_document(id, owner_id).await?;
        info!(document_id = %id, "document deleted");
        Ok(document)
    }

    /// Fans out one audio-generation job per requested page.
    ///
    /// Dispatches are independent: one page's failure is reported alongside
    /// the others' run handles and never aborts the batch. The result holds
    /// exactly one entry per requested page id, in input order. Pages of the
    /// same document are deliberately not serialized against each other;
    /// concurrent regeneration of the *same* page is last-write-wins.
    pub async fn generate_audio_book(
        &self,
        owner_id: Uuid,
        document_id: Uuid,
        page_ids: &[Uuid],
        voice: &str,
    ) -> PortResult<Vec<PageDispatch>> {
        if voice.trim().is_empty() {
            return Err(PortError::Validation("voice must not be blank".to_string()));
        }
        if page_ids.is_empty() {
            return Err(PortError::Validation(
                "at least one page id is required".to_string(),
            ));
        }
        // Surface a missing synthesis credential before any audio rows are
        // cleared; the jobs would be doomed anyway.
        self.synthesis()?;

        let pages = self
            .store
            .pages_for_generation(document_id, owner_id, page_ids)
            .await?;
        let pages_by_id: HashMap<Uuid, _> = pages.into_iter().map(|p| (p.id, p)).collect();

        let dispatches = page_ids.iter().map(|&page_id| {
            let page = pages_by_id.get(&page_id).cloned();
            async move {
                let Some(page) = page else {
                    return PageDispatch::failed(page_id, "page not found in document");
                };

                // Cleanup before regenerate: the page holds no stale artifact
                // while its replacement job is in flight.
                if let Err(e) = self.store.clear_audio_for_page(page_id).await {
                    return PageDispatch::failed(page_id, e.to_string());
                }

                let job = AudioJob {
                    document_id,
                    page_id,
                    voice: voice.to_string(),
                    content: page.content,
                };
                match self.runner.submit(job).await {
                    Ok(run_id) => PageDispatch::dispatched(page_id, run_id),
                    Err(e) => {
                        warn!(page_id = %page_id, "dispatch failed: {e}");
                        PageDispatch::failed(page_id, e.to_string())
                    }
                }
            }
        });

        Ok(join_all(dispatches).await)
    }

    /// Stateless status passthrough to the execution backend.
    pub async fn job_status(&self, run_id: &str) -> PortResult<Run> {
        self.runner.status(run_id).await
    }
}
