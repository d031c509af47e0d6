//! services/api/src/jobs/worker.rs
//!
//! The unit of work executed by the job runner: synthesize audio for one
//! page and persist the result.

use audiopintar_core::domain::{AudioFile, AudioJob};
use audiopintar_core::ports::{ContentStore, DocumentStore, PortError, PortResult, SpeechSynthesis};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// The long-lived dependencies every audio-generation job needs. Constructed
/// once at startup and shared by all workers. The synthesis adapter follows
/// its credential: absent credential, absent adapter.
#[derive(Clone)]
pub struct WorkerContext {
    pub store: Arc<dyn DocumentStore>,
    pub synthesis: Option<Arc<dyn SpeechSynthesis>>,
    pub content: Arc<dyn ContentStore>,
}

/// Runs one audio-generation job to completion.
///
/// Synthesis and storage failures are not retried here; the job simply
/// terminates failed and the page keeps no audio row for this attempt (its
/// previous rows were already cleared at dispatch time).
pub async fn run_audio_job(ctx: &WorkerContext, job: &AudioJob) -> PortResult<AudioFile> {
    // Dispatch already guards on the credential; this is the backstop.
    let synthesis = ctx
        .synthesis
        .as_ref()
        .ok_or_else(|| PortError::Config("synthesis credentials are not set".to_string()))?;
    let audio = synthesis.synthesize(&job.content, &job.voice).await?;

    // Timestamped name so repeated regenerations never collide in the store.
    let file_name = format!(
        "{}-{}-{}.mp3",
        job.document_id,
        job.page_id,
        Utc::now().timestamp_millis()
    );
    let file_path = ctx.content.put_audio(&file_name, audio).await?;

    let audio_file = ctx
        .store
        .replace_audio_for_page(job.page_id, &file_name, &file_path)
        .await?;

    info!(
        page_id = %job.page_id,
        file = %audio_file.file_name,
        "audio generated"
    );
    Ok(audio_file)
}
