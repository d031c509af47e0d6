//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::jobs::JobPoller;
use crate::web::state::AppState;
use audiopintar_core::domain::{AudioFile, DocumentView, PageDispatch, PageView};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_documents_handler,
        create_document_handler,
        delete_document_handler,
        generate_audio_handler,
        job_status_handler,
        list_voices_handler,
    ),
    components(
        schemas(
            DocumentResponse,
            PageResponse,
            AudioFileResponse,
            CreateDocumentRequest,
            GenerateAudioRequest,
            PageDispatchResponse,
            RunResponse,
            VoiceResponse,
            DeletedDocumentResponse,
        )
    ),
    tags(
        (name = "Audiopintar API", description = "Document-to-audiobook pipeline endpoints.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct DocumentResponse {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    pages: Vec<PageResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct PageResponse {
    id: Uuid,
    page_number: i32,
    content: String,
    audio_files: Vec<AudioFileResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct AudioFileResponse {
    id: Uuid,
    file_name: String,
    file_path: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateDocumentRequest {
    name: String,
    /// Retrieval URL handed back by the upload collaborator.
    file_url: String,
}

#[derive(Deserialize, ToSchema)]
pub struct GenerateAudioRequest {
    page_ids: Vec<Uuid>,
    voice: String,
}

/// One entry per requested page; `run_id` and `error` are mutually exclusive.
#[derive(Serialize, ToSchema)]
pub struct PageDispatchResponse {
    page_id: Uuid,
    success: bool,
    run_id: Option<String>,
    error: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct RunResponse {
    run_id: String,
    status: String,
}

#[derive(Serialize, ToSchema)]
pub struct VoiceResponse {
    id: String,
    name: String,
}

#[derive(Serialize, ToSchema)]
pub struct DeletedDocumentResponse {
    id: Uuid,
    name: String,
}

impl From<&AudioFile> for AudioFileResponse {
    fn from(audio: &AudioFile) -> Self {
        Self {
            id: audio.id,
            file_name: audio.file_name.clone(),
            file_path: audio.file_path.clone(),
        }
    }
}

impl From<&PageView> for PageResponse {
    fn from(view: &PageView) -> Self {
        Self {
            id: view.page.id,
            page_number: view.page.page_number,
            content: view.page.content.clone(),
            audio_files: view.audio_files.iter().map(Into::into).collect(),
        }
    }
}

impl From<&DocumentView> for DocumentResponse {
    fn from(view: &DocumentView) -> Self {
        Self {
            id: view.document.id,
            name: view.document.name.clone(),
            created_at: view.document.created_at,
            updated_at: view.document.updated_at,
            pages: view.pages.iter().map(Into::into).collect(),
        }
    }
}

impl From<&PageDispatch> for PageDispatchResponse {
    fn from(dispatch: &PageDispatch) -> Self {
        match &dispatch.outcome {
            Ok(run_id) => Self {
                page_id: dispatch.page_id,
                success: true,
                run_id: Some(run_id.clone()),
                error: None,
            },
            Err(error) => Self {
                page_id: dispatch.page_id,
                success: false,
                run_id: None,
                error: Some(error.clone()),
            },
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the caller's documents, newest first, with pages and audio files.
#[utoipa::path(
    get,
    path = "/documents",
    responses(
        (status = 200, description = "The caller's documents", body = [DocumentResponse]),
        (status = 401, description = "Missing or invalid session")
    )
)]
pub async fn list_documents_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let views = state.pipeline.list_documents(user_id).await?;
    let body: Vec<DocumentResponse> = views.iter().map(Into::into).collect();
    Ok(Json(body))
}

/// Ingest a previously uploaded file into a document with extracted pages.
#[utoipa::path(
    post,
    path = "/documents",
    request_body = CreateDocumentRequest,
    responses(
        (status = 201, description = "Document created", body = DocumentResponse),
        (status = 400, description = "Invalid payload"),
        (status = 502, description = "Fetch or extraction failure")
    )
)]
pub async fn create_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(payload): Json<CreateDocumentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .pipeline
        .create_document(user_id, &payload.name, &payload.file_url)
        .await?;
    Ok((StatusCode::CREATED, Json(DocumentResponse::from(&view))))
}

/// Delete a document the caller owns, cascading to pages and audio files.
#[utoipa::path(
    delete,
    path = "/documents/{id}",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 200, description = "Deleted document", body = DeletedDocumentResponse),
        (status = 404, description = "Not owned by the caller")
    )
)]
pub async fn delete_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state.pipeline.delete_document(user_id, id).await?;
    Ok(Json(DeletedDocumentResponse {
        id: document.id,
        name: document.name,
    }))
}

/// Dispatch one audio-generation job per requested page.
#[utoipa::path(
    post,
    path = "/documents/{id}/audio",
    params(("id" = Uuid, Path, description = "Document id")),
    request_body = GenerateAudioRequest,
    responses(
        (status = 200, description = "Per-page dispatch results", body = [PageDispatchResponse]),
        (status = 400, description = "Blank voice or empty page set"),
        (status = 404, description = "Not owned by the caller"),
        (status = 503, description = "Synthesis credentials absent")
    )
)]
pub async fn generate_audio_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GenerateAudioRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let dispatches = state
        .pipeline
        .generate_audio_book(user_id, id, &payload.page_ids, &payload.voice)
        .await?;

    // Watch each successful dispatch until it turns terminal; completion
    // bumps the document's updated_at so list reads observe the change.
    for dispatch in &dispatches {
        if let Ok(run_id) = &dispatch.outcome {
            spawn_run_watcher(&state, id, run_id.clone());
        }
    }

    let body: Vec<PageDispatchResponse> = dispatches.iter().map(Into::into).collect();
    Ok(Json(body))
}

/// Look up the status of one dispatched run.
#[utoipa::path(
    get,
    path = "/runs/{run_id}",
    params(("run_id" = String, Path, description = "Run handle from a dispatch")),
    responses(
        (status = 200, description = "Run status snapshot", body = RunResponse),
        (status = 404, description = "Unknown run id")
    )
)]
pub async fn job_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(_user_id): Extension<Uuid>,
    Path(run_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let run = state.pipeline.job_status(&run_id).await?;
    Ok(Json(RunResponse {
        run_id: run.run_id,
        status: run.status.to_string(),
    }))
}

/// List the synthesis adapter's available voices.
#[utoipa::path(
    get,
    path = "/voices",
    responses(
        (status = 200, description = "Voice catalog", body = [VoiceResponse]),
        (status = 503, description = "Synthesis credentials absent")
    )
)]
pub async fn list_voices_handler(
    State(state): State<Arc<AppState>>,
    Extension(_user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let voices = state.pipeline.list_voices().await?;
    let body: Vec<VoiceResponse> = voices
        .into_iter()
        .map(|v| VoiceResponse {
            id: v.id,
            name: v.name,
        })
        .collect();
    Ok(Json(body))
}

/// Spawns a poller for one run, tied to the server's shutdown token.
fn spawn_run_watcher(state: &Arc<AppState>, document_id: Uuid, run_id: String) {
    let poller = JobPoller::new(
        state.runner.clone(),
        state.config.poll_interval,
        state.shutdown.child_token(),
    );
    let store = state.store.clone();
    tokio::spawn(async move {
        let refresh = {
            let store = store.clone();
            move || async move {
                if let Err(e) = store.touch_document(document_id).await {
                    warn!(document_id = %document_id, "completion refresh failed: {e}");
                }
            }
        };
        match poller.run(&run_id, refresh).await {
            Ok(outcome) => info!(%run_id, ?outcome, "run watch finished"),
            Err(e) => warn!(%run_id, "run watch aborted: {e}"),
        }
    });
}
