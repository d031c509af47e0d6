//! crates/audiopintar_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

// Represents a user - identity lifecycle is owned by the OAuth provider,
// we only keep the row for ownership scoping.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
}

/// Represents a PDF document uploaded by a user, owned exclusively by its creator.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One unit of extracted text with its 1-based position within a document.
/// Content is immutable after ingestion; regeneration changes audio, not text.
#[derive(Debug, Clone)]
pub struct Page {
    pub id: Uuid,
    pub document_id: Uuid,
    pub page_number: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// The synthesized speech artifact for one page's current content.
/// A page has at most one live audio file at any time.
#[derive(Debug, Clone)]
pub struct AudioFile {
    pub id: Uuid,
    pub page_id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}

/// A page together with its current audio artifacts, as returned by listings.
#[derive(Debug, Clone)]
pub struct PageView {
    pub page: Page,
    pub audio_files: Vec<AudioFile>,
}

/// A document together with its pages (ascending page number).
#[derive(Debug, Clone)]
pub struct DocumentView {
    pub document: Document,
    pub pages: Vec<PageView>,
}

/// A synthesis persona/style from the speech adapter's catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub id: String,
    pub name: String,
}

/// The state of one in-flight asynchronous synthesis task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

impl RunStatus {
    /// Terminal runs never change state again and can be discarded by observers.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "PENDING",
            RunStatus::Executing => "EXECUTING",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status snapshot of one dispatched job, rehydrated from the execution
/// backend on every lookup - never persisted locally.
#[derive(Debug, Clone)]
pub struct Run {
    pub run_id: String,
    pub status: RunStatus,
}

/// The payload carried by one dispatched audio-generation job.
#[derive(Debug, Clone)]
pub struct AudioJob {
    pub document_id: Uuid,
    pub page_id: Uuid,
    pub voice: String,
    pub content: String,
}

/// The per-page outcome of a fan-out regeneration call. One entry per
/// requested page, success and failure carried independently.
#[derive(Debug, Clone)]
pub struct PageDispatch {
    pub page_id: Uuid,
    pub outcome: Result<String, String>,
}

impl PageDispatch {
    pub fn dispatched(page_id: Uuid, run_id: String) -> Self {
        Self {
            page_id,
            outcome: Ok(run_id),
        }
    }

    pub fn failed(page_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            page_id,
            outcome: Err(error.into()),
        }
    }
}
