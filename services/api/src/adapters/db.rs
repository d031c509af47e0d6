//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DocumentStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use audiopintar_core::domain::{AudioFile, Document, DocumentView, Page, PageView};
use audiopintar_core::ports::{DocumentStore, PortError, PortResult};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DocumentStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn db_err(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct DocumentRecord {
    id: Uuid,
    name: String,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}
impl DocumentRecord {
    fn to_domain(self) -> Document {
        Document {
            id: self.id,
            name: self.name,
            owner_id: self.owner_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct PageRecord {
    id: Uuid,
    document_id: Uuid,
    page_number: i32,
    content: String,
    created_at: DateTime<Utc>,
}
impl PageRecord {
    fn to_domain(self) -> Page {
        Page {
            id: self.id,
            document_id: self.document_id,
            page_number: self.page_number,
            content: self.content,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct AudioFileRecord {
    id: Uuid,
    page_id: Uuid,
    file_name: String,
    file_path: String,
    created_at: DateTime<Utc>,
}
impl AudioFileRecord {
    fn to_domain(self) -> AudioFile {
        AudioFile {
            id: self.id,
            page_id: self.page_id,
            file_name: self.file_name,
            file_path: self.file_path,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// `DocumentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentStore for DbAdapter {
    async fn validate_session(&self, token: &str) -> PortResult<Uuid> {
        // Fail closed: an unknown or expired token is simply unauthorized.
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT user_id FROM sessions WHERE session_token = $1 AND expires > now()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(|(user_id,)| user_id).ok_or(PortError::Unauthorized)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> PortResult<Vec<DocumentView>> {
        let documents: Vec<DocumentRecord> = sqlx::query_as(
            "SELECT id, name, owner_id, created_at, updated_at FROM documents \
             WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let document_ids: Vec<Uuid> = documents.iter().map(|d| d.id).collect();
        let pages: Vec<PageRecord> = sqlx::query_as(
            "SELECT id, document_id, page_number, content, created_at FROM pages \
             WHERE document_id = ANY($1) ORDER BY page_number ASC",
        )
        .bind(&document_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let page_ids: Vec<Uuid> = pages.iter().map(|p| p.id).collect();
        let audio_files: Vec<AudioFileRecord> = sqlx::query_as(
            "SELECT id, page_id, file_name, file_path, created_at FROM audio_files \
             WHERE page_id = ANY($1)",
        )
        .bind(&page_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        // Assemble the ownership tree in memory; both child queries already
        // come back in the order the views need.
        let mut audio_by_page: std::collections::HashMap<Uuid, Vec<AudioFile>> =
            std::collections::HashMap::new();
        for record in audio_files {
            audio_by_page
                .entry(record.page_id)
                .or_default()
                .push(record.to_domain());
        }

        let mut pages_by_document: std::collections::HashMap<Uuid, Vec<PageView>> =
            std::collections::HashMap::new();
        for record in pages {
            let page = record.to_domain();
            let audio = audio_by_page.remove(&page.id).unwrap_or_default();
            pages_by_document
                .entry(page.document_id)
                .or_default()
                .push(PageView {
                    page,
                    audio_files: audio,
                });
        }

        Ok(documents
            .into_iter()
            .map(|record| {
                let document = record.to_domain();
                let pages = pages_by_document.remove(&document.id).unwrap_or_default();
                DocumentView { document, pages }
            })
            .collect())
    }

    async fn ingest_document(
        &self,
        owner_id: Uuid,
        name: &str,
        pages: &[String],
    ) -> PortResult<DocumentView> {
        // One transaction for the document row and every page row, so a
        // failed page insert never leaves a partially ingested document.
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let document: DocumentRecord = sqlx::query_as(
            "INSERT INTO documents (id, name, owner_id) VALUES ($1, $2, $3) \
             RETURNING id, name, owner_id, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        let mut page_views = Vec::with_capacity(pages.len());
        for (index, content) in pages.iter().enumerate() {
            let page: PageRecord = sqlx::query_as(
                "INSERT INTO pages (id, document_id, page_number, content) \
                 VALUES ($1, $2, $3, $4) \
                 RETURNING id, document_id, page_number, content, created_at",
            )
            .bind(Uuid::new_v4())
            .bind(document.id)
            .bind(index as i32 + 1)
            .bind(content)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;
            page_views.push(PageView {
                page: page.to_domain(),
                audio_files: Vec::new(),
            });
        }

        tx.commit().await.map_err(db_err)?;

        Ok(DocumentView {
            document: document.to_domain(),
            pages: page_views,
        })
    }

    async fn delete_document(&self, id: Uuid, owner_id: Uuid) -> PortResult<Document> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let document: Option<DocumentRecord> = sqlx::query_as(
            "SELECT id, name, owner_id, created_at, updated_at FROM documents \
             WHERE id = $1 AND owner_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let document =
            document.ok_or_else(|| PortError::NotFound(format!("Document {} not found", id)))?;

        // Child-first removal inside the transaction: audio files, then
        // pages, then the document row. Concurrent readers never observe a
        // partial deletion.
        sqlx::query(
            "DELETE FROM audio_files WHERE page_id IN (SELECT id FROM pages WHERE document_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query("DELETE FROM pages WHERE document_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        Ok(document.to_domain())
    }

    async fn touch_document(&self, id: Uuid) -> PortResult<()> {
        sqlx::query("UPDATE documents SET updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn pages_for_generation(
        &self,
        document_id: Uuid,
        owner_id: Uuid,
        page_ids: &[Uuid],
    ) -> PortResult<Vec<Page>> {
        // Ownership check first, so a caller probing someone else's
        // document learns nothing beyond "not found".
        let owned: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM documents WHERE id = $1 AND owner_id = $2")
                .bind(document_id)
                .bind(owner_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        if owned.is_none() {
            return Err(PortError::NotFound(format!(
                "Document {} not found",
                document_id
            )));
        }

        let pages: Vec<PageRecord> = sqlx::query_as(
            "SELECT id, document_id, page_number, content, created_at FROM pages \
             WHERE document_id = $1 AND id = ANY($2) ORDER BY page_number ASC",
        )
        .bind(document_id)
        .bind(page_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(pages.into_iter().map(|p| p.to_domain()).collect())
    }

    async fn clear_audio_for_page(&self, page_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM audio_files WHERE page_id = $1")
            .bind(page_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn replace_audio_for_page(
        &self,
        page_id: Uuid,
        file_name: &str,
        file_path: &str,
    ) -> PortResult<AudioFile> {
        // Delete-then-insert in one transaction keeps the
        // at-most-one-live-artifact invariant under concurrent regeneration.
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("DELETE FROM audio_files WHERE page_id = $1")
            .bind(page_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        let record: AudioFileRecord = sqlx::query_as(
            "INSERT INTO audio_files (id, page_id, file_name, file_path) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, page_id, file_name, file_path, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(page_id)
        .bind(file_name)
        .bind(file_path)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        Ok(record.to_domain())
    }
}
