//! services/api/src/test_support.rs
//!
//! In-memory implementations of the core ports, shared by the unit tests.
//! The store mirrors the SQL adapter's semantics (ownership scoping,
//! transactional replace, child-first cascade) over plain vectors.

use async_trait::async_trait;
use audiopintar_core::domain::{AudioFile, AudioJob, Document, DocumentView, Page, PageView, Run, RunStatus, Voice};
use audiopintar_core::ports::{
    ContentStore, DocumentStore, JobRunner, PortError, PortResult, SpeechSynthesis, TextExtraction,
};
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

//=========================================================================================
// InMemoryStore
//=========================================================================================

#[derive(Default)]
struct StoreState {
    sessions: HashMap<String, (Uuid, chrono::DateTime<Utc>)>,
    documents: Vec<Document>,
    pages: Vec<Page>,
    audio: Vec<AudioFile>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_session(&self, token: &str, user_id: Uuid) {
        let mut state = self.state.lock().unwrap();
        state.sessions.insert(
            token.to_string(),
            (user_id, Utc::now() + ChronoDuration::hours(1)),
        );
    }

    pub fn seed_expired_session(&self, token: &str, user_id: Uuid) {
        let mut state = self.state.lock().unwrap();
        state.sessions.insert(
            token.to_string(),
            (user_id, Utc::now() - ChronoDuration::hours(1)),
        );
    }

    /// Inserts a document with the given page texts, returning its id and
    /// the page ids in page-number order.
    pub fn seed_document(&self, owner_id: Uuid, name: &str, pages: &[&str]) -> (Uuid, Vec<Uuid>) {
        let mut state = self.state.lock().unwrap();
        let document_id = Uuid::new_v4();
        state.documents.push(Document {
            id: document_id,
            name: name.to_string(),
            owner_id,
            created_at: Utc::now(),
            updated_at: None,
        });
        let mut page_ids = Vec::with_capacity(pages.len());
        for (index, content) in pages.iter().enumerate() {
            let id = Uuid::new_v4();
            page_ids.push(id);
            state.pages.push(Page {
                id,
                document_id,
                page_number: index as i32 + 1,
                content: content.to_string(),
                created_at: Utc::now(),
            });
        }
        (document_id, page_ids)
    }

    pub fn document_count(&self) -> usize {
        self.state.lock().unwrap().documents.len()
    }

    pub fn page_count(&self) -> usize {
        self.state.lock().unwrap().pages.len()
    }

    pub fn audio_count(&self) -> usize {
        self.state.lock().unwrap().audio.len()
    }

    pub fn audio_count_for_page(&self, page_id: Uuid) -> usize {
        self.audio_for_page(page_id).len()
    }

    pub fn audio_for_page(&self, page_id: Uuid) -> Vec<AudioFile> {
        let state = self.state.lock().unwrap();
        state
            .audio
            .iter()
            .filter(|a| a.page_id == page_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn validate_session(&self, token: &str) -> PortResult<Uuid> {
        let state = self.state.lock().unwrap();
        match state.sessions.get(token) {
            Some((user_id, expires)) if *expires > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> PortResult<Vec<DocumentView>> {
        let state = self.state.lock().unwrap();
        // Newest first = reverse insertion order here.
        let mut views = Vec::new();
        for document in state.documents.iter().rev() {
            if document.owner_id != owner_id {
                continue;
            }
            let mut pages: Vec<&Page> = state
                .pages
                .iter()
                .filter(|p| p.document_id == document.id)
                .collect();
            pages.sort_by_key(|p| p.page_number);
            views.push(DocumentView {
                document: document.clone(),
                pages: pages
                    .into_iter()
                    .map(|page| PageView {
                        page: page.clone(),
                        audio_files: state
                            .audio
                            .iter()
                            .filter(|a| a.page_id == page.id)
                            .cloned()
                            .collect(),
                    })
                    .collect(),
            });
        }
        Ok(views)
    }

    async fn ingest_document(
        &self,
        owner_id: Uuid,
        name: &str,
        pages: &[String],
    ) -> PortResult<DocumentView> {
        let texts: Vec<&str> = pages.iter().map(|s| s.as_str()).collect();
        let (document_id, _) = self.seed_document(owner_id, name, &texts);
        let views = self.list_by_owner(owner_id).await?;
        views
            .into_iter()
            .find(|v| v.document.id == document_id)
            .ok_or_else(|| PortError::Unexpected("ingested document vanished".to_string()))
    }

    async fn delete_document(&self, id: Uuid, owner_id: Uuid) -> PortResult<Document> {
        let mut state = self.state.lock().unwrap();
        let position = state
            .documents
            .iter()
            .position(|d| d.id == id && d.owner_id == owner_id)
            .ok_or_else(|| PortError::NotFound(format!("Document {} not found", id)))?;
        let document = state.documents.remove(position);
        let page_ids: HashSet<Uuid> = state
            .pages
            .iter()
            .filter(|p| p.document_id == id)
            .map(|p| p.id)
            .collect();
        state.audio.retain(|a| !page_ids.contains(&a.page_id));
        state.pages.retain(|p| p.document_id != id);
        Ok(document)
    }

    async fn touch_document(&self, id: Uuid) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(document) = state.documents.iter_mut().find(|d| d.id == id) {
            document.updated_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn pages_for_generation(
        &self,
        document_id: Uuid,
        owner_id: Uuid,
        page_ids: &[Uuid],
    ) -> PortResult<Vec<Page>> {
        let state = self.state.lock().unwrap();
        state
            .documents
            .iter()
            .find(|d| d.id == document_id && d.owner_id == owner_id)
            .ok_or_else(|| PortError::NotFound(format!("Document {} not found", document_id)))?;
        let wanted: HashSet<Uuid> = page_ids.iter().copied().collect();
        let mut pages: Vec<Page> = state
            .pages
            .iter()
            .filter(|p| p.document_id == document_id && wanted.contains(&p.id))
            .cloned()
            .collect();
        pages.sort_by_key(|p| p.page_number);
        Ok(pages)
    }

    async fn clear_audio_for_page(&self, page_id: Uuid) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        state.audio.retain(|a| a.page_id != page_id);
        Ok(())
    }

    async fn replace_audio_for_page(
        &self,
        page_id: Uuid,
        file_name: &str,
        file_path: &str,
    ) -> PortResult<AudioFile> {
        let mut state = self.state.lock().unwrap();
        state.audio.retain(|a| a.page_id != page_id);
        let audio = AudioFile {
            id: Uuid::new_v4(),
            page_id,
            file_name: file_name.to_string(),
            file_path: file_path.to_string(),
            created_at: Utc::now(),
        };
        state.audio.push(audio.clone());
        Ok(audio)
    }
}

//=========================================================================================
// Extraction / Synthesis Stubs
//=========================================================================================

pub struct StubExtraction {
    pages: Vec<String>,
    error: Option<String>,
}

impl StubExtraction {
    pub fn pages(pages: &[&str]) -> Self {
        Self {
            pages: pages.iter().map(|s| s.to_string()).collect(),
            error: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            pages: Vec::new(),
            error: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl TextExtraction for StubExtraction {
    async fn extract_pages(&self, _data: &[u8]) -> PortResult<Vec<String>> {
        match &self.error {
            Some(message) => Err(PortError::upstream("extraction", message.clone())),
            None => Ok(self.pages.clone()),
        }
    }
}

pub struct StubSynthesis {
    error: Option<String>,
    delay: Option<Duration>,
}

impl StubSynthesis {
    pub fn ok() -> Self {
        Self {
            error: None,
            delay: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            delay: None,
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            error: None,
            delay: Some(delay),
        }
    }
}

#[async_trait]
impl SpeechSynthesis for StubSynthesis {
    async fn synthesize(&self, text: &str, voice_id: &str) -> PortResult<Vec<u8>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.error {
            Some(message) => Err(PortError::upstream("synthesis", message.clone())),
            None => Ok(format!("audio:{voice_id}:{text}").into_bytes()),
        }
    }

    async fn voices(&self) -> PortResult<Vec<Voice>> {
        Ok(vec![
            Voice {
                id: "v1".to_string(),
                name: "Rachel".to_string(),
            },
            Voice {
                id: "v2".to_string(),
                name: "Antoni".to_string(),
            },
        ])
    }
}

//=========================================================================================
// InMemoryContentStore
//=========================================================================================

#[derive(Default)]
pub struct InMemoryContentStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    puts: AtomicUsize,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, url: &str, data: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(url.to_string(), data.to_vec());
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn fetch(&self, url: &str) -> PortResult<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| PortError::upstream("fetch", format!("file URL returned 404: {url}")))
    }

    async fn put_audio(&self, file_name: &str, data: Vec<u8>) -> PortResult<String> {
        let url = format!("https://blobs.test/audio/{file_name}");
        self.objects.lock().unwrap().insert(url.clone(), data);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(url)
    }
}

//=========================================================================================
// Job Runner Doubles
//=========================================================================================

/// Records submitted jobs and hands out sequential run ids; individual pages
/// can be told to fail at dispatch.
#[derive(Default)]
pub struct RecordingRunner {
    jobs: Mutex<Vec<AudioJob>>,
    fail_pages: Mutex<HashSet<Uuid>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for_page(&self, page_id: Uuid) {
        self.fail_pages.lock().unwrap().insert(page_id);
    }

    pub fn submitted_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }
}

#[async_trait]
impl JobRunner for RecordingRunner {
    async fn submit(&self, job: AudioJob) -> PortResult<String> {
        if self.fail_pages.lock().unwrap().contains(&job.page_id) {
            return Err(PortError::Unexpected("dispatch rejected".to_string()));
        }
        let mut jobs = self.jobs.lock().unwrap();
        jobs.push(job);
        Ok(format!("run-{}", jobs.len()))
    }

    async fn status(&self, run_id: &str) -> PortResult<Run> {
        Ok(Run {
            run_id: run_id.to_string(),
            status: RunStatus::Pending,
        })
    }
}

/// Replays a scripted status sequence for one run, counting lookups. Once
/// the script is exhausted the final status repeats.
pub struct ScriptedRunner {
    run_id: String,
    script: Mutex<VecDeque<RunStatus>>,
    last: Mutex<RunStatus>,
    error: bool,
    lookups: AtomicUsize,
}

impl ScriptedRunner {
    pub fn with_statuses(run_id: &str, statuses: Vec<RunStatus>) -> Self {
        let last = statuses.last().copied().unwrap_or(RunStatus::Pending);
        Self {
            run_id: run_id.to_string(),
            script: Mutex::new(statuses.into()),
            last: Mutex::new(last),
            error: false,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn erroring(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(RunStatus::Pending),
            error: true,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobRunner for ScriptedRunner {
    async fn submit(&self, _job: AudioJob) -> PortResult<String> {
        Ok(self.run_id.clone())
    }

    async fn status(&self, run_id: &str) -> PortResult<Run> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.error {
            return Err(PortError::Unexpected("status backend unreachable".to_string()));
        }
        if run_id != self.run_id {
            return Err(PortError::NotFound(format!("Run {} not found", run_id)));
        }
        let status = match self.script.lock().unwrap().pop_front() {
            Some(status) => {
                *self.last.lock().unwrap() = status;
                status
            }
            None => *self.last.lock().unwrap(),
        };
        Ok(Run {
            run_id: run_id.to_string(),
            status,
        })
    }
}
