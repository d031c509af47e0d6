pub mod middleware;
pub mod rest;
pub mod state;

// Re-export the handlers to make them easily accessible to the binary that
// will build the web server router.
pub use middleware::require_auth;
pub use rest::{
    create_document_handler, delete_document_handler, generate_audio_handler, job_status_handler,
    list_documents_handler, list_voices_handler,
};
