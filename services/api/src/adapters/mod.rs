pub mod db;
pub mod extraction;
pub mod storage;
pub mod tts;

pub use db::DbAdapter;
pub use extraction::LlamaParseAdapter;
pub use storage::BlobStoreAdapter;
pub use tts::ElevenLabsAdapter;
