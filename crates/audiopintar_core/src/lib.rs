pub mod domain;
pub mod ports;

pub use domain::{
    AudioFile, AudioJob, Document, DocumentView, Page, PageDispatch, PageView, Run, RunStatus,
    User, Voice,
};
pub use ports::{
    ContentStore, DocumentStore, JobRunner, PortError, PortResult, SpeechSynthesis, TextExtraction,
};
