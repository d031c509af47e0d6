//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::pipeline::AudioBookPipeline;
use audiopintar_core::ports::{DocumentStore, JobRunner};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AudioBookPipeline>,
    pub store: Arc<dyn DocumentStore>,
    pub runner: Arc<dyn JobRunner>,
    pub config: Arc<Config>,
    /// Server-lifetime token; spawned pollers watch a child of it so they
    /// stop when the process shuts down.
    pub shutdown: CancellationToken,
}
