//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{BlobStoreAdapter, DbAdapter, ElevenLabsAdapter, LlamaParseAdapter},
    config::Config,
    error::ApiError,
    jobs::{LocalJobRunner, WorkerContext},
    pipeline::AudioBookPipeline,
    web::{
        create_document_handler, delete_document_handler, generate_audio_handler,
        job_status_handler, list_documents_handler, list_voices_handler, require_auth,
        rest::ApiDoc, state::AppState,
    },
};
use audiopintar_core::ports::SpeechSynthesis;
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// The upload collaborator caps documents at 16MB; mirror that here.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    // One long-lived HTTP client shared by every outbound adapter.
    let http_client = reqwest::Client::new();

    let extraction = Arc::new(LlamaParseAdapter::new(
        http_client.clone(),
        config.llama_cloud_base_url.clone(),
        config.llama_cloud_api_key.clone(),
    ));

    // The synthesis adapter exists only when its credential does; audio
    // generation without it is a checked, user-surfaced error.
    let synthesis: Option<Arc<dyn SpeechSynthesis>> =
        config.elevenlabs_api_key.as_ref().map(|key| {
            Arc::new(ElevenLabsAdapter::new(
                http_client.clone(),
                config.elevenlabs_base_url.clone(),
                key.clone(),
            )) as Arc<dyn SpeechSynthesis>
        });
    if synthesis.is_none() {
        info!("ELEVENLABS_API_KEY not set; audio generation is disabled until it is");
    }

    let content = Arc::new(BlobStoreAdapter::new(
        http_client,
        config.storage_endpoint.clone(),
        config.storage_bucket.clone(),
        config.storage_access_key.clone(),
        config.storage_secret_key.clone(),
    ));

    // --- 4. Start the Execution Backend ---
    let shutdown = CancellationToken::new();
    let runner = LocalJobRunner::start(
        WorkerContext {
            store: db_adapter.clone(),
            synthesis: synthesis.clone(),
            content: content.clone(),
        },
        config.worker_count,
        config.job_timeout,
        shutdown.clone(),
    );

    // --- 5. Build the Pipeline and Shared AppState ---
    let pipeline = Arc::new(AudioBookPipeline::new(
        db_adapter.clone(),
        extraction,
        synthesis,
        content,
        runner.clone(),
    ));

    let app_state = Arc::new(AppState {
        pipeline,
        store: db_adapter,
        runner,
        config: config.clone(),
        shutdown: shutdown.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    // Every route requires a valid session.
    let api_router = Router::new()
        .route("/documents", get(list_documents_handler))
        .route("/documents", post(create_document_handler))
        .route("/documents/{id}", delete(delete_document_handler))
        .route("/documents/{id}/audio", post(generate_audio_handler))
        .route("/runs/{run_id}", get(job_status_handler))
        .route("/voices", get(list_voices_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received; stopping workers and pollers.");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
