mod config;
mod error;
mod routes;

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use config::AppConfig;
use doc_chat::{ChatService, DocumentProcessor, GeminiService, SessionIds, SqliteChatStore, TesseractOcr};
use routes::{router, AppState};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() {
    // Initialize environment variables and logging
    dotenv::dotenv().ok();
    env_logger::init();

    if let Err(e) = run().await {
        log::error!("Server failed: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = AppConfig::from_env()?;

    let store = SqliteChatStore::open(&config.database_path)
        .with_context(|| format!("cannot open chat store at {}", config.database_path.display()))?;
    let generator = GeminiService::new(&config.gemini_api_key)
        .with_model(&config.gemini_model)
        .with_base_url(&config.gemini_base_url);
    let processor = DocumentProcessor::new(
        Arc::new(TesseractOcr::new(&config.tesseract_bin)),
        &config.upload_temp_dir,
    );
    let chat = ChatService::new(
        processor,
        Arc::new(generator),
        Arc::new(store),
        Arc::new(SessionIds::new()),
    );
    log::info!(
        "Chat service ready (model {}, store {})",
        config.gemini_model,
        config.database_path.display()
    );

    let cors = CorsLayer::new()
        .allow_origin(config.cors_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true);

    let app = router(config.max_upload_bytes)
        .with_state(Arc::new(AppState { chat }))
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    log::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
