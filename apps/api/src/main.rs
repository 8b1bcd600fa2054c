mod config;
mod db;
mod errors;
mod generation;
mod identifier;
mod llm_client;
mod models;
mod routes;
mod scrape;
mod state;
mod storage;
mod submission;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, Options};
use crate::db::{create_pool, ensure_schema};
use crate::generation::compiler::Latexmk;
use crate::generation::cover_letter::CoverLetterWriter;
use crate::generation::cv::CvTailor;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::scrape::ScraperRegistry;
use crate::state::AppState;
use crate::storage::objects::S3DocumentStore;
use crate::storage::sheets::PgRecordStore;
use crate::submission::row::{FIRST_COLUMN, HEADERS};
use crate::submission::Submitter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting jobtrack v{}", env!("CARGO_PKG_VERSION"));

    // Storage locations from the options document
    let options = Options::load(&config.options_path)
        .and_then(Options::resolve)
        .with_context(|| format!("Invalid options in {}", config.options_path.display()))?;
    let options = Arc::new(options);
    info!(
        "Tracking spreadsheet {} (collections: {})",
        options.spreadsheet_id,
        options.collections.join(", ")
    );

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    ensure_schema(&db).await?;
    let records = PgRecordStore::new(db, options.spreadsheet_id.clone());
    records
        .ensure_header(options.primary_collection(), FIRST_COLUMN, HEADERS)
        .await?;

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let documents = Arc::new(S3DocumentStore::new(
        s3,
        config.s3_bucket.clone(),
        config.s3_public_url.clone(),
    ));
    info!("S3 client initialized");

    // Initialize LLM client
    let llm = Arc::new(LlmClient::new(
        config.anthropic_api_key.clone(),
        config.openai_api_key.clone(),
    )?);
    info!("LLM client initialized (default model: {})", config.default_model);

    let cv = Arc::new(CvTailor::new(
        llm.clone(),
        Arc::new(Latexmk::default()),
        documents.clone(),
        config.cv_workspace.clone(),
        options.cv_folder.clone(),
        config.default_model.clone(),
    ));
    let cover_letters = Arc::new(CoverLetterWriter::new(
        llm,
        documents.clone(),
        config.resume_text_dir.clone(),
        config.default_model.clone(),
    ));
    let submitter = Submitter::new(
        Arc::new(records),
        documents,
        cv,
        cover_letters,
        options,
    );

    // Build app state
    let state = AppState {
        config: Arc::new(config.clone()),
        submitter,
        scrapers: Arc::new(ScraperRegistry::default()),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "jobtrack-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
