//! services/api/src/bin/api.rs

use api_lib::{
    adapters::db::DbAdapter,
    config::{Config, StorageBackend},
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderName, HeaderValue, Method,
};
use axum::Router;
use course_file_core::catalog::default_templates;
use course_file_core::{AuditLogService, InMemoryStore, OrgSeed, WorkflowEngine, WorkflowStore};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!(
        backend = %config.storage_backend,
        revert_policy = %config.revert_policy,
        "Configuration loaded. Starting server..."
    );

    // --- 2. Initialize the Store ---
    let (store, audit): (Arc<dyn WorkflowStore>, Arc<dyn AuditLogService>) =
        match config.storage_backend {
            StorageBackend::Postgres => {
                let database_url = config
                    .database_url
                    .as_deref()
                    .ok_or_else(|| ApiError::Internal("DATABASE_URL is required".to_string()))?;
                info!("Connecting to database...");
                let db_pool = PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .connect(database_url)
                    .await?;
                let db_adapter = Arc::new(DbAdapter::new(db_pool));
                info!("Running database migrations...");
                db_adapter.run_migrations().await?;
                info!("Database migrations complete.");
                let store: Arc<dyn WorkflowStore> = db_adapter.clone();
                let audit: Arc<dyn AuditLogService> = db_adapter;
                (store, audit)
            }
            StorageBackend::Memory => {
                warn!("Using the in-memory store; data is lost on shutdown");
                let memory = Arc::new(load_memory_store(&config)?);
                let store: Arc<dyn WorkflowStore> = memory.clone();
                let audit: Arc<dyn AuditLogService> = memory;
                (store, audit)
            }
        };

    // --- 3. Build the Shared AppState ---
    let engine = WorkflowEngine::new(store, audit, config.workflow_settings());
    let app_state = Arc::new(AppState {
        engine,
        config: config.clone(),
    });

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(web::middleware::USER_ID_HEADER),
        ]);

    // --- 4. Create the Web Router ---
    let app = Router::new()
        .merge(web::router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the in-memory store from the optional JSON seed, falling back to the
/// default template catalog when the seed carries none.
fn load_memory_store(config: &Config) -> Result<InMemoryStore, ApiError> {
    let mut seed = match &config.seed_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str::<OrgSeed>(&raw).map_err(|e| {
                ApiError::Internal(format!("Invalid seed file {}: {}", path.display(), e))
            })?
        }
        None => OrgSeed::default(),
    };
    if seed.templates.is_empty() {
        seed.templates = default_templates();
    }
    info!(
        departments = seed.departments.len(),
        users = seed.users.len(),
        templates = seed.templates.len(),
        "Seeding in-memory store"
    );
    Ok(InMemoryStore::from_seed(seed)?)
}
