//! Processos RGPD
//!
//! Backend for the municipal supplier GDPR compliance tracker.
//!
//! ## Features
//!
//! - **Process registry**: CRUD over supplier processes with GDPR assessments
//! - **History**: auto-annotated audit trail plus free-text notes
//! - **CSV**: legacy spreadsheet import and download export
//! - **Dashboard**: contract alerts and aggregate risk stats

mod analytics;
mod config;
mod csv;
mod db;
mod filter;
mod handlers;
mod history;
mod models;
mod repository;
mod validation;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use config::StorageMode;
use handlers::AppState;
use repository::{MemoryRepository, PostgresRepository, ProcessRepository};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "processos_rgpd=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Starting Processos RGPD backend");
    tracing::info!("Environment: {:?}", config.environment);

    // Pick the repository backend
    let repo: Arc<dyn ProcessRepository> = match config.storage {
        StorageMode::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL is required when STORAGE_MODE=postgres")?;

            tracing::info!("Connecting to database...");
            let pool = db::create_pool(database_url).await?;
            tracing::info!("Database connected");

            tracing::info!("Running database migrations...");
            db::run_migrations(&pool).await?;

            Arc::new(PostgresRepository::new(pool))
        }
        StorageMode::Memory => {
            tracing::info!("Using in-memory storage with demo data");
            Arc::new(MemoryRepository::seeded())
        }
    };

    let state = AppState { repo };

    // Build CORS layer
    let cors = if config.is_production() {
        CorsLayer::new()
            .allow_origin(
                config
                    .cors_origins
                    .iter()
                    .filter_map(|o| o.parse().ok())
                    .collect::<Vec<_>>(),
            )
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::permissive()
    };

    // Build API routes
    let api_routes = Router::new()
        // Process registry
        .route("/processes", get(handlers::list_processes))
        .route("/processes", post(handlers::create_process))
        .route("/processes/:id", get(handlers::get_process))
        .route("/processes/:id", put(handlers::update_process))
        .route("/processes/:id", delete(handlers::delete_process))
        .route("/processes/:id/notas", post(handlers::add_note))
        // CSV boundary
        .route("/processes/import", post(handlers::import_processes))
        .route("/processes/export", get(handlers::export_processes))
        // Dashboard
        .route("/dashboard/alerts", get(handlers::get_alerts))
        .route("/dashboard/stats", get(handlers::get_stats))
        // Lookups
        .route("/unidades-organicas", get(handlers::list_units))
        .route("/health", get(handlers::health));

    // Build main router
    let app = Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    // Start server
    let addr = config.server_addr();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
