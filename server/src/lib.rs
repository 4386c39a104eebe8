//! HTTP boundary for the patient records service.
//!
//! The router is backend-agnostic: it holds an `Arc<dyn PatientStore>` chosen
//! by [`build_store`] from the runtime configuration.

pub mod config;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{get, put},
    Router,
};
use clinic_db::{FilePatientStore, LocalStoragePatientStore, SqlPatientStore};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::{Backend, ServerConfig};
pub use crate::handlers::AppState;

pub fn router(store: AppState) -> Router {
    Router::new()
        .route(
            "/patients",
            get(handlers::list_patients).post(handlers::create_patient),
        )
        .route("/patients/statistics", get(handlers::patient_statistics))
        .route(
            "/patients/:id",
            put(handlers::update_patient).delete(handlers::delete_patient),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(store)
}

/// Construct the configured adapter, checking the database first when it is relational
pub async fn build_store(config: &ServerConfig) -> anyhow::Result<AppState> {
    let store: AppState = match config.backend {
        Backend::Sql => {
            let store = SqlPatientStore::new(config.database.clone());
            prepare_sql(&store, config.run_migrations).await?;
            Arc::new(store)
        }
        Backend::File => {
            tracing::info!("Using JSON file storage at {}", config.data_file.display());
            Arc::new(
                FilePatientStore::new(config.data_file.clone())
                    .with_delete_policy(config.delete_policy),
            )
        }
        Backend::Local => {
            tracing::info!("Using in-memory local storage");
            Arc::new(
                LocalStoragePatientStore::in_memory()
                    .with_latency(config.local_latency)
                    .with_delete_policy(config.delete_policy),
            )
        }
    };
    Ok(store)
}

async fn prepare_sql(store: &SqlPatientStore, run_migrations: bool) -> anyhow::Result<()> {
    tracing::info!(
        "Using database {}",
        store.connections().config().redacted_url()
    );

    if !store.test_connection().await {
        // The pool reconnects on the next request, so the server still starts
        tracing::warn!("⚠ Database not reachable at startup");
        return Ok(());
    }
    tracing::info!("✓ Database connection test passed");

    if run_migrations {
        store
            .run_migrations()
            .await
            .context("Failed to install patient schema")?;
    }
    Ok(())
}
