//! Relational adapter backed by stored procedures.

pub mod config;
pub mod connection;
pub mod migrations;
pub mod procedures;

use std::future::Future;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::Postgres;

pub use config::DbConfig;
pub use connection::{ConnectionManager, ConnectionState};

use crate::error::Result;
use crate::models::{NewPatient, Patient, PatientStatistics};
use crate::store::PatientStore;

/// Patient store that delegates every operation to a named stored procedure
pub struct SqlPatientStore {
    connections: ConnectionManager,
}

impl SqlPatientStore {
    pub fn new(config: DbConfig<'static>) -> Self {
        Self {
            connections: ConnectionManager::new(config),
        }
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    /// Run `SELECT 1`, reporting whether the database answered
    pub async fn test_connection(&self) -> bool {
        match self.with_connection("test connection", |mut conn| async move {
            procedures::ping(&mut conn).await
        })
        .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Connection test failed: {}", e);
                false
            }
        }
    }

    /// Install the patients table and the stored procedures
    pub async fn run_migrations(&self) -> Result<usize> {
        self.with_connection("run migrations", |mut conn| async move {
            migrations::run_migrations(&mut conn).await
        })
        .await
    }

    /// Check out a connection, run `op` on it and release it on every exit path.
    ///
    /// Any failure resets the pool so the next call starts from a fresh one.
    async fn with_connection<T, F, Fut>(&self, operation: &str, op: F) -> Result<T>
    where
        F: FnOnce(PoolConnection<Postgres>) -> Fut,
        Fut: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        let conn = self.connections.acquire().await.map_err(|e| {
            tracing::error!("Error during {}: {}", operation, e);
            e
        })?;

        match op(conn).await {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::error!("Error during {}: {}", operation, e);
                self.connections.reset().await;
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl PatientStore for SqlPatientStore {
    async fn get_all(&self) -> Result<Vec<Patient>> {
        self.with_connection("fetch patients", |mut conn| async move {
            procedures::get_all_patients(&mut conn).await
        })
        .await
    }

    async fn search(&self, term: &str) -> Result<Vec<Patient>> {
        let term = term.to_string();
        self.with_connection("search patients", |mut conn| async move {
            procedures::search_patients(&mut conn, &term).await
        })
        .await
    }

    async fn add(&self, patient: NewPatient) -> Result<Patient> {
        let created = self
            .with_connection("add patient", |mut conn| async move {
                procedures::add_patient(&mut conn, &patient).await
            })
            .await?;

        tracing::info!("✓ Patient created: {}", created.id);
        Ok(created)
    }

    async fn update(&self, id: i64, patient: NewPatient) -> Result<Patient> {
        let updated = self
            .with_connection("update patient", |mut conn| async move {
                procedures::update_patient(&mut conn, id, &patient).await
            })
            .await?;

        tracing::info!("✓ Patient updated: {}", id);
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.with_connection("delete patient", |mut conn| async move {
            procedures::delete_patient(&mut conn, id).await
        })
        .await?;

        tracing::info!("✓ Patient deleted: {}", id);
        Ok(())
    }

    async fn statistics(&self) -> Result<PatientStatistics> {
        self.with_connection("fetch statistics", |mut conn| async move {
            procedures::patient_statistics(&mut conn).await
        })
        .await
    }
}
