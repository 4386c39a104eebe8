//! Runtime configuration, read once from the environment at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clinic_db::{DbConfig, DeletePolicy};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("Invalid database settings: {0}")]
    Database(String),
}

/// Which persistence adapter backs the HTTP surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    Sql,
    #[default]
    File,
    Local,
}

impl FromStr for Backend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sql" | "postgres" => Ok(Backend::Sql),
            "file" | "json" => Ok(Backend::File),
            "local" | "memory" => Ok(Backend::Local),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub backend: Backend,
    pub bind: SocketAddr,
    pub data_file: PathBuf,
    pub delete_policy: DeletePolicy,
    pub local_latency: Duration,
    pub run_migrations: bool,
    pub database: DbConfig<'static>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let backend = parse("CLINIC_BACKEND", var("CLINIC_BACKEND", "file"))?;
        let bind = parse("CLINIC_BIND", var("CLINIC_BIND", "0.0.0.0:3000"))?;
        let delete_policy = parse("CLINIC_DELETE_POLICY", var("CLINIC_DELETE_POLICY", "soft"))?;
        let latency_ms: u64 = parse(
            "CLINIC_LOCAL_LATENCY_MS",
            var("CLINIC_LOCAL_LATENCY_MS", "100"),
        )?;
        let run_migrations = match var("CLINIC_RUN_MIGRATIONS", "false").trim() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            other => {
                return Err(ConfigError::Invalid {
                    name: "CLINIC_RUN_MIGRATIONS",
                    value: other.to_string(),
                })
            }
        };
        let database = DbConfig::from_lookup(&lookup).map_err(ConfigError::Database)?;

        Ok(Self {
            backend,
            bind,
            data_file: PathBuf::from(var("CLINIC_DATA_FILE", clinic_db::file::DEFAULT_DATA_FILE)),
            delete_policy,
            local_latency: Duration::from_millis(latency_ms),
            run_migrations,
            database,
        })
    }
}

fn parse<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}
