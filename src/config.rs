//! Bootstrap configuration
//!
//! Configuration is environment-supplied. An optional `.env` file is loaded
//! first so the service can run locally; in containerized deployments the
//! variables are injected by the host and the file is simply absent.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use config::{Config, Environment};

/// Validated configuration required to bootstrap the database.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// MongoDB connection string (`MONGODB_URI`)
    pub mongo_uri: String,

    /// Target database name (`DB_NAME`)
    pub db_name: String,

    /// Secret token used by the authentication layer (`JWT_SECRET`).
    /// Not consumed by the bootstrap itself beyond validation and storage.
    pub auth_secret: String,
}

impl BootstrapConfig {
    /// Read and validate configuration from the environment.
    ///
    /// Each required variable is trimmed of surrounding whitespace; a missing
    /// or empty value is an error naming the variable.
    pub fn from_env() -> Result<BootstrapConfig> {
        if dotenvy::dotenv().is_err() {
            tracing::info!("no .env file found; using host environment variables");
        }

        let settings = Config::builder()
            .add_source(Environment::default())
            .build()
            .map_err(|e| anyhow!("Failed to read environment configuration: {}", e))?;

        let values = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize environment configuration: {}", e))?;

        Self::from_values(&values)
    }

    // The `config` Environment source lowercases variable names.
    fn from_values(values: &HashMap<String, String>) -> Result<BootstrapConfig> {
        Ok(BootstrapConfig {
            mongo_uri: required(values, "mongodb_uri", "MONGODB_URI")?,
            db_name: required(values, "db_name", "DB_NAME")?,
            auth_secret: required(values, "jwt_secret", "JWT_SECRET")?,
        })
    }
}

fn required(values: &HashMap<String, String>, key: &str, var: &str) -> Result<String> {
    let value = values.get(key).map(|v| v.trim()).unwrap_or("");
    if value.is_empty() {
        return Err(anyhow!("{} is required and must not be empty", var));
    }
    Ok(value.to_string())
}
