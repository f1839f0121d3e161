//! Database connection management
//!
//! This module provides the core MongoDB connection wrapper used by the
//! bootstrap and handed to the rest of the application afterwards.

use std::time::Duration;

use anyhow::{anyhow, Result};
use mongodb::bson::{doc, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use tokio::time::timeout;

/// Bound on connection establishment, liveness probes, and seed-guard queries.
pub const OP_TIMEOUT: Duration = Duration::from_secs(10);

/// Core database connection wrapper
///
/// `DatabaseConn` bundles the MongoDB client with the target database handle,
/// with consistent timeouts and error handling. The handle is cheap to clone
/// and safe for concurrent use once bootstrap completes.
pub struct DatabaseConn {
    pub client: Client,
    pub db: Database,
}

impl DatabaseConn {
    /// Connect to the store and verify liveness.
    ///
    /// Fails if the URI does not parse, the client cannot be built, or the
    /// ping does not come back within [`OP_TIMEOUT`].
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| anyhow!("Failed to parse MongoDB URI: {}", e))?;
        options.app_name = Some("choreboard".to_string());
        options.connect_timeout = Some(OP_TIMEOUT);
        options.server_selection_timeout = Some(OP_TIMEOUT);

        let client = Client::with_options(options)
            .map_err(|e| anyhow!("Failed to build MongoDB client: {}", e))?;
        let db = client.database(db_name);

        let conn = DatabaseConn { client, db };
        conn.ping().await?;
        Ok(conn)
    }

    /// Run a liveness probe against the target database.
    pub async fn ping(&self) -> Result<()> {
        timeout(OP_TIMEOUT, self.db.run_command(doc! { "ping": 1 }))
            .await
            .map_err(|_| anyhow!("Timed out pinging MongoDB after {:?}", OP_TIMEOUT))?
            .map_err(|e| anyhow!("Failed to ping MongoDB: {}", e))?;
        Ok(())
    }

    /// Check if a collection exists in the database
    ///
    /// Non-existence is not an error; it tells the convergence engine to skip
    /// remediation that only applies to already-populated collections.
    pub async fn collection_exists(&self, name: &str) -> Result<bool> {
        let names = self
            .db
            .list_collection_names()
            .filter(doc! { "name": name })
            .await
            .map_err(|e| anyhow!("Failed to list collections: {}", e))?;
        Ok(!names.is_empty())
    }

    /// Count documents in a collection matching a filter
    pub async fn collection_count(&self, name: &str, filter: Document) -> Result<u64> {
        self.db
            .collection::<Document>(name)
            .count_documents(filter)
            .await
            .map_err(|e| anyhow!("Failed to count documents in '{}': {}", name, e))
    }
}
