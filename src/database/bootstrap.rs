//! Bootstrap orchestration
//!
//! Sequences the startup steps: connect, migrate legacy group codes, converge
//! every collection's index set, seed reference data. Each step's failure is
//! classified as fatal (no usable database; bootstrap aborts) or advisory
//! (optional remediation of non-fresh deployments; logged and skipped).
//!
//! Partial progress is never rolled back: idempotent index creation makes the
//! next successful startup finish convergence.

use anyhow::{anyhow, Error, Result};
use mongodb::Database;
use tokio::time::timeout;
use tracing::{info, warn};

use super::core::{DatabaseConn, SchemaManager, OP_TIMEOUT};
use super::seed::Seeder;
use crate::config::BootstrapConfig;

/// Process-wide context produced by a successful bootstrap.
///
/// Replaces ambient shared state: the rest of the application receives the
/// database handle and the authentication secret by explicit dependency.
/// Both are cheap to clone and safe for concurrent use.
#[derive(Clone)]
pub struct AppContext {
    pub db: Database,
    pub auth_secret: String,
}

/// Failure of a single bootstrap step.
#[derive(Debug)]
pub enum StepFailure {
    /// Core schema guarantees cannot be trusted; bootstrap must abort.
    Fatal(Error),

    /// Optional remediation failed; bootstrap continues degraded.
    Advisory(Error),
}

async fn migrate_step(manager: &SchemaManager<'_>) -> Result<(), StepFailure> {
    match timeout(OP_TIMEOUT, manager.migrate_legacy_group_codes()).await {
        Ok(Ok(migrated)) => {
            if migrated > 0 {
                info!(migrated, "backfilled legacy group codes");
            }
            Ok(())
        }
        Ok(Err(e)) => Err(StepFailure::Advisory(e)),
        Err(_) => Err(StepFailure::Advisory(anyhow!(
            "Timed out backfilling legacy group codes after {:?}",
            OP_TIMEOUT
        ))),
    }
}

fn run_step(step: &str, result: Result<(), StepFailure>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(StepFailure::Advisory(e)) => {
            warn!(step, error = %e, "bootstrap step failed; continuing");
            Ok(())
        }
        Err(StepFailure::Fatal(e)) => Err(e.context(format!("bootstrap step '{}' failed", step))),
    }
}

/// Run the full startup bootstrap and hand back a ready-to-use context.
///
/// Fatal: connection or liveness failure, any index-creation failure.
/// Advisory: legacy group migration, reference-data seeding.
pub async fn bootstrap(config: &BootstrapConfig) -> Result<AppContext> {
    info!(database = %config.db_name, "connecting to MongoDB");
    let conn = DatabaseConn::connect(&config.mongo_uri, &config.db_name).await?;

    let manager = SchemaManager::new(&conn);

    // Runs ahead of index creation so the `group_code` unique index does not
    // fail on documents missing the field. A fresh installation has nothing
    // to migrate and an error here is not fatal.
    run_step("migrate legacy group codes", migrate_step(&manager).await)?;

    run_step(
        "converge indexes",
        manager.converge().await.map_err(StepFailure::Fatal),
    )?;

    run_step(
        "seed predefined categories",
        Seeder::new(&conn)
            .seed_predefined_categories()
            .await
            .map(drop)
            .map_err(StepFailure::Advisory),
    )?;

    info!(database = %config.db_name, "database bootstrap complete");
    Ok(AppContext {
        db: conn.db.clone(),
        auth_secret: config.auth_secret.clone(),
    })
}

#[cfg(test)]
mod tests {
    use mongodb::bson::oid::ObjectId;
    use mongodb::bson::{doc, Document};
    use mongodb::options::ClientOptions;
    use mongodb::Client;

    use super::super::core::{GROUPS, LEGACY_GROUP_CODE, PANTRY_CATEGORIES, SHOPPING_CART};
    use super::super::seed::PREDEFINED_CATEGORY_TYPE;
    use super::*;

    #[test]
    fn test_successful_step_passes_through() {
        assert!(run_step("noop", Ok(())).is_ok());
    }

    #[test]
    fn test_advisory_failure_continues() {
        let result = run_step("seed", Err(StepFailure::Advisory(anyhow!("count failed"))));
        assert!(result.is_ok());
    }

    #[test]
    fn test_fatal_failure_aborts_with_context() {
        let result = run_step("converge indexes", Err(StepFailure::Fatal(anyhow!("boom"))));
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("converge indexes"));
        assert!(message.contains("boom"));
    }

    #[tokio::test]
    async fn test_migration_failure_is_advisory() {
        // The client connects lazily, so one built against an unroutable
        // address only fails at operation time, once server selection gives
        // up. The migration step must classify that as advisory.
        let mut options = ClientOptions::parse("mongodb://192.0.2.1:27017")
            .await
            .unwrap();
        options.server_selection_timeout = Some(std::time::Duration::from_millis(200));
        options.connect_timeout = Some(std::time::Duration::from_millis(200));
        let client = Client::with_options(options).unwrap();
        let conn = DatabaseConn {
            db: client.database("choreboard-test"),
            client,
        };
        let manager = SchemaManager::new(&conn);

        let result = migrate_step(&manager).await;
        assert!(matches!(&result, Err(StepFailure::Advisory(_))));
        assert!(run_step("migrate legacy group codes", result).is_ok());
    }

    // The tests below need a running MongoDB instance. Set MONGODB_URI,
    // DB_NAME, and JWT_SECRET, then run with `cargo test -- --ignored`.

    fn live_config() -> Option<BootstrapConfig> {
        BootstrapConfig::from_env().ok()
    }

    #[tokio::test]
    #[ignore = "requires a running MongoDB instance"]
    async fn test_bootstrap_is_idempotent() {
        let Some(config) = live_config() else { return };

        let context = bootstrap(&config).await.unwrap();
        bootstrap(&config).await.unwrap();

        // Second run must not add predefined categories.
        let count = context
            .db
            .collection::<Document>(PANTRY_CATEGORIES)
            .count_documents(doc! { "type": PREDEFINED_CATEGORY_TYPE })
            .await
            .unwrap();
        assert_eq!(count, 20);
    }

    #[tokio::test]
    #[ignore = "requires a running MongoDB instance"]
    async fn test_legacy_group_gets_sentinel_code() {
        let Some(config) = live_config() else { return };

        let conn = DatabaseConn::connect(&config.mongo_uri, &config.db_name)
            .await
            .unwrap();
        let groups = conn.db.collection::<Document>(GROUPS);

        groups
            .delete_many(doc! { "name": "bootstrap-test-legacy" })
            .await
            .unwrap();
        groups
            .insert_one(doc! { "name": "bootstrap-test-legacy" })
            .await
            .unwrap();

        bootstrap(&config).await.unwrap();

        let migrated = groups
            .find_one(doc! { "name": "bootstrap-test-legacy" })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(migrated.get_str("group_code").unwrap(), LEGACY_GROUP_CODE);

        groups
            .delete_many(doc! { "name": "bootstrap-test-legacy" })
            .await
            .unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running MongoDB instance"]
    async fn test_duplicate_username_rejected_after_bootstrap() {
        let Some(config) = live_config() else { return };

        let context = bootstrap(&config).await.unwrap();
        let users = context.db.collection::<Document>("users");

        users
            .delete_many(doc! { "username": "bootstrap-test-user" })
            .await
            .unwrap();
        users
            .insert_one(doc! { "username": "bootstrap-test-user", "phone_number": "+15550001" })
            .await
            .unwrap();

        let duplicate = users
            .insert_one(doc! { "username": "bootstrap-test-user", "phone_number": "+15550002" })
            .await;
        assert!(duplicate.is_err());

        users
            .delete_many(doc! { "username": "bootstrap-test-user" })
            .await
            .unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running MongoDB instance"]
    async fn test_duplicate_group_code_rejected_after_bootstrap() {
        let Some(config) = live_config() else { return };

        let context = bootstrap(&config).await.unwrap();
        let groups = context.db.collection::<Document>(GROUPS);

        groups
            .delete_many(doc! { "group_code": "BOOTTEST" })
            .await
            .unwrap();
        groups
            .insert_one(doc! { "name": "bootstrap-test-group-a", "group_code": "BOOTTEST" })
            .await
            .unwrap();

        let duplicate = groups
            .insert_one(doc! { "name": "bootstrap-test-group-b", "group_code": "BOOTTEST" })
            .await;
        assert!(duplicate.is_err());

        groups
            .delete_many(doc! { "group_code": "BOOTTEST" })
            .await
            .unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running MongoDB instance"]
    async fn test_duplicate_cart_item_rejected_after_bootstrap() {
        let Some(config) = live_config() else { return };

        let context = bootstrap(&config).await.unwrap();
        let cart = context.db.collection::<Document>(SHOPPING_CART);
        let user_id = ObjectId::new();
        let group_id = ObjectId::new();

        cart.delete_many(doc! { "item_name": "bootstrap-test-milk" })
            .await
            .unwrap();
        cart.insert_one(
            doc! { "user_id": user_id, "group_id": group_id, "item_name": "bootstrap-test-milk" },
        )
        .await
        .unwrap();

        // Same user, same group, same item: rejected by the compound index.
        let duplicate = cart
            .insert_one(
                doc! { "user_id": user_id, "group_id": group_id, "item_name": "bootstrap-test-milk" },
            )
            .await;
        assert!(duplicate.is_err());

        // Another user may carry the same item in the same group's cart.
        let other_user = cart
            .insert_one(doc! {
                "user_id": ObjectId::new(),
                "group_id": group_id,
                "item_name": "bootstrap-test-milk",
            })
            .await;
        assert!(other_user.is_ok());

        cart.delete_many(doc! { "item_name": "bootstrap-test-milk" })
            .await
            .unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running MongoDB instance"]
    async fn test_ungrouped_categories_may_share_names() {
        let Some(config) = live_config() else { return };

        let context = bootstrap(&config).await.unwrap();
        let categories = context.db.collection::<Document>(PANTRY_CATEGORIES);

        categories
            .delete_many(doc! { "name": "bootstrap-test-shared" })
            .await
            .unwrap();
        categories
            .insert_one(doc! { "name": "bootstrap-test-shared", "is_active": true })
            .await
            .unwrap();

        // Both documents lack `group_id`, so the partial uniqueness filter
        // never applies and they must coexist.
        let second = categories
            .insert_one(doc! { "name": "bootstrap-test-shared", "is_active": true })
            .await;
        assert!(second.is_ok());

        categories
            .delete_many(doc! { "name": "bootstrap-test-shared" })
            .await
            .unwrap();
    }
}
