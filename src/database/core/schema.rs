//! Schema definitions and index convergence
//!
//! This module declares the complete target index set for every collection and
//! reconciles actual store state to match. All collections are defined here to
//! keep the schema in one place and the bootstrap order explicit.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::IndexModel;
use tokio::time::timeout;
use tracing::{info, warn};

use super::connection::DatabaseConn;

/// Collection names governed by the bootstrap
pub const USERS: &str = "users";
pub const GROUPS: &str = "groups";
pub const CHORES: &str = "chores";
pub const RECURRING_CHORES: &str = "recurring_chores";
pub const CHORE_COMPLETIONS: &str = "chore_completions";
pub const SHOPPING_CART: &str = "shopping_cart";
pub const PANTRY_CATEGORIES: &str = "pantry_categories";

/// Sentinel `group_code` assigned to groups that predate the field, so the
/// unique index can build without colliding on missing values.
pub const LEGACY_GROUP_CODE: &str = "LEGACY";

/// Bound on the full index-convergence pass.
pub const CONVERGE_TIMEOUT: Duration = Duration::from_secs(30);

/// How a collection's declared index set is reconciled with current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// Create each declared index; one that already exists with identical
    /// keys is a no-op, not an error.
    Additive,

    /// Drop all existing indexes first, then create the declared set fresh.
    ///
    /// Used for collections whose uniqueness keys were introduced after
    /// initial deployment and may conflict with stale indexes. Queries on the
    /// collection briefly lose index support during the rebuild.
    DestructiveRebuild,
}

/// Declared target state for one collection.
pub struct CollectionSchema {
    pub name: &'static str,
    pub mode: IndexMode,
    pub indexes: Vec<IndexModel>,
}

fn index(keys: Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn unique_index(keys: Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

/// Schema definitions for all collections governed by the bootstrap
///
/// Each collection's index set is independent of the others; the only
/// ordering constraint is that the legacy group migration runs before the
/// `groups` unique index is built.
pub struct SchemaDefinitions;

impl SchemaDefinitions {
    /// Users: unique identity fields plus score/room lookups.
    pub fn users() -> CollectionSchema {
        CollectionSchema {
            name: USERS,
            mode: IndexMode::Additive,
            indexes: vec![
                unique_index(doc! { "username": 1 }),
                unique_index(doc! { "phone_number": 1 }),
                index(doc! { "score": -1 }),
                index(doc! { "room_number": 1 }),
            ],
        }
    }

    /// Groups: rebuilt destructively since `group_code` postdates the first
    /// deployed schema and older databases may carry inconsistent indexes.
    pub fn groups() -> CollectionSchema {
        CollectionSchema {
            name: GROUPS,
            mode: IndexMode::DestructiveRebuild,
            indexes: vec![
                unique_index(doc! { "name": 1 }),
                unique_index(doc! { "group_code": 1 }),
            ],
        }
    }

    /// Chores: lookup by group, assignee, lifecycle state, due ordering, and
    /// originating recurrence.
    pub fn chores() -> CollectionSchema {
        CollectionSchema {
            name: CHORES,
            mode: IndexMode::Additive,
            indexes: vec![
                index(doc! { "group_id": 1 }),
                index(doc! { "assigned_to": 1 }),
                index(doc! { "status": 1 }),
                index(doc! { "due_date": 1 }),
                index(doc! { "recurring_id": 1 }),
            ],
        }
    }

    /// Recurring chore rules: drives due-for-generation queries.
    pub fn recurring_chores() -> CollectionSchema {
        CollectionSchema {
            name: RECURRING_CHORES,
            mode: IndexMode::Additive,
            indexes: vec![
                index(doc! { "group_id": 1 }),
                index(doc! { "is_active": 1 }),
                index(doc! { "next_assignment": 1 }),
            ],
        }
    }

    /// Chore completions: recency-ordered history per chore and per user.
    pub fn chore_completions() -> CollectionSchema {
        CollectionSchema {
            name: CHORE_COMPLETIONS,
            mode: IndexMode::Additive,
            indexes: vec![
                index(doc! { "chore_id": 1 }),
                index(doc! { "user_id": 1 }),
                index(doc! { "completed_at": -1 }),
            ],
        }
    }

    /// Shopping cart: a user gets at most one entry per item per group cart.
    pub fn shopping_cart() -> CollectionSchema {
        CollectionSchema {
            name: SHOPPING_CART,
            mode: IndexMode::Additive,
            indexes: vec![
                index(doc! { "group_id": 1 }),
                index(doc! { "user_id": 1 }),
                index(doc! { "item_name": 1 }),
                unique_index(doc! { "user_id": 1, "group_id": 1, "item_name": 1 }),
            ],
        }
    }

    /// Pantry categories: (`name`, `group_id`) uniqueness applies only to
    /// group-scoped documents. Predefined categories carry no `group_id`, so
    /// the partial filter exempts them; the seeding guard keeps them unique.
    pub fn pantry_categories() -> CollectionSchema {
        CollectionSchema {
            name: PANTRY_CATEGORIES,
            mode: IndexMode::Additive,
            indexes: vec![
                IndexModel::builder()
                    .keys(doc! { "name": 1, "group_id": 1 })
                    .options(
                        IndexOptions::builder()
                            .unique(true)
                            .partial_filter_expression(doc! { "group_id": { "$exists": true } })
                            .build(),
                    )
                    .build(),
                index(doc! { "type": 1 }),
                index(doc! { "group_id": 1 }),
                index(doc! { "is_active": 1 }),
            ],
        }
    }

    /// All collection schemas in bootstrap order.
    ///
    /// Only the `groups` position matters (its migration must precede its
    /// index build); the rest of the order is incidental but kept fixed.
    pub fn collections() -> Vec<CollectionSchema> {
        vec![
            Self::users(),
            Self::groups(),
            Self::chores(),
            Self::recurring_chores(),
            Self::chore_completions(),
            Self::shopping_cart(),
            Self::pantry_categories(),
        ]
    }
}

/// Schema manager for the Choreboard database
///
/// Handles index convergence and the legacy group-code migration.
pub struct SchemaManager<'a> {
    conn: &'a DatabaseConn,
}

impl<'a> SchemaManager<'a> {
    /// Create a new schema manager for the given connection
    pub fn new(conn: &'a DatabaseConn) -> Self {
        Self { conn }
    }

    /// Reconcile every declared index set against the store.
    ///
    /// Any index-creation failure is an error naming the collection; cleanup
    /// steps preceding a destructive rebuild are logged and skipped on
    /// failure since only the build step is depended on. The whole pass is
    /// bounded by [`CONVERGE_TIMEOUT`].
    pub async fn converge(&self) -> Result<()> {
        timeout(CONVERGE_TIMEOUT, self.converge_all())
            .await
            .map_err(|_| anyhow!("Index convergence timed out after {:?}", CONVERGE_TIMEOUT))?
    }

    async fn converge_all(&self) -> Result<()> {
        for schema in SchemaDefinitions::collections() {
            self.converge_collection(schema).await?;
        }
        Ok(())
    }

    async fn converge_collection(&self, schema: CollectionSchema) -> Result<()> {
        let collection = self.conn.db.collection::<Document>(schema.name);

        // A probe failure is treated as a fresh collection with nothing to
        // clean up.
        if schema.mode == IndexMode::DestructiveRebuild
            && self
                .conn
                .collection_exists(schema.name)
                .await
                .unwrap_or(false)
        {
            if let Err(e) = collection.drop_indexes().await {
                warn!(
                    collection = schema.name,
                    error = %e,
                    "failed to drop stale indexes; continuing"
                );
            }

            // Backfill group codes after the drop so the fresh unique index
            // does not fail on documents still missing the field.
            if let Err(e) = self.migrate_legacy_group_codes().await {
                warn!(
                    collection = schema.name,
                    error = %e,
                    "failed to backfill legacy group codes; continuing"
                );
            }
        }

        let declared = schema.indexes.len();
        collection
            .create_indexes(schema.indexes)
            .await
            .with_context(|| format!("failed to create {} indexes", schema.name))?;
        info!(collection = schema.name, declared, "indexes converged");
        Ok(())
    }

    /// Set the sentinel `group_code` on group documents missing the field.
    ///
    /// Idempotent: documents that already carry any code are untouched.
    /// Returns the number of documents migrated.
    pub async fn migrate_legacy_group_codes(&self) -> Result<u64> {
        let result = self
            .conn
            .db
            .collection::<Document>(GROUPS)
            .update_many(
                doc! { "group_code": { "$exists": false } },
                doc! { "$set": { "group_code": LEGACY_GROUP_CODE } },
            )
            .await
            .map_err(|e| anyhow!("Failed to backfill legacy group codes: {}", e))?;
        Ok(result.modified_count)
    }
}
