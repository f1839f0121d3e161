//! Reference data seeding
//!
//! Inserts the fixed predefined pantry-category catalog exactly once over the
//! database's lifetime, guarded by a type-tagged count query.

use anyhow::{anyhow, Result};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, DateTime};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::info;

use super::core::{DatabaseConn, OP_TIMEOUT, PANTRY_CATEGORIES};

/// Type tag distinguishing seeded categories from user-created ones.
pub const PREDEFINED_CATEGORY_TYPE: &str = "predefined";

/// The fixed reference catalog of predefined pantry categories.
pub const PREDEFINED_CATEGORIES: &[&str] = &[
    "Dairy",
    "Fruits",
    "Vegetables",
    "Grains & Cereals",
    "Meat & Poultry",
    "Seafood",
    "Beverages",
    "Snacks",
    "Condiments & Sauces",
    "Spices & Seasonings",
    "Baking Supplies",
    "Frozen Foods",
    "Canned Goods",
    "Oils & Vinegars",
    "Nuts & Seeds",
    "Bread & Bakery",
    "Pasta & Rice",
    "Cleaning Supplies",
    "Personal Care",
    "Other",
];

/// A pantry category document.
///
/// Predefined categories are global and carry no `group_id`; the field is
/// omitted entirely so the partial uniqueness filter on
/// (`name`, `group_id`) never applies to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PantryCategory {
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<ObjectId>,
    pub is_active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl PantryCategory {
    /// Build a predefined (global, ungrouped) category.
    pub fn predefined(name: &str) -> Self {
        let now = DateTime::now();
        PantryCategory {
            name: name.to_string(),
            category_type: PREDEFINED_CATEGORY_TYPE.to_string(),
            group_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Outcome of the predefined-category seeding step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The full catalog was inserted.
    Seeded { inserted: usize },

    /// At least one predefined category already existed; nothing inserted.
    ///
    /// The guard is all-or-nothing: a partial prior seed (process killed
    /// mid-insert) also lands here and is not topped up.
    AlreadySeeded { existing: u64 },
}

/// Seeder for the predefined pantry-category catalog
pub struct Seeder<'a> {
    conn: &'a DatabaseConn,
}

impl<'a> Seeder<'a> {
    /// Create a new seeder for the given connection
    pub fn new(conn: &'a DatabaseConn) -> Self {
        Self { conn }
    }

    /// Insert the predefined catalog if no predefined category exists yet.
    pub async fn seed_predefined_categories(&self) -> Result<SeedOutcome> {
        let collection = self
            .conn
            .db
            .collection::<PantryCategory>(PANTRY_CATEGORIES);

        let existing = timeout(
            OP_TIMEOUT,
            self.conn.collection_count(
                PANTRY_CATEGORIES,
                doc! { "type": PREDEFINED_CATEGORY_TYPE },
            ),
        )
        .await
        .map_err(|_| anyhow!("Timed out checking for predefined categories"))??;

        if existing > 0 {
            info!(existing, "predefined categories already present; skipping seeding");
            return Ok(SeedOutcome::AlreadySeeded { existing });
        }

        let categories: Vec<PantryCategory> = PREDEFINED_CATEGORIES
            .iter()
            .map(|name| PantryCategory::predefined(name))
            .collect();

        let result = collection
            .insert_many(&categories)
            .await
            .map_err(|e| anyhow!("Failed to insert predefined categories: {}", e))?;

        let inserted = result.inserted_ids.len();
        info!(inserted, "seeded predefined categories");
        Ok(SeedOutcome::Seeded { inserted })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use mongodb::bson::to_document;

    use super::*;

    #[test]
    fn test_catalog_has_twenty_entries() {
        assert_eq!(PREDEFINED_CATEGORIES.len(), 20);
    }

    #[test]
    fn test_catalog_names_distinct() {
        let names: HashSet<_> = PREDEFINED_CATEGORIES.iter().collect();
        assert_eq!(names.len(), PREDEFINED_CATEGORIES.len());
    }

    #[test]
    fn test_predefined_category_shape() {
        let category = PantryCategory::predefined("Dairy");
        let document = to_document(&category).unwrap();

        assert_eq!(document.get_str("name").unwrap(), "Dairy");
        assert_eq!(
            document.get_str("type").unwrap(),
            PREDEFINED_CATEGORY_TYPE
        );
        assert!(document.get_bool("is_active").unwrap());
        assert!(document.contains_key("created_at"));
        assert!(document.contains_key("updated_at"));
    }

    #[test]
    fn test_predefined_category_is_ungrouped() {
        // The serialized document must omit `group_id` entirely, not carry a
        // null, so the partial uniqueness filter never matches it.
        let document = to_document(&PantryCategory::predefined("Other")).unwrap();
        assert!(!document.contains_key("group_id"));
    }

    #[tokio::test]
    #[ignore = "requires a running MongoDB instance"]
    async fn test_partial_prior_seed_is_not_topped_up() {
        let Ok(config) = crate::config::BootstrapConfig::from_env() else {
            return;
        };

        let conn = DatabaseConn::connect(&config.mongo_uri, &config.db_name)
            .await
            .unwrap();
        let collection = conn.db.collection::<PantryCategory>(PANTRY_CATEGORIES);

        // Leave exactly one predefined category, as if a prior seed was
        // interrupted mid-insert.
        collection
            .delete_many(doc! { "type": PREDEFINED_CATEGORY_TYPE })
            .await
            .unwrap();
        collection
            .insert_one(PantryCategory::predefined("Dairy"))
            .await
            .unwrap();

        // The guard is all-or-nothing: one existing category suppresses
        // re-seeding, and the missing nineteen are not filled in.
        let outcome = Seeder::new(&conn)
            .seed_predefined_categories()
            .await
            .unwrap();
        assert_eq!(outcome, SeedOutcome::AlreadySeeded { existing: 1 });

        let count = conn
            .collection_count(
                PANTRY_CATEGORIES,
                doc! { "type": PREDEFINED_CATEGORY_TYPE },
            )
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
