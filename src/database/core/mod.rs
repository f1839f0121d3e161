//! Core database infrastructure
//!
//! This module provides the foundational bootstrap components:
//! - `DatabaseConn`: MongoDB connection wrapper with bounded timeouts
//! - `SchemaDefinitions`: declarative per-collection index sets
//! - `SchemaManager`: index convergence and legacy migration

mod connection;
mod schema;

pub use connection::{DatabaseConn, OP_TIMEOUT};
pub use schema::{
    CollectionSchema, IndexMode, SchemaDefinitions, SchemaManager, CHORES, CHORE_COMPLETIONS,
    CONVERGE_TIMEOUT, GROUPS, LEGACY_GROUP_CODE, PANTRY_CATEGORIES, RECURRING_CHORES,
    SHOPPING_CART, USERS,
};
