//! Database module
//!
//! Startup-time bootstrap for the Choreboard MongoDB store, organized into:
//!
//! - **core**: connection wrapper, declarative schema, index convergence
//! - **seed**: one-time predefined pantry-category catalog
//! - **bootstrap**: step sequencing and the fatal/advisory failure policy
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/           # Foundation
//! │   ├── connection  # MongoDB DatabaseConn wrapper
//! │   └── schema      # Index declarations and convergence engine
//! │
//! ├── seed            # Predefined pantry-category catalog
//! └── bootstrap       # Orchestration, AppContext handoff
//! ```
//!
//! The bootstrap runs to completion before any other consumer starts, so none
//! of this module coordinates concurrent access; the [`AppContext`] it
//! produces is safe to share afterwards.

pub mod bootstrap;
pub mod core;
pub mod seed;

// Orchestration entry point and context handoff
pub use bootstrap::{bootstrap, AppContext, StepFailure};

// Connection and schema management
pub use core::{
    CollectionSchema, DatabaseConn, IndexMode, SchemaDefinitions, SchemaManager, CHORES,
    CHORE_COMPLETIONS, CONVERGE_TIMEOUT, GROUPS, LEGACY_GROUP_CODE, OP_TIMEOUT,
    PANTRY_CATEGORIES, RECURRING_CHORES, SHOPPING_CART, USERS,
};

// Reference data seeding
pub use seed::{
    PantryCategory, SeedOutcome, Seeder, PREDEFINED_CATEGORIES, PREDEFINED_CATEGORY_TYPE,
};
