#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Choreboard database bootstrap
//!
//! This crate is the startup-time schema and data bootstrap for the Choreboard
//! backend (a shared-household chore and pantry tracker). It runs once per
//! process start, before any other consumer of the database, and:
//!
//! 1. establishes a bounded-time connection to MongoDB and verifies liveness,
//! 2. backfills the `group_code` field on legacy group documents,
//! 3. reconciles every collection's declared index set against current state,
//! 4. seeds the fixed predefined pantry-category catalog exactly once.
//!
//! Every step is safe to re-run against a database populated by a prior
//! version of the schema: index creation is idempotent, the legacy migration
//! only touches documents missing the field, and seeding is guarded by a
//! count check.
//!
//! # Architecture
//!
//! - **[`config`]**: environment-supplied configuration (`MONGODB_URI`,
//!   `DB_NAME`, `JWT_SECRET`), validated at startup
//! - **[`database`]**: all bootstrap functionality
//!   - `core`: connection wrapper, schema definitions, index convergence
//!   - `seed`: predefined pantry-category catalog
//!   - `bootstrap`: step sequencing and the fatal/advisory failure policy
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use choreboard::{bootstrap, BootstrapConfig};
//!
//! let config = BootstrapConfig::from_env()?;
//! let context = bootstrap(&config).await?;
//!
//! // Hand the context to the rest of the application.
//! let users = context.db.collection::<User>("users");
//! ```
//!
//! Fatal failures (missing configuration, unreachable store, index-creation
//! errors) surface as `Err` and the process should exit; advisory failures
//! (legacy migration, seeding) are logged and bootstrap proceeds degraded.

pub mod config;
pub mod database;

pub use config::BootstrapConfig;

// Bootstrap orchestration
pub use database::{bootstrap, AppContext, StepFailure};

// Core database types
pub use database::{CollectionSchema, DatabaseConn, IndexMode, SchemaDefinitions, SchemaManager};

// Reference data seeding
pub use database::{
    PantryCategory, SeedOutcome, Seeder, PREDEFINED_CATEGORIES, PREDEFINED_CATEGORY_TYPE,
};
