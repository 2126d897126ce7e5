//! # platforma-database
//!
//! Database facade and per-repository SQL schema migrations.
//!
//! A [`Database`] owns a PostgreSQL connection pool and a registry of
//! repositories. Repositories that expose a [`MigrationSource`] (a virtual
//! tree of `.sql` files) take part in [`Database::migrate`]: their files are
//! parsed into ordered [`Migration`] records, reconciled against the
//! `platforma_migrations` bookkeeping table, and applied in lexicographic
//! filename order. When an Up statement fails mid-batch, every migration
//! already applied in that batch is compensated by running its Down
//! statements in reverse order.
//!
//! ## Migration file format
//!
//! ```sql
//! -- +migrate ID: optional_custom_id
//! -- +migrate Up
//! CREATE TABLE IF NOT EXISTS users (id BIGINT PRIMARY KEY);
//!
//! -- +migrate Down
//! DROP TABLE IF EXISTS users;
//! ```
//!
//! The migration id defaults to the filename without its `.sql` suffix; the
//! `ID:` directive overrides it. The Up section is required, the Down
//! section is optional.

pub mod database;
pub mod error;
pub mod migration;
pub mod parser;
pub mod service;
pub mod source;
pub mod store;

pub use database::{Database, Domain, Repository};
pub use error::{DatabaseError, DbResult};
pub use migration::{Migration, MigrationLog};
pub use parser::parse_migrations;
pub use service::{MigrationService, MIGRATION_REPOSITORY};
pub use source::{DirSource, MigrationSource, SourceEntry, StaticSource};
pub use store::{MigrationStore, PgStore, StoreError};
