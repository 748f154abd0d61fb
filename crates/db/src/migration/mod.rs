//! Database migrations.
//!
//! Migrations are managed using sea-orm-migration. The schema is built with
//! the portable schema builder so the same migrations run on PostgreSQL and
//! on the SQLite database used by the test suite; PostgreSQL-only guards live
//! in their own migration.

pub use sea_orm_migration::prelude::*;

mod m20250101_000001_sacco_core;
mod m20250101_000002_append_only_guards;

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_sacco_core::Migration),
            Box::new(m20250101_000002_append_only_guards::Migration),
        ]
    }
}
