//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_energy_data_points;
mod m20250301_000002_create_energy_price_points;
mod m20250301_000003_create_backfill_progress;
mod m20250301_000004_create_collection_metrics;
mod m20250301_000005_create_hypertables;
mod m20250301_000006_create_scheduler_jobs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_energy_data_points::Migration),
            Box::new(m20250301_000002_create_energy_price_points::Migration),
            Box::new(m20250301_000003_create_backfill_progress::Migration),
            Box::new(m20250301_000004_create_collection_metrics::Migration),
            Box::new(m20250301_000005_create_hypertables::Migration),
            Box::new(m20250301_000006_create_scheduler_jobs::Migration),
        ]
    }
}
