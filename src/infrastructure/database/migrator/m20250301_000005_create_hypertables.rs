//! Convert the time-series tables into TimescaleDB hypertables.
//!
//! Requires the timescaledb extension. `if_not_exists` keeps the migration
//! idempotent; `migrate_data` covers databases that already hold rows.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared("CREATE EXTENSION IF NOT EXISTS timescaledb")
            .await?;

        db.execute_unprepared(
            "SELECT create_hypertable('energy_data_points', 'timestamp', \
             chunk_time_interval => INTERVAL '1 day', \
             if_not_exists => TRUE, migrate_data => TRUE)",
        )
        .await?;

        db.execute_unprepared(
            "SELECT create_hypertable('energy_price_points', 'timestamp', \
             chunk_time_interval => INTERVAL '1 day', \
             if_not_exists => TRUE, migrate_data => TRUE)",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, _manager: &SchemaManager) -> Result<(), DbErr> {
        // Hypertables are dropped together with their tables.
        Ok(())
    }
}
