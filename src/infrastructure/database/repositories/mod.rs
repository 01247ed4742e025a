//! SeaORM repository implementations

mod backfill_progress_repository;
mod collection_metrics_repository;
mod energy_data_repository;
mod energy_price_repository;
mod scheduler_job_repository;

pub use backfill_progress_repository::SeaOrmBackfillProgressRepository;
pub use collection_metrics_repository::SeaOrmCollectionMetricsRepository;
pub use energy_data_repository::SeaOrmEnergyDataRepository;
pub use energy_price_repository::SeaOrmEnergyPriceRepository;
pub use scheduler_job_repository::SeaOrmSchedulerJobRepository;

use sea_orm::DatabaseConnection;

use crate::domain::repositories::{
    BackfillProgressRepository, CollectionMetricsRepository, EnergyDataRepository,
    EnergyPriceRepository, RepositoryProvider, SchedulerJobRepository,
};

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
pub struct SeaOrmRepositoryProvider {
    energy_data: SeaOrmEnergyDataRepository,
    energy_prices: SeaOrmEnergyPriceRepository,
    backfill_progress: SeaOrmBackfillProgressRepository,
    collection_metrics: SeaOrmCollectionMetricsRepository,
    scheduler_jobs: SeaOrmSchedulerJobRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            energy_data: SeaOrmEnergyDataRepository::new(db.clone()),
            energy_prices: SeaOrmEnergyPriceRepository::new(db.clone()),
            backfill_progress: SeaOrmBackfillProgressRepository::new(db.clone()),
            collection_metrics: SeaOrmCollectionMetricsRepository::new(db.clone()),
            scheduler_jobs: SeaOrmSchedulerJobRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn energy_data(&self) -> &dyn EnergyDataRepository {
        &self.energy_data
    }

    fn energy_prices(&self) -> &dyn EnergyPriceRepository {
        &self.energy_prices
    }

    fn backfill_progress(&self) -> &dyn BackfillProgressRepository {
        &self.backfill_progress
    }

    fn collection_metrics(&self) -> &dyn CollectionMetricsRepository {
        &self.collection_metrics
    }

    fn scheduler_jobs(&self) -> &dyn SchedulerJobRepository {
        &self.scheduler_jobs
    }
}
