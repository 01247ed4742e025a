//! Database entities module

pub mod backfill_progress;
pub mod collection_metrics;
pub mod energy_data_point;
pub mod energy_price_point;
pub mod scheduler_job;

pub use backfill_progress::Entity as BackfillProgress;
pub use collection_metrics::Entity as CollectionMetrics;
pub use energy_data_point::Entity as EnergyDataPoint;
pub use energy_price_point::Entity as EnergyPricePoint;
pub use scheduler_job::Entity as SchedulerJob;
