//! Persistence ports.
//!
//! The services talk to storage exclusively through these traits; the
//! SeaORM implementations live under `infrastructure::database::repositories`
//! and a DashMap-backed variant under `infrastructure::memory`.
//!
//! Time-window parameters (`since`, `cutoff`) are computed by callers from
//! the injected clock so implementations never read wall-clock time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::infrastructure::database::entities::backfill_progress::{self, BackfillStatus};
use crate::infrastructure::database::entities::collection_metrics;
use crate::infrastructure::database::entities::energy_data_point::{self, EnergyDataType};
use crate::infrastructure::database::entities::energy_price_point;
use crate::infrastructure::database::entities::scheduler_job;
use crate::shared::errors::DataAccessError;

pub type DataResult<T> = Result<T, DataAccessError>;

/// Composite primary key of both time-series tables.
#[derive(Debug, Clone, PartialEq)]
pub struct PointKey {
    pub timestamp: DateTime<Utc>,
    pub area_code: String,
    pub data_type: EnergyDataType,
    pub business_type: String,
}

/// Filters for time-range queries over the time-series tables.
#[derive(Debug, Clone, Default)]
pub struct PointFilter {
    pub area_codes: Option<Vec<String>>,
    pub data_types: Option<Vec<EnergyDataType>>,
    pub business_types: Option<Vec<String>>,
}

impl PointFilter {
    pub fn for_area_and_type(area_code: &str, data_type: EnergyDataType) -> Self {
        Self {
            area_codes: Some(vec![area_code.to_string()]),
            data_types: Some(vec![data_type]),
            business_types: None,
        }
    }
}

/// Store for load data points (C1, load table).
#[async_trait]
pub trait EnergyDataRepository: Send + Sync {
    /// Insert-or-replace a batch keyed by the composite key. The whole batch
    /// commits in one transaction; empty input returns immediately.
    async fn upsert_batch(&self, points: Vec<energy_data_point::Model>) -> DataResult<usize>;

    /// Points within `[start, end]`, ascending by timestamp.
    async fn get_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: &PointFilter,
    ) -> DataResult<Vec<energy_data_point::Model>>;

    /// Most recent point for an area/data-type slice, ignoring business type.
    /// Gap detection depends on this: the upstream may return varying
    /// business types for the same slice.
    async fn get_latest_for_area_and_type(
        &self,
        area_code: &str,
        data_type: EnergyDataType,
    ) -> DataResult<Option<energy_data_point::Model>>;

    /// Most recent point for a fully qualified slice including business type.
    async fn get_latest_for_area(
        &self,
        area_code: &str,
        data_type: EnergyDataType,
        business_type: &str,
    ) -> DataResult<Option<energy_data_point::Model>>;

    /// Points for an area, descending by timestamp.
    async fn get_by_area(
        &self,
        area_code: &str,
        data_type: Option<EnergyDataType>,
        limit: Option<u64>,
    ) -> DataResult<Vec<energy_data_point::Model>>;

    async fn get_by_id(&self, key: &PointKey) -> DataResult<Option<energy_data_point::Model>>;

    async fn delete(&self, key: &PointKey) -> DataResult<bool>;
}

/// Store for price points (C1, price table).
#[async_trait]
pub trait EnergyPriceRepository: Send + Sync {
    async fn upsert_batch(&self, points: Vec<energy_price_point::Model>) -> DataResult<usize>;

    async fn get_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: &PointFilter,
    ) -> DataResult<Vec<energy_price_point::Model>>;

    async fn get_latest_for_area_and_type(
        &self,
        area_code: &str,
        data_type: EnergyDataType,
    ) -> DataResult<Option<energy_price_point::Model>>;

    async fn get_latest_for_area(
        &self,
        area_code: &str,
        data_type: EnergyDataType,
        business_type: &str,
    ) -> DataResult<Option<energy_price_point::Model>>;

    async fn get_by_area(
        &self,
        area_code: &str,
        data_type: Option<EnergyDataType>,
        limit: Option<u64>,
    ) -> DataResult<Vec<energy_price_point::Model>>;

    async fn get_by_id(&self, key: &PointKey) -> DataResult<Option<energy_price_point::Model>>;

    async fn delete(&self, key: &PointKey) -> DataResult<bool>;
}

/// Field deltas applied by [`BackfillProgressRepository::update_progress_by_id`].
///
/// Only `Some` fields are written; `progress_percentage` is recomputed from
/// the chunk counters after the deltas land.
#[derive(Debug, Clone, Default)]
pub struct ProgressUpdate {
    pub status: Option<BackfillStatus>,
    pub completed_chunks: Option<i32>,
    pub failed_chunks: Option<i32>,
    pub total_data_points: Option<i64>,
    pub current_chunk_start: Option<Option<DateTime<Utc>>>,
    pub current_chunk_end: Option<Option<DateTime<Utc>>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub estimated_completion: Option<Option<DateTime<Utc>>>,
    pub last_error: Option<Option<String>>,
    pub progress_percentage: Option<Decimal>,
}

/// Durable state for backfill operations (C2).
#[async_trait]
pub trait BackfillProgressRepository: Send + Sync {
    /// Persist a new record and return it with its assigned id.
    async fn create(
        &self,
        progress: backfill_progress::Model,
    ) -> DataResult<backfill_progress::Model>;

    async fn get_by_id(&self, id: i32) -> DataResult<Option<backfill_progress::Model>>;

    /// Overwrite all mutable columns of an existing record. Callers always
    /// pass an instance freshly read in the current session.
    async fn update(&self, progress: &backfill_progress::Model) -> DataResult<()>;

    /// Pending ∪ in-progress, newest first.
    async fn get_active(&self) -> DataResult<Vec<backfill_progress::Model>>;

    /// Failed ∪ pending with `completed_chunks > 0`, newest first.
    async fn get_resumable(&self) -> DataResult<Vec<backfill_progress::Model>>;

    async fn get_by_area_endpoint(
        &self,
        area_code: &str,
        endpoint_name: &str,
    ) -> DataResult<Vec<backfill_progress::Model>>;

    async fn get_by_area_endpoint_period(
        &self,
        area_code: &str,
        endpoint_name: &str,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> DataResult<Option<backfill_progress::Model>>;

    /// Fetch the current record, apply the deltas, commit, return refreshed.
    /// The record never leaves the implementation's session mid-update.
    async fn update_progress_by_id(
        &self,
        id: i32,
        update: ProgressUpdate,
    ) -> DataResult<backfill_progress::Model>;

    async fn delete(&self, id: i32) -> DataResult<bool>;
}

/// Aggregates returned by [`CollectionMetricsRepository::get_performance_metrics`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceAggregates {
    pub avg_api_response_time: Option<f64>,
    pub min_api_response_time: Option<f64>,
    pub max_api_response_time: Option<f64>,
    pub avg_processing_time: Option<f64>,
    pub min_processing_time: Option<f64>,
    pub max_processing_time: Option<f64>,
}

/// Durable per-operation metrics (C3).
#[async_trait]
pub trait CollectionMetricsRepository: Send + Sync {
    async fn insert(&self, metric: collection_metrics::Model) -> DataResult<()>;

    async fn insert_many(&self, metrics: Vec<collection_metrics::Model>) -> DataResult<()>;

    async fn get_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        area_codes: Option<&[String]>,
        data_types: Option<&[EnergyDataType]>,
    ) -> DataResult<Vec<collection_metrics::Model>>;

    /// Metrics with `collection_start >= since`, newest first.
    async fn get_recent_metrics(
        &self,
        since: DateTime<Utc>,
    ) -> DataResult<Vec<collection_metrics::Model>>;

    async fn get_metrics_by_job_id(
        &self,
        job_id: &str,
    ) -> DataResult<Vec<collection_metrics::Model>>;

    async fn get_performance_metrics(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DataResult<PerformanceAggregates>;

    /// Delete metrics with `collection_start < cutoff`; returns the count.
    async fn cleanup_old_metrics(&self, cutoff: DateTime<Utc>) -> DataResult<u64>;
}

/// Persistent scheduler job registry (survives restarts).
#[async_trait]
pub trait SchedulerJobRepository: Send + Sync {
    /// Insert or refresh a job registration, idempotent by job id.
    async fn upsert(&self, job: scheduler_job::Model) -> DataResult<()>;

    async fn get_all(&self) -> DataResult<Vec<scheduler_job::Model>>;
}

/// Unified access to all repositories. Services hold one provider and pull
/// the stores they need.
pub trait RepositoryProvider: Send + Sync {
    fn energy_data(&self) -> &dyn EnergyDataRepository;
    fn energy_prices(&self) -> &dyn EnergyPriceRepository;
    fn backfill_progress(&self) -> &dyn BackfillProgressRepository;
    fn collection_metrics(&self) -> &dyn CollectionMetricsRepository;
    fn scheduler_jobs(&self) -> &dyn SchedulerJobRepository;
}
