//! In-memory repository provider for development and testing.
//!
//! Mirrors the SeaORM provider's observable behavior (composite-key upsert,
//! ordering, progress-percentage recomputation) over DashMaps so service
//! logic can be exercised without a database.

use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::domain::repositories::{
    BackfillProgressRepository, CollectionMetricsRepository, DataResult, EnergyDataRepository,
    EnergyPriceRepository, PerformanceAggregates, PointFilter, PointKey, ProgressUpdate,
    RepositoryProvider, SchedulerJobRepository,
};
use crate::infrastructure::database::entities::backfill_progress::{
    self, progress_percentage, BackfillStatus,
};
use crate::infrastructure::database::entities::collection_metrics;
use crate::infrastructure::database::entities::energy_data_point::{self, EnergyDataType};
use crate::infrastructure::database::entities::energy_price_point;
use crate::infrastructure::database::entities::scheduler_job;
use crate::shared::errors::DataAccessError;

type Key = (DateTime<Utc>, String, EnergyDataType, String);

fn key_of(timestamp: DateTime<Utc>, area: &str, data_type: EnergyDataType, business: &str) -> Key {
    (timestamp, area.to_string(), data_type, business.to_string())
}

// ── Energy data ─────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryEnergyDataRepository {
    points: DashMap<Key, energy_data_point::Model>,
}

#[async_trait]
impl EnergyDataRepository for InMemoryEnergyDataRepository {
    async fn upsert_batch(&self, points: Vec<energy_data_point::Model>) -> DataResult<usize> {
        let count = points.len();
        for point in points {
            let key = key_of(
                point.timestamp,
                &point.area_code,
                point.data_type,
                &point.business_type,
            );
            self.points.insert(key, point);
        }
        Ok(count)
    }

    async fn get_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: &PointFilter,
    ) -> DataResult<Vec<energy_data_point::Model>> {
        let mut matches: Vec<energy_data_point::Model> = self
            .points
            .iter()
            .map(|e| e.value().clone())
            .filter(|p| p.timestamp >= start && p.timestamp <= end)
            .filter(|p| {
                filter
                    .area_codes
                    .as_ref()
                    .map_or(true, |areas| areas.contains(&p.area_code))
            })
            .filter(|p| {
                filter
                    .data_types
                    .as_ref()
                    .map_or(true, |types| types.contains(&p.data_type))
            })
            .filter(|p| {
                filter
                    .business_types
                    .as_ref()
                    .map_or(true, |business| business.contains(&p.business_type))
            })
            .collect();
        matches.sort_by_key(|p| p.timestamp);
        Ok(matches)
    }

    async fn get_latest_for_area_and_type(
        &self,
        area_code: &str,
        data_type: EnergyDataType,
    ) -> DataResult<Option<energy_data_point::Model>> {
        Ok(self
            .points
            .iter()
            .map(|e| e.value().clone())
            .filter(|p| p.area_code == area_code && p.data_type == data_type)
            .max_by_key(|p| p.timestamp))
    }

    async fn get_latest_for_area(
        &self,
        area_code: &str,
        data_type: EnergyDataType,
        business_type: &str,
    ) -> DataResult<Option<energy_data_point::Model>> {
        Ok(self
            .points
            .iter()
            .map(|e| e.value().clone())
            .filter(|p| {
                p.area_code == area_code
                    && p.data_type == data_type
                    && p.business_type == business_type
            })
            .max_by_key(|p| p.timestamp))
    }

    async fn get_by_area(
        &self,
        area_code: &str,
        data_type: Option<EnergyDataType>,
        limit: Option<u64>,
    ) -> DataResult<Vec<energy_data_point::Model>> {
        let mut matches: Vec<energy_data_point::Model> = self
            .points
            .iter()
            .map(|e| e.value().clone())
            .filter(|p| p.area_code == area_code)
            .filter(|p| data_type.map_or(true, |dt| p.data_type == dt))
            .collect();
        matches.sort_by_key(|p| std::cmp::Reverse(p.timestamp));
        if let Some(limit) = limit {
            matches.truncate(limit as usize);
        }
        Ok(matches)
    }

    async fn get_by_id(&self, key: &PointKey) -> DataResult<Option<energy_data_point::Model>> {
        let key = key_of(key.timestamp, &key.area_code, key.data_type, &key.business_type);
        Ok(self.points.get(&key).map(|e| e.value().clone()))
    }

    async fn delete(&self, key: &PointKey) -> DataResult<bool> {
        let key = key_of(key.timestamp, &key.area_code, key.data_type, &key.business_type);
        Ok(self.points.remove(&key).is_some())
    }
}

// ── Energy prices ───────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryEnergyPriceRepository {
    points: DashMap<Key, energy_price_point::Model>,
}

#[async_trait]
impl EnergyPriceRepository for InMemoryEnergyPriceRepository {
    async fn upsert_batch(&self, points: Vec<energy_price_point::Model>) -> DataResult<usize> {
        let count = points.len();
        for point in points {
            let key = key_of(
                point.timestamp,
                &point.area_code,
                point.data_type,
                &point.business_type,
            );
            self.points.insert(key, point);
        }
        Ok(count)
    }

    async fn get_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: &PointFilter,
    ) -> DataResult<Vec<energy_price_point::Model>> {
        let mut matches: Vec<energy_price_point::Model> = self
            .points
            .iter()
            .map(|e| e.value().clone())
            .filter(|p| p.timestamp >= start && p.timestamp <= end)
            .filter(|p| {
                filter
                    .area_codes
                    .as_ref()
                    .map_or(true, |areas| areas.contains(&p.area_code))
            })
            .filter(|p| {
                filter
                    .data_types
                    .as_ref()
                    .map_or(true, |types| types.contains(&p.data_type))
            })
            .filter(|p| {
                filter
                    .business_types
                    .as_ref()
                    .map_or(true, |business| business.contains(&p.business_type))
            })
            .collect();
        matches.sort_by_key(|p| p.timestamp);
        Ok(matches)
    }

    async fn get_latest_for_area_and_type(
        &self,
        area_code: &str,
        data_type: EnergyDataType,
    ) -> DataResult<Option<energy_price_point::Model>> {
        Ok(self
            .points
            .iter()
            .map(|e| e.value().clone())
            .filter(|p| p.area_code == area_code && p.data_type == data_type)
            .max_by_key(|p| p.timestamp))
    }

    async fn get_latest_for_area(
        &self,
        area_code: &str,
        data_type: EnergyDataType,
        business_type: &str,
    ) -> DataResult<Option<energy_price_point::Model>> {
        Ok(self
            .points
            .iter()
            .map(|e| e.value().clone())
            .filter(|p| {
                p.area_code == area_code
                    && p.data_type == data_type
                    && p.business_type == business_type
            })
            .max_by_key(|p| p.timestamp))
    }

    async fn get_by_area(
        &self,
        area_code: &str,
        data_type: Option<EnergyDataType>,
        limit: Option<u64>,
    ) -> DataResult<Vec<energy_price_point::Model>> {
        let mut matches: Vec<energy_price_point::Model> = self
            .points
            .iter()
            .map(|e| e.value().clone())
            .filter(|p| p.area_code == area_code)
            .filter(|p| data_type.map_or(true, |dt| p.data_type == dt))
            .collect();
        matches.sort_by_key(|p| std::cmp::Reverse(p.timestamp));
        if let Some(limit) = limit {
            matches.truncate(limit as usize);
        }
        Ok(matches)
    }

    async fn get_by_id(&self, key: &PointKey) -> DataResult<Option<energy_price_point::Model>> {
        let key = key_of(key.timestamp, &key.area_code, key.data_type, &key.business_type);
        Ok(self.points.get(&key).map(|e| e.value().clone()))
    }

    async fn delete(&self, key: &PointKey) -> DataResult<bool> {
        let key = key_of(key.timestamp, &key.area_code, key.data_type, &key.business_type);
        Ok(self.points.remove(&key).is_some())
    }
}

// ── Backfill progress ───────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryBackfillProgressRepository {
    records: DashMap<i32, backfill_progress::Model>,
    counter: AtomicI32,
}

#[async_trait]
impl BackfillProgressRepository for InMemoryBackfillProgressRepository {
    async fn create(
        &self,
        mut progress: backfill_progress::Model,
    ) -> DataResult<backfill_progress::Model> {
        let id = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        progress.id = id;
        self.records.insert(id, progress.clone());
        Ok(progress)
    }

    async fn get_by_id(&self, id: i32) -> DataResult<Option<backfill_progress::Model>> {
        Ok(self.records.get(&id).map(|e| e.value().clone()))
    }

    async fn update(&self, progress: &backfill_progress::Model) -> DataResult<()> {
        if !self.records.contains_key(&progress.id) {
            return Err(DataAccessError::NotFound {
                model_type: "BackfillProgress",
                id: progress.id.to_string(),
            });
        }
        self.records.insert(progress.id, progress.clone());
        Ok(())
    }

    async fn get_active(&self) -> DataResult<Vec<backfill_progress::Model>> {
        let mut matches: Vec<backfill_progress::Model> = self
            .records
            .iter()
            .map(|e| e.value().clone())
            .filter(|p| {
                matches!(
                    p.status,
                    BackfillStatus::Pending | BackfillStatus::InProgress
                )
            })
            .collect();
        matches.sort_by_key(|p| std::cmp::Reverse(p.created_at));
        Ok(matches)
    }

    async fn get_resumable(&self) -> DataResult<Vec<backfill_progress::Model>> {
        let mut matches: Vec<backfill_progress::Model> = self
            .records
            .iter()
            .map(|e| e.value().clone())
            .filter(|p| p.can_be_resumed())
            .collect();
        matches.sort_by_key(|p| std::cmp::Reverse(p.created_at));
        Ok(matches)
    }

    async fn get_by_area_endpoint(
        &self,
        area_code: &str,
        endpoint_name: &str,
    ) -> DataResult<Vec<backfill_progress::Model>> {
        let mut matches: Vec<backfill_progress::Model> = self
            .records
            .iter()
            .map(|e| e.value().clone())
            .filter(|p| p.area_code == area_code && p.endpoint_name == endpoint_name)
            .collect();
        matches.sort_by_key(|p| std::cmp::Reverse(p.created_at));
        Ok(matches)
    }

    async fn get_by_area_endpoint_period(
        &self,
        area_code: &str,
        endpoint_name: &str,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> DataResult<Option<backfill_progress::Model>> {
        Ok(self
            .records
            .iter()
            .map(|e| e.value().clone())
            .find(|p| {
                p.area_code == area_code
                    && p.endpoint_name == endpoint_name
                    && p.period_start == period_start
                    && p.period_end == period_end
            }))
    }

    async fn update_progress_by_id(
        &self,
        id: i32,
        update: ProgressUpdate,
    ) -> DataResult<backfill_progress::Model> {
        let mut entry = self.records.get_mut(&id).ok_or(DataAccessError::NotFound {
            model_type: "BackfillProgress",
            id: id.to_string(),
        })?;
        let record = entry.value_mut();

        if let Some(status) = update.status {
            record.status = status;
        }
        if let Some(completed_chunks) = update.completed_chunks {
            record.completed_chunks = completed_chunks;
        }
        if let Some(failed_chunks) = update.failed_chunks {
            record.failed_chunks = failed_chunks;
        }
        if let Some(total_data_points) = update.total_data_points {
            record.total_data_points = total_data_points;
        }
        if let Some(current_chunk_start) = update.current_chunk_start {
            record.current_chunk_start = current_chunk_start;
        }
        if let Some(current_chunk_end) = update.current_chunk_end {
            record.current_chunk_end = current_chunk_end;
        }
        if let Some(started_at) = update.started_at {
            record.started_at = Some(started_at);
        }
        if let Some(completed_at) = update.completed_at {
            record.completed_at = Some(completed_at);
        }
        if let Some(estimated_completion) = update.estimated_completion {
            record.estimated_completion = estimated_completion;
        }
        if let Some(last_error) = update.last_error {
            record.last_error = last_error;
        }
        record.progress_percentage = update
            .progress_percentage
            .unwrap_or_else(|| progress_percentage(record.completed_chunks, record.total_chunks));
        record.updated_at = Utc::now();

        Ok(record.clone())
    }

    async fn delete(&self, id: i32) -> DataResult<bool> {
        Ok(self.records.remove(&id).is_some())
    }
}

// ── Collection metrics ──────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryCollectionMetricsRepository {
    records: DashMap<i32, collection_metrics::Model>,
    counter: AtomicI32,
}

impl InMemoryCollectionMetricsRepository {
    fn insert_one(&self, mut metric: collection_metrics::Model) {
        let id = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        metric.id = id;
        self.records.insert(id, metric);
    }

    fn all(&self) -> Vec<collection_metrics::Model> {
        self.records.iter().map(|e| e.value().clone()).collect()
    }
}

#[async_trait]
impl CollectionMetricsRepository for InMemoryCollectionMetricsRepository {
    async fn insert(&self, metric: collection_metrics::Model) -> DataResult<()> {
        self.insert_one(metric);
        Ok(())
    }

    async fn insert_many(&self, metrics: Vec<collection_metrics::Model>) -> DataResult<()> {
        for metric in metrics {
            self.insert_one(metric);
        }
        Ok(())
    }

    async fn get_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        area_codes: Option<&[String]>,
        data_types: Option<&[EnergyDataType]>,
    ) -> DataResult<Vec<collection_metrics::Model>> {
        let mut matches: Vec<collection_metrics::Model> = self
            .all()
            .into_iter()
            .filter(|m| m.collection_start >= start && m.collection_start <= end)
            .filter(|m| area_codes.map_or(true, |areas| areas.contains(&m.area_code)))
            .filter(|m| data_types.map_or(true, |types| types.contains(&m.data_type)))
            .collect();
        matches.sort_by_key(|m| m.collection_start);
        Ok(matches)
    }

    async fn get_recent_metrics(
        &self,
        since: DateTime<Utc>,
    ) -> DataResult<Vec<collection_metrics::Model>> {
        let mut matches: Vec<collection_metrics::Model> = self
            .all()
            .into_iter()
            .filter(|m| m.collection_start >= since)
            .collect();
        matches.sort_by_key(|m| std::cmp::Reverse(m.collection_start));
        Ok(matches)
    }

    async fn get_metrics_by_job_id(
        &self,
        job_id: &str,
    ) -> DataResult<Vec<collection_metrics::Model>> {
        let mut matches: Vec<collection_metrics::Model> = self
            .all()
            .into_iter()
            .filter(|m| m.job_id == job_id)
            .collect();
        matches.sort_by_key(|m| std::cmp::Reverse(m.collection_start));
        Ok(matches)
    }

    async fn get_performance_metrics(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DataResult<PerformanceAggregates> {
        let rows: Vec<collection_metrics::Model> = self
            .all()
            .into_iter()
            .filter(|m| m.collection_start >= start && m.collection_start <= end)
            .collect();

        fn fold<F>(rows: &[collection_metrics::Model], f: F) -> (Option<f64>, Option<f64>, Option<f64>)
        where
            F: Fn(&collection_metrics::Model) -> Option<f64>,
        {
            let values: Vec<f64> = rows.iter().filter_map(&f).collect();
            if values.is_empty() {
                return (None, None, None);
            }
            let sum: f64 = values.iter().sum();
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            (Some(sum / values.len() as f64), Some(min), Some(max))
        }

        let (avg_api, min_api, max_api) = fold(&rows, |m| m.api_response_time);
        let (avg_proc, min_proc, max_proc) = fold(&rows, |m| m.processing_time);

        Ok(PerformanceAggregates {
            avg_api_response_time: avg_api,
            min_api_response_time: min_api,
            max_api_response_time: max_api,
            avg_processing_time: avg_proc,
            min_processing_time: min_proc,
            max_processing_time: max_proc,
        })
    }

    async fn cleanup_old_metrics(&self, cutoff: DateTime<Utc>) -> DataResult<u64> {
        let stale: Vec<i32> = self
            .records
            .iter()
            .filter(|e| e.value().collection_start < cutoff)
            .map(|e| *e.key())
            .collect();
        let deleted = stale.len() as u64;
        for id in stale {
            self.records.remove(&id);
        }
        Ok(deleted)
    }
}

// ── Scheduler jobs ──────────────────────────────────────────────

#[derive(Default)]
pub struct InMemorySchedulerJobRepository {
    jobs: DashMap<String, scheduler_job::Model>,
}

#[async_trait]
impl SchedulerJobRepository for InMemorySchedulerJobRepository {
    async fn upsert(&self, job: scheduler_job::Model) -> DataResult<()> {
        self.jobs.insert(job.id.clone(), job);
        Ok(())
    }

    async fn get_all(&self) -> DataResult<Vec<scheduler_job::Model>> {
        let mut jobs: Vec<scheduler_job::Model> =
            self.jobs.iter().map(|e| e.value().clone()).collect();
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(jobs)
    }
}

// ── Provider ────────────────────────────────────────────────────

/// DashMap-backed provider wiring all in-memory repositories together.
#[derive(Default)]
pub struct InMemoryRepositoryProvider {
    energy_data: InMemoryEnergyDataRepository,
    energy_prices: InMemoryEnergyPriceRepository,
    backfill_progress: InMemoryBackfillProgressRepository,
    collection_metrics: InMemoryCollectionMetricsRepository,
    scheduler_jobs: InMemorySchedulerJobRepository,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
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
