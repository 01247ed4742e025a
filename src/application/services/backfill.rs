//! Historical backfill engine.
//!
//! Pulls arbitrarily deep historical periods chunk by chunk, checkpointing
//! progress after every chunk so an interrupted operation resumes where it
//! stopped. A semaphore caps concurrent operations per process; acquiring
//! a slot and registering the operation happen under one gate, never as a
//! separate check-then-register.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::application::processing::{
    GlMarketDocumentProcessor, PublicationMarketDocumentProcessor,
};
use crate::application::services::collection::{create_time_chunks, EndpointName};
use crate::config::BackfillSettings;
use crate::domain::area::AreaCode;
use crate::domain::collector::EntsoeCollector;
use crate::domain::repositories::{PointFilter, ProgressUpdate, RepositoryProvider};
use crate::infrastructure::database::entities::backfill_progress::{self, BackfillStatus};
use crate::shared::clock::Clock;
use crate::shared::errors::{BackfillError, DataAccessError};

/// Coverage below this percentage flags an area/endpoint for backfill.
const MIN_COVERAGE_PERCENTAGE: f64 = 95.0;

/// Expected data spacing per endpoint for coverage analysis, in minutes.
/// The historical archive resolves forecasts hourly.
const ENDPOINT_INTERVALS: &[(EndpointName, i64)] = &[
    (EndpointName::ActualLoad, 15),
    (EndpointName::DayAheadForecast, 60),
    (EndpointName::WeekAheadForecast, 60),
    (EndpointName::MonthAheadForecast, 60),
    (EndpointName::YearAheadForecast, 60),
    (EndpointName::ForecastMargin, 60),
    (EndpointName::DayAheadPrices, 60),
];

/// Result of coverage analysis for one area/endpoint combination.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageAnalysis {
    pub area_code: String,
    pub endpoint_name: String,
    pub analysis_period_start: DateTime<Utc>,
    pub analysis_period_end: DateTime<Utc>,
    pub expected_data_points: i64,
    pub actual_data_points: i64,
    pub coverage_percentage: f64,
}

impl CoverageAnalysis {
    pub fn needs_backfill(&self) -> bool {
        self.coverage_percentage < MIN_COVERAGE_PERCENTAGE
    }

    pub fn total_missing_points(&self) -> i64 {
        (self.expected_data_points - self.actual_data_points).max(0)
    }
}

/// Summary of a finished (or failed) backfill run.
#[derive(Debug, Clone, Serialize)]
pub struct BackfillResult {
    pub backfill_id: i32,
    pub area_code: String,
    pub endpoint_name: String,
    pub success: bool,
    pub data_points_collected: i64,
    pub chunks_processed: i32,
    pub chunks_failed: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub error_messages: Vec<String>,
}

impl BackfillResult {
    pub fn duration_seconds(&self) -> f64 {
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0)
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.chunks_processed + self.chunks_failed;
        if total == 0 {
            return 0.0;
        }
        f64::from(self.chunks_processed) / f64::from(total) * 100.0
    }
}

/// Point-in-time status of a backfill operation.
#[derive(Debug, Clone, Serialize)]
pub struct BackfillStatusReport {
    pub backfill_id: i32,
    pub area_code: String,
    pub endpoint_name: String,
    pub status: String,
    pub progress_percentage: f64,
    pub total_chunks: i32,
    pub completed_chunks: i32,
    pub failed_chunks: i32,
    pub remaining_chunks: i32,
    pub total_data_points: i64,
    pub success_rate: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub estimated_completion: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub is_active: bool,
    pub can_be_resumed: bool,
    pub current_chunk_start: Option<DateTime<Utc>>,
    pub current_chunk_end: Option<DateTime<Utc>>,
}

impl BackfillStatusReport {
    fn from_model(progress: &backfill_progress::Model) -> Self {
        Self {
            backfill_id: progress.id,
            area_code: progress.area_code.clone(),
            endpoint_name: progress.endpoint_name.clone(),
            status: progress.status.to_string(),
            progress_percentage: progress.progress_percentage.to_f64().unwrap_or(0.0),
            total_chunks: progress.total_chunks,
            completed_chunks: progress.completed_chunks,
            failed_chunks: progress.failed_chunks,
            remaining_chunks: progress.remaining_chunks(),
            total_data_points: progress.total_data_points,
            success_rate: progress.success_rate().to_f64().unwrap_or(0.0),
            started_at: progress.started_at,
            completed_at: progress.completed_at,
            estimated_completion: progress.estimated_completion,
            last_error: progress.last_error.clone(),
            is_active: progress.is_active(),
            can_be_resumed: progress.can_be_resumed(),
            current_chunk_start: progress.current_chunk_start,
            current_chunk_end: progress.current_chunk_end,
        }
    }
}

/// Service for resumable historical data collection.
pub struct BackfillService {
    collector: Arc<dyn EntsoeCollector>,
    load_processor: GlMarketDocumentProcessor,
    price_processor: PublicationMarketDocumentProcessor,
    repos: Arc<dyn RepositoryProvider>,
    clock: Arc<dyn Clock>,
    config: BackfillSettings,
    /// Capacity gate; holding a permit admits one operation.
    slots: Arc<Semaphore>,
    /// Operation key → permit, for introspection and release on completion.
    active_operations: Mutex<HashMap<String, OwnedSemaphorePermit>>,
}

impl BackfillService {
    pub fn new(
        collector: Arc<dyn EntsoeCollector>,
        repos: Arc<dyn RepositoryProvider>,
        clock: Arc<dyn Clock>,
        config: BackfillSettings,
    ) -> Self {
        let slots = Arc::new(Semaphore::new(config.max_concurrent_areas));
        Self {
            collector,
            load_processor: GlMarketDocumentProcessor::new(),
            price_processor: PublicationMarketDocumentProcessor::new(),
            repos,
            clock,
            config,
            slots,
            active_operations: Mutex::new(HashMap::new()),
        }
    }

    // ── Coverage analysis ───────────────────────────────────────

    /// Analyze historical coverage for the given areas and endpoints.
    pub async fn analyze_coverage(
        &self,
        areas: Option<Vec<String>>,
        endpoints: Option<Vec<String>>,
        years_back: Option<u32>,
    ) -> Result<Vec<CoverageAnalysis>, BackfillError> {
        let areas = areas.unwrap_or_else(|| {
            vec!["DE".to_string(), "FR".to_string(), "NL".to_string()]
        });
        let endpoints = endpoints.unwrap_or_else(|| {
            EndpointName::ALL
                .iter()
                .map(|e| e.as_str().to_string())
                .collect()
        });
        let years_back = years_back.unwrap_or(self.config.historical_years);

        let end_time = self.clock.now_utc();
        let start_time = end_time - Duration::days(i64::from(years_back) * 365);

        info!(
            areas = areas.len(),
            endpoints = endpoints.len(),
            years_back,
            "Starting coverage analysis"
        );

        let mut results = Vec::new();
        for area in &areas {
            for endpoint_name in &endpoints {
                let analysis = self
                    .analyze_area_endpoint_coverage(area, endpoint_name, start_time, end_time)
                    .await?;
                debug!(
                    area = %analysis.area_code,
                    endpoint = %analysis.endpoint_name,
                    coverage = analysis.coverage_percentage,
                    "Coverage analysis complete"
                );
                results.push(analysis);
            }
        }

        info!(combinations = results.len(), "Coverage analysis complete");
        Ok(results)
    }

    async fn analyze_area_endpoint_coverage(
        &self,
        area_code: &str,
        endpoint_name: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<CoverageAnalysis, BackfillError> {
        let endpoint =
            EndpointName::from_name(endpoint_name).ok_or_else(|| BackfillError::Coverage {
                area_code: area_code.to_string(),
                endpoint_name: endpoint_name.to_string(),
                reason: "unknown endpoint name".to_string(),
            })?;

        let interval_minutes = endpoint_interval_minutes(endpoint);
        let total_minutes = (end_time - start_time).num_minutes();
        let expected = total_minutes / interval_minutes;

        let data_type = endpoint.config().data_type;
        let filter = PointFilter::for_area_and_type(area_code, data_type);
        let actual = match endpoint {
            EndpointName::DayAheadPrices => self
                .repos
                .energy_prices()
                .get_by_time_range(start_time, end_time, &filter)
                .await?
                .len() as i64,
            _ => self
                .repos
                .energy_data()
                .get_by_time_range(start_time, end_time, &filter)
                .await?
                .len() as i64,
        };

        let coverage_percentage = if expected > 0 {
            actual as f64 / expected as f64 * 100.0
        } else {
            0.0
        };

        Ok(CoverageAnalysis {
            area_code: area_code.to_string(),
            endpoint_name: endpoint_name.to_string(),
            analysis_period_start: start_time,
            analysis_period_end: end_time,
            expected_data_points: expected,
            actual_data_points: actual,
            coverage_percentage,
        })
    }

    // ── Backfill lifecycle ──────────────────────────────────────

    /// Start a new backfill operation.
    ///
    /// Fails with a resource error when `max_concurrent_areas` operations
    /// are already in flight; no progress record is created in that case.
    pub async fn start_backfill(
        &self,
        area_code: &str,
        endpoint_name: &str,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        chunk_size_days: Option<i64>,
    ) -> Result<BackfillResult, BackfillError> {
        let endpoint =
            EndpointName::from_name(endpoint_name).ok_or_else(|| BackfillError::UnknownEndpoint {
                endpoint_name: endpoint_name.to_string(),
            })?;
        let area =
            AreaCode::from_country_code(area_code).ok_or_else(|| BackfillError::UnknownArea {
                area_code: area_code.to_string(),
            })?;
        if period_start >= period_end {
            return Err(BackfillError::Chunking {
                period_start,
                period_end,
                chunk_size_days: chunk_size_days.unwrap_or(0),
            });
        }

        let permit = self.acquire_slot()?;

        let chunk_size_days =
            chunk_size_days.unwrap_or_else(|| i64::from(self.config.chunk_months) * 30);
        let total_days = (period_end - period_start).num_days();
        let total_chunks = ((total_days + chunk_size_days - 1) / chunk_size_days).max(1) as i32;

        info!(
            area = area_code,
            endpoint = endpoint_name,
            %period_start,
            %period_end,
            chunk_size_days,
            total_chunks,
            "Starting backfill"
        );

        let progress = self
            .repos
            .backfill_progress()
            .create(backfill_progress::Model {
                id: 0,
                area_code: area_code.to_string(),
                endpoint_name: endpoint_name.to_string(),
                period_start,
                period_end,
                status: BackfillStatus::Pending,
                progress_percentage: Decimal::ZERO,
                current_chunk_start: None,
                current_chunk_end: None,
                total_chunks,
                completed_chunks: 0,
                failed_chunks: 0,
                total_data_points: 0,
                last_error: None,
                started_at: None,
                completed_at: None,
                estimated_completion: None,
                chunk_size_days: chunk_size_days as i32,
                rate_limit_delay: decimal_seconds(self.config.rate_limit_delay),
                created_at: self.clock.now_utc(),
                updated_at: self.clock.now_utc(),
            })
            .await?;

        let key = operation_key(area_code, endpoint_name, progress.id);
        self.register(key.clone(), permit).await;

        let outcome = self.run_backfill(&progress, area, endpoint, false).await;

        self.unregister(&key).await;
        outcome
    }

    /// Resume an interrupted backfill from its last completed chunk.
    pub async fn resume_backfill(&self, backfill_id: i32) -> Result<BackfillResult, BackfillError> {
        let progress = self.load_progress(backfill_id).await?;

        if !progress.can_be_resumed() {
            return Err(BackfillError::Progress {
                backfill_id: Some(backfill_id),
                reason: format!("cannot be resumed (status: {})", progress.status),
            });
        }

        let endpoint = EndpointName::from_name(&progress.endpoint_name).ok_or_else(|| {
            BackfillError::UnknownEndpoint {
                endpoint_name: progress.endpoint_name.clone(),
            }
        })?;
        let area = AreaCode::from_country_code(&progress.area_code).ok_or_else(|| {
            BackfillError::UnknownArea {
                area_code: progress.area_code.clone(),
            }
        })?;

        let permit = self.acquire_slot()?;

        info!(
            backfill_id,
            area = %progress.area_code,
            endpoint = %progress.endpoint_name,
            completed = progress.completed_chunks,
            total = progress.total_chunks,
            "Resuming backfill"
        );

        let key = operation_key(&progress.area_code, &progress.endpoint_name, progress.id);
        self.register(key.clone(), permit).await;

        let outcome = self.run_backfill(&progress, area, endpoint, true).await;

        self.unregister(&key).await;
        outcome
    }

    /// Current status of a backfill operation.
    pub async fn get_backfill_status(
        &self,
        backfill_id: i32,
    ) -> Result<BackfillStatusReport, BackfillError> {
        let progress = self.load_progress(backfill_id).await?;
        Ok(BackfillStatusReport::from_model(&progress))
    }

    /// Summaries of all pending / in-progress operations, newest first.
    pub async fn list_active_backfills(&self) -> Result<Vec<BackfillStatusReport>, BackfillError> {
        let active = self.repos.backfill_progress().get_active().await?;
        Ok(active.iter().map(BackfillStatusReport::from_model).collect())
    }

    /// Request cancellation of an active operation. The running task
    /// observes the status flip at its next chunk boundary.
    pub async fn cancel_backfill(
        &self,
        backfill_id: i32,
    ) -> Result<BackfillStatusReport, BackfillError> {
        let progress = self.load_progress(backfill_id).await?;
        if !progress.is_active() {
            return Err(BackfillError::Progress {
                backfill_id: Some(backfill_id),
                reason: format!("cannot be cancelled (status: {})", progress.status),
            });
        }

        let updated = self
            .repos
            .backfill_progress()
            .update_progress_by_id(
                backfill_id,
                ProgressUpdate {
                    status: Some(BackfillStatus::Cancelled),
                    completed_at: Some(self.clock.now_utc()),
                    ..Default::default()
                },
            )
            .await?;

        info!(backfill_id, "Backfill cancelled");
        Ok(BackfillStatusReport::from_model(&updated))
    }

    // ── Internals ───────────────────────────────────────────────

    fn acquire_slot(&self) -> Result<OwnedSemaphorePermit, BackfillError> {
        self.slots.clone().try_acquire_owned().map_err(|_| {
            let limit = self.config.max_concurrent_areas;
            BackfillError::Resource {
                resource_type: "concurrent_operations",
                limit,
                current: limit - self.slots.available_permits(),
            }
        })
    }

    async fn register(&self, key: String, permit: OwnedSemaphorePermit) {
        self.active_operations.lock().await.insert(key, permit);
    }

    async fn unregister(&self, key: &str) {
        // Dropping the permit frees the slot.
        self.active_operations.lock().await.remove(key);
    }

    #[cfg(test)]
    pub(crate) async fn occupy_slot_for_test(&self, key: &str) -> Result<(), BackfillError> {
        let permit = self.acquire_slot()?;
        self.register(key.to_string(), permit).await;
        Ok(())
    }

    async fn load_progress(
        &self,
        backfill_id: i32,
    ) -> Result<backfill_progress::Model, BackfillError> {
        self.repos
            .backfill_progress()
            .get_by_id(backfill_id)
            .await?
            .ok_or(BackfillError::DataAccess(DataAccessError::NotFound {
                model_type: "BackfillProgress",
                id: backfill_id.to_string(),
            }))
    }

    /// Transition to in-progress, execute, and settle the terminal status.
    async fn run_backfill(
        &self,
        progress: &backfill_progress::Model,
        area: AreaCode,
        endpoint: EndpointName,
        resume: bool,
    ) -> Result<BackfillResult, BackfillError> {
        let progress = self
            .repos
            .backfill_progress()
            .update_progress_by_id(
                progress.id,
                ProgressUpdate {
                    status: Some(BackfillStatus::InProgress),
                    started_at: Some(self.clock.now_utc()),
                    last_error: Some(None),
                    ..Default::default()
                },
            )
            .await?;

        match self.execute_backfill(&progress, area, endpoint, resume).await {
            Ok(result) => {
                let terminal = if result.success {
                    ProgressUpdate {
                        status: Some(BackfillStatus::Completed),
                        completed_at: Some(self.clock.now_utc()),
                        estimated_completion: Some(None),
                        ..Default::default()
                    }
                } else {
                    ProgressUpdate {
                        status: Some(BackfillStatus::Failed),
                        last_error: Some(Some(result.error_messages.join("; "))),
                        ..Default::default()
                    }
                };
                // A cancelled operation keeps its status.
                let current = self.load_progress(progress.id).await?;
                if current.status == BackfillStatus::InProgress {
                    self.repos
                        .backfill_progress()
                        .update_progress_by_id(progress.id, terminal)
                        .await?;
                }
                Ok(result)
            }
            Err(e) => {
                warn!(
                    backfill_id = progress.id,
                    error = %e,
                    "Backfill execution failed, marking operation failed"
                );
                let settle = self
                    .repos
                    .backfill_progress()
                    .update_progress_by_id(
                        progress.id,
                        ProgressUpdate {
                            status: Some(BackfillStatus::Failed),
                            last_error: Some(Some(e.to_string())),
                            ..Default::default()
                        },
                    )
                    .await;
                if let Err(settle_err) = settle {
                    warn!(
                        backfill_id = progress.id,
                        error = %settle_err,
                        "Failed to record backfill failure"
                    );
                }
                Err(e)
            }
        }
    }

    async fn execute_backfill(
        &self,
        progress: &backfill_progress::Model,
        area: AreaCode,
        endpoint: EndpointName,
        resume: bool,
    ) -> Result<BackfillResult, BackfillError> {
        let start_time = self.clock.now_utc();
        let chunks = create_time_chunks(
            progress.period_start,
            progress.period_end,
            i64::from(progress.chunk_size_days),
        );
        let total = chunks.len();

        let skip = if resume {
            progress.completed_chunks.max(0) as usize
        } else {
            0
        };
        let mut completed_chunks = if resume { progress.completed_chunks } else { 0 };
        let mut total_data_points = if resume { progress.total_data_points } else { 0 };
        let mut failed_total = progress.failed_chunks;
        let mut chunks_failed_this_run = 0i32;
        let mut error_messages: Vec<String> = Vec::new();

        let rate_limit = std::time::Duration::from_secs_f64(
            progress.rate_limit_delay.to_f64().unwrap_or(1.0).max(0.0),
        );

        info!(
            backfill_id = progress.id,
            chunks = total - skip,
            resume,
            "Executing backfill"
        );

        let mut chunk_seconds: Vec<f64> = Vec::new();

        for (i, (chunk_start, chunk_end)) in chunks.iter().enumerate().skip(skip) {
            // Cancellation is observed at chunk boundaries.
            let current = self.load_progress(progress.id).await?;
            if current.status == BackfillStatus::Cancelled {
                info!(backfill_id = progress.id, "Backfill cancelled, stopping");
                break;
            }

            self.repos
                .backfill_progress()
                .update_progress_by_id(
                    progress.id,
                    ProgressUpdate {
                        current_chunk_start: Some(Some(*chunk_start)),
                        current_chunk_end: Some(Some(*chunk_end)),
                        ..Default::default()
                    },
                )
                .await?;

            let chunk_started = Instant::now();
            match self.collect_chunk(area, endpoint, *chunk_start, *chunk_end).await {
                Ok(count) => {
                    completed_chunks += 1;
                    total_data_points += count as i64;
                    chunk_seconds.push(chunk_started.elapsed().as_secs_f64());
                    debug!(
                        backfill_id = progress.id,
                        chunk = i + 1,
                        total,
                        points = count,
                        "Chunk completed"
                    );
                }
                Err(e) => {
                    failed_total += 1;
                    chunks_failed_this_run += 1;
                    let message =
                        format!("Chunk {}/{} failed ({chunk_start} to {chunk_end}): {e}", i + 1, total);
                    warn!(backfill_id = progress.id, "{message}");
                    error_messages.push(message);
                }
            }

            let estimated_completion =
                estimate_completion(self.clock.now_utc(), &chunk_seconds, total - (i + 1));
            self.repos
                .backfill_progress()
                .update_progress_by_id(
                    progress.id,
                    ProgressUpdate {
                        completed_chunks: Some(completed_chunks),
                        failed_chunks: Some(failed_total),
                        total_data_points: Some(total_data_points),
                        estimated_completion: Some(estimated_completion),
                        ..Default::default()
                    },
                )
                .await?;

            if i + 1 < total {
                tokio::time::sleep(rate_limit).await;
            }
        }

        Ok(BackfillResult {
            backfill_id: progress.id,
            area_code: progress.area_code.clone(),
            endpoint_name: progress.endpoint_name.clone(),
            success: chunks_failed_this_run == 0,
            data_points_collected: total_data_points,
            chunks_processed: completed_chunks,
            chunks_failed: chunks_failed_this_run,
            start_time,
            end_time: Some(self.clock.now_utc()),
            error_messages,
        })
    }

    async fn collect_chunk(
        &self,
        area: AreaCode,
        endpoint: EndpointName,
        chunk_start: DateTime<Utc>,
        chunk_end: DateTime<Utc>,
    ) -> Result<usize, BackfillError> {
        if endpoint == EndpointName::DayAheadPrices {
            let Some(document) = self
                .collector
                .get_day_ahead_prices(area, chunk_start, chunk_end)
                .await?
            else {
                return Ok(0);
            };
            let points = self.price_processor.process(std::slice::from_ref(&document))?;
            return Ok(self.repos.energy_prices().upsert_batch(points).await?);
        }

        let document = match endpoint {
            EndpointName::ActualLoad => {
                self.collector
                    .get_actual_total_load(area, chunk_start, chunk_end)
                    .await?
            }
            EndpointName::DayAheadForecast => {
                self.collector
                    .get_day_ahead_load_forecast(area, chunk_start, chunk_end)
                    .await?
            }
            EndpointName::WeekAheadForecast => {
                self.collector
                    .get_week_ahead_load_forecast(area, chunk_start, chunk_end)
                    .await?
            }
            EndpointName::MonthAheadForecast => {
                self.collector
                    .get_month_ahead_load_forecast(area, chunk_start, chunk_end)
                    .await?
            }
            EndpointName::YearAheadForecast => {
                self.collector
                    .get_year_ahead_load_forecast(area, chunk_start, chunk_end)
                    .await?
            }
            EndpointName::ForecastMargin => {
                self.collector
                    .get_year_ahead_forecast_margin(area, chunk_start, chunk_end)
                    .await?
            }
            EndpointName::DayAheadPrices => unreachable!("handled above"),
        };

        let Some(document) = document else {
            return Ok(0);
        };
        let points = self.load_processor.process(std::slice::from_ref(&document))?;
        Ok(self.repos.energy_data().upsert_batch(points).await?)
    }
}

fn operation_key(area_code: &str, endpoint_name: &str, id: i32) -> String {
    format!("{area_code}_{endpoint_name}_{id}")
}

fn endpoint_interval_minutes(endpoint: EndpointName) -> i64 {
    ENDPOINT_INTERVALS
        .iter()
        .find(|(e, _)| *e == endpoint)
        .map(|(_, minutes)| *minutes)
        .unwrap_or(60)
}

fn decimal_seconds(seconds: f64) -> Decimal {
    Decimal::try_from(seconds)
        .map(|d| d.round_dp(2))
        .unwrap_or(Decimal::ONE)
}

/// Mean measured chunk duration times remaining chunks, from `now`.
fn estimate_completion(
    now: DateTime<Utc>,
    chunk_seconds: &[f64],
    remaining_chunks: usize,
) -> Option<DateTime<Utc>> {
    if chunk_seconds.is_empty() || remaining_chunks == 0 {
        return None;
    }
    let mean = chunk_seconds.iter().sum::<f64>() / chunk_seconds.len() as f64;
    let remaining_ms = (mean * remaining_chunks as f64 * 1000.0) as i64;
    Some(now + Duration::milliseconds(remaining_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::application::services::test_support::{sample_load_document, MockCollector, MockResponse};
    use crate::infrastructure::memory::InMemoryRepositoryProvider;
    use crate::shared::clock::ManualClock;

    fn at(y: i32, mo: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, 0, 0, 0).unwrap()
    }

    fn settings(max_concurrent: usize) -> BackfillSettings {
        BackfillSettings {
            historical_years: 2,
            chunk_months: 1,
            rate_limit_delay: 0.5,
            max_concurrent_areas: max_concurrent,
        }
    }

    fn service_with(
        collector: Arc<MockCollector>,
        repos: Arc<InMemoryRepositoryProvider>,
        clock: Arc<ManualClock>,
        config: BackfillSettings,
    ) -> BackfillService {
        BackfillService::new(collector, repos, clock, config)
    }

    #[tokio::test(start_paused = true)]
    async fn chunked_backfill_runs_to_completion() {
        // December 2023 in 7-day chunks: 5 chunks, the last one partial.
        let collector = Arc::new(MockCollector::new(sample_load_document(4)));
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let clock = Arc::new(ManualClock::new(at(2024, 2, 1)));
        let service = service_with(collector.clone(), repos.clone(), clock, settings(3));

        let result = service
            .start_backfill("DE", "actual_load", at(2023, 12, 1), at(2023, 12, 31), Some(7))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.chunks_processed, 5);
        assert_eq!(result.chunks_failed, 0);
        assert_eq!(result.data_points_collected, 5 * 4);
        assert_eq!(collector.calls().len(), 5);
        assert_eq!(collector.calls()[4].period_end, at(2023, 12, 31));

        let progress = repos
            .backfill_progress()
            .get_by_id(result.backfill_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(progress.status, BackfillStatus::Completed);
        assert_eq!(progress.progress_percentage, Decimal::new(10000, 2));
        assert_eq!(progress.completed_chunks, 5);
        assert_eq!(progress.failed_chunks, 0);
        assert!(progress.started_at.is_some());
        assert!(progress.completed_at.is_some());

        // Data landed in the store.
        let stored = repos
            .energy_data()
            .get_by_area("DE", None, None)
            .await
            .unwrap();
        assert!(!stored.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_chunks_do_not_abort_the_operation() {
        let collector = Arc::new(MockCollector::new(sample_load_document(2)));
        collector.script(vec![
            MockResponse::Document,
            MockResponse::HttpError(500),
            MockResponse::Document,
            MockResponse::Document,
            MockResponse::Document,
        ]);
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let clock = Arc::new(ManualClock::new(at(2024, 2, 1)));
        let service = service_with(collector.clone(), repos.clone(), clock, settings(3));

        let result = service
            .start_backfill("DE", "actual_load", at(2023, 12, 1), at(2023, 12, 31), Some(7))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.chunks_processed, 4);
        assert_eq!(result.chunks_failed, 1);
        assert_eq!(collector.calls().len(), 5);
        assert_eq!(result.error_messages.len(), 1);
        assert!(result.error_messages[0].contains("Chunk 2/5"));

        let progress = repos
            .backfill_progress()
            .get_by_id(result.backfill_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(progress.status, BackfillStatus::Failed);
        assert_eq!(progress.failed_chunks, 1);
        assert!(progress.last_error.is_some());
        assert!(progress.can_be_resumed());
    }

    #[tokio::test(start_paused = true)]
    async fn resume_skips_completed_chunks() {
        // 2-year period in 30-day chunks: 24 chunks, 12 already done.
        let collector = Arc::new(MockCollector::new(sample_load_document(3)));
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let clock = Arc::new(ManualClock::new(at(2024, 2, 1)));
        let service = service_with(collector.clone(), repos.clone(), clock.clone(), settings(3));

        let period_start = at(2022, 1, 1);
        let period_end = period_start + Duration::days(720);
        let seeded = repos
            .backfill_progress()
            .create(backfill_progress::Model {
                id: 0,
                area_code: "DE".to_string(),
                endpoint_name: "actual_load".to_string(),
                period_start,
                period_end,
                status: BackfillStatus::Failed,
                progress_percentage: Decimal::new(5000, 2),
                current_chunk_start: None,
                current_chunk_end: None,
                total_chunks: 24,
                completed_chunks: 12,
                failed_chunks: 0,
                total_data_points: 1200,
                last_error: Some("network burp".to_string()),
                started_at: Some(at(2024, 1, 31)),
                completed_at: None,
                estimated_completion: None,
                chunk_size_days: 30,
                rate_limit_delay: Decimal::new(50, 2),
                created_at: clock.now_utc(),
                updated_at: clock.now_utc(),
            })
            .await
            .unwrap();

        let result = service.resume_backfill(seeded.id).await.unwrap();

        assert!(result.success);
        // Exactly the remaining 12 chunks were fetched.
        assert_eq!(collector.calls().len(), 12);
        assert_eq!(collector.calls()[0].period_start, period_start + Duration::days(12 * 30));
        assert_eq!(result.chunks_processed, 24);
        assert_eq!(result.data_points_collected, 1200 + 12 * 3);

        let progress = repos
            .backfill_progress()
            .get_by_id(seeded.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(progress.status, BackfillStatus::Completed);
        assert_eq!(progress.progress_percentage, Decimal::new(10000, 2));
        assert_eq!(progress.completed_chunks, 24);
    }

    #[tokio::test]
    async fn resume_requires_prior_progress() {
        let collector = Arc::new(MockCollector::new(sample_load_document(1)));
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let clock = Arc::new(ManualClock::new(at(2024, 2, 1)));
        let service = service_with(collector, repos.clone(), clock.clone(), settings(3));

        let seeded = repos
            .backfill_progress()
            .create(backfill_progress::Model {
                id: 0,
                area_code: "DE".to_string(),
                endpoint_name: "actual_load".to_string(),
                period_start: at(2023, 1, 1),
                period_end: at(2023, 2, 1),
                status: BackfillStatus::Failed,
                progress_percentage: Decimal::ZERO,
                current_chunk_start: None,
                current_chunk_end: None,
                total_chunks: 2,
                completed_chunks: 0,
                failed_chunks: 2,
                total_data_points: 0,
                last_error: None,
                started_at: None,
                completed_at: None,
                estimated_completion: None,
                chunk_size_days: 15,
                rate_limit_delay: Decimal::new(50, 2),
                created_at: clock.now_utc(),
                updated_at: clock.now_utc(),
            })
            .await
            .unwrap();

        let err = service.resume_backfill(seeded.id).await.unwrap_err();
        match err {
            BackfillError::Progress { backfill_id, reason } => {
                assert_eq!(backfill_id, Some(seeded.id));
                assert!(reason.contains("cannot be resumed"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn concurrency_cap_rejects_and_creates_no_record() {
        let collector = Arc::new(MockCollector::new(sample_load_document(1)));
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let clock = Arc::new(ManualClock::new(at(2024, 2, 1)));
        let service = service_with(collector, repos.clone(), clock, settings(2));

        service.occupy_slot_for_test("DE_actual_load_900").await.unwrap();
        service.occupy_slot_for_test("FR_actual_load_901").await.unwrap();

        let err = service
            .start_backfill("NL", "actual_load", at(2023, 1, 1), at(2023, 2, 1), Some(7))
            .await
            .unwrap_err();

        match err {
            BackfillError::Resource {
                resource_type,
                limit,
                current,
            } => {
                assert_eq!(resource_type, "concurrent_operations");
                assert_eq!(limit, 2);
                assert_eq!(current, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // No progress record was created for the rejected request.
        assert!(repos.backfill_progress().get_active().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slot_is_released_after_completion() {
        let collector = Arc::new(MockCollector::new(sample_load_document(1)));
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let clock = Arc::new(ManualClock::new(at(2024, 2, 1)));
        let service = service_with(collector, repos, clock, settings(1));

        service
            .start_backfill("DE", "actual_load", at(2023, 12, 1), at(2023, 12, 15), Some(7))
            .await
            .unwrap();

        // The single slot is free again.
        service
            .start_backfill("FR", "actual_load", at(2023, 12, 1), at(2023, 12, 15), Some(7))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn coverage_analysis_flags_sparse_slices() {
        let collector = Arc::new(MockCollector::new(sample_load_document(1)));
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let clock = Arc::new(ManualClock::new(at(2024, 2, 1)));
        let service = service_with(collector, repos.clone(), clock, settings(3));

        let results = service
            .analyze_coverage(
                Some(vec!["DE".to_string()]),
                Some(vec!["actual_load".to_string()]),
                Some(1),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        let analysis = &results[0];
        // One year of 15-minute data.
        assert_eq!(analysis.expected_data_points, 365 * 24 * 4);
        assert_eq!(analysis.actual_data_points, 0);
        assert!(analysis.needs_backfill());
    }

    #[tokio::test]
    async fn coverage_analysis_rejects_unknown_endpoints() {
        let collector = Arc::new(MockCollector::new(sample_load_document(1)));
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let clock = Arc::new(ManualClock::new(at(2024, 2, 1)));
        let service = service_with(collector, repos, clock, settings(3));

        let err = service
            .analyze_coverage(None, Some(vec!["household_load".to_string()]), Some(1))
            .await
            .unwrap_err();

        match err {
            BackfillError::Coverage { endpoint_name, .. } => {
                assert_eq!(endpoint_name, "household_load");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn coverage_defaults_cover_all_areas_and_endpoints() {
        let collector = Arc::new(MockCollector::new(sample_load_document(1)));
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let clock = Arc::new(ManualClock::new(at(2024, 2, 1)));
        let service = service_with(collector, repos, clock, settings(3));

        let results = service.analyze_coverage(None, None, None).await.unwrap();
        // 3 default areas × 7 endpoints.
        assert_eq!(results.len(), 21);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_at_chunk_boundary() {
        let collector = Arc::new(MockCollector::new(sample_load_document(1)));
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let clock = Arc::new(ManualClock::new(at(2024, 2, 1)));
        let service = Arc::new(service_with(collector.clone(), repos.clone(), clock, settings(3)));

        // Cancel as soon as the record exists and is in progress.
        let repos_bg = repos.clone();
        let watcher = tokio::spawn(async move {
            loop {
                let active = repos_bg.backfill_progress().get_active().await.unwrap();
                if let Some(record) = active.first() {
                    if record.status == BackfillStatus::InProgress {
                        repos_bg
                            .backfill_progress()
                            .update_progress_by_id(
                                record.id,
                                ProgressUpdate {
                                    status: Some(BackfillStatus::Cancelled),
                                    ..Default::default()
                                },
                            )
                            .await
                            .unwrap();
                        return record.id;
                    }
                }
                tokio::task::yield_now().await;
            }
        });

        let result = service
            .start_backfill("DE", "actual_load", at(2023, 1, 1), at(2023, 12, 31), Some(7))
            .await
            .unwrap();
        let cancelled_id = watcher.await.unwrap();

        // Far fewer chunks ran than the 52 scheduled.
        assert!(result.chunks_processed < 52);
        let progress = repos
            .backfill_progress()
            .get_by_id(cancelled_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(progress.status, BackfillStatus::Cancelled);
    }
}
