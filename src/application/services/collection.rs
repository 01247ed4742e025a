//! Gap-aware real-time collection engine.
//!
//! For each (area, endpoint) pair the engine asks the store for the latest
//! point, derives the missing interval, splits it into API-friendly chunks
//! and pulls them sequentially with rate limiting. One endpoint's failure
//! never aborts the others; one chunk's failure never aborts the rest of
//! the gap. Every attempt leaves exactly one metrics record behind.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::processing::{
    GlMarketDocumentProcessor, PublicationMarketDocumentProcessor,
};
use crate::domain::area::AreaCode;
use crate::domain::collector::EntsoeCollector;
use crate::domain::repositories::RepositoryProvider;
use crate::infrastructure::database::entities::collection_metrics;
use crate::infrastructure::database::entities::energy_data_point::EnergyDataType;
use crate::shared::clock::Clock;
use crate::shared::errors::{CollectorError, DataAccessError, ProcessorError};

/// Lookback used when an area has no data at all for a backward-looking
/// endpoint.
const FRESH_DATABASE_LOOKBACK_DAYS: i64 = 7;

/// Floor for the inter-chunk sleep; the upstream rate limiter starts
/// rejecting well before this.
const MIN_RATE_LIMIT_DELAY_SECS: f64 = 0.5;

/// The closed set of upstream query families this engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EndpointName {
    ActualLoad,
    DayAheadForecast,
    WeekAheadForecast,
    MonthAheadForecast,
    YearAheadForecast,
    ForecastMargin,
    DayAheadPrices,
}

impl EndpointName {
    pub const ALL: [EndpointName; 7] = [
        EndpointName::ActualLoad,
        EndpointName::DayAheadForecast,
        EndpointName::WeekAheadForecast,
        EndpointName::MonthAheadForecast,
        EndpointName::YearAheadForecast,
        EndpointName::ForecastMargin,
        EndpointName::DayAheadPrices,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointName::ActualLoad => "actual_load",
            EndpointName::DayAheadForecast => "day_ahead_forecast",
            EndpointName::WeekAheadForecast => "week_ahead_forecast",
            EndpointName::MonthAheadForecast => "month_ahead_forecast",
            EndpointName::YearAheadForecast => "year_ahead_forecast",
            EndpointName::ForecastMargin => "forecast_margin",
            EndpointName::DayAheadPrices => "day_ahead_prices",
        }
    }

    pub fn from_name(name: &str) -> Option<EndpointName> {
        Self::ALL.iter().copied().find(|e| e.as_str() == name)
    }

    pub fn config(&self) -> EndpointConfig {
        match self {
            EndpointName::ActualLoad => EndpointConfig {
                data_type: EnergyDataType::Actual,
                expected_interval_minutes: 5,
                max_chunk_days: 3,
                rate_limit_delay_secs: 1.0,
                forecast_horizon_days: None,
            },
            EndpointName::DayAheadForecast => EndpointConfig {
                data_type: EnergyDataType::DayAhead,
                expected_interval_minutes: 15,
                max_chunk_days: 7,
                rate_limit_delay_secs: 1.0,
                forecast_horizon_days: Some(2),
            },
            EndpointName::WeekAheadForecast => EndpointConfig {
                data_type: EnergyDataType::WeekAhead,
                expected_interval_minutes: 30,
                max_chunk_days: 14,
                rate_limit_delay_secs: 1.0,
                forecast_horizon_days: Some(14),
            },
            EndpointName::MonthAheadForecast => EndpointConfig {
                data_type: EnergyDataType::MonthAhead,
                expected_interval_minutes: 120,
                max_chunk_days: 30,
                rate_limit_delay_secs: 1.0,
                forecast_horizon_days: Some(62),
            },
            EndpointName::YearAheadForecast => EndpointConfig {
                data_type: EnergyDataType::YearAhead,
                expected_interval_minutes: 360,
                max_chunk_days: 90,
                rate_limit_delay_secs: 1.0,
                forecast_horizon_days: Some(730),
            },
            EndpointName::ForecastMargin => EndpointConfig {
                data_type: EnergyDataType::ForecastMargin,
                expected_interval_minutes: 720,
                max_chunk_days: 30,
                rate_limit_delay_secs: 1.0,
                forecast_horizon_days: Some(365),
            },
            EndpointName::DayAheadPrices => EndpointConfig {
                data_type: EnergyDataType::DayAhead,
                expected_interval_minutes: 15,
                max_chunk_days: 7,
                rate_limit_delay_secs: 1.0,
                forecast_horizon_days: Some(2),
            },
        }
    }
}

impl std::fmt::Display for EndpointName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collection behavior of one endpoint.
#[derive(Debug, Clone, Copy)]
pub struct EndpointConfig {
    pub data_type: EnergyDataType,
    pub expected_interval_minutes: i64,
    pub max_chunk_days: i64,
    pub rate_limit_delay_secs: f64,
    /// `Some` for forward-looking (forecast) endpoints.
    pub forecast_horizon_days: Option<i64>,
}

impl EndpointConfig {
    pub fn expected_interval(&self) -> Duration {
        Duration::minutes(self.expected_interval_minutes)
    }

    pub fn is_forward_looking(&self) -> bool {
        self.forecast_horizon_days.is_some()
    }

    pub fn forecast_horizon(&self) -> Option<Duration> {
        self.forecast_horizon_days.map(Duration::days)
    }

    pub fn rate_limit_delay(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(
            self.rate_limit_delay_secs.max(MIN_RATE_LIMIT_DELAY_SECS),
        )
    }
}

/// Outcome of one (area, endpoint) collection attempt.
#[derive(Debug, Clone)]
pub struct CollectionResult {
    pub area: String,
    pub data_type: EnergyDataType,
    pub stored_count: usize,
    pub success: bool,
    pub no_data_available: bool,
    pub no_data_reason: Option<String>,
    pub error_message: Option<String>,
    /// Collected time range (the detected gap).
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
enum ChunkFailure {
    #[error(transparent)]
    Collector(#[from] CollectorError),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    #[error(transparent)]
    Store(#[from] DataAccessError),
}

enum ChunkOutcome {
    NoData,
    Stored(usize),
}

struct ChunkTimings {
    api_ms: f64,
    processing_ms: f64,
}

/// Gap-filling orchestration service for ENTSO-E data collection.
pub struct EntsoeDataService {
    collector: Arc<dyn EntsoeCollector>,
    load_processor: GlMarketDocumentProcessor,
    price_processor: PublicationMarketDocumentProcessor,
    repos: Arc<dyn RepositoryProvider>,
    clock: Arc<dyn Clock>,
    areas: Vec<AreaCode>,
}

impl EntsoeDataService {
    pub fn new(
        collector: Arc<dyn EntsoeCollector>,
        repos: Arc<dyn RepositoryProvider>,
        clock: Arc<dyn Clock>,
        areas: Vec<AreaCode>,
    ) -> Self {
        Self {
            collector,
            load_processor: GlMarketDocumentProcessor::new(),
            price_processor: PublicationMarketDocumentProcessor::new(),
            repos,
            clock,
            areas,
        }
    }

    /// Fill gaps for all configured areas and endpoints.
    pub async fn collect_all_gaps(
        &self,
    ) -> BTreeMap<String, BTreeMap<&'static str, CollectionResult>> {
        let job_id = format!("manual_{}", Uuid::new_v4());
        self.collect_all_gaps_for_job(&job_id).await
    }

    /// Same as [`collect_all_gaps`](Self::collect_all_gaps), correlated to a
    /// scheduler job id in the metrics store.
    pub async fn collect_all_gaps_for_job(
        &self,
        job_id: &str,
    ) -> BTreeMap<String, BTreeMap<&'static str, CollectionResult>> {
        let mut results = BTreeMap::new();
        for area in self.areas.clone() {
            let area_results = self.collect_gaps_for_area_for_job(job_id, area).await;
            results.insert(area.area_name().to_string(), area_results);
        }
        results
    }

    /// Collect missing data for every endpoint of one area. Endpoint
    /// failures are reported in their results, never propagated.
    pub async fn collect_gaps_for_area(
        &self,
        area: AreaCode,
    ) -> BTreeMap<&'static str, CollectionResult> {
        let job_id = format!("manual_{}", Uuid::new_v4());
        self.collect_gaps_for_area_for_job(&job_id, area).await
    }

    async fn collect_gaps_for_area_for_job(
        &self,
        job_id: &str,
        area: AreaCode,
    ) -> BTreeMap<&'static str, CollectionResult> {
        info!(
            area = %area,
            endpoints = EndpointName::ALL.len(),
            "Starting gap collection for area"
        );

        let mut results = BTreeMap::new();
        for endpoint in EndpointName::ALL {
            let result = self
                .collect_gaps_for_endpoint_for_job(job_id, area, endpoint)
                .await;
            results.insert(endpoint.as_str(), result);
        }

        let successful = results.values().filter(|r| r.success).count();
        let total_stored: usize = results.values().map(|r| r.stored_count).sum();
        info!(
            area = %area,
            successful,
            endpoints = results.len(),
            total_stored,
            "Completed gap collection for area"
        );

        results
    }

    /// Fill the gap for one (area, endpoint) pair.
    pub async fn collect_gaps_for_endpoint(
        &self,
        area: AreaCode,
        endpoint: EndpointName,
    ) -> CollectionResult {
        let job_id = format!("manual_{}", Uuid::new_v4());
        self.collect_gaps_for_endpoint_for_job(&job_id, area, endpoint)
            .await
    }

    async fn collect_gaps_for_endpoint_for_job(
        &self,
        job_id: &str,
        area: AreaCode,
        endpoint: EndpointName,
    ) -> CollectionResult {
        let operation_start = self.clock.now_utc();
        let result = self.run_endpoint_collection(area, endpoint).await;
        let operation_end = self.clock.now_utc();

        self.record_metrics(job_id, area, endpoint, &result, operation_start, operation_end)
            .await;

        metrics::counter!(
            "entsoe_points_stored_total",
            "area" => area.area_name().to_string(),
            "endpoint" => endpoint.as_str(),
        )
        .increment(result.0.stored_count as u64);

        result.0
    }

    async fn run_endpoint_collection(
        &self,
        area: AreaCode,
        endpoint: EndpointName,
    ) -> (CollectionResult, ChunkTimings) {
        let config = endpoint.config();

        let (gap_start, gap_end) = match self.detect_gap(area, endpoint).await {
            Ok(gap) => gap,
            Err(e) => {
                let now = self.clock.now_utc();
                warn!(area = %area, endpoint = %endpoint, error = %e, "Gap detection failed");
                return (
                    CollectionResult {
                        area: area.area_name().to_string(),
                        data_type: config.data_type,
                        stored_count: 0,
                        success: false,
                        no_data_available: false,
                        no_data_reason: None,
                        error_message: Some(e.to_string()),
                        start_time: now,
                        end_time: now,
                    },
                    ChunkTimings {
                        api_ms: 0.0,
                        processing_ms: 0.0,
                    },
                );
            }
        };

        if gap_start >= gap_end {
            debug!(area = %area, endpoint = %endpoint, "No gap detected, data is up to date");
            return (
                CollectionResult {
                    area: area.area_name().to_string(),
                    data_type: config.data_type,
                    stored_count: 0,
                    success: true,
                    no_data_available: false,
                    no_data_reason: None,
                    error_message: None,
                    start_time: gap_start,
                    end_time: gap_end,
                },
                ChunkTimings {
                    api_ms: 0.0,
                    processing_ms: 0.0,
                },
            );
        }

        info!(
            area = %area,
            endpoint = %endpoint,
            gap_start = %gap_start,
            gap_end = %gap_end,
            "Gap detected"
        );

        self.collect_with_chunking(area, endpoint, gap_start, gap_end)
            .await
    }

    /// Collect a time range with chunking and inter-chunk rate limiting.
    async fn collect_with_chunking(
        &self,
        area: AreaCode,
        endpoint: EndpointName,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> (CollectionResult, ChunkTimings) {
        let config = endpoint.config();
        let chunks = create_time_chunks(start_time, end_time, config.max_chunk_days);

        info!(
            area = %area,
            endpoint = %endpoint,
            chunks = chunks.len(),
            rate_limit_secs = config.rate_limit_delay_secs,
            "Starting chunked collection"
        );

        let mut stored_count = 0usize;
        let mut no_data_chunks = 0usize;
        let mut errors: Vec<String> = Vec::new();
        let mut timings = ChunkTimings {
            api_ms: 0.0,
            processing_ms: 0.0,
        };

        for (i, (chunk_start, chunk_end)) in chunks.iter().enumerate() {
            debug!(
                area = %area,
                endpoint = %endpoint,
                chunk = i + 1,
                total = chunks.len(),
                "Processing chunk"
            );

            match self
                .collect_chunk(area, endpoint, *chunk_start, *chunk_end, &mut timings)
                .await
            {
                Ok(ChunkOutcome::Stored(count)) => stored_count += count,
                Ok(ChunkOutcome::NoData) => no_data_chunks += 1,
                Err(e) => {
                    warn!(
                        area = %area,
                        endpoint = %endpoint,
                        chunk = i + 1,
                        total = chunks.len(),
                        error = %e,
                        "Chunk failed, continuing with next chunk"
                    );
                    errors.push(format!(
                        "chunk {}/{} ({chunk_start}..{chunk_end}): {e}",
                        i + 1,
                        chunks.len()
                    ));
                }
            }

            if i + 1 < chunks.len() {
                tokio::time::sleep(config.rate_limit_delay()).await;
            }
        }

        info!(
            area = %area,
            endpoint = %endpoint,
            stored_count,
            chunks = chunks.len(),
            failed = errors.len(),
            "Completed chunked collection"
        );

        let no_data_available = no_data_chunks > 0;
        let result = CollectionResult {
            area: area.area_name().to_string(),
            data_type: config.data_type,
            stored_count,
            success: errors.is_empty(),
            no_data_available,
            no_data_reason: no_data_available
                .then(|| format!("{no_data_chunks}/{} chunks returned no data", chunks.len())),
            error_message: (!errors.is_empty()).then(|| errors.join("; ")),
            start_time,
            end_time,
        };
        (result, timings)
    }

    /// Collection is due when no point exists yet, or the latest point is
    /// older than the endpoint's expected interval.
    pub async fn should_collect_now(
        &self,
        area: AreaCode,
        endpoint: EndpointName,
    ) -> Result<bool, DataAccessError> {
        let config = endpoint.config();
        let Some(latest) = self.latest_timestamp(area, endpoint).await? else {
            return Ok(true);
        };
        Ok(self.clock.now_utc() >= latest + config.expected_interval())
    }

    async fn latest_timestamp(
        &self,
        area: AreaCode,
        endpoint: EndpointName,
    ) -> Result<Option<DateTime<Utc>>, DataAccessError> {
        let config = endpoint.config();
        let area_name = area.area_name();
        let latest = match endpoint {
            EndpointName::DayAheadPrices => self
                .repos
                .energy_prices()
                .get_latest_for_area_and_type(area_name, config.data_type)
                .await?
                .map(|p| p.timestamp),
            _ => self
                .repos
                .energy_data()
                .get_latest_for_area_and_type(area_name, config.data_type)
                .await?
                .map(|p| p.timestamp),
        };
        Ok(latest)
    }

    /// Derive the missing interval for an (area, endpoint) pair.
    ///
    /// Backward-looking endpoints chase `now`; forward-looking endpoints
    /// chase `now + forecast_horizon`.
    async fn detect_gap(
        &self,
        area: AreaCode,
        endpoint: EndpointName,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), DataAccessError> {
        let config = endpoint.config();
        let now = self.clock.now_utc();
        let latest = self.latest_timestamp(area, endpoint).await?;

        let gap = match (config.forecast_horizon(), latest) {
            (Some(horizon), None) => (now, now + horizon),
            (Some(horizon), Some(latest)) => {
                (latest + config.expected_interval(), now + horizon)
            }
            (None, None) => (now - Duration::days(FRESH_DATABASE_LOOKBACK_DAYS), now),
            (None, Some(latest)) => (latest + config.expected_interval(), now),
        };
        Ok(gap)
    }

    async fn collect_chunk(
        &self,
        area: AreaCode,
        endpoint: EndpointName,
        chunk_start: DateTime<Utc>,
        chunk_end: DateTime<Utc>,
        timings: &mut ChunkTimings,
    ) -> Result<ChunkOutcome, ChunkFailure> {
        if endpoint == EndpointName::DayAheadPrices {
            let api_started = Instant::now();
            let document = self
                .collector
                .get_day_ahead_prices(area, chunk_start, chunk_end)
                .await?;
            timings.api_ms += api_started.elapsed().as_secs_f64() * 1000.0;

            let Some(document) = document else {
                return Ok(ChunkOutcome::NoData);
            };

            let processing_started = Instant::now();
            let points = self.price_processor.process(std::slice::from_ref(&document))?;
            let stored = self.repos.energy_prices().upsert_batch(points).await?;
            timings.processing_ms += processing_started.elapsed().as_secs_f64() * 1000.0;
            return Ok(ChunkOutcome::Stored(stored));
        }

        let api_started = Instant::now();
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
        timings.api_ms += api_started.elapsed().as_secs_f64() * 1000.0;

        let Some(document) = document else {
            return Ok(ChunkOutcome::NoData);
        };

        let processing_started = Instant::now();
        let points = self.load_processor.process(std::slice::from_ref(&document))?;
        let stored = self.repos.energy_data().upsert_batch(points).await?;
        timings.processing_ms += processing_started.elapsed().as_secs_f64() * 1000.0;

        Ok(ChunkOutcome::Stored(stored))
    }

    async fn record_metrics(
        &self,
        job_id: &str,
        area: AreaCode,
        endpoint: EndpointName,
        outcome: &(CollectionResult, ChunkTimings),
        operation_start: DateTime<Utc>,
        operation_end: DateTime<Utc>,
    ) {
        let (result, timings) = outcome;
        let metric = collection_metrics::Model {
            id: 0,
            job_id: job_id.to_string(),
            area_code: area.area_name().to_string(),
            data_type: endpoint.config().data_type,
            collection_start: operation_start,
            collection_end: operation_end,
            points_collected: result.stored_count as i32,
            success: result.success,
            error_message: result.error_message.clone(),
            api_response_time: (timings.api_ms > 0.0).then_some(timings.api_ms),
            processing_time: (timings.processing_ms > 0.0).then_some(timings.processing_ms),
            created_at: operation_end,
            updated_at: operation_end,
        };

        if let Err(e) = self.repos.collection_metrics().insert(metric).await {
            warn!(
                area = %area,
                endpoint = %endpoint,
                error = %e,
                "Failed to record collection metrics"
            );
        }
    }
}

/// Split `[start, end)` into adjacent chunks of at most `max_chunk_days`.
pub fn create_time_chunks(
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    max_chunk_days: i64,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut chunks = Vec::new();
    let chunk_delta = Duration::days(max_chunk_days);
    let mut current_start = start_time;

    while current_start < end_time {
        let chunk_end = (current_start + chunk_delta).min(end_time);
        chunks.push((current_start, chunk_end));
        current_start = chunk_end;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::application::services::test_support::{sample_load_document, MockCollector, MockResponse};
    use crate::domain::repositories::PointFilter;
    use crate::infrastructure::memory::InMemoryRepositoryProvider;
    use crate::shared::clock::ManualClock;

    fn service_with(
        collector: Arc<MockCollector>,
        repos: Arc<InMemoryRepositoryProvider>,
        clock: Arc<ManualClock>,
    ) -> EntsoeDataService {
        EntsoeDataService::new(collector, repos, clock, vec![AreaCode::GERMANY])
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn chunking_splits_with_partial_tail() {
        let chunks = create_time_chunks(at(2024, 1, 1, 0, 0), at(2024, 1, 8, 0, 0), 3);
        assert_eq!(
            chunks,
            vec![
                (at(2024, 1, 1, 0, 0), at(2024, 1, 4, 0, 0)),
                (at(2024, 1, 4, 0, 0), at(2024, 1, 7, 0, 0)),
                (at(2024, 1, 7, 0, 0), at(2024, 1, 8, 0, 0)),
            ]
        );
    }

    #[test]
    fn chunking_of_empty_range_is_empty() {
        let t = at(2024, 1, 1, 0, 0);
        assert!(create_time_chunks(t, t, 3).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_database_backward_looking_collection() {
        // Scenario: empty store, actual_load, now = 2024-01-08T00:00Z.
        // Expect a 7-day gap split into 3 chunks with 2 rate-limit sleeps.
        let collector = Arc::new(MockCollector::new(sample_load_document(4)));
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let clock = Arc::new(ManualClock::new(at(2024, 1, 8, 0, 0)));
        let service = service_with(collector.clone(), repos.clone(), clock);

        let wall_start = tokio::time::Instant::now();
        let result = service
            .collect_gaps_for_endpoint(AreaCode::GERMANY, EndpointName::ActualLoad)
            .await;
        let slept = wall_start.elapsed();

        assert!(result.success);
        assert_eq!(result.start_time, at(2024, 1, 1, 0, 0));
        assert_eq!(result.end_time, at(2024, 1, 8, 0, 0));
        assert_eq!(result.stored_count, 3 * 4);

        let calls = collector.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].period_start, at(2024, 1, 1, 0, 0));
        assert_eq!(calls[0].period_end, at(2024, 1, 4, 0, 0));
        assert_eq!(calls[2].period_end, at(2024, 1, 8, 0, 0));

        // Two inter-chunk sleeps at 1s each (none after the last chunk).
        assert_eq!(slept.as_secs(), 2);

        // Exactly one metrics row for the attempt.
        let metrics = repos
            .collection_metrics()
            .get_recent_metrics(at(2000, 1, 1, 0, 0))
            .await
            .unwrap();
        assert_eq!(metrics.len(), 1);
        assert!(metrics[0].success);
        assert_eq!(metrics[0].points_collected, 12);
    }

    #[tokio::test]
    async fn forward_looking_gap_with_existing_data() {
        // Scenario: latest day_ahead point at 10:00, now = 12:00,
        // interval 15m, horizon 2d.
        let collector = Arc::new(MockCollector::new(sample_load_document(1)));
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let clock = Arc::new(ManualClock::new(at(2024, 1, 15, 12, 0)));
        let service = service_with(collector.clone(), repos.clone(), clock);

        let mut point = crate::application::services::test_support::sample_data_point();
        point.timestamp = at(2024, 1, 15, 10, 0);
        point.data_type = EnergyDataType::DayAhead;
        repos.energy_data().upsert_batch(vec![point]).await.unwrap();

        let result = service
            .collect_gaps_for_endpoint(AreaCode::GERMANY, EndpointName::DayAheadForecast)
            .await;

        assert_eq!(result.start_time, at(2024, 1, 15, 10, 15));
        assert_eq!(result.end_time, at(2024, 1, 17, 12, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn all_no_data_chunks_still_succeed() {
        let collector = Arc::new(MockCollector::new(sample_load_document(1)));
        collector.script(vec![MockResponse::NoData, MockResponse::NoData, MockResponse::NoData]);
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let clock = Arc::new(ManualClock::new(at(2024, 1, 8, 0, 0)));
        let service = service_with(collector, repos, clock);

        let result = service
            .collect_gaps_for_endpoint(AreaCode::GERMANY, EndpointName::ActualLoad)
            .await;

        assert!(result.success);
        assert!(result.no_data_available);
        assert_eq!(result.stored_count, 0);
        assert_eq!(
            result.no_data_reason.as_deref(),
            Some("3/3 chunks returned no data")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn mixed_chunks_report_partial_no_data() {
        let collector = Arc::new(MockCollector::new(sample_load_document(2)));
        collector.script(vec![
            MockResponse::NoData,
            MockResponse::Document,
            MockResponse::Document,
        ]);
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let clock = Arc::new(ManualClock::new(at(2024, 1, 8, 0, 0)));
        let service = service_with(collector, repos, clock);

        let result = service
            .collect_gaps_for_endpoint(AreaCode::GERMANY, EndpointName::ActualLoad)
            .await;

        assert!(result.success);
        assert!(result.no_data_available);
        assert_eq!(
            result.no_data_reason.as_deref(),
            Some("1/3 chunks returned no data")
        );
        assert_eq!(result.stored_count, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn chunk_errors_do_not_abort_remaining_chunks() {
        let collector = Arc::new(MockCollector::new(sample_load_document(2)));
        collector.script(vec![
            MockResponse::Document,
            MockResponse::HttpError(503),
            MockResponse::Document,
        ]);
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let clock = Arc::new(ManualClock::new(at(2024, 1, 8, 0, 0)));
        let service = service_with(collector.clone(), repos.clone(), clock);

        let result = service
            .collect_gaps_for_endpoint(AreaCode::GERMANY, EndpointName::ActualLoad)
            .await;

        assert!(!result.success);
        assert_eq!(result.stored_count, 4);
        assert_eq!(collector.calls().len(), 3);
        assert!(result.error_message.as_deref().unwrap().contains("chunk 2/3"));

        // Failure still produces a metrics record.
        let metrics = repos
            .collection_metrics()
            .get_recent_metrics(at(2000, 1, 1, 0, 0))
            .await
            .unwrap();
        assert_eq!(metrics.len(), 1);
        assert!(!metrics[0].success);
    }

    #[tokio::test]
    async fn up_to_date_endpoint_skips_api_entirely() {
        let collector = Arc::new(MockCollector::new(sample_load_document(1)));
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let now = at(2024, 1, 15, 12, 0);
        let clock = Arc::new(ManualClock::new(now));
        let service = service_with(collector.clone(), repos.clone(), clock);

        // Forward horizon already covered: latest point beyond now + 2d.
        let mut point = crate::application::services::test_support::sample_data_point();
        point.timestamp = at(2024, 1, 18, 0, 0);
        point.data_type = EnergyDataType::DayAhead;
        repos.energy_data().upsert_batch(vec![point]).await.unwrap();

        let result = service
            .collect_gaps_for_endpoint(AreaCode::GERMANY, EndpointName::DayAheadForecast)
            .await;

        assert!(result.success);
        assert_eq!(result.stored_count, 0);
        assert!(collector.calls().is_empty());
    }

    #[tokio::test]
    async fn should_collect_now_respects_expected_interval() {
        let collector = Arc::new(MockCollector::new(sample_load_document(1)));
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let clock = Arc::new(ManualClock::new(at(2024, 1, 15, 12, 0)));
        let service = service_with(collector, repos.clone(), clock.clone());

        // Empty store: always due.
        assert!(service
            .should_collect_now(AreaCode::GERMANY, EndpointName::ActualLoad)
            .await
            .unwrap());

        let mut point = crate::application::services::test_support::sample_data_point();
        point.timestamp = at(2024, 1, 15, 11, 58);
        repos.energy_data().upsert_batch(vec![point]).await.unwrap();

        // Interval is 5m; latest is 2m old.
        assert!(!service
            .should_collect_now(AreaCode::GERMANY, EndpointName::ActualLoad)
            .await
            .unwrap());

        clock.advance(Duration::minutes(5));
        assert!(service
            .should_collect_now(AreaCode::GERMANY, EndpointName::ActualLoad)
            .await
            .unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn stored_points_are_queryable_by_time_range() {
        let collector = Arc::new(MockCollector::new(sample_load_document(4)));
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let clock = Arc::new(ManualClock::new(at(2024, 1, 8, 0, 0)));
        let service = service_with(collector, repos.clone(), clock);

        service
            .collect_gaps_for_endpoint(AreaCode::GERMANY, EndpointName::ActualLoad)
            .await;

        let stored = repos
            .energy_data()
            .get_by_time_range(
                at(2020, 1, 1, 0, 0),
                at(2030, 1, 1, 0, 0),
                &PointFilter::for_area_and_type("DE", EnergyDataType::Actual),
            )
            .await
            .unwrap();
        assert!(!stored.is_empty());
        // Ascending by timestamp.
        assert!(stored.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }
}
