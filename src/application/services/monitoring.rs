//! Collection monitoring engine.
//!
//! Read-mostly consumer of the metrics store: success rates, performance
//! aggregates, anomaly signals, trend and failure-pattern analysis, and the
//! retention job for old metrics.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::MonitoringSettings;
use crate::domain::repositories::RepositoryProvider;
use crate::infrastructure::database::entities::collection_metrics;
use crate::infrastructure::database::entities::energy_data_point::EnergyDataType;
use crate::shared::clock::Clock;
use crate::shared::errors::MonitoringError;

/// Severity boundary inside `low_success_rate`: below this the signal is
/// high-severity regardless of the configured threshold.
const CRITICAL_SUCCESS_RATE: f64 = 0.8;

/// Days averaged on each end of the window for trend direction.
const TREND_WINDOW_DAYS: usize = 3;

/// Share of failures one dimension value must account for before a
/// recommendation is emitted.
const DOMINANT_FAILURE_SHARE: f64 = 0.5;

/// One area's outcome inside a tracked collection run.
#[derive(Debug, Clone)]
pub struct AreaResult {
    pub area_code: String,
    pub data_type: EnergyDataType,
    pub points_collected: i32,
    pub success: bool,
    pub error_message: Option<String>,
    pub api_response_time_ms: Option<f64>,
    pub processing_time_ms: Option<f64>,
}

/// A collection run to be recorded in the metrics store.
#[derive(Debug, Clone)]
pub struct CollectionOutcome {
    pub job_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub area_results: Vec<AreaResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    LowSuccessRate,
    HighResponseTime,
    NoDataCollection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub description: String,
    pub severity: Severity,
    pub value: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnomalyReport {
    pub anomaly_detection_enabled: bool,
    pub area_code: String,
    pub data_type: String,
    pub period_seconds: i64,
    pub total_operations: usize,
    pub success_rate: Option<f64>,
    pub anomalies: Vec<Anomaly>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub avg_api_response_time: Option<f64>,
    pub min_api_response_time: Option<f64>,
    pub max_api_response_time: Option<f64>,
    pub avg_processing_time: Option<f64>,
    pub min_processing_time: Option<f64>,
    pub max_processing_time: Option<f64>,
    pub total_operations: usize,
    pub successful_operations: usize,
    pub failed_operations: usize,
    pub overall_success_rate: f64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DailyStats {
    pub total_operations: usize,
    pub successful_operations: usize,
    pub total_points: i64,
    pub avg_response_time: Option<f64>,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub period_days: i64,
    pub total_operations: usize,
    pub total_successful_operations: usize,
    pub total_points_collected: i64,
    pub overall_success_rate: f64,
    pub daily_statistics: BTreeMap<NaiveDate, DailyStats>,
    pub trend_direction: TrendDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubsystemStatus {
    Good,
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSummary {
    pub overall_status: HealthStatus,
    pub performance_status: SubsystemStatus,
    pub availability_status: SubsystemStatus,
    pub data_quality_status: SubsystemStatus,
    pub status_reasons: Vec<String>,
    pub recent_operations_count: usize,
    pub performance: PerformanceReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailurePatternReport {
    pub period_seconds: i64,
    pub total_operations: usize,
    pub failed_operations: usize,
    pub failure_rate: f64,
    pub by_area_code: BTreeMap<String, usize>,
    pub by_data_type: BTreeMap<String, usize>,
    pub by_error_pattern: BTreeMap<String, usize>,
    pub top_areas: Vec<(String, usize)>,
    pub top_data_types: Vec<(String, usize)>,
    pub top_error_patterns: Vec<(String, usize)>,
    pub recommendations: Vec<String>,
}

/// Service for collection performance and health tracking.
pub struct MonitoringService {
    repos: Arc<dyn RepositoryProvider>,
    clock: Arc<dyn Clock>,
    config: MonitoringSettings,
}

impl MonitoringService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        clock: Arc<dyn Clock>,
        config: MonitoringSettings,
    ) -> Self {
        Self {
            repos,
            clock,
            config,
        }
    }

    /// Persist one metrics row per area result of a collection run.
    pub async fn track_collection_result(
        &self,
        outcome: &CollectionOutcome,
    ) -> Result<(), MonitoringError> {
        if outcome.job_id.is_empty() {
            return Err(MonitoringError::InvalidInput {
                operation: "track_collection_result",
                reason: "empty job_id".to_string(),
            });
        }
        if outcome.area_results.is_empty() {
            return Err(MonitoringError::InvalidInput {
                operation: "track_collection_result",
                reason: "no area results".to_string(),
            });
        }

        let metrics: Vec<collection_metrics::Model> = outcome
            .area_results
            .iter()
            .map(|area| collection_metrics::Model {
                id: 0,
                job_id: outcome.job_id.clone(),
                area_code: area.area_code.clone(),
                data_type: area.data_type,
                collection_start: outcome.start_time,
                collection_end: outcome.end_time,
                points_collected: area.points_collected,
                success: area.success,
                error_message: area.error_message.clone(),
                api_response_time: area.api_response_time_ms,
                processing_time: area.processing_time_ms,
                created_at: outcome.end_time,
                updated_at: outcome.end_time,
            })
            .collect();

        let count = metrics.len();
        self.repos.collection_metrics().insert_many(metrics).await?;
        debug!(job_id = %outcome.job_id, count, "Tracked collection metrics");
        Ok(())
    }

    /// Success rate per `area/data_type` slice over the given period.
    pub async fn calculate_success_rates(
        &self,
        period: Duration,
    ) -> Result<BTreeMap<String, f64>, MonitoringError> {
        let end_time = self.clock.now_utc();
        let start_time = end_time - period;

        let metrics = self
            .repos
            .collection_metrics()
            .get_by_time_range(start_time, end_time, None, None)
            .await?;

        let mut counts: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for metric in &metrics {
            let key = format!("{}/{}", metric.area_code, metric.data_type);
            let entry = counts.entry(key).or_default();
            entry.0 += 1;
            if metric.success {
                entry.1 += 1;
            }
        }

        Ok(counts
            .into_iter()
            .map(|(key, (total, successful))| (key, successful as f64 / total as f64))
            .collect())
    }

    /// Aggregated response/processing times and operation counts.
    pub async fn get_performance_metrics(
        &self,
        period: Duration,
    ) -> Result<PerformanceReport, MonitoringError> {
        let end_time = self.clock.now_utc();
        let start_time = end_time - period;

        let aggregates = self
            .repos
            .collection_metrics()
            .get_performance_metrics(start_time, end_time)
            .await?;
        let metrics = self
            .repos
            .collection_metrics()
            .get_by_time_range(start_time, end_time, None, None)
            .await?;

        let total_operations = metrics.len();
        let successful_operations = metrics.iter().filter(|m| m.success).count();

        Ok(PerformanceReport {
            avg_api_response_time: aggregates.avg_api_response_time,
            min_api_response_time: aggregates.min_api_response_time,
            max_api_response_time: aggregates.max_api_response_time,
            avg_processing_time: aggregates.avg_processing_time,
            min_processing_time: aggregates.min_processing_time,
            max_processing_time: aggregates.max_processing_time,
            total_operations,
            successful_operations,
            failed_operations: total_operations - successful_operations,
            overall_success_rate: if total_operations > 0 {
                successful_operations as f64 / total_operations as f64
            } else {
                0.0
            },
            period_start: start_time,
            period_end: end_time,
        })
    }

    /// Metrics from the last `minutes` minutes, newest first.
    pub async fn get_recent_metrics(
        &self,
        minutes: i64,
    ) -> Result<Vec<collection_metrics::Model>, MonitoringError> {
        let since = self.clock.now_utc() - Duration::minutes(minutes);
        Ok(self.repos.collection_metrics().get_recent_metrics(since).await?)
    }

    /// Detect collection anomalies for one area/data-type slice.
    pub async fn detect_anomalies(
        &self,
        area_code: &str,
        data_type: EnergyDataType,
        period: Duration,
    ) -> Result<AnomalyReport, MonitoringError> {
        if !self.config.anomaly_detection_enabled {
            return Ok(AnomalyReport {
                anomaly_detection_enabled: false,
                area_code: area_code.to_string(),
                data_type: data_type.to_string(),
                period_seconds: period.num_seconds(),
                total_operations: 0,
                success_rate: None,
                anomalies: Vec::new(),
            });
        }

        let end_time = self.clock.now_utc();
        let start_time = end_time - period;
        let metrics = self
            .repos
            .collection_metrics()
            .get_by_time_range(
                start_time,
                end_time,
                Some(&[area_code.to_string()]),
                Some(&[data_type]),
            )
            .await?;

        let total_operations = metrics.len();
        let mut anomalies = Vec::new();

        if total_operations == 0 {
            anomalies.push(Anomaly {
                kind: AnomalyKind::NoDataCollection,
                description: format!(
                    "No collection operations for {area_code}/{data_type} in the last {}s",
                    period.num_seconds()
                ),
                severity: Severity::High,
                value: 0.0,
                threshold: 1.0,
            });
            return Ok(AnomalyReport {
                anomaly_detection_enabled: true,
                area_code: area_code.to_string(),
                data_type: data_type.to_string(),
                period_seconds: period.num_seconds(),
                total_operations,
                success_rate: None,
                anomalies,
            });
        }

        let successful = metrics.iter().filter(|m| m.success).count();
        let success_rate = successful as f64 / total_operations as f64;

        if success_rate < self.config.success_rate_threshold {
            anomalies.push(Anomaly {
                kind: AnomalyKind::LowSuccessRate,
                description: format!(
                    "Success rate {:.1}% below threshold {:.1}%",
                    success_rate * 100.0,
                    self.config.success_rate_threshold * 100.0
                ),
                severity: if success_rate < CRITICAL_SUCCESS_RATE {
                    Severity::High
                } else {
                    Severity::Medium
                },
                value: success_rate,
                threshold: self.config.success_rate_threshold,
            });
        }

        let response_times: Vec<f64> =
            metrics.iter().filter_map(|m| m.api_response_time).collect();
        if !response_times.is_empty() {
            let avg = response_times.iter().sum::<f64>() / response_times.len() as f64;
            if avg > self.config.performance_threshold_ms {
                anomalies.push(Anomaly {
                    kind: AnomalyKind::HighResponseTime,
                    description: format!(
                        "Average response time {avg:.1}ms exceeds threshold {:.0}ms",
                        self.config.performance_threshold_ms
                    ),
                    severity: Severity::Medium,
                    value: avg,
                    threshold: self.config.performance_threshold_ms,
                });
            }
        }

        debug!(
            area = area_code,
            data_type = %data_type,
            anomalies = anomalies.len(),
            total_operations,
            "Anomaly detection complete"
        );

        Ok(AnomalyReport {
            anomaly_detection_enabled: true,
            area_code: area_code.to_string(),
            data_type: data_type.to_string(),
            period_seconds: period.num_seconds(),
            total_operations,
            success_rate: Some(success_rate),
            anomalies,
        })
    }

    /// Daily operation statistics and the overall trend over `days`.
    pub async fn get_collection_trends(&self, days: i64) -> Result<TrendReport, MonitoringError> {
        let end_time = self.clock.now_utc();
        let start_time = end_time - Duration::days(days);

        let metrics = self
            .repos
            .collection_metrics()
            .get_by_time_range(start_time, end_time, None, None)
            .await?;

        let mut daily: BTreeMap<NaiveDate, (DailyStats, Vec<f64>)> = BTreeMap::new();
        for metric in &metrics {
            let day = metric.collection_start.date_naive();
            let (stats, response_times) = daily.entry(day).or_default();
            stats.total_operations += 1;
            if metric.success {
                stats.successful_operations += 1;
            }
            stats.total_points += i64::from(metric.points_collected);
            if let Some(rt) = metric.api_response_time {
                response_times.push(rt);
            }
        }

        let daily_statistics: BTreeMap<NaiveDate, DailyStats> = daily
            .into_iter()
            .map(|(day, (mut stats, response_times))| {
                if !response_times.is_empty() {
                    stats.avg_response_time =
                        Some(response_times.iter().sum::<f64>() / response_times.len() as f64);
                }
                stats.success_rate = if stats.total_operations > 0 {
                    stats.successful_operations as f64 / stats.total_operations as f64
                } else {
                    0.0
                };
                (day, stats)
            })
            .collect();

        let total_operations: usize = daily_statistics.values().map(|s| s.total_operations).sum();
        let total_successful: usize = daily_statistics
            .values()
            .map(|s| s.successful_operations)
            .sum();
        let total_points: i64 = daily_statistics.values().map(|s| s.total_points).sum();

        Ok(TrendReport {
            period_days: days,
            total_operations,
            total_successful_operations: total_successful,
            total_points_collected: total_points,
            overall_success_rate: if total_operations > 0 {
                total_successful as f64 / total_operations as f64
            } else {
                0.0
            },
            trend_direction: trend_direction(&daily_statistics),
            daily_statistics,
        })
    }

    /// Overall system health from the last hour of metrics.
    pub async fn get_system_health_summary(&self) -> Result<HealthSummary, MonitoringError> {
        let performance = self.get_performance_metrics(Duration::hours(1)).await?;
        let recent = self.get_recent_metrics(60).await?;

        let mut status_reasons = Vec::new();

        let performance_status = match performance.avg_api_response_time {
            Some(avg) if avg > self.config.performance_threshold_ms => {
                status_reasons.push(format!("High average response time: {avg:.1}ms"));
                SubsystemStatus::Degraded
            }
            _ => SubsystemStatus::Good,
        };

        let availability_status = if performance.overall_success_rate
            < self.config.success_rate_threshold
        {
            status_reasons.push(format!(
                "Low success rate: {:.1}%",
                performance.overall_success_rate * 100.0
            ));
            SubsystemStatus::Degraded
        } else {
            SubsystemStatus::Good
        };

        let data_quality_status = if recent.is_empty() {
            status_reasons.push("No recent data collection operations".to_string());
            SubsystemStatus::Degraded
        } else {
            SubsystemStatus::Good
        };

        let overall_status = if [performance_status, availability_status, data_quality_status]
            .contains(&SubsystemStatus::Degraded)
        {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Ok(HealthSummary {
            overall_status,
            performance_status,
            availability_status,
            data_quality_status,
            status_reasons,
            recent_operations_count: recent.len(),
            performance,
        })
    }

    /// Group failures by area, data type and error pattern; recommend where
    /// a single value dominates.
    pub async fn analyze_failure_patterns(
        &self,
        period: Duration,
    ) -> Result<FailurePatternReport, MonitoringError> {
        let end_time = self.clock.now_utc();
        let start_time = end_time - period;

        let metrics = self
            .repos
            .collection_metrics()
            .get_by_time_range(start_time, end_time, None, None)
            .await?;

        let total_operations = metrics.len();
        let failed: Vec<&collection_metrics::Model> =
            metrics.iter().filter(|m| !m.success).collect();
        let failed_operations = failed.len();

        let mut by_area: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_data_type: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_error_pattern: BTreeMap<String, usize> = BTreeMap::new();

        for metric in &failed {
            *by_area.entry(metric.area_code.clone()).or_default() += 1;
            *by_data_type.entry(metric.data_type.to_string()).or_default() += 1;
            let pattern = metric
                .error_message
                .as_deref()
                .and_then(|m| m.split_whitespace().next())
                .unwrap_or("unknown")
                .to_string();
            *by_error_pattern.entry(pattern).or_default() += 1;
        }

        let top_areas = top_n(&by_area, 5);
        let top_data_types = top_n(&by_data_type, 5);
        let top_error_patterns = top_n(&by_error_pattern, 5);

        let mut recommendations = Vec::new();
        if failed_operations > 0 {
            if let Some((area, count)) = top_areas.first() {
                if *count as f64 / failed_operations as f64 >= DOMINANT_FAILURE_SHARE {
                    recommendations.push(format!(
                        "Focus on area '{area}': responsible for {count}/{failed_operations} failures"
                    ));
                }
            }
            if let Some((data_type, count)) = top_data_types.first() {
                if *count as f64 / failed_operations as f64 >= DOMINANT_FAILURE_SHARE {
                    recommendations.push(format!(
                        "Investigate data type '{data_type}': responsible for {count}/{failed_operations} failures"
                    ));
                }
            }
            if let Some((pattern, count)) = top_error_patterns.first() {
                if *count as f64 / failed_operations as f64 >= DOMINANT_FAILURE_SHARE {
                    recommendations.push(format!(
                        "Recurring error pattern '{pattern}': seen in {count}/{failed_operations} failures"
                    ));
                }
            }
        }

        Ok(FailurePatternReport {
            period_seconds: period.num_seconds(),
            total_operations,
            failed_operations,
            failure_rate: if total_operations > 0 {
                failed_operations as f64 / total_operations as f64
            } else {
                0.0
            },
            by_area_code: by_area,
            by_data_type,
            by_error_pattern,
            top_areas,
            top_data_types,
            top_error_patterns,
            recommendations,
        })
    }

    /// Delete metrics older than the configured retention period.
    pub async fn cleanup_old_metrics(&self) -> Result<u64, MonitoringError> {
        let cutoff =
            self.clock.now_utc() - Duration::days(i64::from(self.config.metrics_retention_days));
        let deleted = self
            .repos
            .collection_metrics()
            .cleanup_old_metrics(cutoff)
            .await?;
        info!(
            deleted,
            retention_days = self.config.metrics_retention_days,
            "Cleaned up old collection metrics"
        );
        Ok(deleted)
    }
}

fn trend_direction(daily: &BTreeMap<NaiveDate, DailyStats>) -> TrendDirection {
    if daily.len() < TREND_WINDOW_DAYS {
        return TrendDirection::InsufficientData;
    }

    let counts: Vec<f64> = daily.values().map(|s| s.total_operations as f64).collect();
    let early: f64 = counts.iter().take(TREND_WINDOW_DAYS).sum::<f64>() / TREND_WINDOW_DAYS as f64;
    let recent: f64 = counts
        .iter()
        .rev()
        .take(TREND_WINDOW_DAYS)
        .sum::<f64>()
        / TREND_WINDOW_DAYS as f64;

    if recent > early {
        TrendDirection::Increasing
    } else if recent < early {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

fn top_n(counts: &BTreeMap<String, usize>, n: usize) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> =
        counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(n);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::infrastructure::memory::InMemoryRepositoryProvider;
    use crate::shared::clock::ManualClock;

    fn at(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
    }

    fn settings() -> MonitoringSettings {
        MonitoringSettings {
            metrics_retention_days: 30,
            performance_threshold_ms: 5000.0,
            success_rate_threshold: 0.95,
            anomaly_detection_enabled: true,
        }
    }

    fn metric(
        area: &str,
        data_type: EnergyDataType,
        start: DateTime<Utc>,
        success: bool,
        response_ms: Option<f64>,
        error: Option<&str>,
    ) -> collection_metrics::Model {
        collection_metrics::Model {
            id: 0,
            job_id: "job-1".to_string(),
            area_code: area.to_string(),
            data_type,
            collection_start: start,
            collection_end: start + Duration::minutes(1),
            points_collected: 96,
            success,
            error_message: error.map(String::from),
            api_response_time: response_ms,
            processing_time: Some(120.0),
            created_at: start,
            updated_at: start,
        }
    }

    async fn seeded(
        rows: Vec<collection_metrics::Model>,
        now: DateTime<Utc>,
    ) -> (MonitoringService, Arc<InMemoryRepositoryProvider>) {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        repos.collection_metrics().insert_many(rows).await.unwrap();
        let clock = Arc::new(ManualClock::new(now));
        (
            MonitoringService::new(repos.clone(), clock, settings()),
            repos,
        )
    }

    #[tokio::test]
    async fn success_rates_group_by_area_and_type() {
        let now = at(2024, 3, 1, 12);
        let rows = vec![
            metric("DE", EnergyDataType::Actual, now - Duration::minutes(30), true, None, None),
            metric("DE", EnergyDataType::Actual, now - Duration::minutes(20), false, None, Some("Timeout")),
            metric("FR", EnergyDataType::DayAhead, now - Duration::minutes(10), true, None, None),
        ];
        let (service, _) = seeded(rows, now).await;

        let rates = service.calculate_success_rates(Duration::hours(1)).await.unwrap();
        assert_eq!(rates.len(), 2);
        assert_eq!(rates["DE/actual"], 0.5);
        assert_eq!(rates["FR/day_ahead"], 1.0);
    }

    #[tokio::test]
    async fn track_collection_result_persists_one_row_per_area() {
        let now = at(2024, 3, 1, 12);
        let (service, repos) = seeded(Vec::new(), now).await;

        let outcome = CollectionOutcome {
            job_id: "real_time_collection".to_string(),
            start_time: now - Duration::minutes(2),
            end_time: now,
            area_results: vec![
                AreaResult {
                    area_code: "DE".to_string(),
                    data_type: EnergyDataType::Actual,
                    points_collected: 96,
                    success: true,
                    error_message: None,
                    api_response_time_ms: Some(230.0),
                    processing_time_ms: Some(40.0),
                },
                AreaResult {
                    area_code: "FR".to_string(),
                    data_type: EnergyDataType::Actual,
                    points_collected: 0,
                    success: false,
                    error_message: Some("HTTP 503".to_string()),
                    api_response_time_ms: None,
                    processing_time_ms: None,
                },
            ],
        };

        service.track_collection_result(&outcome).await.unwrap();

        let rows = repos
            .collection_metrics()
            .get_metrics_by_job_id("real_time_collection")
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn track_collection_result_rejects_empty_input() {
        let now = at(2024, 3, 1, 12);
        let (service, _) = seeded(Vec::new(), now).await;

        let outcome = CollectionOutcome {
            job_id: "job".to_string(),
            start_time: now,
            end_time: now,
            area_results: Vec::new(),
        };

        let err = service.track_collection_result(&outcome).await.unwrap_err();
        match err {
            MonitoringError::InvalidInput { operation, .. } => {
                assert_eq!(operation, "track_collection_result");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn low_success_rate_anomaly_severity_scales() {
        let now = at(2024, 3, 1, 12);
        // 1 success, 9 failures: 10% success, well below the 80% critical line.
        let mut rows = vec![metric(
            "DE",
            EnergyDataType::Actual,
            now - Duration::minutes(50),
            true,
            None,
            None,
        )];
        for i in 0..9 {
            rows.push(metric(
                "DE",
                EnergyDataType::Actual,
                now - Duration::minutes(40 - i),
                false,
                None,
                Some("Timeout contacting API"),
            ));
        }
        let (service, _) = seeded(rows, now).await;

        let report = service
            .detect_anomalies("DE", EnergyDataType::Actual, Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(report.total_operations, 10);
        let anomaly = report
            .anomalies
            .iter()
            .find(|a| a.kind == AnomalyKind::LowSuccessRate)
            .expect("expected low_success_rate anomaly");
        assert_eq!(anomaly.severity, Severity::High);
    }

    #[tokio::test]
    async fn high_response_time_anomaly() {
        let now = at(2024, 3, 1, 12);
        let rows = vec![
            metric("DE", EnergyDataType::Actual, now - Duration::minutes(30), true, Some(9000.0), None),
            metric("DE", EnergyDataType::Actual, now - Duration::minutes(20), true, Some(8000.0), None),
        ];
        let (service, _) = seeded(rows, now).await;

        let report = service
            .detect_anomalies("DE", EnergyDataType::Actual, Duration::hours(1))
            .await
            .unwrap();

        let anomaly = report
            .anomalies
            .iter()
            .find(|a| a.kind == AnomalyKind::HighResponseTime)
            .expect("expected high_response_time anomaly");
        assert_eq!(anomaly.severity, Severity::Medium);
        assert!(anomaly.value > 5000.0);
    }

    #[tokio::test]
    async fn zero_operations_is_an_anomaly() {
        let now = at(2024, 3, 1, 12);
        let (service, _) = seeded(Vec::new(), now).await;

        let report = service
            .detect_anomalies("DE", EnergyDataType::Actual, Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(report.total_operations, 0);
        assert_eq!(report.anomalies.len(), 1);
        assert_eq!(report.anomalies[0].kind, AnomalyKind::NoDataCollection);
        assert_eq!(report.anomalies[0].severity, Severity::High);
    }

    #[tokio::test]
    async fn anomaly_detection_can_be_disabled() {
        let now = at(2024, 3, 1, 12);
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let clock = Arc::new(ManualClock::new(now));
        let mut config = settings();
        config.anomaly_detection_enabled = false;
        let service = MonitoringService::new(repos, clock, config);

        let report = service
            .detect_anomalies("DE", EnergyDataType::Actual, Duration::hours(1))
            .await
            .unwrap();
        assert!(!report.anomaly_detection_enabled);
        assert!(report.anomalies.is_empty());
    }

    #[tokio::test]
    async fn trend_direction_compares_first_and_last_days() {
        let now = at(2024, 3, 10, 12);
        let mut rows = Vec::new();
        // Ramp up: day k gets k operations across 6 days.
        for day in 0..6i64 {
            for _ in 0..=day {
                rows.push(metric(
                    "DE",
                    EnergyDataType::Actual,
                    at(2024, 3, 4, 1) + Duration::days(day),
                    true,
                    None,
                    None,
                ));
            }
        }
        let (service, _) = seeded(rows, now).await;

        let report = service.get_collection_trends(10).await.unwrap();
        assert_eq!(report.trend_direction, TrendDirection::Increasing);
        assert_eq!(report.total_operations, 21);
        assert_eq!(report.daily_statistics.len(), 6);
    }

    #[tokio::test]
    async fn trend_requires_three_days_of_data() {
        let now = at(2024, 3, 10, 12);
        let rows = vec![
            metric("DE", EnergyDataType::Actual, at(2024, 3, 9, 1), true, None, None),
            metric("DE", EnergyDataType::Actual, at(2024, 3, 10, 1), true, None, None),
        ];
        let (service, _) = seeded(rows, now).await;

        let report = service.get_collection_trends(10).await.unwrap();
        assert_eq!(report.trend_direction, TrendDirection::InsufficientData);
    }

    #[tokio::test]
    async fn health_summary_degrades_on_low_success_rate() {
        let now = at(2024, 3, 1, 12);
        let rows = vec![
            metric("DE", EnergyDataType::Actual, now - Duration::minutes(30), true, Some(200.0), None),
            metric("DE", EnergyDataType::Actual, now - Duration::minutes(20), false, Some(210.0), Some("HTTP 500")),
        ];
        let (service, _) = seeded(rows, now).await;

        let summary = service.get_system_health_summary().await.unwrap();
        assert_eq!(summary.overall_status, HealthStatus::Degraded);
        assert_eq!(summary.availability_status, SubsystemStatus::Degraded);
        assert_eq!(summary.performance_status, SubsystemStatus::Good);
        assert!(!summary.status_reasons.is_empty());
    }

    #[tokio::test]
    async fn health_summary_healthy_with_good_metrics() {
        let now = at(2024, 3, 1, 12);
        let rows = vec![
            metric("DE", EnergyDataType::Actual, now - Duration::minutes(30), true, Some(200.0), None),
            metric("FR", EnergyDataType::Actual, now - Duration::minutes(20), true, Some(180.0), None),
        ];
        let (service, _) = seeded(rows, now).await;

        let summary = service.get_system_health_summary().await.unwrap();
        assert_eq!(summary.overall_status, HealthStatus::Healthy);
        assert!(summary.status_reasons.is_empty());
    }

    #[tokio::test]
    async fn failure_patterns_recommend_dominant_dimension() {
        let now = at(2024, 3, 1, 12);
        let rows = vec![
            metric("DE", EnergyDataType::Actual, now - Duration::minutes(50), false, None, Some("Timeout contacting API")),
            metric("DE", EnergyDataType::Actual, now - Duration::minutes(40), false, None, Some("Timeout contacting API")),
            metric("DE", EnergyDataType::DayAhead, now - Duration::minutes(30), false, None, Some("Timeout contacting API")),
            metric("FR", EnergyDataType::Actual, now - Duration::minutes(20), false, None, Some("HTTP 503")),
            metric("NL", EnergyDataType::Actual, now - Duration::minutes(10), true, None, None),
        ];
        let (service, _) = seeded(rows, now).await;

        let report = service.analyze_failure_patterns(Duration::hours(1)).await.unwrap();
        assert_eq!(report.total_operations, 5);
        assert_eq!(report.failed_operations, 4);
        assert_eq!(report.by_area_code["DE"], 3);
        assert_eq!(report.by_error_pattern["Timeout"], 3);
        // DE carries 3/4 of failures, "Timeout" 3/4: both recommended.
        assert!(report.recommendations.iter().any(|r| r.contains("'DE'")));
        assert!(report.recommendations.iter().any(|r| r.contains("'Timeout'")));
    }

    #[tokio::test]
    async fn cleanup_respects_retention_window() {
        let now = at(2024, 3, 1, 12);
        let rows = vec![
            metric("DE", EnergyDataType::Actual, now - Duration::days(45), true, None, None),
            metric("DE", EnergyDataType::Actual, now - Duration::days(40), true, None, None),
            metric("DE", EnergyDataType::Actual, now - Duration::days(5), true, None, None),
        ];
        let (service, repos) = seeded(rows, now).await;

        let deleted = service.cleanup_old_metrics().await.unwrap();
        assert_eq!(deleted, 2);

        let remaining = repos
            .collection_metrics()
            .get_recent_metrics(now - Duration::days(60))
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
    }
}
