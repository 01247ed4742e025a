//! Job scheduler.
//!
//! Drives four jobs on interval / cron triggers, each in its own task:
//! real-time collection, gap analysis, daily backfill analysis (which also
//! runs metrics retention), and job health monitoring. Failed jobs retry
//! with exponential backoff and jitter until `max_retry_attempts`, then
//! wait for operator intervention. The job registry is persisted so a
//! restart re-registers the same jobs idempotently.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::application::services::backfill::BackfillService;
use crate::application::services::collection::EntsoeDataService;
use crate::application::services::monitoring::MonitoringService;
use crate::config::SchedulerSettings;
use crate::domain::repositories::RepositoryProvider;
use crate::infrastructure::database::entities::scheduler_job;
use crate::shared::clock::Clock;
use crate::shared::errors::SchedulerError;
use crate::shared::shutdown::ShutdownSignal;

/// The four jobs this scheduler owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobId {
    RealTimeCollection,
    GapAnalysis,
    DailyBackfillAnalysis,
    HealthCheck,
}

impl JobId {
    pub const ALL: [JobId; 4] = [
        JobId::RealTimeCollection,
        JobId::GapAnalysis,
        JobId::DailyBackfillAnalysis,
        JobId::HealthCheck,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobId::RealTimeCollection => "real_time_collection",
            JobId::GapAnalysis => "gap_analysis",
            JobId::DailyBackfillAnalysis => "daily_backfill_analysis",
            JobId::HealthCheck => "health_check",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            JobId::RealTimeCollection => "Real-Time Data Collection",
            JobId::GapAnalysis => "Gap Analysis",
            JobId::DailyBackfillAnalysis => "Daily Backfill Analysis",
            JobId::HealthCheck => "Job Health Monitor",
        }
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a scheduler lifecycle operation.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleExecutionResult {
    pub operation: &'static str,
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-job status for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub id: &'static str,
    pub name: &'static str,
    pub next_run_time: Option<DateTime<Utc>>,
    pub failure_count: u32,
    pub last_successful_run: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub is_running: bool,
    pub config_enabled: bool,
    pub jobs: Vec<JobStatus>,
}

#[derive(Default)]
struct Tracking {
    failure_counts: HashMap<JobId, u32>,
    last_successful_runs: HashMap<JobId, DateTime<Utc>>,
    next_run_times: HashMap<JobId, DateTime<Utc>>,
}

struct Lifecycle {
    running: bool,
    shutdown: Option<ShutdownSignal>,
    handles: Vec<JoinHandle<()>>,
}

/// Shared context cloned into every job task.
struct JobRunner {
    collection: Arc<EntsoeDataService>,
    backfill: Arc<BackfillService>,
    monitoring: Arc<MonitoringService>,
    config: SchedulerSettings,
    clock: Arc<dyn Clock>,
    tracking: Arc<StdMutex<Tracking>>,
    shutdown: ShutdownSignal,
}

pub struct SchedulerService {
    collection: Arc<EntsoeDataService>,
    backfill: Arc<BackfillService>,
    monitoring: Arc<MonitoringService>,
    db: DatabaseConnection,
    repos: Arc<dyn RepositoryProvider>,
    config: SchedulerSettings,
    clock: Arc<dyn Clock>,
    tracking: Arc<StdMutex<Tracking>>,
    lifecycle: Mutex<Lifecycle>,
}

impl SchedulerService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        collection: Arc<EntsoeDataService>,
        backfill: Arc<BackfillService>,
        monitoring: Arc<MonitoringService>,
        db: DatabaseConnection,
        repos: Arc<dyn RepositoryProvider>,
        config: SchedulerSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            collection,
            backfill,
            monitoring,
            db,
            repos,
            config,
            clock,
            tracking: Arc::new(StdMutex::new(Tracking::default())),
            lifecycle: Mutex::new(Lifecycle {
                running: false,
                shutdown: None,
                handles: Vec::new(),
            }),
        }
    }

    /// Start all configured jobs. Idempotent: a second call reports
    /// "already running" without touching the running jobs.
    pub async fn start(&self) -> Result<ScheduleExecutionResult, SchedulerError> {
        let mut lifecycle = self.lifecycle.lock().await;

        if lifecycle.running {
            return Ok(ScheduleExecutionResult {
                operation: "start",
                success: false,
                message: "Scheduler is already running".to_string(),
                timestamp: self.clock.now_utc(),
            });
        }

        if !self.config.enabled {
            return Ok(ScheduleExecutionResult {
                operation: "start",
                success: false,
                message: "Scheduler is disabled in configuration".to_string(),
                timestamp: self.clock.now_utc(),
            });
        }

        self.validate_configuration()?;
        self.validate_database_connectivity().await?;

        if self.config.use_persistent_job_store {
            self.register_jobs().await?;
        }

        let shutdown = ShutdownSignal::new();
        let runner = Arc::new(JobRunner {
            collection: self.collection.clone(),
            backfill: self.backfill.clone(),
            monitoring: self.monitoring.clone(),
            config: self.config.clone(),
            clock: self.clock.clone(),
            tracking: self.tracking.clone(),
            shutdown: shutdown.clone(),
        });

        let mut handles = Vec::new();

        if self.config.real_time_collection_enabled {
            handles.push(spawn_interval_job(
                runner.clone(),
                JobId::RealTimeCollection,
                std::time::Duration::from_secs(
                    self.config.real_time_collection_interval_minutes * 60,
                ),
            ));
            info!(
                interval_minutes = self.config.real_time_collection_interval_minutes,
                "Configured real-time collection job"
            );
        }

        if self.config.gap_analysis_enabled {
            handles.push(spawn_interval_job(
                runner.clone(),
                JobId::GapAnalysis,
                std::time::Duration::from_secs(self.config.gap_analysis_interval_hours * 3600),
            ));
            info!(
                interval_hours = self.config.gap_analysis_interval_hours,
                "Configured gap analysis job"
            );
        }

        if self.config.daily_backfill_analysis_enabled {
            handles.push(spawn_daily_job(
                runner.clone(),
                JobId::DailyBackfillAnalysis,
                self.config.daily_backfill_analysis_hour,
                self.config.daily_backfill_analysis_minute,
            ));
            info!(
                hour = self.config.daily_backfill_analysis_hour,
                minute = self.config.daily_backfill_analysis_minute,
                "Configured daily backfill analysis job"
            );
        }

        handles.push(spawn_interval_job(
            runner,
            JobId::HealthCheck,
            std::time::Duration::from_secs(self.config.job_health_check_interval_minutes * 60),
        ));
        info!(
            interval_minutes = self.config.job_health_check_interval_minutes,
            "Configured health check job"
        );

        lifecycle.running = true;
        lifecycle.shutdown = Some(shutdown);
        lifecycle.handles = handles;

        info!("Scheduler service started");
        Ok(ScheduleExecutionResult {
            operation: "start",
            success: true,
            message: "Scheduler service started successfully".to_string(),
            timestamp: self.clock.now_utc(),
        })
    }

    /// Stop the scheduler, waiting for running jobs to finish.
    pub async fn stop(&self) -> Result<ScheduleExecutionResult, SchedulerError> {
        let mut lifecycle = self.lifecycle.lock().await;

        if !lifecycle.running {
            return Ok(ScheduleExecutionResult {
                operation: "stop",
                success: true,
                message: "Scheduler is already stopped".to_string(),
                timestamp: self.clock.now_utc(),
            });
        }

        if let Some(shutdown) = lifecycle.shutdown.take() {
            shutdown.trigger();
        }
        for handle in lifecycle.handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "Scheduler job task panicked during shutdown");
            }
        }
        lifecycle.running = false;

        let mut tracking = self.tracking.lock().expect("tracking lock poisoned");
        tracking.failure_counts.clear();
        tracking.next_run_times.clear();

        info!("Scheduler service stopped");
        Ok(ScheduleExecutionResult {
            operation: "stop",
            success: true,
            message: "Scheduler service stopped successfully".to_string(),
            timestamp: self.clock.now_utc(),
        })
    }

    /// Current scheduler and per-job state.
    pub async fn get_status(&self) -> SchedulerStatus {
        let lifecycle = self.lifecycle.lock().await;
        let tracking = self.tracking.lock().expect("tracking lock poisoned");

        let jobs = JobId::ALL
            .iter()
            .map(|job| JobStatus {
                id: job.as_str(),
                name: job.display_name(),
                next_run_time: tracking.next_run_times.get(job).copied(),
                failure_count: tracking.failure_counts.get(job).copied().unwrap_or(0),
                last_successful_run: tracking.last_successful_runs.get(job).copied(),
            })
            .collect();

        SchedulerStatus {
            is_running: lifecycle.running,
            config_enabled: self.config.enabled,
            jobs,
        }
    }

    /// Manually trigger one real-time collection pass.
    pub async fn trigger_real_time_collection(
        &self,
    ) -> Result<ScheduleExecutionResult, SchedulerError> {
        let results = self
            .collection
            .collect_all_gaps_for_job(JobId::RealTimeCollection.as_str())
            .await;
        let total_points: usize = results
            .values()
            .flat_map(|area| area.values())
            .map(|r| r.stored_count)
            .sum();
        Ok(ScheduleExecutionResult {
            operation: "trigger_real_time_collection",
            success: true,
            message: format!("Real-time collection completed: {total_points} data points collected"),
            timestamp: self.clock.now_utc(),
        })
    }

    /// Manually trigger one gap analysis pass.
    pub async fn trigger_gap_analysis(&self) -> Result<ScheduleExecutionResult, SchedulerError> {
        let results = self
            .backfill
            .analyze_coverage(None, None, None)
            .await
            .map_err(|e| SchedulerError::Job {
                job_name: JobId::GapAnalysis.display_name().to_string(),
                message: e.to_string(),
            })?;
        let needing = results.iter().filter(|r| r.needs_backfill()).count();
        Ok(ScheduleExecutionResult {
            operation: "trigger_gap_analysis",
            success: true,
            message: format!("Gap analysis completed: {needing} areas/endpoints need backfill"),
            timestamp: self.clock.now_utc(),
        })
    }

    fn validate_configuration(&self) -> Result<(), SchedulerError> {
        if self.config.real_time_collection_enabled
            && self.config.real_time_collection_interval_minutes == 0
        {
            return Err(SchedulerError::Configuration {
                configuration_field: "real_time_collection_interval_minutes",
                message: "interval must be at least one minute".to_string(),
            });
        }
        if self.config.gap_analysis_enabled && self.config.gap_analysis_interval_hours == 0 {
            return Err(SchedulerError::Configuration {
                configuration_field: "gap_analysis_interval_hours",
                message: "interval must be at least one hour".to_string(),
            });
        }
        if self.config.job_health_check_interval_minutes == 0 {
            return Err(SchedulerError::Configuration {
                configuration_field: "job_health_check_interval_minutes",
                message: "interval must be at least one minute".to_string(),
            });
        }
        if self.config.daily_backfill_analysis_hour > 23
            || self.config.daily_backfill_analysis_minute > 59
        {
            return Err(SchedulerError::Configuration {
                configuration_field: "daily_backfill_analysis_hour",
                message: "cron trigger out of range".to_string(),
            });
        }
        Ok(())
    }

    /// Jobs need the database; fail fast if it is unreachable.
    async fn validate_database_connectivity(&self) -> Result<(), SchedulerError> {
        // The crate only ever builds a `sqlx-postgres` connection, so the backend
        // is fixed; avoid `self.db.get_database_backend()`, which panics for the
        // `Disconnected` variant instead of returning an error.
        let statement = Statement::from_string(sea_orm::DatabaseBackend::Postgres, "SELECT 1".to_string());
        self.db
            .query_one(statement)
            .await
            .map_err(|e| SchedulerError::Configuration {
                configuration_field: "database_connection",
                message: format!("database connectivity validation failed: {e}"),
            })?;
        debug!("Database connectivity validated");
        Ok(())
    }

    async fn register_jobs(&self) -> Result<(), SchedulerError> {
        let now = self.clock.now_utc();
        let registrations = [
            (
                JobId::RealTimeCollection,
                self.config.real_time_collection_enabled,
                format!("every {}m", self.config.real_time_collection_interval_minutes),
            ),
            (
                JobId::GapAnalysis,
                self.config.gap_analysis_enabled,
                format!("every {}h", self.config.gap_analysis_interval_hours),
            ),
            (
                JobId::DailyBackfillAnalysis,
                self.config.daily_backfill_analysis_enabled,
                format!(
                    "daily at {:02}:{:02} UTC",
                    self.config.daily_backfill_analysis_hour,
                    self.config.daily_backfill_analysis_minute
                ),
            ),
            (
                JobId::HealthCheck,
                true,
                format!("every {}m", self.config.job_health_check_interval_minutes),
            ),
        ];

        for (job, enabled, trigger) in registrations {
            self.repos
                .scheduler_jobs()
                .upsert(scheduler_job::Model {
                    id: job.as_str().to_string(),
                    job_name: job.display_name().to_string(),
                    trigger,
                    enabled,
                    created_at: now,
                    updated_at: now,
                })
                .await?;
        }
        debug!("Scheduler job registry updated");
        Ok(())
    }
}

// ── Job execution ───────────────────────────────────────────────

fn spawn_interval_job(
    runner: Arc<JobRunner>,
    job: JobId,
    period: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(if runner.config.job_defaults_coalesce {
            MissedTickBehavior::Skip
        } else {
            MissedTickBehavior::Burst
        });
        // The first tick fires immediately; jobs start one period in.
        interval.tick().await;

        loop {
            set_next_run(
                &runner,
                job,
                runner.clock.now_utc()
                    + Duration::milliseconds(period.as_millis() as i64),
            );
            tokio::select! {
                _ = interval.tick() => run_job(runner.clone(), job).await,
                _ = runner.shutdown.wait() => {
                    debug!(job = %job, "Job loop shutting down");
                    break;
                }
            }
        }
    })
}

fn spawn_daily_job(runner: Arc<JobRunner>, job: JobId, hour: u32, minute: u32) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = runner.clock.now_utc();
            let next = next_daily_occurrence(now, hour, minute);
            set_next_run(&runner, job, next);

            let sleep_for = (next - now)
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {
                    let woke_at = runner.clock.now_utc();
                    let grace =
                        Duration::seconds(runner.config.job_defaults_misfire_grace_time_seconds as i64);
                    if woke_at > next + grace {
                        warn!(job = %job, scheduled = %next, "Missed cron window, skipping run");
                        continue;
                    }
                    run_job(runner.clone(), job).await;
                }
                _ = runner.shutdown.wait() => {
                    debug!(job = %job, "Job loop shutting down");
                    break;
                }
            }
        }
    })
}

fn set_next_run(runner: &JobRunner, job: JobId, next: DateTime<Utc>) {
    runner
        .tracking
        .lock()
        .expect("tracking lock poisoned")
        .next_run_times
        .insert(job, next);
}

/// Next `hour:minute` UTC occurrence strictly after `now`.
pub(crate) fn next_daily_occurrence(now: DateTime<Utc>, hour: u32, minute: u32) -> DateTime<Utc> {
    let today = now
        .date_naive()
        .and_hms_opt(hour, minute, 0)
        .expect("validated cron trigger")
        .and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Backoff for attempt `failure_count` (1-based):
/// `min(base × 2^(n−1), max) + uniform(0.1, 0.3) × base × 2^(n−1)`.
pub(crate) fn compute_retry_delay(config: &SchedulerSettings, failure_count: u32) -> f64 {
    let exponential =
        config.retry_backoff_base_seconds * 2f64.powi(failure_count.saturating_sub(1) as i32);
    let capped = exponential.min(config.retry_backoff_max_seconds);
    let jitter = rand::thread_rng().gen_range(0.1..0.3) * exponential;
    capped + jitter
}

fn run_job(runner: Arc<JobRunner>, job: JobId) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        let started = runner.clock.now_utc();
        info!(job = %job, "Starting job");

        let outcome = execute_job(&runner, job).await;
        let elapsed = runner.clock.now_utc() - started;

        match outcome {
            Ok(summary) => {
                {
                    let mut tracking = runner.tracking.lock().expect("tracking lock poisoned");
                    tracking.failure_counts.remove(&job);
                    tracking
                        .last_successful_runs
                        .insert(job, runner.clock.now_utc());
                }
                info!(
                    job = %job,
                    elapsed_seconds = elapsed.num_seconds(),
                    "{summary}"
                );
            }
            Err(e) => handle_job_failure(runner.clone(), job, e).await,
        }
    })
}

async fn execute_job(runner: &JobRunner, job: JobId) -> Result<String, SchedulerError> {
    match job {
        JobId::RealTimeCollection => {
            let results = runner.collection.collect_all_gaps_for_job(job.as_str()).await;
            let total_points: usize = results
                .values()
                .flat_map(|area| area.values())
                .map(|r| r.stored_count)
                .sum();
            let successful = results
                .values()
                .flat_map(|area| area.values())
                .filter(|r| r.success)
                .count();
            Ok(format!(
                "Collection completed: {total_points} data points from {successful} successful endpoint collections"
            ))
        }
        JobId::GapAnalysis => {
            let results = runner
                .backfill
                .analyze_coverage(None, None, None)
                .await
                .map_err(|e| SchedulerError::Job {
                    job_name: job.display_name().to_string(),
                    message: e.to_string(),
                })?;
            let needing: Vec<String> = results
                .iter()
                .filter(|r| r.needs_backfill())
                .map(|r| {
                    format!(
                        "{}/{} ({:.1}%)",
                        r.area_code, r.endpoint_name, r.coverage_percentage
                    )
                })
                .collect();
            if !needing.is_empty() {
                warn!(
                    needing = %needing.join(", "),
                    "Areas/endpoints needing backfill"
                );
            }
            Ok(format!(
                "Gap analysis completed: {}/{} combinations need backfill",
                needing.len(),
                results.len()
            ))
        }
        JobId::DailyBackfillAnalysis => {
            // Report-only: never auto-starts backfills.
            let results = runner
                .backfill
                .analyze_coverage(None, None, None)
                .await
                .map_err(|e| SchedulerError::Job {
                    job_name: job.display_name().to_string(),
                    message: e.to_string(),
                })?;
            for result in results.iter().filter(|r| r.needs_backfill()) {
                info!(
                    area = %result.area_code,
                    endpoint = %result.endpoint_name,
                    coverage = result.coverage_percentage,
                    missing = result.total_missing_points(),
                    "Backfill needed"
                );
            }

            let deleted = runner
                .monitoring
                .cleanup_old_metrics()
                .await
                .map_err(|e| SchedulerError::Job {
                    job_name: job.display_name().to_string(),
                    message: e.to_string(),
                })?;

            Ok(format!(
                "Daily analysis completed: {} combinations analyzed, {deleted} old metrics removed",
                results.len()
            ))
        }
        JobId::HealthCheck => {
            let unhealthy: Vec<String> = {
                let tracking = runner.tracking.lock().expect("tracking lock poisoned");
                tracking
                    .failure_counts
                    .iter()
                    .filter(|(_, count)| **count >= runner.config.failed_job_notification_threshold)
                    .map(|(job, count)| format!("{job} ({count} failures)"))
                    .collect()
            };
            if !unhealthy.is_empty() {
                warn!(unhealthy = %unhealthy.join(", "), "Unhealthy jobs detected");
            }
            Ok(format!(
                "Health check completed: {} unhealthy jobs",
                unhealthy.len()
            ))
        }
    }
}

async fn handle_job_failure(runner: Arc<JobRunner>, job: JobId, error: SchedulerError) {
    let failure_count = {
        let mut tracking = runner.tracking.lock().expect("tracking lock poisoned");
        let count = tracking.failure_counts.entry(job).or_insert(0);
        *count += 1;
        *count
    };

    error!(job = %job, attempt = failure_count, error = %error, "Job failed");

    if failure_count >= runner.config.max_retry_attempts {
        error!(
            job = %job,
            max_retry_attempts = runner.config.max_retry_attempts,
            "Job exceeded maximum retry attempts; manual intervention required"
        );
        return;
    }

    let delay = compute_retry_delay(&runner.config, failure_count);
    info!(
        job = %job,
        retry_in_seconds = delay,
        attempt = failure_count + 1,
        "Scheduling job retry"
    );

    let retry_runner = runner.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_secs_f64(delay)) => {
                run_job(retry_runner.clone(), job).await;
            }
            _ = retry_runner.shutdown.wait() => {}
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn settings() -> SchedulerSettings {
        SchedulerSettings::default()
    }

    #[test]
    fn retry_delay_grows_exponentially_within_bounds() {
        let mut config = settings();
        config.retry_backoff_base_seconds = 60.0;
        config.retry_backoff_max_seconds = 3600.0;

        for _ in 0..50 {
            // attempt 1: 60 + jitter(6..18)
            let d1 = compute_retry_delay(&config, 1);
            assert!((66.0..78.0).contains(&d1), "attempt 1 delay {d1}");

            // attempt 3: 240 + jitter(24..72)
            let d3 = compute_retry_delay(&config, 3);
            assert!((264.0..312.0).contains(&d3), "attempt 3 delay {d3}");
        }
    }

    #[test]
    fn retry_delay_is_capped() {
        let mut config = settings();
        config.retry_backoff_base_seconds = 60.0;
        config.retry_backoff_max_seconds = 120.0;

        // attempt 5 exponential term is 960s; the fixed part caps at 120.
        for _ in 0..50 {
            let d5 = compute_retry_delay(&config, 5);
            let exponential = 60.0 * 2f64.powi(4);
            assert!(d5 >= 120.0 + 0.1 * exponential);
            assert!(d5 <= 120.0 + 0.3 * exponential);
        }
    }

    #[test]
    fn next_daily_occurrence_rolls_over_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 3, 0, 0).unwrap();
        let next = next_daily_occurrence(now, 2, 30);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 2, 2, 30, 0).unwrap());

        let now = Utc.with_ymd_and_hms(2024, 3, 1, 1, 0, 0).unwrap();
        let next = next_daily_occurrence(now, 2, 30);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 1, 2, 30, 0).unwrap());
    }

    #[test]
    fn next_daily_occurrence_skips_exact_match() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 2, 30, 0).unwrap();
        let next = next_daily_occurrence(now, 2, 30);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 2, 2, 30, 0).unwrap());
    }

    mod lifecycle {
        use super::*;

        use crate::application::services::test_support::{sample_load_document, MockCollector};
        use crate::config::{BackfillSettings, MonitoringSettings};
        use crate::domain::area::AreaCode;
        use crate::infrastructure::memory::InMemoryRepositoryProvider;
        use crate::shared::clock::ManualClock;

        fn scheduler_with(config: SchedulerSettings) -> SchedulerService {
            let collector = Arc::new(MockCollector::new(sample_load_document(1)));
            let repos: Arc<InMemoryRepositoryProvider> =
                Arc::new(InMemoryRepositoryProvider::new());
            let clock = Arc::new(ManualClock::new(
                Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            ));

            let collection = Arc::new(EntsoeDataService::new(
                collector.clone(),
                repos.clone(),
                clock.clone(),
                vec![AreaCode::GERMANY],
            ));
            let backfill = Arc::new(BackfillService::new(
                collector,
                repos.clone(),
                clock.clone(),
                BackfillSettings::default(),
            ));
            let monitoring = Arc::new(MonitoringService::new(
                repos.clone(),
                clock.clone(),
                MonitoringSettings::default(),
            ));

            SchedulerService::new(
                collection,
                backfill,
                monitoring,
                // Disconnected: any preflight query fails.
                DatabaseConnection::default(),
                repos,
                config,
                clock,
            )
        }

        #[tokio::test]
        async fn disabled_scheduler_refuses_to_start() {
            let mut config = settings();
            config.enabled = false;
            let scheduler = scheduler_with(config);

            let result = scheduler.start().await.unwrap();
            assert!(!result.success);
            assert!(result.message.contains("disabled"));
            assert!(!scheduler.get_status().await.is_running);
        }

        #[tokio::test]
        async fn preflight_failure_prevents_start() {
            let scheduler = scheduler_with(settings());

            let err = scheduler.start().await.unwrap_err();
            match err {
                SchedulerError::Configuration {
                    configuration_field,
                    ..
                } => assert_eq!(configuration_field, "database_connection"),
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[tokio::test]
        async fn invalid_interval_is_rejected_before_preflight() {
            let mut config = settings();
            config.real_time_collection_interval_minutes = 0;
            let scheduler = scheduler_with(config);

            let err = scheduler.start().await.unwrap_err();
            match err {
                SchedulerError::Configuration {
                    configuration_field,
                    ..
                } => assert_eq!(
                    configuration_field,
                    "real_time_collection_interval_minutes"
                ),
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[tokio::test]
        async fn stop_when_not_running_is_a_no_op() {
            let scheduler = scheduler_with(settings());
            let result = scheduler.stop().await.unwrap();
            assert!(result.success);
            assert!(result.message.contains("already stopped"));
        }
    }
}
