//! Error types for every subsystem.
//!
//! Expected outcomes (partial collections, failed chunks) travel as result
//! values; these enums cover the exceptional paths and carry enough domain
//! context to diagnose a failure from the log line alone.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Document transformation failures (processor layer).
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("unsupported ProcessType+DocumentType combination: {source_code} (supported: {})", available_mappings.join(", "))]
    Mapping {
        source_code: String,
        available_mappings: Vec<String>,
    },

    #[error("failed to calculate timestamp for position {position} (resolution {resolution}, period start {period_start})")]
    Timestamp {
        resolution: String,
        period_start: DateTime<Utc>,
        position: i64,
    },

    #[error("transformation failed for {source_value}: {reason}")]
    Transform { source_value: String, reason: String },

    #[error("document {document_mrid} failed structural validation at {stage}: {reason}")]
    DocumentParsing {
        document_mrid: String,
        stage: &'static str,
        reason: String,
    },
}

/// Storage-layer failures, surfaced by all repositories.
#[derive(Debug, Error)]
pub enum DataAccessError {
    #[error("{model_type}.{operation} failed ({context}): {source}")]
    Query {
        model_type: &'static str,
        operation: &'static str,
        context: String,
        #[source]
        source: sea_orm::DbErr,
    },

    #[error("{model_type}.upsert_batch failed for batch of {batch_size}: {source}")]
    BatchUpsert {
        model_type: &'static str,
        batch_size: usize,
        #[source]
        source: sea_orm::DbErr,
    },

    #[error("{model_type} with id {id} not found")]
    NotFound { model_type: &'static str, id: String },
}

/// Upstream API failures, classified for retry decisions.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("ENTSO-E API returned HTTP {status}{}", retry_after.map(|s| format!(" (retry after {s}s)")).unwrap_or_default())]
    Http {
        status: u16,
        retry_after: Option<u64>,
        body: String,
    },

    #[error("ENTSO-E API request timed out for {operation}")]
    Timeout { operation: String },

    #[error("ENTSO-E API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to decode ENTSO-E response: {reason}")]
    Decode { reason: String },
}

impl CollectorError {
    /// Timeouts, transport errors, 5xx, and rate limits with a Retry-After
    /// hint are worth retrying; other 4xx responses are permanent.
    pub fn is_retriable(&self) -> bool {
        match self {
            CollectorError::Timeout { .. } => true,
            CollectorError::Request(_) => true,
            CollectorError::Http {
                status, retry_after, ..
            } => *status >= 500 || (*status == 429 && retry_after.is_some()),
            CollectorError::Decode { .. } => false,
        }
    }
}

/// Backfill-scoped failures.
#[derive(Debug, Error)]
pub enum BackfillError {
    #[error("coverage analysis failed for {area_code}/{endpoint_name}: {reason}")]
    Coverage {
        area_code: String,
        endpoint_name: String,
        reason: String,
    },

    #[error("backfill {} {reason}", backfill_id.map(|id| id.to_string()).unwrap_or_else(|| "<unsaved>".into()))]
    Progress {
        backfill_id: Option<i32>,
        reason: String,
    },

    #[error("{resource_type} limit exceeded ({current}/{limit})")]
    Resource {
        resource_type: &'static str,
        limit: usize,
        current: usize,
    },

    #[error("cannot chunk period {period_start}..{period_end} with chunk size {chunk_size_days} days")]
    Chunking {
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        chunk_size_days: i64,
    },

    #[error("unknown area code: {area_code}")]
    UnknownArea { area_code: String },

    #[error("unknown endpoint name: {endpoint_name}")]
    UnknownEndpoint { endpoint_name: String },

    #[error(transparent)]
    DataAccess(#[from] DataAccessError),

    #[error(transparent)]
    Collector(#[from] CollectorError),

    #[error(transparent)]
    Processor(#[from] ProcessorError),
}

/// Scheduler-scoped failures.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler {operation} failed: expected state {expected_state}, actual {actual_state}")]
    State {
        expected_state: &'static str,
        actual_state: &'static str,
        operation: &'static str,
    },

    #[error("job {job_name} failed: {message}")]
    Job { job_name: String, message: String },

    #[error("scheduler configuration invalid ({configuration_field}): {message}")]
    Configuration {
        configuration_field: &'static str,
        message: String,
    },

    #[error(transparent)]
    DataAccess(#[from] DataAccessError),
}

/// Monitoring-engine failures.
#[derive(Debug, Error)]
pub enum MonitoringError {
    #[error("monitoring operation {operation} received invalid input: {reason}")]
    InvalidInput {
        operation: &'static str,
        reason: String,
    },

    #[error(transparent)]
    DataAccess(#[from] DataAccessError),
}
