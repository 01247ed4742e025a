//! Backfill progress entity.
//!
//! One row per backfill operation; mutated at every chunk boundary so a
//! process kill leaves the record accurate and resumable.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Backfill operation lifecycle.
///
/// `completed` and `cancelled` are terminal; `failed` records with
/// `completed_chunks > 0` may be resumed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum BackfillStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl BackfillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for BackfillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "backfill_progress")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub area_code: String,

    pub endpoint_name: String,

    pub period_start: DateTimeUtc,

    pub period_end: DateTimeUtc,

    pub status: BackfillStatus,

    /// Derived: 100 × completed_chunks / total_chunks
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub progress_percentage: Decimal,

    #[sea_orm(nullable)]
    pub current_chunk_start: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub current_chunk_end: Option<DateTimeUtc>,

    pub total_chunks: i32,

    pub completed_chunks: i32,

    pub failed_chunks: i32,

    pub total_data_points: i64,

    #[sea_orm(nullable)]
    pub last_error: Option<String>,

    #[sea_orm(nullable)]
    pub started_at: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub completed_at: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub estimated_completion: Option<DateTimeUtc>,

    // Config snapshot for this operation
    pub chunk_size_days: i32,

    #[sea_orm(column_type = "Decimal(Some((4, 2)))")]
    pub rate_limit_delay: Decimal,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            BackfillStatus::Pending | BackfillStatus::InProgress
        )
    }

    /// Failed or pending operations that already made progress can resume.
    pub fn can_be_resumed(&self) -> bool {
        matches!(
            self.status,
            BackfillStatus::Failed | BackfillStatus::Pending
        ) && self.completed_chunks > 0
    }

    pub fn remaining_chunks(&self) -> i32 {
        (self.total_chunks - self.completed_chunks).max(0)
    }

    /// Share of chunks completed without failure, in percent.
    pub fn success_rate(&self) -> Decimal {
        if self.total_chunks == 0 {
            return Decimal::ZERO;
        }
        let successful = self.completed_chunks - self.failed_chunks;
        (Decimal::from(successful) * Decimal::from(100) / Decimal::from(self.total_chunks))
            .round_dp(2)
    }
}

/// 100 × completed / total, rounded to two decimals; zero when `total == 0`.
pub fn progress_percentage(completed_chunks: i32, total_chunks: i32) -> Decimal {
    if total_chunks <= 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(completed_chunks) * Decimal::from(100) / Decimal::from(total_chunks)).round_dp(2)
}
