//! Collection metrics entity.
//!
//! Append-only record of every collection attempt; the monitoring engine
//! reads these, a retention job deletes old ones.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::energy_data_point::EnergyDataType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "collection_metrics")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Scheduler job identifier for correlation
    pub job_id: String,

    pub area_code: String,

    pub data_type: EnergyDataType,

    pub collection_start: DateTimeUtc,

    pub collection_end: DateTimeUtc,

    pub points_collected: i32,

    pub success: bool,

    #[sea_orm(nullable)]
    pub error_message: Option<String>,

    /// API response time in milliseconds
    #[sea_orm(nullable, column_type = "Double")]
    pub api_response_time: Option<f64>,

    /// Processing time in milliseconds
    #[sea_orm(nullable, column_type = "Double")]
    pub processing_time: Option<f64>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn collection_duration_seconds(&self) -> f64 {
        (self.collection_end - self.collection_start).num_milliseconds() as f64 / 1000.0
    }

    pub fn collection_rate_points_per_second(&self) -> f64 {
        let duration = self.collection_duration_seconds();
        if duration <= 0.0 {
            return 0.0;
        }
        self.points_collected as f64 / duration
    }
}
