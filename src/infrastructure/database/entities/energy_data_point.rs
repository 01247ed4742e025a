//! Energy data point entity (load and load forecasts).
//!
//! Composite primary key `(timestamp, area_code, data_type, business_type)`;
//! the backing table is a TimescaleDB hypertable partitioned on `timestamp`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Internal classification of a data point.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum EnergyDataType {
    #[sea_orm(string_value = "actual")]
    Actual,
    #[sea_orm(string_value = "day_ahead")]
    DayAhead,
    #[sea_orm(string_value = "week_ahead")]
    WeekAhead,
    #[sea_orm(string_value = "month_ahead")]
    MonthAhead,
    #[sea_orm(string_value = "year_ahead")]
    YearAhead,
    #[sea_orm(string_value = "forecast_margin")]
    ForecastMargin,
}

impl EnergyDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Actual => "actual",
            Self::DayAhead => "day_ahead",
            Self::WeekAhead => "week_ahead",
            Self::MonthAhead => "month_ahead",
            Self::YearAhead => "year_ahead",
            Self::ForecastMargin => "forecast_margin",
        }
    }
}

impl std::fmt::Display for EnergyDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "energy_data_points")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub timestamp: DateTimeUtc,

    #[sea_orm(primary_key, auto_increment = false)]
    pub area_code: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub data_type: EnergyDataType,

    #[sea_orm(primary_key, auto_increment = false)]
    pub business_type: String,

    /// Load in `unit` (typically MAW)
    #[sea_orm(column_type = "Decimal(Some((15, 3)))")]
    pub quantity: Decimal,

    pub unit: String,

    pub data_source: String,

    // Provenance
    pub document_mrid: String,

    #[sea_orm(nullable)]
    pub revision_number: Option<i32>,

    pub document_created_at: DateTimeUtc,

    pub time_series_mrid: String,

    /// ISO 8601 duration between successive points (e.g. "PT15M")
    pub resolution: String,

    pub curve_type: String,

    pub object_aggregation: String,

    /// 1-based position within the source time series period
    pub position: i32,

    pub period_start: DateTimeUtc,

    pub period_end: DateTimeUtc,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
