//! Energy price point entity (day-ahead market prices).
//!
//! Same composite-key shape as the load table for consistent querying.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::energy_data_point::EnergyDataType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "energy_price_points")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub timestamp: DateTimeUtc,

    #[sea_orm(primary_key, auto_increment = false)]
    pub area_code: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub data_type: EnergyDataType,

    #[sea_orm(primary_key, auto_increment = false)]
    pub business_type: String,

    /// Price per `price_measure_unit_name` in `currency_unit_name`
    #[sea_orm(column_type = "Decimal(Some((15, 6)))")]
    pub price_amount: Decimal,

    pub currency_unit_name: String,

    pub price_measure_unit_name: String,

    #[sea_orm(nullable)]
    pub auction_type: Option<String>,

    #[sea_orm(nullable)]
    pub contract_market_agreement_type: Option<String>,

    pub data_source: String,

    // Provenance
    pub document_mrid: String,

    #[sea_orm(nullable)]
    pub revision_number: Option<i32>,

    pub document_created_at: DateTimeUtc,

    pub time_series_mrid: String,

    pub resolution: String,

    #[sea_orm(nullable)]
    pub curve_type: Option<String>,

    pub position: i32,

    pub period_start: DateTimeUtc,

    pub period_end: DateTimeUtc,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
