//! Upstream API port.
//!
//! One method per ENTSO-E query family. `Ok(None)` is the explicit
//! "the upstream acknowledges no data for this interval" sentinel; every
//! other failure surfaces as a classified [`CollectorError`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::area::AreaCode;
use crate::domain::documents::{GlMarketDocument, PublicationMarketDocument};
use crate::shared::errors::CollectorError;

pub type CollectorResult<T> = Result<Option<T>, CollectorError>;

#[async_trait]
pub trait EntsoeCollector: Send + Sync {
    async fn get_actual_total_load(
        &self,
        bidding_zone: AreaCode,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> CollectorResult<GlMarketDocument>;

    async fn get_day_ahead_load_forecast(
        &self,
        bidding_zone: AreaCode,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> CollectorResult<GlMarketDocument>;

    async fn get_week_ahead_load_forecast(
        &self,
        bidding_zone: AreaCode,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> CollectorResult<GlMarketDocument>;

    async fn get_month_ahead_load_forecast(
        &self,
        bidding_zone: AreaCode,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> CollectorResult<GlMarketDocument>;

    async fn get_year_ahead_load_forecast(
        &self,
        bidding_zone: AreaCode,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> CollectorResult<GlMarketDocument>;

    async fn get_year_ahead_forecast_margin(
        &self,
        bidding_zone: AreaCode,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> CollectorResult<GlMarketDocument>;

    async fn get_day_ahead_prices(
        &self,
        bidding_zone: AreaCode,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> CollectorResult<PublicationMarketDocument>;
}
