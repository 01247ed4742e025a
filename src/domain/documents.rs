//! Decoded ENTSO-E market documents.
//!
//! These mirror the structure of GL_MarketDocument (load / forecast data)
//! and Publication_MarketDocument (day-ahead prices) after XML decoding.
//! The transformer consumes them; the HTTP collector produces them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// ENTSO-E process type codes relevant to this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessType {
    #[serde(rename = "A01")]
    DayAhead,
    #[serde(rename = "A02")]
    IntraDayIncremental,
    #[serde(rename = "A16")]
    Realised,
    #[serde(rename = "A31")]
    WeekAhead,
    #[serde(rename = "A32")]
    MonthAhead,
    #[serde(rename = "A33")]
    YearAhead,
}

impl ProcessType {
    pub fn code(&self) -> &'static str {
        match self {
            ProcessType::DayAhead => "A01",
            ProcessType::IntraDayIncremental => "A02",
            ProcessType::Realised => "A16",
            ProcessType::WeekAhead => "A31",
            ProcessType::MonthAhead => "A32",
            ProcessType::YearAhead => "A33",
        }
    }
}

/// ENTSO-E document type codes relevant to this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    #[serde(rename = "A44")]
    PriceDocument,
    #[serde(rename = "A65")]
    SystemTotalLoad,
    #[serde(rename = "A70")]
    LoadForecastMargin,
}

impl DocumentType {
    pub fn code(&self) -> &'static str {
        match self {
            DocumentType::PriceDocument => "A44",
            DocumentType::SystemTotalLoad => "A65",
            DocumentType::LoadForecastMargin => "A70",
        }
    }
}

/// An EIC domain reference (`<outBiddingZone_Domain.mRID>…</...>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainId {
    #[serde(rename = "$text")]
    pub value: String,
}

impl DomainId {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// `<timeInterval>` of a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    #[serde(with = "entsoe_datetime")]
    pub start: DateTime<Utc>,
    #[serde(with = "entsoe_datetime")]
    pub end: DateTime<Utc>,
}

/// A single `<Point>` within a period. Load documents carry `quantity`,
/// price documents `price.amount`; either may be absent in degenerate
/// responses and such points are skipped by the transformer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub quantity: Option<Decimal>,
    #[serde(
        rename = "price.amount",
        default,
        with = "rust_decimal::serde::str_option"
    )]
    pub price_amount: Option<Decimal>,
}

/// `<Period>`: a time interval, a resolution, and the points inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPeriod {
    #[serde(rename = "timeInterval")]
    pub time_interval: TimeInterval,
    pub resolution: String,
    #[serde(rename = "Point", default)]
    pub points: Vec<SeriesPoint>,
}

/// One `<TimeSeries>` of a GL_MarketDocument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadTimeSeries {
    #[serde(rename = "mRID")]
    pub mrid: String,
    #[serde(rename = "businessType")]
    pub business_type: String,
    #[serde(rename = "objectAggregation")]
    pub object_aggregation: String,
    #[serde(rename = "outBiddingZone_Domain.mRID")]
    pub out_bidding_zone_domain: DomainId,
    #[serde(rename = "quantity_Measure_Unit.name")]
    pub quantity_measure_unit_name: String,
    #[serde(rename = "curveType")]
    pub curve_type: String,
    #[serde(rename = "Period")]
    pub period: SeriesPeriod,
}

/// GL_MarketDocument: system total load and load forecasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlMarketDocument {
    #[serde(rename = "mRID")]
    pub mrid: String,
    #[serde(rename = "revisionNumber", default)]
    pub revision_number: Option<i32>,
    #[serde(rename = "type")]
    pub document_type: DocumentType,
    #[serde(rename = "process.processType")]
    pub process_type: ProcessType,
    #[serde(rename = "createdDateTime", with = "entsoe_datetime")]
    pub created_date_time: DateTime<Utc>,
    #[serde(rename = "TimeSeries", default)]
    pub time_series: Vec<LoadTimeSeries>,
}

/// One `<TimeSeries>` of a Publication_MarketDocument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTimeSeries {
    #[serde(rename = "mRID")]
    pub mrid: String,
    #[serde(rename = "businessType")]
    pub business_type: String,
    #[serde(rename = "in_Domain.mRID")]
    pub in_domain: DomainId,
    #[serde(rename = "out_Domain.mRID")]
    pub out_domain: DomainId,
    #[serde(rename = "currency_Unit.name", default)]
    pub currency_unit_name: Option<String>,
    #[serde(rename = "price_Measure_Unit.name", default)]
    pub price_measure_unit_name: Option<String>,
    #[serde(rename = "auction.type", default)]
    pub auction_type: Option<String>,
    #[serde(rename = "contract_MarketAgreement.type", default)]
    pub contract_market_agreement_type: Option<String>,
    #[serde(rename = "curveType", default)]
    pub curve_type: Option<String>,
    #[serde(rename = "Period")]
    pub period: SeriesPeriod,
}

/// Publication_MarketDocument: day-ahead prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationMarketDocument {
    #[serde(rename = "mRID")]
    pub mrid: String,
    #[serde(rename = "revisionNumber", default)]
    pub revision_number: Option<i32>,
    #[serde(rename = "type")]
    pub document_type: DocumentType,
    #[serde(rename = "process.processType")]
    pub process_type: ProcessType,
    #[serde(rename = "createdDateTime", with = "entsoe_datetime")]
    pub created_date_time: DateTime<Utc>,
    #[serde(rename = "TimeSeries", default)]
    pub time_series: Vec<PriceTimeSeries>,
}

/// ENTSO-E timestamps come as RFC 3339 with or without seconds
/// (`2024-01-01T00:00Z`); accept both, emit RFC 3339.
pub mod entsoe_datetime {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(dt.with_timezone(&Utc));
        }
        if let Some(stripped) = raw.strip_suffix('Z') {
            if let Ok(naive) = NaiveDateTime::parse_from_str(stripped, "%Y-%m-%dT%H:%M") {
                return Ok(naive.and_utc());
            }
        }
        Err(format!("unrecognized ENTSO-E timestamp: {raw}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minute_precision_timestamps() {
        let dt = entsoe_datetime::parse("2024-01-01T00:00Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn parses_rfc3339_timestamps() {
        let dt = entsoe_datetime::parse("2024-06-15T10:30:00Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-06-15T10:30:00+00:00");
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert!(entsoe_datetime::parse("yesterday").is_err());
    }

    #[test]
    fn process_type_codes_round_trip() {
        assert_eq!(ProcessType::DayAhead.code(), "A01");
        assert_eq!(ProcessType::Realised.code(), "A16");
        assert_eq!(DocumentType::SystemTotalLoad.code(), "A65");
        assert_eq!(DocumentType::PriceDocument.code(), "A44");
    }
}
