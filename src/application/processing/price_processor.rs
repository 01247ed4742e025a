//! Publication_MarketDocument → EnergyPricePoint transformation.
//!
//! Day-ahead prices are the only supported mapping: A01 (day ahead) + A44
//! (price document) → day_ahead.

use tracing::debug;

use crate::domain::documents::{
    DocumentType, PriceTimeSeries, ProcessType, PublicationMarketDocument,
};
use crate::infrastructure::database::entities::energy_data_point::EnergyDataType;
use crate::infrastructure::database::entities::energy_price_point;
use crate::shared::errors::ProcessorError;

use super::{calculate_point_timestamp, extract_area_code};

const DEFAULT_CURRENCY: &str = "EUR";
const DEFAULT_PRICE_MEASURE_UNIT: &str = "EUR/MWh";

/// Stateless transformer for day-ahead price documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicationMarketDocumentProcessor;

impl PublicationMarketDocumentProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn process(
        &self,
        documents: &[PublicationMarketDocument],
    ) -> Result<Vec<energy_price_point::Model>, ProcessorError> {
        let mut points = Vec::new();
        for document in documents {
            points.extend(self.process_document(document)?);
        }
        Ok(points)
    }

    fn process_document(
        &self,
        document: &PublicationMarketDocument,
    ) -> Result<Vec<energy_price_point::Model>, ProcessorError> {
        let data_type = map_to_energy_data_type(document.process_type, document.document_type)?;

        debug!(
            document_mrid = %document.mrid,
            time_series = document.time_series.len(),
            "Processing Publication_MarketDocument"
        );

        let mut points = Vec::new();
        for time_series in &document.time_series {
            points.extend(self.process_time_series(data_type, document, time_series)?);
        }
        Ok(points)
    }

    fn process_time_series(
        &self,
        data_type: EnergyDataType,
        document: &PublicationMarketDocument,
        time_series: &PriceTimeSeries,
    ) -> Result<Vec<energy_price_point::Model>, ProcessorError> {
        let area_code = extract_area_code(&time_series.out_domain)?;
        let period = &time_series.period;

        let currency = time_series
            .currency_unit_name
            .clone()
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        let price_measure_unit = time_series
            .price_measure_unit_name
            .clone()
            .unwrap_or_else(|| DEFAULT_PRICE_MEASURE_UNIT.to_string());

        let mut points = Vec::new();
        for point in &period.points {
            let (Some(position), Some(price_amount)) = (point.position, point.price_amount) else {
                continue;
            };

            let timestamp =
                calculate_point_timestamp(period.time_interval.start, &period.resolution, position)?;

            points.push(energy_price_point::Model {
                timestamp,
                area_code: area_code.clone(),
                data_type,
                business_type: time_series.business_type.clone(),
                price_amount,
                currency_unit_name: currency.clone(),
                price_measure_unit_name: price_measure_unit.clone(),
                auction_type: time_series.auction_type.clone(),
                contract_market_agreement_type: time_series.contract_market_agreement_type.clone(),
                data_source: "entsoe".to_string(),
                document_mrid: document.mrid.clone(),
                revision_number: document.revision_number,
                document_created_at: document.created_date_time,
                time_series_mrid: time_series.mrid.clone(),
                resolution: period.resolution.clone(),
                curve_type: time_series.curve_type.clone(),
                position: position as i32,
                period_start: period.time_interval.start,
                period_end: period.time_interval.end,
                // Audit columns are stamped by the store on write.
                created_at: document.created_date_time,
                updated_at: document.created_date_time,
            });
        }

        Ok(points)
    }
}

fn map_to_energy_data_type(
    process_type: ProcessType,
    document_type: DocumentType,
) -> Result<EnergyDataType, ProcessorError> {
    if process_type == ProcessType::DayAhead && document_type == DocumentType::PriceDocument {
        return Ok(EnergyDataType::DayAhead);
    }
    Err(ProcessorError::Mapping {
        source_code: format!("{}+{}", process_type.code(), document_type.code()),
        available_mappings: vec!["A01+A44".to_string()],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use crate::domain::documents::{DomainId, SeriesPeriod, SeriesPoint, TimeInterval};

    fn sample_document(points: Vec<SeriesPoint>) -> PublicationMarketDocument {
        PublicationMarketDocument {
            mrid: "price-doc-1".to_string(),
            revision_number: Some(1),
            document_type: DocumentType::PriceDocument,
            process_type: ProcessType::DayAhead,
            created_date_time: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            time_series: vec![PriceTimeSeries {
                mrid: "1".to_string(),
                business_type: "A62".to_string(),
                in_domain: DomainId::new("10Y1001A1001A83F"),
                out_domain: DomainId::new("10Y1001A1001A83F"),
                currency_unit_name: Some("EUR".to_string()),
                price_measure_unit_name: Some("EUR/MWh".to_string()),
                auction_type: Some("A01".to_string()),
                contract_market_agreement_type: Some("A01".to_string()),
                curve_type: Some("A03".to_string()),
                period: SeriesPeriod {
                    time_interval: TimeInterval {
                        start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                        end: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
                    },
                    resolution: "PT60M".to_string(),
                    points,
                },
            }],
        }
    }

    fn price_point(position: i64, amount: &str) -> SeriesPoint {
        SeriesPoint {
            position: Some(position),
            quantity: None,
            price_amount: Some(amount.parse::<Decimal>().unwrap()),
        }
    }

    #[test]
    fn transforms_day_ahead_prices() {
        let document = sample_document(vec![price_point(1, "45.67"), price_point(2, "48.10")]);

        let points = PublicationMarketDocumentProcessor::new()
            .process(&[document])
            .unwrap();

        assert_eq!(points.len(), 2);
        let first = &points[0];
        assert_eq!(first.area_code, "DE");
        assert_eq!(first.data_type, EnergyDataType::DayAhead);
        assert_eq!(first.business_type, "A62");
        assert_eq!(first.price_amount, "45.67".parse::<Decimal>().unwrap());
        assert_eq!(first.currency_unit_name, "EUR");
        assert_eq!(first.auction_type.as_deref(), Some("A01"));
        assert_eq!(
            points[1].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap()
        );
    }

    #[test]
    fn defaults_currency_and_measure_unit() {
        let mut document = sample_document(vec![price_point(1, "45.67")]);
        document.time_series[0].currency_unit_name = None;
        document.time_series[0].price_measure_unit_name = None;

        let points = PublicationMarketDocumentProcessor::new()
            .process(&[document])
            .unwrap();

        assert_eq!(points[0].currency_unit_name, "EUR");
        assert_eq!(points[0].price_measure_unit_name, "EUR/MWh");
    }

    #[test]
    fn skips_points_without_price() {
        let mut document = sample_document(vec![price_point(1, "45.67")]);
        document.time_series[0].period.points.push(SeriesPoint {
            position: Some(2),
            quantity: None,
            price_amount: None,
        });

        let points = PublicationMarketDocumentProcessor::new()
            .process(&[document])
            .unwrap();
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn rejects_non_day_ahead_process() {
        let mut document = sample_document(vec![price_point(1, "45.67")]);
        document.process_type = ProcessType::Realised;

        let err = PublicationMarketDocumentProcessor::new()
            .process(&[document])
            .unwrap_err();
        match err {
            ProcessorError::Mapping { source_code, .. } => assert_eq!(source_code, "A16+A44"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
