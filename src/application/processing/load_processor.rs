//! GL_MarketDocument → EnergyDataPoint transformation.
//!
//! Supported mappings:
//! - A01 (day ahead)  + A65 (system total load)     → day_ahead
//! - A16 (realised)   + A65 (system total load)     → actual
//! - A31 (week ahead)  + A65 (system total load)    → week_ahead
//! - A32 (month ahead) + A65 (system total load)    → month_ahead
//! - A33 (year ahead)  + A65 (system total load)    → year_ahead
//! - A33 (year ahead)  + A70 (load forecast margin) → forecast_margin

use tracing::debug;

use crate::domain::documents::{DocumentType, GlMarketDocument, LoadTimeSeries, ProcessType};
use crate::infrastructure::database::entities::energy_data_point::{self, EnergyDataType};
use crate::shared::errors::ProcessorError;

use super::{calculate_point_timestamp, extract_area_code};

const TYPE_MAPPING: &[((ProcessType, DocumentType), EnergyDataType)] = &[
    (
        (ProcessType::DayAhead, DocumentType::SystemTotalLoad),
        EnergyDataType::DayAhead,
    ),
    (
        (ProcessType::Realised, DocumentType::SystemTotalLoad),
        EnergyDataType::Actual,
    ),
    (
        (ProcessType::WeekAhead, DocumentType::SystemTotalLoad),
        EnergyDataType::WeekAhead,
    ),
    (
        (ProcessType::MonthAhead, DocumentType::SystemTotalLoad),
        EnergyDataType::MonthAhead,
    ),
    (
        (ProcessType::YearAhead, DocumentType::SystemTotalLoad),
        EnergyDataType::YearAhead,
    ),
    (
        (ProcessType::YearAhead, DocumentType::LoadForecastMargin),
        EnergyDataType::ForecastMargin,
    ),
];

/// Stateless transformer for load and load-forecast documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlMarketDocumentProcessor;

impl GlMarketDocumentProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Transform decoded documents into store-ready data points.
    ///
    /// Points with a missing position or quantity are skipped silently;
    /// everything else either transforms completely or fails with a
    /// [`ProcessorError`] naming the offending input.
    pub fn process(
        &self,
        documents: &[GlMarketDocument],
    ) -> Result<Vec<energy_data_point::Model>, ProcessorError> {
        let mut points = Vec::new();
        for document in documents {
            points.extend(self.process_document(document)?);
        }
        Ok(points)
    }

    fn process_document(
        &self,
        document: &GlMarketDocument,
    ) -> Result<Vec<energy_data_point::Model>, ProcessorError> {
        let data_type = map_to_energy_data_type(document.process_type, document.document_type)?;

        debug!(
            document_mrid = %document.mrid,
            time_series = document.time_series.len(),
            %data_type,
            "Processing GL_MarketDocument"
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
        document: &GlMarketDocument,
        time_series: &LoadTimeSeries,
    ) -> Result<Vec<energy_data_point::Model>, ProcessorError> {
        let area_code = extract_area_code(&time_series.out_bidding_zone_domain)?;
        let period = &time_series.period;

        let mut points = Vec::new();
        for point in &period.points {
            let (Some(position), Some(quantity)) = (point.position, point.quantity) else {
                continue;
            };

            let timestamp =
                calculate_point_timestamp(period.time_interval.start, &period.resolution, position)?;

            points.push(energy_data_point::Model {
                timestamp,
                area_code: area_code.clone(),
                data_type,
                business_type: time_series.business_type.clone(),
                quantity,
                unit: time_series.quantity_measure_unit_name.clone(),
                data_source: "entsoe".to_string(),
                document_mrid: document.mrid.clone(),
                revision_number: document.revision_number,
                document_created_at: document.created_date_time,
                time_series_mrid: time_series.mrid.clone(),
                resolution: period.resolution.clone(),
                curve_type: time_series.curve_type.clone(),
                object_aggregation: time_series.object_aggregation.clone(),
                position: position as i32,
                period_start: period.time_interval.start,
                period_end: period.time_interval.end,
                // Audit columns are stamped by the store on write.
                created_at: document.created_date_time,
                updated_at: document.created_date_time,
            });
        }

        debug!(
            time_series_mrid = %time_series.mrid,
            points = points.len(),
            "Processed TimeSeries"
        );

        Ok(points)
    }
}

/// Closed lookup from (process type, document type) to the store's data type.
pub(crate) fn map_to_energy_data_type(
    process_type: ProcessType,
    document_type: DocumentType,
) -> Result<EnergyDataType, ProcessorError> {
    TYPE_MAPPING
        .iter()
        .find(|((pt, dt), _)| *pt == process_type && *dt == document_type)
        .map(|(_, data_type)| *data_type)
        .ok_or_else(|| ProcessorError::Mapping {
            source_code: format!("{}+{}", process_type.code(), document_type.code()),
            available_mappings: TYPE_MAPPING
                .iter()
                .map(|((pt, dt), _)| format!("{}+{}", pt.code(), dt.code()))
                .collect(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use crate::domain::documents::{DomainId, SeriesPeriod, SeriesPoint, TimeInterval};

    fn sample_document(
        process_type: ProcessType,
        document_type: DocumentType,
        points: Vec<SeriesPoint>,
    ) -> GlMarketDocument {
        GlMarketDocument {
            mrid: "test-doc-1".to_string(),
            revision_number: Some(2),
            document_type,
            process_type,
            created_date_time: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            time_series: vec![LoadTimeSeries {
                mrid: "ts-1".to_string(),
                business_type: "A04".to_string(),
                object_aggregation: "A01".to_string(),
                out_bidding_zone_domain: DomainId::new("10Y1001A1001A83F"),
                quantity_measure_unit_name: "MAW".to_string(),
                curve_type: "A01".to_string(),
                period: SeriesPeriod {
                    time_interval: TimeInterval {
                        start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                        end: Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap(),
                    },
                    resolution: "PT15M".to_string(),
                    points,
                },
            }],
        }
    }

    fn quantity_point(position: i64, quantity: &str) -> SeriesPoint {
        SeriesPoint {
            position: Some(position),
            quantity: Some(quantity.parse::<Decimal>().unwrap()),
            price_amount: None,
        }
    }

    #[test]
    fn transforms_realised_load_document() {
        let document = sample_document(
            ProcessType::Realised,
            DocumentType::SystemTotalLoad,
            vec![
                quantity_point(1, "42000.500"),
                quantity_point(2, "41880.000"),
                quantity_point(3, "41775.250"),
            ],
        );

        let points = GlMarketDocumentProcessor::new().process(&[document]).unwrap();

        assert_eq!(points.len(), 3);
        let first = &points[0];
        assert_eq!(first.area_code, "DE");
        assert_eq!(first.data_type, EnergyDataType::Actual);
        assert_eq!(first.business_type, "A04");
        assert_eq!(first.document_mrid, "test-doc-1");
        assert_eq!(first.time_series_mrid, "ts-1");
        assert_eq!(first.resolution, "PT15M");
        assert_eq!(first.position, 1);
        assert_eq!(
            first.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            points[2].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 30, 0).unwrap()
        );
    }

    #[test]
    fn transform_is_deterministic() {
        let document = sample_document(
            ProcessType::DayAhead,
            DocumentType::SystemTotalLoad,
            vec![quantity_point(1, "100.000"), quantity_point(2, "200.000")],
        );

        let processor = GlMarketDocumentProcessor::new();
        let first = processor.process(std::slice::from_ref(&document)).unwrap();
        let second = processor.process(&[document]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn skips_points_without_position_or_quantity() {
        let document = sample_document(
            ProcessType::Realised,
            DocumentType::SystemTotalLoad,
            vec![
                quantity_point(1, "100.000"),
                SeriesPoint {
                    position: None,
                    quantity: Some(Decimal::new(200, 0)),
                    price_amount: None,
                },
                SeriesPoint {
                    position: Some(3),
                    quantity: None,
                    price_amount: None,
                },
                quantity_point(4, "400.000"),
            ],
        );

        let points = GlMarketDocumentProcessor::new().process(&[document]).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].position, 1);
        assert_eq!(points[1].position, 4);
    }

    #[test]
    fn forecast_margin_mapping() {
        let document = sample_document(
            ProcessType::YearAhead,
            DocumentType::LoadForecastMargin,
            vec![quantity_point(1, "5000.000")],
        );

        let points = GlMarketDocumentProcessor::new().process(&[document]).unwrap();
        assert_eq!(points[0].data_type, EnergyDataType::ForecastMargin);
    }

    #[test]
    fn rejects_unsupported_type_combination() {
        let document = sample_document(
            ProcessType::IntraDayIncremental,
            DocumentType::SystemTotalLoad,
            vec![quantity_point(1, "100.000")],
        );

        let err = GlMarketDocumentProcessor::new()
            .process(&[document])
            .unwrap_err();

        match err {
            ProcessorError::Mapping {
                source_code,
                available_mappings,
            } => {
                assert_eq!(source_code, "A02+A65");
                assert_eq!(available_mappings.len(), 6);
                assert!(available_mappings.contains(&"A16+A65".to_string()));
                assert!(available_mappings.contains(&"A33+A70".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn required_provenance_fields_are_populated() {
        let document = sample_document(
            ProcessType::Realised,
            DocumentType::SystemTotalLoad,
            vec![quantity_point(1, "100.000")],
        );

        let points = GlMarketDocumentProcessor::new().process(&[document]).unwrap();
        let point = &points[0];
        assert!(!point.document_mrid.is_empty());
        assert!(!point.time_series_mrid.is_empty());
        assert!(!point.resolution.is_empty());
        assert!(point.position >= 1);
        assert!(point.period_end > point.period_start);
    }
}
