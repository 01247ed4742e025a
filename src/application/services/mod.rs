//! Application services: collection, backfill, scheduling, monitoring.

pub mod backfill;
pub mod collection;
pub mod monitoring;
pub mod scheduler;

pub use backfill::{BackfillResult, BackfillService, CoverageAnalysis};
pub use collection::{CollectionResult, EndpointConfig, EndpointName, EntsoeDataService};
pub use monitoring::MonitoringService;
pub use scheduler::{ScheduleExecutionResult, SchedulerService};

#[cfg(test)]
pub(crate) mod test_support {
    //! Scripted collector and fixture builders shared by service tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal::Decimal;

    use crate::domain::area::AreaCode;
    use crate::domain::collector::{CollectorResult, EntsoeCollector};
    use crate::domain::documents::{
        DocumentType, DomainId, GlMarketDocument, LoadTimeSeries, PriceTimeSeries, ProcessType,
        PublicationMarketDocument, SeriesPeriod, SeriesPoint, TimeInterval,
    };
    use crate::infrastructure::database::entities::energy_data_point::{self, EnergyDataType};
    use crate::shared::errors::CollectorError;

    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub endpoint: &'static str,
        pub area: String,
        pub period_start: DateTime<Utc>,
        pub period_end: DateTime<Utc>,
    }

    /// Per-call behavior; an exhausted script falls back to `Document`.
    #[derive(Debug, Clone, Copy)]
    pub enum MockResponse {
        Document,
        NoData,
        HttpError(u16),
    }

    pub struct MockCollector {
        default_load: GlMarketDocument,
        default_price: Option<PublicationMarketDocument>,
        script: Mutex<VecDeque<MockResponse>>,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl MockCollector {
        pub fn new(default_load: GlMarketDocument) -> Self {
            Self {
                default_load,
                default_price: None,
                script: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn with_price(mut self, document: PublicationMarketDocument) -> Self {
            self.default_price = Some(document);
            self
        }

        pub fn script(&self, responses: Vec<MockResponse>) {
            let mut script = self.script.lock().unwrap();
            script.extend(responses);
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        fn next_response(&self) -> MockResponse {
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(MockResponse::Document)
        }

        fn record(
            &self,
            endpoint: &'static str,
            area: AreaCode,
            period_start: DateTime<Utc>,
            period_end: DateTime<Utc>,
        ) {
            self.calls.lock().unwrap().push(RecordedCall {
                endpoint,
                area: area.area_name().to_string(),
                period_start,
                period_end,
            });
        }

        fn respond_load(
            &self,
            endpoint: &'static str,
            area: AreaCode,
            period_start: DateTime<Utc>,
            period_end: DateTime<Utc>,
        ) -> CollectorResult<GlMarketDocument> {
            self.record(endpoint, area, period_start, period_end);
            match self.next_response() {
                MockResponse::Document => Ok(Some(self.default_load.clone())),
                MockResponse::NoData => Ok(None),
                MockResponse::HttpError(status) => Err(CollectorError::Http {
                    status,
                    retry_after: None,
                    body: String::new(),
                }),
            }
        }
    }

    #[async_trait]
    impl EntsoeCollector for MockCollector {
        async fn get_actual_total_load(
            &self,
            bidding_zone: AreaCode,
            period_start: DateTime<Utc>,
            period_end: DateTime<Utc>,
        ) -> CollectorResult<GlMarketDocument> {
            self.respond_load("actual_load", bidding_zone, period_start, period_end)
        }

        async fn get_day_ahead_load_forecast(
            &self,
            bidding_zone: AreaCode,
            period_start: DateTime<Utc>,
            period_end: DateTime<Utc>,
        ) -> CollectorResult<GlMarketDocument> {
            self.respond_load("day_ahead_forecast", bidding_zone, period_start, period_end)
        }

        async fn get_week_ahead_load_forecast(
            &self,
            bidding_zone: AreaCode,
            period_start: DateTime<Utc>,
            period_end: DateTime<Utc>,
        ) -> CollectorResult<GlMarketDocument> {
            self.respond_load("week_ahead_forecast", bidding_zone, period_start, period_end)
        }

        async fn get_month_ahead_load_forecast(
            &self,
            bidding_zone: AreaCode,
            period_start: DateTime<Utc>,
            period_end: DateTime<Utc>,
        ) -> CollectorResult<GlMarketDocument> {
            self.respond_load("month_ahead_forecast", bidding_zone, period_start, period_end)
        }

        async fn get_year_ahead_load_forecast(
            &self,
            bidding_zone: AreaCode,
            period_start: DateTime<Utc>,
            period_end: DateTime<Utc>,
        ) -> CollectorResult<GlMarketDocument> {
            self.respond_load("year_ahead_forecast", bidding_zone, period_start, period_end)
        }

        async fn get_year_ahead_forecast_margin(
            &self,
            bidding_zone: AreaCode,
            period_start: DateTime<Utc>,
            period_end: DateTime<Utc>,
        ) -> CollectorResult<GlMarketDocument> {
            self.respond_load("forecast_margin", bidding_zone, period_start, period_end)
        }

        async fn get_day_ahead_prices(
            &self,
            bidding_zone: AreaCode,
            period_start: DateTime<Utc>,
            period_end: DateTime<Utc>,
        ) -> CollectorResult<PublicationMarketDocument> {
            self.record("day_ahead_prices", bidding_zone, period_start, period_end);
            match self.next_response() {
                MockResponse::Document => Ok(self.default_price.clone()),
                MockResponse::NoData => Ok(None),
                MockResponse::HttpError(status) => Err(CollectorError::Http {
                    status,
                    retry_after: None,
                    body: String::new(),
                }),
            }
        }
    }

    /// A realised-load document for Germany whose single time series holds
    /// `point_count` quarter-hour points.
    pub fn sample_load_document(point_count: usize) -> GlMarketDocument {
        let period_start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let points = (1..=point_count as i64)
            .map(|position| SeriesPoint {
                position: Some(position),
                quantity: Some(Decimal::new(42_000_000 + position * 250, 3)),
                price_amount: None,
            })
            .collect();

        GlMarketDocument {
            mrid: "mock-doc".to_string(),
            revision_number: Some(1),
            document_type: DocumentType::SystemTotalLoad,
            process_type: ProcessType::Realised,
            created_date_time: period_start,
            time_series: vec![LoadTimeSeries {
                mrid: "mock-ts".to_string(),
                business_type: "A04".to_string(),
                object_aggregation: "A01".to_string(),
                out_bidding_zone_domain: DomainId::new("10Y1001A1001A83F"),
                quantity_measure_unit_name: "MAW".to_string(),
                curve_type: "A01".to_string(),
                period: SeriesPeriod {
                    time_interval: TimeInterval {
                        start: period_start,
                        end: period_start + chrono::Duration::minutes(15 * point_count as i64),
                    },
                    resolution: "PT15M".to_string(),
                    points,
                },
            }],
        }
    }

    /// A day-ahead price document for Germany with `point_count` hourly points.
    pub fn sample_price_document(point_count: usize) -> PublicationMarketDocument {
        let period_start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let points = (1..=point_count as i64)
            .map(|position| SeriesPoint {
                position: Some(position),
                quantity: None,
                price_amount: Some(Decimal::new(4_567 + position * 10, 2)),
            })
            .collect();

        PublicationMarketDocument {
            mrid: "mock-price-doc".to_string(),
            revision_number: Some(1),
            document_type: DocumentType::PriceDocument,
            process_type: ProcessType::DayAhead,
            created_date_time: period_start,
            time_series: vec![PriceTimeSeries {
                mrid: "mock-price-ts".to_string(),
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
                        start: period_start,
                        end: period_start + chrono::Duration::hours(point_count as i64),
                    },
                    resolution: "PT60M".to_string(),
                    points,
                },
            }],
        }
    }

    /// A bare data point for seeding store state in tests.
    pub fn sample_data_point() -> energy_data_point::Model {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        energy_data_point::Model {
            timestamp,
            area_code: "DE".to_string(),
            data_type: EnergyDataType::Actual,
            business_type: "A04".to_string(),
            quantity: Decimal::new(42_000_000, 3),
            unit: "MAW".to_string(),
            data_source: "entsoe".to_string(),
            document_mrid: "seed-doc".to_string(),
            revision_number: Some(1),
            document_created_at: timestamp,
            time_series_mrid: "seed-ts".to_string(),
            resolution: "PT15M".to_string(),
            curve_type: "A01".to_string(),
            object_aggregation: "A01".to_string(),
            position: 1,
            period_start: timestamp,
            period_end: timestamp + chrono::Duration::hours(1),
            created_at: timestamp,
            updated_at: timestamp,
        }
    }
}
