//! HTTP implementation of the ENTSO-E collector port.
//!
//! Speaks the Transparency Platform REST API: security token and query
//! parameters on a GET, XML documents back. A 200 response carrying an
//! `Acknowledgement_MarketDocument` is the upstream's way of saying "no data
//! for this interval" and maps to the `Ok(None)` sentinel.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::CollectorSettings;
use crate::domain::area::AreaCode;
use crate::domain::collector::{CollectorResult, EntsoeCollector};
use crate::domain::documents::{DocumentType, GlMarketDocument, ProcessType, PublicationMarketDocument};
use crate::shared::errors::CollectorError;

const MAX_ERROR_BODY: usize = 512;

pub struct EntsoeHttpCollector {
    client: reqwest::Client,
    api_url: String,
    security_token: String,
}

impl EntsoeHttpCollector {
    pub fn new(settings: &CollectorSettings) -> Result<Self, CollectorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            api_url: settings.api_url.clone(),
            security_token: settings.security_token.clone(),
        })
    }

    /// ENTSO-E period parameters use minute precision: `yyyyMMddHHmm`.
    fn format_period(t: DateTime<Utc>) -> String {
        t.format("%Y%m%d%H%M").to_string()
    }

    async fn fetch(
        &self,
        operation: &'static str,
        params: Vec<(&'static str, String)>,
    ) -> Result<Option<String>, CollectorError> {
        let mut query = vec![("securityToken", self.security_token.clone())];
        query.extend(params);

        debug!(operation, "Requesting ENTSO-E API");

        let response = self
            .client
            .get(&self.api_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CollectorError::Timeout {
                        operation: operation.to_string(),
                    }
                } else {
                    CollectorError::Request(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let mut body = response.text().await.unwrap_or_default();
            body.truncate(MAX_ERROR_BODY);
            return Err(CollectorError::Http {
                status: status.as_u16(),
                retry_after,
                body,
            });
        }

        let body = response.text().await.map_err(CollectorError::Request)?;
        if body.contains("Acknowledgement_MarketDocument") {
            debug!(operation, "ENTSO-E acknowledged: no data for interval");
            return Ok(None);
        }
        Ok(Some(body))
    }

    async fn get_load_document(
        &self,
        operation: &'static str,
        document_type: DocumentType,
        process_type: ProcessType,
        bidding_zone: AreaCode,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> CollectorResult<GlMarketDocument> {
        let params = vec![
            ("documentType", document_type.code().to_string()),
            ("processType", process_type.code().to_string()),
            ("outBiddingZone_Domain", bidding_zone.code().to_string()),
            ("periodStart", Self::format_period(period_start)),
            ("periodEnd", Self::format_period(period_end)),
        ];

        let Some(body) = self.fetch(operation, params).await? else {
            return Ok(None);
        };

        let document: GlMarketDocument =
            quick_xml::de::from_str(&body).map_err(|e| CollectorError::Decode {
                reason: format!("{operation}: {e}"),
            })?;
        Ok(Some(document))
    }
}

#[async_trait]
impl EntsoeCollector for EntsoeHttpCollector {
    async fn get_actual_total_load(
        &self,
        bidding_zone: AreaCode,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> CollectorResult<GlMarketDocument> {
        self.get_load_document(
            "actual_total_load",
            DocumentType::SystemTotalLoad,
            ProcessType::Realised,
            bidding_zone,
            period_start,
            period_end,
        )
        .await
    }

    async fn get_day_ahead_load_forecast(
        &self,
        bidding_zone: AreaCode,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> CollectorResult<GlMarketDocument> {
        self.get_load_document(
            "day_ahead_load_forecast",
            DocumentType::SystemTotalLoad,
            ProcessType::DayAhead,
            bidding_zone,
            period_start,
            period_end,
        )
        .await
    }

    async fn get_week_ahead_load_forecast(
        &self,
        bidding_zone: AreaCode,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> CollectorResult<GlMarketDocument> {
        self.get_load_document(
            "week_ahead_load_forecast",
            DocumentType::SystemTotalLoad,
            ProcessType::WeekAhead,
            bidding_zone,
            period_start,
            period_end,
        )
        .await
    }

    async fn get_month_ahead_load_forecast(
        &self,
        bidding_zone: AreaCode,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> CollectorResult<GlMarketDocument> {
        self.get_load_document(
            "month_ahead_load_forecast",
            DocumentType::SystemTotalLoad,
            ProcessType::MonthAhead,
            bidding_zone,
            period_start,
            period_end,
        )
        .await
    }

    async fn get_year_ahead_load_forecast(
        &self,
        bidding_zone: AreaCode,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> CollectorResult<GlMarketDocument> {
        self.get_load_document(
            "year_ahead_load_forecast",
            DocumentType::SystemTotalLoad,
            ProcessType::YearAhead,
            bidding_zone,
            period_start,
            period_end,
        )
        .await
    }

    async fn get_year_ahead_forecast_margin(
        &self,
        bidding_zone: AreaCode,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> CollectorResult<GlMarketDocument> {
        self.get_load_document(
            "year_ahead_forecast_margin",
            DocumentType::LoadForecastMargin,
            ProcessType::YearAhead,
            bidding_zone,
            period_start,
            period_end,
        )
        .await
    }

    async fn get_day_ahead_prices(
        &self,
        bidding_zone: AreaCode,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> CollectorResult<PublicationMarketDocument> {
        let params = vec![
            ("documentType", DocumentType::PriceDocument.code().to_string()),
            ("in_Domain", bidding_zone.code().to_string()),
            ("out_Domain", bidding_zone.code().to_string()),
            ("periodStart", Self::format_period(period_start)),
            ("periodEnd", Self::format_period(period_end)),
        ];

        let Some(body) = self.fetch("day_ahead_prices", params).await? else {
            return Ok(None);
        };

        let document: PublicationMarketDocument =
            quick_xml::de::from_str(&body).map_err(|e| CollectorError::Decode {
                reason: format!("day_ahead_prices: {e}"),
            })?;
        Ok(Some(document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn period_format_is_minute_precision() {
        let t = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        assert_eq!(EntsoeHttpCollector::format_period(t), "202401080000");

        let t = Utc.with_ymd_and_hms(2023, 12, 31, 23, 45, 12).unwrap();
        assert_eq!(EntsoeHttpCollector::format_period(t), "202312312345");
    }

    #[test]
    fn decodes_gl_market_document() {
        let xml = r#"<GL_MarketDocument>
            <mRID>doc-1</mRID>
            <revisionNumber>1</revisionNumber>
            <type>A65</type>
            <process.processType>A16</process.processType>
            <createdDateTime>2024-01-08T00:05:00Z</createdDateTime>
            <TimeSeries>
                <mRID>ts-1</mRID>
                <businessType>A04</businessType>
                <objectAggregation>A01</objectAggregation>
                <outBiddingZone_Domain.mRID>10Y1001A1001A83F</outBiddingZone_Domain.mRID>
                <quantity_Measure_Unit.name>MAW</quantity_Measure_Unit.name>
                <curveType>A01</curveType>
                <Period>
                    <timeInterval>
                        <start>2024-01-07T00:00Z</start>
                        <end>2024-01-07T01:00Z</end>
                    </timeInterval>
                    <resolution>PT15M</resolution>
                    <Point><position>1</position><quantity>42000.5</quantity></Point>
                    <Point><position>2</position><quantity>41880.0</quantity></Point>
                </Period>
            </TimeSeries>
        </GL_MarketDocument>"#;

        let document: GlMarketDocument = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(document.mrid, "doc-1");
        assert_eq!(document.process_type, ProcessType::Realised);
        assert_eq!(document.document_type, DocumentType::SystemTotalLoad);
        assert_eq!(document.time_series.len(), 1);
        let series = &document.time_series[0];
        assert_eq!(series.out_bidding_zone_domain.value, "10Y1001A1001A83F");
        assert_eq!(series.period.points.len(), 2);
        assert_eq!(series.period.points[0].position, Some(1));
    }
}
