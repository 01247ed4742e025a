//! Document transformation (decoded ENTSO-E documents → typed data points).
//!
//! Both processors are pure: no I/O, deterministic output for a given
//! document. Shared pieces (area-code extraction, point timestamp
//! calculation) live here.

pub mod duration;
mod load_processor;
mod price_processor;

pub use load_processor::GlMarketDocumentProcessor;
pub use price_processor::PublicationMarketDocumentProcessor;

use chrono::{DateTime, Utc};

use crate::domain::area::AreaCode;
use crate::domain::documents::DomainId;
use crate::shared::errors::ProcessorError;

/// Extract the store's area code from a domain MRID.
///
/// Resolution order: the zone's country code, then a trailing `(XX)` in its
/// description, then the whitespace-stripped description truncated to 10
/// characters. An EIC code missing from the registry fails outright.
pub(crate) fn extract_area_code(domain: &DomainId) -> Result<String, ProcessorError> {
    let Some(area) = AreaCode::from_eic(&domain.value) else {
        return Err(ProcessorError::Transform {
            source_value: domain.value.clone(),
            reason: "domain MRID not in area registry".to_string(),
        });
    };

    if let Some(country_code) = area.country_code() {
        return Ok(country_code.to_string());
    }

    let description = area.description().trim();
    if let Some(code) = parenthesized_country_code(description) {
        return Ok(code);
    }

    let stripped: String = description.chars().filter(|c| !c.is_whitespace()).collect();
    if stripped.is_empty() {
        return Err(ProcessorError::Transform {
            source_value: domain.value.clone(),
            reason: "area has neither country code nor description".to_string(),
        });
    }
    Ok(stripped.chars().take(10).collect())
}

/// First `(XX)` occurrence with two uppercase ASCII letters.
fn parenthesized_country_code(description: &str) -> Option<String> {
    let bytes = description.as_bytes();
    for i in 0..bytes.len().saturating_sub(3) {
        if bytes[i] == b'('
            && bytes[i + 1].is_ascii_uppercase()
            && bytes[i + 2].is_ascii_uppercase()
            && bytes[i + 3] == b')'
        {
            return Some(description[i + 1..i + 3].to_string());
        }
    }
    None
}

/// Timestamp of the point at 1-based `position` within a period.
///
/// `timestamp = period_start + (position - 1) × resolution`, with calendar
/// arithmetic for year/month resolutions.
pub(crate) fn calculate_point_timestamp(
    period_start: DateTime<Utc>,
    resolution: &str,
    position: i64,
) -> Result<DateTime<Utc>, ProcessorError> {
    let timestamp_error = || ProcessorError::Timestamp {
        resolution: resolution.to_string(),
        period_start,
        position,
    };

    let components = duration::parse_iso_duration(resolution).ok_or_else(timestamp_error)?;
    duration::advance(period_start, components, position - 1).ok_or_else(timestamp_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn area_extraction_prefers_country_code() {
        let domain = DomainId::new("10Y1001A1001A83F");
        assert_eq!(extract_area_code(&domain).unwrap(), "DE");
    }

    #[test]
    fn area_extraction_falls_back_to_description() {
        // IRELAND_SEM has no country code; its description carries "(IE)"
        let domain = DomainId::new("10Y1001A1001A59C");
        assert_eq!(extract_area_code(&domain).unwrap(), "IE");
    }

    #[test]
    fn unknown_domain_fails_with_source_value() {
        let domain = DomainId::new("99XUNKNOWN-----X");
        let err = extract_area_code(&domain).unwrap_err();
        match err {
            ProcessorError::Transform { source_value, .. } => {
                assert_eq!(source_value, "99XUNKNOWN-----X");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn timestamp_law_for_time_only_resolutions() {
        let period_start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for position in 1..=96 {
            let expected = period_start + chrono::Duration::minutes(15 * (position - 1));
            let actual = calculate_point_timestamp(period_start, "PT15M", position).unwrap();
            assert_eq!(actual, expected, "position {position}");
        }
    }

    #[test]
    fn unparseable_resolution_carries_context() {
        let period_start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let err = calculate_point_timestamp(period_start, "quarterly", 3).unwrap_err();
        match err {
            ProcessorError::Timestamp {
                resolution,
                period_start: start,
                position,
            } => {
                assert_eq!(resolution, "quarterly");
                assert_eq!(start, period_start);
                assert_eq!(position, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
