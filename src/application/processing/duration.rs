//! ISO 8601 duration parsing and calendar-aware arithmetic.
//!
//! ENTSO-E resolutions range from `PT15M` to `P1Y`. Year and month
//! components advance with calendar arithmetic (variable month lengths,
//! leap years); day/hour/minute components advance with absolute
//! arithmetic. Mixed forms like `P1DT2H30M` combine both.

use chrono::{DateTime, Duration, Months, Utc};

/// Components of an ISO 8601 duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DurationComponents {
    pub years: u32,
    pub months: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
}

impl DurationComponents {
    fn is_zero(&self) -> bool {
        self.years == 0 && self.months == 0 && self.days == 0 && self.hours == 0 && self.minutes == 0
    }
}

/// Parse an ISO 8601 duration string (`PT15M`, `P1D`, `P1Y`, `P1DT2H30M`).
///
/// Returns `None` for malformed input and for durations whose components
/// are all zero (a zero resolution can never space out points).
pub fn parse_iso_duration(duration: &str) -> Option<DurationComponents> {
    let rest = duration.strip_prefix('P')?;

    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => (date, time),
        None => (rest, ""),
    };

    let mut components = DurationComponents::default();

    for (designator, value) in parse_designators(date_part)? {
        match designator {
            'Y' => components.years = value,
            'M' => components.months = value,
            'D' => components.days = value,
            _ => return None,
        }
    }

    for (designator, value) in parse_designators(time_part)? {
        match designator {
            'H' => components.hours = value,
            'M' => components.minutes = value,
            _ => return None,
        }
    }

    if components.is_zero() {
        return None;
    }
    Some(components)
}

/// Split `"1DT..."`-style segments into `(designator, value)` pairs.
fn parse_designators(part: &str) -> Option<Vec<(char, u32)>> {
    let mut pairs = Vec::new();
    let mut digits = String::new();
    for c in part.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if c.is_ascii_uppercase() {
            if digits.is_empty() {
                return None;
            }
            pairs.push((c, digits.parse().ok()?));
            digits.clear();
        } else {
            return None;
        }
    }
    if !digits.is_empty() {
        // trailing digits without a designator
        return None;
    }
    Some(pairs)
}

/// Advance `start` by `offset` multiples of the duration.
///
/// Calendar components first (months clamp to the target month's last day,
/// so Jan 31 + P1M lands on Feb 28/29), then the absolute remainder.
pub fn advance(
    start: DateTime<Utc>,
    components: DurationComponents,
    offset: i64,
) -> Option<DateTime<Utc>> {
    if offset < 0 {
        return None;
    }

    let mut timestamp = start;

    let months_per_step = u64::from(components.years) * 12 + u64::from(components.months);
    let total_months = months_per_step.checked_mul(offset as u64)?;
    if total_months > 0 {
        timestamp = timestamp.checked_add_months(Months::new(u32::try_from(total_months).ok()?))?;
    }

    let absolute = Duration::days(i64::from(components.days).checked_mul(offset)?)
        + Duration::hours(i64::from(components.hours).checked_mul(offset)?)
        + Duration::minutes(i64::from(components.minutes).checked_mul(offset)?);
    timestamp.checked_add_signed(absolute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn parses_time_only_durations() {
        assert_eq!(
            parse_iso_duration("PT15M"),
            Some(DurationComponents {
                minutes: 15,
                ..Default::default()
            })
        );
        assert_eq!(
            parse_iso_duration("PT1H"),
            Some(DurationComponents {
                hours: 1,
                ..Default::default()
            })
        );
    }

    #[test]
    fn parses_date_only_durations() {
        assert_eq!(
            parse_iso_duration("P1D"),
            Some(DurationComponents {
                days: 1,
                ..Default::default()
            })
        );
        assert_eq!(
            parse_iso_duration("P7D"),
            Some(DurationComponents {
                days: 7,
                ..Default::default()
            })
        );
        assert_eq!(
            parse_iso_duration("P1Y"),
            Some(DurationComponents {
                years: 1,
                ..Default::default()
            })
        );
        assert_eq!(
            parse_iso_duration("P1M"),
            Some(DurationComponents {
                months: 1,
                ..Default::default()
            })
        );
    }

    #[test]
    fn parses_mixed_durations() {
        assert_eq!(
            parse_iso_duration("P1DT2H30M"),
            Some(DurationComponents {
                days: 1,
                hours: 2,
                minutes: 30,
                ..Default::default()
            })
        );
    }

    #[test]
    fn rejects_malformed_durations() {
        assert_eq!(parse_iso_duration(""), None);
        assert_eq!(parse_iso_duration("15M"), None);
        assert_eq!(parse_iso_duration("P"), None);
        assert_eq!(parse_iso_duration("PT"), None);
        assert_eq!(parse_iso_duration("P1X"), None);
        assert_eq!(parse_iso_duration("PT0M"), None);
        assert_eq!(parse_iso_duration("P12"), None);
    }

    #[test]
    fn advances_with_absolute_arithmetic() {
        let start = at(2024, 1, 1, 0, 0);
        let quarter_hour = parse_iso_duration("PT15M").unwrap();
        assert_eq!(advance(start, quarter_hour, 0), Some(start));
        assert_eq!(advance(start, quarter_hour, 1), Some(at(2024, 1, 1, 0, 15)));
        assert_eq!(advance(start, quarter_hour, 96), Some(at(2024, 1, 2, 0, 0)));
    }

    #[test]
    fn monthly_steps_clamp_to_month_end() {
        let start = at(2024, 1, 31, 0, 0);
        let monthly = parse_iso_duration("P1M").unwrap();
        // 2024 is a leap year
        assert_eq!(advance(start, monthly, 1), Some(at(2024, 2, 29, 0, 0)));

        let start = at(2023, 1, 31, 0, 0);
        assert_eq!(advance(start, monthly, 1), Some(at(2023, 2, 28, 0, 0)));
        assert_eq!(advance(start, monthly, 2), Some(at(2023, 3, 31, 0, 0)));
    }

    #[test]
    fn yearly_steps_handle_leap_days() {
        let start = at(2024, 2, 29, 0, 0);
        let yearly = parse_iso_duration("P1Y").unwrap();
        assert_eq!(advance(start, yearly, 1), Some(at(2025, 2, 28, 0, 0)));
        assert_eq!(advance(start, yearly, 4), Some(at(2028, 2, 29, 0, 0)));
    }

    #[test]
    fn mixed_durations_combine_calendar_and_absolute() {
        let start = at(2024, 1, 1, 0, 0);
        let mixed = parse_iso_duration("P1DT2H30M").unwrap();
        assert_eq!(advance(start, mixed, 1), Some(at(2024, 1, 2, 2, 30)));
        assert_eq!(advance(start, mixed, 2), Some(at(2024, 1, 3, 5, 0)));
    }

    #[test]
    fn negative_offsets_are_rejected() {
        let start = at(2024, 1, 1, 0, 0);
        let daily = parse_iso_duration("P1D").unwrap();
        assert_eq!(advance(start, daily, -1), None);
    }
}
