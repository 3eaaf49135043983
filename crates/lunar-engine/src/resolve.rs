//! Calendar reconstruction: page date components → absolute instants.
//!
//! The source writes instants as `24 декабря 11:35`, with a genitive Russian
//! month name, no year, and an implied fixed UTC+3 offset. Resolution places
//! each component in the year nearest to the date being queried, which keeps
//! pages around New Year correct (a 31 December page may end on `1 января`).

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone};
use serde::Serialize;

use crate::error::{LunarError, Result};
use crate::extract::{DateComponents, RawInterval};

/// Offset of the source's wall-clock times (UTC+3).
pub const SOURCE_OFFSET_SECONDS: i32 = 3 * 3600;

/// The fixed UTC+3 offset the source uses.
pub fn source_offset() -> FixedOffset {
    FixedOffset::east_opt(SOURCE_OFFSET_SECONDS).expect("UTC+3 is a valid offset")
}

/// A lunar day bounded by two absolute instants. Invariant: `start < end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedInterval {
    pub day_number: u8,
    pub zodiac: Option<String>,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl ResolvedInterval {
    /// Whether `instant` lies in `[start, end)`.
    pub fn contains<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> bool {
        let instant = instant.with_timezone(&self.start.timezone());
        self.start <= instant && instant < self.end
    }
}

/// Month number (1-12) for a genitive Russian month name, case-insensitive.
pub fn month_number(name: &str) -> Option<u32> {
    match name.to_lowercase().as_str() {
        "января" => Some(1),
        "февраля" => Some(2),
        "марта" => Some(3),
        "апреля" => Some(4),
        "мая" => Some(5),
        "июня" => Some(6),
        "июля" => Some(7),
        "августа" => Some(8),
        "сентября" => Some(9),
        "октября" => Some(10),
        "ноября" => Some(11),
        "декабря" => Some(12),
        _ => None,
    }
}

/// Genitive Russian month name for a month number (1-12).
pub fn month_name(month: u32) -> Option<&'static str> {
    const NAMES: [&str; 12] = [
        "января", "февраля", "марта", "апреля", "мая", "июня", "июля", "августа",
        "сентября", "октября", "ноября", "декабря",
    ];
    NAMES.get(month.checked_sub(1)? as usize).copied()
}

/// Resolve one `(day, month name, HH:MM)` triple to an instant.
///
/// # Arguments
///
/// * `components` — Day of month, genitive month name and wall-clock time
/// * `query_date` — The calendar date whose page the components came from;
///   the year nearest to it (previous, same or next) is chosen
/// * `offset` — The offset the wall-clock time is expressed in
///
/// # Errors
///
/// Returns [`LunarError::ParseFailure`] if the month name is not one of the
/// twelve genitive month names, or the day does not exist in that month.
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, NaiveTime};
/// use lunar_engine::extract::DateComponents;
/// use lunar_engine::resolve::{resolve_components, source_offset};
///
/// let components = DateComponents {
///     day: 24,
///     month: "декабря".to_string(),
///     time: NaiveTime::from_hms_opt(11, 35, 0).unwrap(),
/// };
/// let query = NaiveDate::from_ymd_opt(2024, 12, 24).unwrap();
/// let instant = resolve_components(&components, query, source_offset()).unwrap();
/// assert_eq!(instant.to_rfc3339(), "2024-12-24T11:35:00+03:00");
/// ```
pub fn resolve_components(
    components: &DateComponents,
    query_date: NaiveDate,
    offset: FixedOffset,
) -> Result<DateTime<FixedOffset>> {
    let month = month_number(&components.month).ok_or_else(|| {
        LunarError::parse_failure(
            format!("unknown month name '{}'", components.month),
            &components.month,
        )
    })?;

    let year = query_date.year();
    let date = [year, year - 1, year + 1]
        .into_iter()
        .filter_map(|y| NaiveDate::from_ymd_opt(y, month, components.day))
        .min_by_key(|d| (*d - query_date).num_days().abs())
        .ok_or_else(|| {
            LunarError::parse_failure(
                format!("no such date: {} {}", components.day, components.month),
                &components.month,
            )
        })?;

    offset
        .from_local_datetime(&date.and_time(components.time))
        .single()
        .ok_or_else(|| {
            LunarError::parse_failure(
                format!("unrepresentable local time {date} {}", components.time),
                &components.month,
            )
        })
}

/// Resolve a [`RawInterval`] into absolute instants.
///
/// # Errors
///
/// Returns [`LunarError::ParseFailure`] if either endpoint cannot be resolved
/// or the resolved end does not follow the start.
pub fn resolve_interval(
    raw: &RawInterval,
    query_date: NaiveDate,
    offset: FixedOffset,
) -> Result<ResolvedInterval> {
    let start = resolve_components(&raw.start, query_date, offset)?;
    let end = resolve_components(&raw.end, query_date, offset)?;
    if start >= end {
        return Err(LunarError::parse_failure(
            format!(
                "lunar day {} ends ({}) before it starts ({})",
                raw.day_number,
                end.to_rfc3339(),
                start.to_rfc3339()
            ),
            &format!("{} лунный день", raw.day_number),
        ));
    }
    Ok(ResolvedInterval {
        day_number: raw.day_number,
        zodiac: raw.zodiac.clone(),
        start,
        end,
    })
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Utc};
    use proptest::prelude::*;

    fn comp(day: u32, month: &str, h: u32, m: u32) -> DateComponents {
        DateComponents {
            day,
            month: month.to_string(),
            time: NaiveTime::from_hms_opt(h, m, 0).unwrap(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_table_round_trips() {
        for m in 1..=12 {
            assert_eq!(month_number(month_name(m).unwrap()), Some(m));
        }
        assert_eq!(month_name(0), None);
        assert_eq!(month_name(13), None);
    }

    #[test]
    fn test_month_number_case_insensitive() {
        assert_eq!(month_number("Декабря"), Some(12));
        assert_eq!(month_number("December"), None);
        assert_eq!(month_number("декабрь"), None);
    }

    #[test]
    fn test_resolve_same_year() {
        let dt = resolve_components(&comp(24, "декабря", 11, 35), date(2024, 12, 24), source_offset())
            .unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-12-24T11:35:00+03:00");
        assert_eq!(dt.with_timezone(&Utc).to_rfc3339(), "2024-12-24T08:35:00+00:00");
    }

    #[test]
    fn test_resolve_rolls_into_next_year() {
        let dt = resolve_components(&comp(1, "января", 6, 0), date(2024, 12, 31), source_offset())
            .unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-01-01T06:00:00+03:00");
    }

    #[test]
    fn test_resolve_rolls_into_previous_year() {
        let dt = resolve_components(&comp(31, "декабря", 22, 10), date(2025, 1, 1), source_offset())
            .unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-12-31T22:10:00+03:00");
    }

    #[test]
    fn test_resolve_leap_day_uses_existing_year() {
        let dt = resolve_components(&comp(29, "февраля", 3, 0), date(2024, 2, 28), source_offset())
            .unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-02-29T03:00:00+03:00");
    }

    #[test]
    fn test_resolve_unknown_month_is_parse_failure() {
        let err = resolve_components(&comp(24, "декабрь", 11, 35), date(2024, 12, 24), source_offset())
            .unwrap_err();
        assert!(matches!(err, LunarError::ParseFailure { .. }));
        assert!(err.to_string().contains("декабрь"));
    }

    #[test]
    fn test_resolve_impossible_day_is_parse_failure() {
        let err = resolve_components(&comp(31, "апреля", 1, 0), date(2024, 4, 10), source_offset())
            .unwrap_err();
        assert!(matches!(err, LunarError::ParseFailure { .. }));
    }

    #[test]
    fn test_resolve_interval_scenario() {
        let raw = RawInterval {
            day_number: 6,
            zodiac: None,
            start: comp(24, "декабря", 11, 35),
            end: comp(25, "декабря", 11, 42),
        };
        let iv = resolve_interval(&raw, date(2024, 12, 24), source_offset()).unwrap();
        assert_eq!(iv.day_number, 6);
        assert_eq!(iv.start.to_rfc3339(), "2024-12-24T11:35:00+03:00");
        assert_eq!(iv.end.to_rfc3339(), "2024-12-25T11:42:00+03:00");
    }

    #[test]
    fn test_resolve_interval_backwards_is_parse_failure() {
        let raw = RawInterval {
            day_number: 6,
            zodiac: None,
            start: comp(25, "декабря", 11, 42),
            end: comp(24, "декабря", 11, 35),
        };
        assert!(resolve_interval(&raw, date(2024, 12, 24), source_offset()).is_err());
    }

    #[test]
    fn test_contains_is_half_open() {
        let raw = RawInterval {
            day_number: 6,
            zodiac: None,
            start: comp(24, "декабря", 11, 35),
            end: comp(25, "декабря", 11, 42),
        };
        let iv = resolve_interval(&raw, date(2024, 12, 24), source_offset()).unwrap();
        assert!(iv.contains(&iv.start));
        assert!(!iv.contains(&iv.end));
        let utc_inside = Utc.with_ymd_and_hms(2024, 12, 25, 6, 0, 0).unwrap();
        assert!(iv.contains(&utc_inside));
    }

    proptest! {
        #[test]
        fn prop_textually_later_end_resolves_after_start(
            month in 1u32..=12,
            day in 1u32..=28,
            span in 0u32..=2,
            (h1, m1) in (0u32..24, 0u32..60),
            (h2, m2) in (0u32..24, 0u32..60),
        ) {
            let end_day = day + span;
            prop_assume!(end_day <= 28);
            prop_assume!(span > 0 || (h2, m2) > (h1, m1));
            let name = month_name(month).unwrap();
            let raw = RawInterval {
                day_number: 1,
                zodiac: None,
                start: comp(day, name, h1, m1),
                end: comp(end_day, name, h2, m2),
            };
            let query = date(2024, month, day);
            let iv = resolve_interval(&raw, query, source_offset()).unwrap();
            prop_assert!(iv.start < iv.end);
        }
    }
}
