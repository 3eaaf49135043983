//! One description of a calendar date's lunar days, whichever convention the
//! page used.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use serde::Serialize;

use crate::error::{LunarError, Result};
use crate::extract::{Extracted, Transition};
use crate::resolve::{resolve_interval, ResolvedInterval};

/// Which extraction convention produced a [`DayDescription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionKind {
    Intervals,
    Transition,
}

impl DescriptionKind {
    /// All kinds, in the order the default extractor tries them.
    pub const ALL: [DescriptionKind; 2] = [DescriptionKind::Intervals, DescriptionKind::Transition];

    pub fn as_str(self) -> &'static str {
        match self {
            DescriptionKind::Intervals => "intervals",
            DescriptionKind::Transition => "transition",
        }
    }
}

impl fmt::Display for DescriptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The lunar days of one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DayDescription {
    /// Explicit, resolved intervals in page order (never empty).
    Intervals { intervals: Vec<ResolvedInterval> },
    /// A single within-day boundary, or a single day with no boundary.
    Transition { transition: Transition },
}

impl DayDescription {
    /// Resolve an extraction result for `date` into absolute instants.
    ///
    /// # Errors
    ///
    /// Returns [`LunarError::ParseFailure`] if an interval has an unknown month
    /// name or ends before it starts, or if the interval list is empty.
    pub fn resolve(extracted: Extracted, date: NaiveDate, offset: FixedOffset) -> Result<Self> {
        match extracted {
            Extracted::Intervals(raw) => {
                if raw.is_empty() {
                    return Err(LunarError::parse_failure("empty interval list", ""));
                }
                let intervals = raw
                    .iter()
                    .map(|r| resolve_interval(r, date, offset))
                    .collect::<Result<Vec<_>>>()?;
                Ok(DayDescription::Intervals { intervals })
            }
            Extracted::Transition(transition) => Ok(DayDescription::Transition { transition }),
        }
    }

    pub fn kind(&self) -> DescriptionKind {
        match self {
            DayDescription::Intervals { .. } => DescriptionKind::Intervals,
            DayDescription::Transition { .. } => DescriptionKind::Transition,
        }
    }

    pub fn transition(&self) -> Option<&Transition> {
        match self {
            DayDescription::Transition { transition } => Some(transition),
            DayDescription::Intervals { .. } => None,
        }
    }

    /// The description of `date` as a single within-day boundary.
    ///
    /// A transition is returned as-is. For intervals, the first interval
    /// ending on `date` gives the boundary time and the lunar days on either
    /// side of it; with no boundary on `date` the last interval's lunar day is
    /// the only known day.
    pub fn transition_on(&self, date: NaiveDate) -> Option<Transition> {
        match self {
            DayDescription::Transition { transition } => Some(*transition),
            DayDescription::Intervals { intervals } => intervals
                .windows(2)
                .find(|w| w[0].end.date_naive() == date)
                .map(|w| Transition {
                    time: Some(w[0].end.time()),
                    before_day: Some(w[0].day_number),
                    after_day: w[1].day_number,
                })
                .or_else(|| intervals.last().map(|iv| Transition::single_day(iv.day_number))),
        }
    }

    /// Intervals covering the description, suitable for current-day selection.
    ///
    /// Interval descriptions are returned as-is. A transition becomes
    /// `[00:00, T)` for the day before the boundary and `[T, next 00:00)` for
    /// the day after it; without a boundary the single day covers the whole
    /// calendar date.
    ///
    /// # Errors
    ///
    /// Returns [`LunarError::ParseFailure`] if `date` has no following day.
    pub fn intervals_for(&self, date: NaiveDate, offset: FixedOffset) -> Result<Vec<ResolvedInterval>> {
        let transition = match self {
            DayDescription::Intervals { intervals } => return Ok(intervals.clone()),
            DayDescription::Transition { transition } => transition,
        };

        let day_start = local_instant(date, NaiveTime::default(), offset)?;
        let next = date
            .succ_opt()
            .ok_or_else(|| LunarError::parse_failure(format!("no day after {date}"), ""))?;
        let day_end = local_instant(next, NaiveTime::default(), offset)?;

        let whole_day = |day_number| ResolvedInterval {
            day_number,
            zodiac: None,
            start: day_start,
            end: day_end,
        };

        match (transition.time, transition.before_day) {
            (Some(time), Some(before_day)) => {
                let boundary = local_instant(date, time, offset)?;
                if boundary == day_start {
                    return Ok(vec![whole_day(transition.after_day)]);
                }
                Ok(vec![
                    ResolvedInterval {
                        day_number: before_day,
                        zodiac: None,
                        start: day_start,
                        end: boundary,
                    },
                    ResolvedInterval {
                        day_number: transition.after_day,
                        zodiac: None,
                        start: boundary,
                        end: day_end,
                    },
                ])
            }
            _ => Ok(vec![whole_day(transition.after_day)]),
        }
    }
}

fn local_instant(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> Result<DateTime<FixedOffset>> {
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .ok_or_else(|| LunarError::parse_failure(format!("unrepresentable local time {date} {time}"), ""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{DateComponents, RawInterval};
    use crate::resolve::source_offset;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_resolve_intervals_variant() {
        let raw = RawInterval {
            day_number: 6,
            zodiac: Some("Козерог".to_string()),
            start: DateComponents {
                day: 24,
                month: "декабря".to_string(),
                time: hm(11, 35),
            },
            end: DateComponents {
                day: 25,
                month: "декабря".to_string(),
                time: hm(11, 42),
            },
        };
        let desc = DayDescription::resolve(Extracted::Intervals(vec![raw]), date(2024, 12, 24), source_offset())
            .unwrap();
        assert_eq!(desc.kind(), DescriptionKind::Intervals);
        let ivs = desc.intervals_for(date(2024, 12, 24), source_offset()).unwrap();
        assert_eq!(ivs.len(), 1);
        assert_eq!(ivs[0].zodiac.as_deref(), Some("Козерог"));
    }

    #[test]
    fn test_resolve_empty_intervals_fails() {
        let err = DayDescription::resolve(Extracted::Intervals(vec![]), date(2024, 12, 24), source_offset())
            .unwrap_err();
        assert!(matches!(err, LunarError::ParseFailure { .. }));
    }

    #[test]
    fn test_transition_splits_calendar_date() {
        let desc = DayDescription::Transition {
            transition: Transition {
                time: Some(hm(11, 42)),
                before_day: Some(6),
                after_day: 7,
            },
        };
        let ivs = desc.intervals_for(date(2024, 12, 25), source_offset()).unwrap();
        assert_eq!(ivs.len(), 2);
        assert_eq!(ivs[0].day_number, 6);
        assert_eq!(ivs[0].start.to_rfc3339(), "2024-12-25T00:00:00+03:00");
        assert_eq!(ivs[0].end.to_rfc3339(), "2024-12-25T11:42:00+03:00");
        assert_eq!(ivs[1].day_number, 7);
        assert_eq!(ivs[1].start, ivs[0].end);
        assert_eq!(ivs[1].end.to_rfc3339(), "2024-12-26T00:00:00+03:00");
    }

    #[test]
    fn test_transition_without_change_covers_whole_date() {
        let desc = DayDescription::Transition {
            transition: Transition::single_day(6),
        };
        let ivs = desc.intervals_for(date(2024, 12, 31), source_offset()).unwrap();
        assert_eq!(ivs.len(), 1);
        assert_eq!(ivs[0].day_number, 6);
        assert_eq!(ivs[0].end.to_rfc3339(), "2025-01-01T00:00:00+03:00");
    }

    #[test]
    fn test_transition_at_midnight_has_no_empty_interval() {
        let desc = DayDescription::Transition {
            transition: Transition {
                time: Some(hm(0, 0)),
                before_day: Some(6),
                after_day: 7,
            },
        };
        let ivs = desc.intervals_for(date(2024, 12, 25), source_offset()).unwrap();
        assert_eq!(ivs.len(), 1);
        assert_eq!(ivs[0].day_number, 7);
    }

    fn msk_interval(day_number: u8, start: (u32, u32, u32), end: (u32, u32, u32)) -> ResolvedInterval {
        let at = |(d, h, m): (u32, u32, u32)| source_offset().with_ymd_and_hms(2024, 12, d, h, m, 0).unwrap();
        ResolvedInterval {
            day_number,
            zodiac: None,
            start: at(start),
            end: at(end),
        }
    }

    #[test]
    fn test_transition_on_finds_interval_boundary() {
        let desc = DayDescription::Intervals {
            intervals: vec![
                msk_interval(5, (23, 11, 20), (24, 11, 35)),
                msk_interval(6, (24, 11, 35), (25, 11, 42)),
            ],
        };
        assert_eq!(
            desc.transition_on(date(2024, 12, 24)),
            Some(Transition {
                time: Some(hm(11, 35)),
                before_day: Some(5),
                after_day: 6,
            })
        );
    }

    #[test]
    fn test_transition_on_without_boundary_is_single_day() {
        let desc = DayDescription::Intervals {
            intervals: vec![msk_interval(6, (24, 11, 35), (25, 11, 42))],
        };
        assert_eq!(desc.transition_on(date(2024, 12, 24)), Some(Transition::single_day(6)));
    }

    #[test]
    fn test_transition_on_passes_transition_through() {
        let transition = Transition {
            time: Some(hm(11, 42)),
            before_day: Some(6),
            after_day: 7,
        };
        let desc = DayDescription::Transition { transition };
        assert_eq!(desc.transition_on(date(2024, 12, 25)), Some(transition));
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let desc = DayDescription::Transition {
            transition: Transition::single_day(6),
        };
        let json = serde_json::to_value(&desc).unwrap();
        assert_eq!(json["kind"], "transition");
        assert_eq!(json["transition"]["after_day"], 6);
    }
}
