//! Picking the lunar day that is current at a given instant.

use chrono::{DateTime, FixedOffset, TimeZone};
use serde::Serialize;

use crate::error::{LunarError, Result};
use crate::resolve::ResolvedInterval;

/// How the current interval was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// `now` lies inside the interval.
    Containing,
    /// `now` is before every interval; the first one is shown.
    First,
    /// `now` is after the described window; the last one is shown.
    Last,
}

/// The interval considered current, and when it ends if that is still ahead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentInterval {
    pub interval: ResolvedInterval,
    pub selection: Selection,
    /// End of `interval` if it is after `now`; absent once the described
    /// window has lapsed.
    pub next_switch: Option<DateTime<FixedOffset>>,
}

/// Select the interval that is current at `now`.
///
/// Rules, in order:
/// 1. the interval whose `[start, end)` contains `now`;
/// 2. the first interval, if `now` is before its start;
/// 3. otherwise the last interval.
///
/// The selection never fails for a non-empty list, so callers always have
/// something sensible to show even slightly outside the described window.
///
/// # Errors
///
/// Returns [`LunarError::ParseFailure`] only if `intervals` is empty.
pub fn select_current<Tz: TimeZone>(
    intervals: &[ResolvedInterval],
    now: &DateTime<Tz>,
) -> Result<CurrentInterval> {
    let (first, last) = match (intervals.first(), intervals.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(LunarError::parse_failure(
                "no lunar day intervals to select from",
                "",
            ))
        }
    };
    let now = now.with_timezone(&first.start.timezone());

    let (interval, selection) = if let Some(hit) = intervals.iter().find(|iv| iv.contains(&now)) {
        (hit, Selection::Containing)
    } else if now < first.start {
        (first, Selection::First)
    } else {
        (last, Selection::Last)
    };

    let next_switch = (interval.end > now).then_some(interval.end);

    Ok(CurrentInterval {
        interval: interval.clone(),
        selection,
        next_switch,
    })
}
