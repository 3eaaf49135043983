//! Human-readable lines for resolved lunar days.
//!
//! All text is Russian, matching the source page, with dates as `DD.MM.YYYY`.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime};
use serde::Serialize;

use crate::description::DayDescription;
use crate::extract::Transition;
use crate::resolve::{month_name, ResolvedInterval};

/// A rendered calendar date: the lines plus the facts they were built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LunarText {
    /// The calendar date, ISO formatted.
    pub date: NaiveDate,
    /// When the lunar day changes within the date (`HH:MM`), if it does.
    pub transition_time: Option<String>,
    pub before_day: Option<u8>,
    pub after_day: Option<u8>,
    pub lines: Vec<String>,
    /// `lines` joined with newlines.
    pub text: String,
}

/// `DD.MM.YYYY`.
pub fn format_ru_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

fn format_hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// `24 декабря 11:35`, the way the source writes an instant.
pub fn format_instant(instant: &DateTime<FixedOffset>) -> String {
    let month = month_name(instant.month()).unwrap_or_default();
    format!("{} {} {}", instant.day(), month, instant.format("%H:%M"))
}

/// `6 лунный день Козерог 24 декабря 11:35 — 25 декабря 11:42`.
pub fn render_interval(interval: &ResolvedInterval) -> String {
    let mut line = format!("{} лунный день ", interval.day_number);
    if let Some(zodiac) = &interval.zodiac {
        line.push_str(zodiac);
        line.push(' ');
    }
    line.push_str(&format_instant(&interval.start));
    line.push_str(" — ");
    line.push_str(&format_instant(&interval.end));
    line
}

/// One line per interval, in page order.
pub fn render_intervals(intervals: &[ResolvedInterval]) -> Vec<String> {
    intervals.iter().map(render_interval).collect()
}

/// Compose the description of `date` from its transition and the previous
/// date's transition.
///
/// With a change within the day this yields two lines: the earlier lunar day
/// from yesterday's change (or `00:00`) up to today's change, and the later
/// lunar day from today's change onward. Without a change it yields one line
/// saying the lunar day lasts the whole date; `yesterday` is not consulted.
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, NaiveTime};
/// use lunar_engine::extract::Transition;
/// use lunar_engine::render::render_transition;
///
/// let today = Transition {
///     time: NaiveTime::from_hms_opt(11, 42, 0),
///     before_day: Some(6),
///     after_day: 7,
/// };
/// let date = NaiveDate::from_ymd_opt(2024, 12, 25).unwrap();
/// let lines = render_transition(date, &today, None);
/// assert_eq!(lines[0], "6 лунный день с 00:00 24.12.2024 по 11:42 25.12.2024");
/// assert_eq!(lines[1], "7 лунный день с 11:42 25.12.2024 и до следующего дня");
/// ```
pub fn render_transition(
    date: NaiveDate,
    today: &Transition,
    yesterday: Option<&Transition>,
) -> Vec<String> {
    let (time, before_day) = match (today.time, today.before_day) {
        (Some(time), Some(before_day)) => (time, before_day),
        _ => {
            return vec![format!(
                "{} лунный день {} (без смены в течение суток)",
                today.after_day,
                format_ru_date(date)
            )]
        }
    };

    let prev_date = date.pred_opt().unwrap_or(date);
    let start_time = yesterday
        .and_then(|y| y.time)
        .map(format_hhmm)
        .unwrap_or_else(|| "00:00".to_string());

    vec![
        format!(
            "{before_day} лунный день с {start_time} {} по {} {}",
            format_ru_date(prev_date),
            format_hhmm(time),
            format_ru_date(date)
        ),
        format!(
            "{} лунный день с {} {} и до следующего дня",
            today.after_day,
            format_hhmm(time),
            format_ru_date(date)
        ),
    ]
}

/// Build the [`LunarText`] of `date` from its description.
///
/// `yesterday` is only used for transition descriptions that change within
/// the day; see [`render_transition`].
pub fn lunar_text(
    date: NaiveDate,
    description: &DayDescription,
    yesterday: Option<&Transition>,
) -> LunarText {
    let (transition_time, before_day, after_day, lines) = match description {
        DayDescription::Transition { transition } => (
            transition.time.filter(|_| transition.has_change()).map(format_hhmm),
            transition.before_day.filter(|_| transition.has_change()),
            Some(transition.after_day),
            render_transition(date, transition, yesterday),
        ),
        DayDescription::Intervals { intervals } => {
            let on_date = description.transition_on(date);
            let boundary = on_date.filter(|t| t.has_change());
            (
                boundary.and_then(|t| t.time).map(format_hhmm),
                boundary.and_then(|t| t.before_day),
                on_date.map(|t| t.after_day),
                render_intervals(intervals),
            )
        }
    };

    LunarText {
        date,
        transition_time,
        before_day,
        after_day,
        text: lines.join("\n"),
        lines,
    }
}
