//! Pattern-based extraction of lunar days from normalized page text.
//!
//! The calendar source has described lunar days in two textual conventions
//! over its revisions, and both must keep working:
//!
//! - **Interval form**: `6 лунный день Козерог 24 декабря 11:35 — 25 декабря 11:42`,
//!   one explicit interval per lunar day.
//! - **Transition form**: `До 11:42 — 6-й лунный день … После 11:42 — 7-й лунный день`,
//!   a single boundary within the calendar date.
//!
//! Each convention is an [`ExtractionRule`]. The [`Extractor`] runs its rules in
//! order and the first one that recognizes the text wins, so a new page
//! revision means a new rule rather than a rewrite.

use std::sync::OnceLock;

use chrono::NaiveTime;
use regex::{Captures, Regex};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{LunarError, Result};

/// Highest lunar day number the source uses.
pub const MAX_LUNAR_DAY: u8 = 30;

/// How many intervals the interval-form rule keeps by default: the lunar day
/// active before the boundary and the one active after it.
pub const DEFAULT_MAX_INTERVALS: usize = 2;

/// How far (in characters) a transition marker may be from its day ordinal.
const MARKER_LOOKAHEAD: usize = 80;

// ── Extracted data ──────────────────────────────────────────────────────────

/// A calendar point as written on the page: day of month, genitive month name
/// and wall-clock time, with no year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateComponents {
    /// Day of month (1-31).
    pub day: u32,
    /// Month name as written, e.g. `"декабря"`.
    pub month: String,
    /// Wall-clock time in the source offset.
    #[serde(serialize_with = "hhmm::serialize")]
    pub time: NaiveTime,
}

/// One lunar day recovered by the interval-form rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawInterval {
    /// Lunar day number (1-30).
    pub day_number: u8,
    /// Zodiac sign shown next to the day, if any.
    pub zodiac: Option<String>,
    pub start: DateComponents,
    pub end: DateComponents,
}

/// A single within-day boundary recovered by the transition-form rule.
///
/// `time` and `before_day` are both absent when the page names only one lunar
/// day for the whole calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    /// When the lunar day changes, in the source offset.
    #[serde(serialize_with = "hhmm::serialize_opt")]
    pub time: Option<NaiveTime>,
    /// Lunar day active until `time`.
    pub before_day: Option<u8>,
    /// Lunar day active after `time`, or the only known day.
    pub after_day: u8,
}

impl Transition {
    /// A date with one lunar day and no boundary.
    pub fn single_day(day: u8) -> Self {
        Transition {
            time: None,
            before_day: None,
            after_day: day,
        }
    }

    /// True when the lunar day changes within the calendar date.
    pub fn has_change(&self) -> bool {
        self.time.is_some() && self.before_day.is_some()
    }
}

/// What a successful rule produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Intervals(Vec<RawInterval>),
    Transition(Transition),
}

// ── Rules ───────────────────────────────────────────────────────────────────

/// One textual convention the source has used to describe lunar days.
pub trait ExtractionRule: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Recognize `text`, or return `None` so the next rule can try.
    fn extract(&self, text: &str) -> Option<Extracted>;
}

struct Patterns {
    interval: Regex,
    until: Regex,
    after: Regex,
    any_day: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        // "6 лунный день Козерог 24 декабря 11:35 — 25 декабря 11:42"
        let interval = Regex::new(
            r"\b(?P<day>\d{1,2})\s+лунный\s+день\s+(?:(?P<zodiac>[А-ЯЁ][а-яё]+)\s+)?(?P<d1>\d{1,2})\s+(?P<m1>[А-ЯЁа-яё]+)\s+(?P<t1>\d{1,2}:\d{2})\s*[—-]\s*(?P<d2>\d{1,2})\s+(?P<m2>[А-ЯЁа-яё]+)\s+(?P<t2>\d{1,2}:\d{2})",
        )
        .expect("valid regex");
        // "До 11:42 — 6-й лунный день" / "После 11:42 — 7-й лунный день"
        let marker = |word: &str| {
            Regex::new(&format!(
                r"(?i)\b{word}\s+(?P<time>\d{{1,2}}:\d{{2}}).{{0,{MARKER_LOOKAHEAD}}}?\b(?P<day>\d{{1,2}})[-\s]*й\s+лунн"
            ))
            .expect("valid regex")
        };
        Patterns {
            interval,
            until: marker("До"),
            after: marker("После"),
            any_day: Regex::new(r"(?i)\b(?P<day>\d{1,2})[-\s]*й\s+лунн").expect("valid regex"),
        }
    })
}

/// Interval-form rule: every `<N> лунный день [<Zodiac>] <d> <month> <HH:MM> — <d> <month> <HH:MM>`
/// occurrence, in text order, truncated to `max_intervals`.
#[derive(Debug, Clone)]
pub struct IntervalRule {
    max_intervals: usize,
}

impl IntervalRule {
    pub fn new(max_intervals: usize) -> Self {
        IntervalRule { max_intervals }
    }
}

impl Default for IntervalRule {
    fn default() -> Self {
        IntervalRule::new(DEFAULT_MAX_INTERVALS)
    }
}

impl ExtractionRule for IntervalRule {
    fn name(&self) -> &'static str {
        "interval"
    }

    fn extract(&self, text: &str) -> Option<Extracted> {
        let intervals = extract_intervals(text, self.max_intervals);
        if intervals.is_empty() {
            None
        } else {
            Some(Extracted::Intervals(intervals))
        }
    }
}

/// Transition-form rule: a "До" / "После" marker pair, falling back to any bare
/// `N-й лунный день` phrase.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionRule;

impl ExtractionRule for TransitionRule {
    fn name(&self) -> &'static str {
        "transition"
    }

    fn extract(&self, text: &str) -> Option<Extracted> {
        extract_transition(text).map(Extracted::Transition)
    }
}

/// Collect interval-form matches from `text`, in order, keeping at most `limit`.
///
/// Matches whose lunar day number falls outside 1-30 or whose times are not
/// valid wall-clock times are skipped.
pub fn extract_intervals(text: &str, limit: usize) -> Vec<RawInterval> {
    let mut found: Vec<RawInterval> = patterns()
        .interval
        .captures_iter(text)
        .filter_map(|caps| interval_from_captures(&caps))
        .collect();

    if found.len() > limit {
        // The source is expected to describe at most `limit` lunar days for a
        // calendar date; anything past that is dropped but made visible.
        warn!(
            found = found.len(),
            kept = limit,
            "interval-form page describes more lunar days than expected; truncating"
        );
        found.truncate(limit);
    }
    found
}

/// Recover the transition-form description of a calendar date.
///
/// With both markers present the result carries the "before" time; if the
/// "after" marker names a different time it is ignored. Without a full marker
/// pair the first bare `N-й лунный день` phrase becomes the only known day.
pub fn extract_transition(text: &str) -> Option<Transition> {
    let p = patterns();

    let until = p.until.captures(text).and_then(|c| marker_from_captures(&c));
    let after = p.after.captures(text).and_then(|c| marker_from_captures(&c));

    if let (Some((t_before, before_day)), Some((t_after, after_day))) = (until, after) {
        if t_before != t_after {
            debug!(
                before = %t_before.format("%H:%M"),
                after = %t_after.format("%H:%M"),
                "transition markers disagree on time; using the \"before\" time"
            );
        }
        return Some(Transition {
            time: Some(t_before),
            before_day: Some(before_day),
            after_day,
        });
    }

    p.any_day
        .captures_iter(text)
        .find_map(|c| parse_lunar_day(&c["day"]))
        .map(Transition::single_day)
}

// ── Extractor ───────────────────────────────────────────────────────────────

/// Ordered chain of [`ExtractionRule`]s; the first rule that matches wins.
pub struct Extractor {
    rules: Vec<Box<dyn ExtractionRule>>,
}

impl Extractor {
    /// The default chain: interval form first, then transition form.
    pub fn new(max_intervals: usize) -> Self {
        Extractor::with_rules(vec![
            Box::new(IntervalRule::new(max_intervals)),
            Box::new(TransitionRule),
        ])
    }

    /// A chain with caller-supplied rules, tried in the given order.
    pub fn with_rules(rules: Vec<Box<dyn ExtractionRule>>) -> Self {
        Extractor { rules }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run the chain over normalized text.
    ///
    /// # Errors
    ///
    /// Returns [`LunarError::ParseFailure`] with an excerpt of `text` when no
    /// rule recognizes it (typically a block/CAPTCHA page or a markup change).
    pub fn extract(&self, text: &str) -> Result<Extracted> {
        for rule in &self.rules {
            if let Some(extracted) = rule.extract(text) {
                debug!(rule = rule.name(), "extraction rule matched");
                return Ok(extracted);
            }
        }
        warn!(
            chars = text.chars().count(),
            "no extraction rule matched the page text"
        );
        Err(LunarError::parse_failure(
            "no lunar day pattern matched (blocked page or markup changed)",
            text,
        ))
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Extractor::new(DEFAULT_MAX_INTERVALS)
    }
}

// ── Internal helpers ────────────────────────────────────────────────────────

fn interval_from_captures(caps: &Captures<'_>) -> Option<RawInterval> {
    Some(RawInterval {
        day_number: parse_lunar_day(&caps["day"])?,
        zodiac: caps.name("zodiac").map(|m| m.as_str().to_string()),
        start: DateComponents {
            day: caps["d1"].parse().ok()?,
            month: caps["m1"].to_string(),
            time: parse_hhmm(&caps["t1"])?,
        },
        end: DateComponents {
            day: caps["d2"].parse().ok()?,
            month: caps["m2"].to_string(),
            time: parse_hhmm(&caps["t2"])?,
        },
    })
}

fn marker_from_captures(caps: &Captures<'_>) -> Option<(NaiveTime, u8)> {
    Some((parse_hhmm(&caps["time"])?, parse_lunar_day(&caps["day"])?))
}

/// Parse a lunar day ordinal, rejecting numbers outside 1-30.
fn parse_lunar_day(s: &str) -> Option<u8> {
    let day: u8 = s.parse().ok()?;
    (1..=MAX_LUNAR_DAY).contains(&day).then_some(day)
}

/// Parse `H:MM` / `HH:MM`.
pub(crate) fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    let (h, m) = s.split_once(':')?;
    NaiveTime::from_hms_opt(h.parse().ok()?, m.parse().ok()?, 0)
}

/// Serialize wall-clock times as `HH:MM`, the way the source writes them.
pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&t.format("%H:%M"))
    }

    pub fn serialize_opt<S: Serializer>(t: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match t {
            Some(t) => s.collect_str(&t.format("%H:%M")),
            None => s.serialize_none(),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
