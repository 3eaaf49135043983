//! The resolution API: fetch → extract → resolve → cache → select/render.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use tracing::{debug, info};

use crate::cache::{CacheKey, ResultCache};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::description::{DayDescription, DescriptionKind};
use crate::error::Result;
use crate::extract::Extractor;
use crate::fetch::PageFetcher;
use crate::render::{lunar_text, LunarText};
use crate::select::{select_current, CurrentInterval};

/// Extract and resolve the description of `date` from already normalized
/// page text, without touching any cache.
///
/// # Errors
///
/// Returns [`LunarError::ParseFailure`](crate::LunarError::ParseFailure) if no
/// extraction rule matches or an interval cannot be resolved; either way the
/// excerpt is taken from `text`.
pub fn describe_text(
    extractor: &Extractor,
    text: &str,
    date: NaiveDate,
    offset: FixedOffset,
) -> Result<DayDescription> {
    let extracted = extractor.extract(text)?;
    DayDescription::resolve(extracted, date, offset).map_err(|e| e.within_page(text))
}

/// Resolves lunar days for calendar dates, memoizing per (kind, date).
///
/// Created once per process and shared by reference; the cache inside is
/// the only mutable state and is safe to use from several threads.
pub struct LunarCalendar<F, C = SystemClock> {
    fetcher: F,
    extractor: Extractor,
    cache: ResultCache<CacheKey, DayDescription, C>,
    clock: C,
    config: EngineConfig,
}

impl<F: PageFetcher> LunarCalendar<F, SystemClock> {
    pub fn new(fetcher: F, config: EngineConfig) -> Self {
        LunarCalendar::with_clock(fetcher, config, SystemClock)
    }
}

impl<F: PageFetcher, C: Clock + Clone> LunarCalendar<F, C> {
    pub fn with_clock(fetcher: F, config: EngineConfig, clock: C) -> Self {
        LunarCalendar {
            fetcher,
            extractor: Extractor::new(config.max_intervals),
            cache: ResultCache::new(config.cache_config(), clock.clone()),
            clock,
            config,
        }
    }

    /// Replace the default extraction chain.
    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of cached descriptions.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// The lunar days of `date`, from cache or from a fresh page fetch.
    ///
    /// # Errors
    ///
    /// Propagates [`LunarError::Timeout`](crate::LunarError::Timeout) and
    /// [`LunarError::Upstream`](crate::LunarError::Upstream) from the fetcher
    /// and [`LunarError::ParseFailure`](crate::LunarError::ParseFailure) from
    /// extraction. Failures are not cached.
    pub fn describe(&self, date: NaiveDate) -> Result<DayDescription> {
        for kind in DescriptionKind::ALL {
            if let Some(hit) = self.cache.get(&CacheKey::new(kind, date)) {
                debug!(%date, %kind, "description served from cache");
                return Ok(hit);
            }
        }

        let text = self.fetcher.fetch(date)?;
        let description = describe_text(&self.extractor, &text, date, self.config.source_offset)?;
        info!(%date, kind = %description.kind(), "resolved lunar day description");
        self.cache
            .put(CacheKey::new(description.kind(), date), description.clone());
        Ok(description)
    }

    /// The structured text for `date`.
    ///
    /// A transition that changes within the day also needs the previous
    /// date's boundary to know when the earlier lunar day began, so that
    /// date is resolved (and cached) as well. Its page may use either form.
    pub fn lunar_text(&self, date: NaiveDate) -> Result<LunarText> {
        let description = self.describe(date)?;
        let needs_yesterday = description.transition().is_some_and(|t| t.has_change());

        let yesterday = match date.pred_opt() {
            Some(prev) if needs_yesterday => self.describe(prev)?.transition_on(prev),
            _ => None,
        };
        Ok(lunar_text(date, &description, yesterday.as_ref()))
    }

    /// The human-readable description of `date`, one lunar day per line.
    pub fn render_text(&self, date: NaiveDate) -> Result<String> {
        Ok(self.lunar_text(date)?.text)
    }

    /// The lunar day of `date` that is current at `now`.
    pub fn current_at<Tz: TimeZone>(&self, date: NaiveDate, now: &DateTime<Tz>) -> Result<CurrentInterval> {
        let description = self.describe(date)?;
        let intervals = description.intervals_for(date, self.config.source_offset)?;
        select_current(&intervals, now)
    }

    /// The lunar day of `date` that is current according to the clock.
    pub fn current(&self, date: NaiveDate) -> Result<CurrentInterval> {
        let now = self.clock.now();
        self.current_at(date, &now)
    }

    /// Today's date in the source offset, according to the clock.
    pub fn today(&self) -> NaiveDate {
        self.clock
            .now()
            .with_timezone(&self.config.source_offset)
            .date_naive()
    }
}
