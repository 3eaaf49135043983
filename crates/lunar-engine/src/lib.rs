//! # lunar-engine
//!
//! Lunar day extraction and resolution for a third-party lunar calendar.
//!
//! The calendar site publishes, per calendar date, a page describing which
//! lunar day (1-30) is active and when it changes. This crate turns that page
//! into structured, timezone-attached data. It never computes moon positions
//! itself; it only reads the pre-computed description.
//!
//! ## Modules
//!
//! - [`normalize`] — raw markup → flat normalized text
//! - [`extract`] — ordered pattern rules recovering intervals or a transition
//! - [`resolve`] — Russian month names and wall-clock times → UTC+3 instants
//! - [`description`] — the two description conventions behind one enum
//! - [`select`] — which lunar day is current at a given instant
//! - [`cache`] — keyed TTL cache with a capacity bound
//! - [`render`] — Russian text lines for a calendar date
//! - [`fetch`] — the page fetcher trait and its HTTP implementation
//! - [`engine`] — [`LunarCalendar`], the resolution API tying it together
//! - [`config`], [`clock`], [`error`] — configuration, time sources, errors

pub mod cache;
pub mod clock;
pub mod config;
pub mod description;
pub mod engine;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod render;
pub mod resolve;
pub mod select;

pub use cache::{CacheConfig, CacheKey, ResultCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use description::{DayDescription, DescriptionKind};
pub use engine::{describe_text, LunarCalendar};
pub use error::{ErrorKind, LunarError};
pub use extract::{
    extract_intervals, extract_transition, DateComponents, Extracted, ExtractionRule, Extractor,
    IntervalRule, RawInterval, Transition, TransitionRule,
};
pub use fetch::{HttpPageFetcher, PageFetcher};
pub use normalize::normalize_markup;
pub use render::{render_interval, render_transition, LunarText};
pub use resolve::{resolve_components, resolve_interval, ResolvedInterval};
pub use select::{select_current, CurrentInterval, Selection};
