//! Error types for lunar-engine operations.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Number of characters of source text kept in a [`LunarError::ParseFailure`].
pub const EXCERPT_CHARS: usize = 300;

#[derive(Error, Debug)]
pub enum LunarError {
    #[error("Timeout fetching calendar page after {}s", .after.as_secs())]
    Timeout { after: Duration },

    #[error("Upstream error{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    #[error("Could not parse calendar page ({reason}); text: '{excerpt}'")]
    ParseFailure { reason: String, excerpt: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// The distinguishing kind of a [`LunarError`], stable for callers that map
/// failures onto their own protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    Upstream,
    ParseFailure,
    InvalidConfig,
}

impl ErrorKind {
    /// HTTP status a gateway should answer with for this kind.
    pub fn gateway_status(self) -> u16 {
        match self {
            ErrorKind::Timeout => 504,
            ErrorKind::Upstream | ErrorKind::ParseFailure => 502,
            ErrorKind::InvalidConfig => 400,
        }
    }
}

impl LunarError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LunarError::Timeout { .. } => ErrorKind::Timeout,
            LunarError::Upstream { .. } => ErrorKind::Upstream,
            LunarError::ParseFailure { .. } => ErrorKind::ParseFailure,
            LunarError::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    /// Build a parse failure carrying the leading part of `text` for diagnosis.
    pub fn parse_failure(reason: impl Into<String>, text: &str) -> Self {
        LunarError::ParseFailure {
            reason: reason.into(),
            excerpt: excerpt(text),
        }
    }

    /// Re-anchor a parse failure in the full page text.
    ///
    /// Failures raised while resolving a single interval only know the
    /// offending token; this swaps their excerpt for the page text around
    /// that token. Other kinds pass through unchanged.
    pub fn within_page(self, text: &str) -> Self {
        match self {
            LunarError::ParseFailure { reason, excerpt } => LunarError::ParseFailure {
                reason,
                excerpt: excerpt_around(text, &excerpt),
            },
            other => other,
        }
    }
}

/// First [`EXCERPT_CHARS`] characters of `text`, cut on a char boundary.
pub fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}

/// Up to [`EXCERPT_CHARS`] characters of `text` around the first occurrence of
/// `focus`, starting a little before it. Falls back to [`excerpt`] when `focus`
/// is empty or not in `text`.
pub fn excerpt_around(text: &str, focus: &str) -> String {
    let Some(pos) = (!focus.is_empty()).then(|| text.find(focus)).flatten() else {
        return excerpt(text);
    };
    let focus_at = text[..pos].chars().count();
    let skip = focus_at.saturating_sub(EXCERPT_CHARS / 3);
    text.chars().skip(skip).take(EXCERPT_CHARS).collect()
}

pub type Result<T> = std::result::Result<T, LunarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_is_char_safe() {
        let text = "лунный ".repeat(100);
        let cut = excerpt(&text);
        assert_eq!(cut.chars().count(), EXCERPT_CHARS);
        assert!(text.starts_with(&cut));
    }

    #[test]
    fn test_excerpt_short_text_kept_whole() {
        assert_eq!(excerpt("captcha"), "captcha");
    }

    #[test]
    fn test_excerpt_around_centers_on_focus() {
        let text = format!("{}6 лунный день 24 Дек 11:35{}", "а".repeat(500), "б".repeat(500));
        let cut = excerpt_around(&text, "Дек");
        assert_eq!(cut.chars().count(), EXCERPT_CHARS);
        assert!(cut.contains("6 лунный день 24 Дек 11:35"));
    }

    #[test]
    fn test_excerpt_around_missing_focus_uses_leading_text() {
        assert_eq!(excerpt_around("captcha page", "Дек"), "captcha page");
        assert_eq!(excerpt_around("captcha page", ""), "captcha page");
    }

    #[test]
    fn test_within_page_replaces_token_excerpt() {
        let page = "Лунный календарь. 6 лунный день 24 Дек 11:35 — 25 Дек 11:42. Советы дня.";
        let err = LunarError::parse_failure("unknown month name 'Дек'", "Дек").within_page(page);
        match err {
            LunarError::ParseFailure { reason, excerpt } => {
                assert!(reason.contains("Дек"));
                assert_eq!(excerpt, page);
            }
            other => panic!("expected ParseFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_within_page_keeps_other_kinds() {
        let err = LunarError::Timeout {
            after: Duration::from_secs(15),
        }
        .within_page("page");
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn test_kinds_map_to_gateway_statuses() {
        let timeout = LunarError::Timeout {
            after: Duration::from_secs(15),
        };
        assert_eq!(timeout.kind(), ErrorKind::Timeout);
        assert_eq!(timeout.kind().gateway_status(), 504);

        let upstream = LunarError::Upstream {
            status: Some(403),
            message: "blocked".to_string(),
        };
        assert_eq!(upstream.kind().gateway_status(), 502);
        assert!(upstream.to_string().contains("status 403"));

        let parse = LunarError::parse_failure("no pattern matched", "Access denied");
        assert_eq!(parse.kind(), ErrorKind::ParseFailure);
        assert_eq!(parse.kind().gateway_status(), 502);
        assert!(parse.to_string().contains("Access denied"));
    }

    #[test]
    fn test_upstream_without_status_displays_message() {
        let err = LunarError::Upstream {
            status: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "Upstream error: connection refused");
    }
}
