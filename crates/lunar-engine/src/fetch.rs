//! Fetching calendar pages.
//!
//! The engine only depends on [`PageFetcher`]; [`HttpPageFetcher`] is the
//! production implementation. Retries live entirely inside the fetcher and
//! never change its success/failure contract.

use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, USER_AGENT};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{LunarError, Result};
use crate::normalize::normalize_markup;

/// Placeholder in [`EngineConfig::base_url`] replaced by the ISO date.
pub const DATE_PLACEHOLDER: &str = "{date}";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Supplies the normalized text of the calendar page for a date.
pub trait PageFetcher: Send + Sync {
    /// # Errors
    ///
    /// [`LunarError::Timeout`] when the page did not arrive in time,
    /// [`LunarError::Upstream`] for any non-200 response or transport failure.
    fn fetch(&self, date: NaiveDate) -> Result<String>;
}

impl<F: PageFetcher + ?Sized> PageFetcher for &F {
    fn fetch(&self, date: NaiveDate) -> Result<String> {
        (**self).fetch(date)
    }
}

/// Blocking HTTP fetcher for the calendar site.
#[derive(Clone)]
pub struct HttpPageFetcher {
    client: Client,
    base_url: String,
    timeout: Duration,
    max_retries: usize,
}

impl HttpPageFetcher {
    /// Build a fetcher from the URL template, timeout and retry budget in
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns [`LunarError::InvalidConfig`] if the URL template lacks the
    /// `{date}` placeholder or the HTTP client cannot be built.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        if !config.base_url.contains(DATE_PLACEHOLDER) {
            return Err(LunarError::InvalidConfig(format!(
                "base URL '{}' has no {DATE_PLACEHOLDER} placeholder",
                config.base_url
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("ru-RU,ru;q=0.9,en;q=0.8"),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        let client = Client::builder()
            .timeout(config.http_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| LunarError::InvalidConfig(format!("cannot build HTTP client: {e}")))?;

        Ok(HttpPageFetcher {
            client,
            base_url: config.base_url.clone(),
            timeout: config.http_timeout,
            max_retries: config.max_retries,
        })
    }

    /// The page URL for `date`.
    pub fn url_for(&self, date: NaiveDate) -> String {
        page_url(&self.base_url, date)
    }

    fn fetch_raw(&self, date: NaiveDate) -> Result<String> {
        let url = self.url_for(date);
        let mut attempt = 0usize;
        loop {
            debug!(%url, attempt, "fetching calendar page");
            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status == StatusCode::OK {
                        return resp.text().map_err(|e| self.transport_error(e));
                    }
                    if should_retry(status) && attempt < self.max_retries {
                        attempt += 1;
                        warn!(%url, %status, attempt, "retrying calendar page fetch");
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    // block pages typically arrive as 403/429
                    return Err(LunarError::Upstream {
                        status: Some(status.as_u16()),
                        message: format!("calendar page returned status {status}"),
                    });
                }
                Err(err) if err.is_timeout() => {
                    return Err(LunarError::Timeout {
                        after: self.timeout,
                    })
                }
                Err(err) => {
                    if err.is_connect() && attempt < self.max_retries {
                        attempt += 1;
                        warn!(%url, error = %err, attempt, "retrying calendar page fetch");
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    return Err(self.transport_error(err));
                }
            }
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> LunarError {
        if err.is_timeout() {
            return LunarError::Timeout {
                after: self.timeout,
            };
        }
        LunarError::Upstream {
            status: err.status().map(|s| s.as_u16()),
            message: format!("request error: {err}"),
        }
    }
}

impl PageFetcher for HttpPageFetcher {
    fn fetch(&self, date: NaiveDate) -> Result<String> {
        let raw = self.fetch_raw(date)?;
        Ok(normalize_markup(&raw))
    }
}

/// Substitute the ISO date into a URL template.
pub fn page_url(template: &str, date: NaiveDate) -> String {
    template.replace(DATE_PLACEHOLDER, &date.format("%Y-%m-%d").to_string())
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(250 * (1 << capped))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_page_url_substitutes_iso_date() {
        let url = page_url(
            "https://horoscopes.rambler.ru/moon/calendar/{date}/",
            date(2024, 1, 5),
        );
        assert_eq!(url, "https://horoscopes.rambler.ru/moon/calendar/2024-01-05/");
    }

    #[test]
    fn test_default_config_builds_fetcher() {
        let fetcher = HttpPageFetcher::new(&EngineConfig::default()).unwrap();
        assert!(fetcher.url_for(date(2024, 12, 24)).ends_with("/2024-12-24/"));
    }

    #[test]
    fn test_template_without_placeholder_rejected() {
        let config = EngineConfig {
            base_url: "https://example.com/moon/".to_string(),
            ..EngineConfig::default()
        };
        let err = HttpPageFetcher::new(&config).err().unwrap();
        assert!(matches!(err, LunarError::InvalidConfig(_)));
    }

    #[test]
    fn test_retry_policy() {
        assert!(should_retry(StatusCode::TOO_MANY_REQUESTS));
        assert!(should_retry(StatusCode::BAD_GATEWAY));
        assert!(!should_retry(StatusCode::FORBIDDEN));
        assert!(!should_retry(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(retry_backoff(1), Duration::from_millis(500));
        assert_eq!(retry_backoff(9), retry_backoff(5));
    }
}
