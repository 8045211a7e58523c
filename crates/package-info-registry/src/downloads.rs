//! Monthly download counts from the npm downloads API.

use crate::{MonthRange, RegistryError, RetryPolicy, month_ranges, with_timeout};
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Downloads for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyDownloadCount {
    pub period: MonthRange,
    pub downloads: u64,
}

/// Source of download counts.
#[async_trait]
pub trait DownloadSource: Send + Sync {
    /// Downloads of `package` within `period`.
    ///
    /// Failures should be [`RegistryError::DownloadCountUnavailable`] naming
    /// `period`, or [`RegistryError::Timeout`].
    async fn fetch_month(&self, package: &str, period: MonthRange) -> Result<u64, RegistryError>;

    /// Twelve months ending with the month containing `today`, oldest first.
    async fn fetch_counts(
        &self,
        package: &str,
        today: NaiveDate,
    ) -> Result<Vec<MonthlyDownloadCount>, RegistryError> {
        fetch_monthly_counts(self, package, today).await
    }
}

/// Fetch every month concurrently and wait for all of them.
///
/// Results keep the computed oldest-to-newest order regardless of completion
/// order. Any failed month fails the whole fetch; there is no zero-filling.
pub async fn fetch_monthly_counts<S>(
    source: &S,
    package: &str,
    today: NaiveDate,
) -> Result<Vec<MonthlyDownloadCount>, RegistryError>
where
    S: DownloadSource + ?Sized,
{
    let periods = month_ranges(today);
    let results = join_all(periods.into_iter().map(|period| async move {
        source
            .fetch_month(package, period)
            .await
            .map(|downloads| MonthlyDownloadCount { period, downloads })
    }))
    .await;

    results.into_iter().collect()
}

#[derive(Deserialize)]
struct DownloadPoint {
    downloads: u64,
}

/// Extract the `downloads` field from a point-query response body.
pub fn parse_downloads_body(body: &str) -> Result<u64, String> {
    serde_json::from_str::<DownloadPoint>(body)
        .map(|point| point.downloads)
        .map_err(|e| format!("malformed response: {}", e))
}

/// Download counts via `GET {base}/{start}:{end}/{package}`.
#[derive(Debug, Clone)]
pub struct NpmDownloads {
    client: reqwest::Client,
    base_url: reqwest::Url,
    timeout: Duration,
    retry: RetryPolicy,
}

impl NpmDownloads {
    pub const DEFAULT_URL: &'static str = "https://api.npmjs.org/downloads/point";

    /// Requests are bounded by `timeout` through [`with_timeout`], not by the
    /// client, so an expired call surfaces as [`RegistryError::Timeout`].
    pub fn new(base_url: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self, RegistryError> {
        let invalid = |reason: String| RegistryError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };
        let parsed = reqwest::Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(invalid("not a hierarchical url".to_string()));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("package-info/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: parsed,
            timeout,
            retry,
        })
    }

    /// The package name is one percent-encoded path segment, so `#`, `?` and
    /// the like cannot redirect the request to another package.
    pub fn month_url(&self, package: &str, period: MonthRange) -> reqwest::Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(&period.to_string())
                .push(package);
        }
        url
    }

    async fn get_once(&self, package: &str, period: MonthRange) -> Result<u64, RegistryError> {
        let url = self.month_url(package, period);
        tracing::debug!(%url, "fetching download count");

        let unavailable = |reason: String| RegistryError::DownloadCountUnavailable {
            package: package.to_string(),
            period,
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(unavailable(format!("HTTP {}", status)));
        }

        let body = response.text().await.map_err(|e| unavailable(e.to_string()))?;
        parse_downloads_body(&body).map_err(unavailable)
    }
}

#[async_trait]
impl DownloadSource for NpmDownloads {
    async fn fetch_month(&self, package: &str, period: MonthRange) -> Result<u64, RegistryError> {
        let operation = format!("download count for {} ({})", package, period);
        self.retry
            .run(&operation, || {
                with_timeout(self.timeout, operation.clone(), self.get_once(package, period))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body() {
        let body = r#"{"downloads":31234567,"start":"2024-03-01","end":"2024-03-31","package":"lodash"}"#;
        assert_eq!(parse_downloads_body(body), Ok(31234567));
    }

    #[test]
    fn test_parse_error_body() {
        assert!(parse_downloads_body(r#"{"error":"package nope not found"}"#).is_err());
        assert!(parse_downloads_body(r#"{"downloads":-1}"#).is_err());
        assert!(parse_downloads_body("<html>").is_err());
    }

    #[test]
    fn test_month_url() {
        let downloads = NpmDownloads::new(
            "https://api.npmjs.org/downloads/point/",
            Duration::from_secs(10),
            RetryPolicy::none(),
        )
        .unwrap();
        let period = MonthRange::containing(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()).unwrap();
        assert_eq!(
            downloads.month_url("lodash", period).as_str(),
            "https://api.npmjs.org/downloads/point/2024-03-01:2024-03-31/lodash"
        );
    }

    #[test]
    fn test_month_url_encodes_reserved_characters() {
        let downloads =
            NpmDownloads::new("http://127.0.0.1:9/point", Duration::from_secs(1), RetryPolicy::none())
                .unwrap();
        let period = MonthRange::containing(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()).unwrap();
        let url = downloads.month_url("lodash#evil?x", period);
        assert_eq!(url.path(), "/point/2024-03-01:2024-03-31/lodash%23evil%3Fx");
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        for base in ["not a url", "mailto:someone@example.com"] {
            let err = NpmDownloads::new(base, Duration::from_secs(1), RetryPolicy::none()).unwrap_err();
            assert!(matches!(err, RegistryError::InvalidUrl { .. }), "{}", base);
        }
    }
}
