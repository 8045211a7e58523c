use crate::MonthRange;
use std::time::Duration;

/// Error type for registry queries.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Registry tool missing, failed, or produced unusable output.
    #[error("metadata unavailable for {package}: {reason}")]
    MetadataUnavailable { package: String, reason: String },

    /// One month's download count could not be fetched.
    #[error("download count unavailable for {package} ({period}): {reason}")]
    DownloadCountUnavailable {
        package: String,
        period: MonthRange,
        reason: String,
    },

    /// An external call exceeded its time bound.
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout { operation: String, after: Duration },

    /// Repository stats lookup failed.
    #[error("github info unavailable for {package}: {reason}")]
    GithubUnavailable { package: String, reason: String },

    /// A configured endpoint is not a usable base URL.
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The HTTP client could not be constructed.
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl RegistryError {
    /// Stable machine-readable tag for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryError::MetadataUnavailable { .. } => "metadata_unavailable",
            RegistryError::DownloadCountUnavailable { .. } => "download_count_unavailable",
            RegistryError::Timeout { .. } => "timeout",
            RegistryError::GithubUnavailable { .. } => "github_unavailable",
            RegistryError::InvalidUrl { .. } => "invalid_url",
            RegistryError::Client(_) => "client",
        }
    }
}
