//! npm registry metadata and download-count queries.
//!
//! Two independent sources feed a package record:
//!
//! - [`MetadataSource`]: description and repository URL, by default read from
//!   `npm view <pkg> --json` (or the pnpm/yarn equivalent) via [`RegistryCli`].
//! - [`DownloadSource`]: twelve months of download counts, by default from the
//!   public downloads API via [`NpmDownloads`].
//!
//! [`github`] adds optional repository stats from the GitHub search API.
//!
//! Every external call is bounded by a timeout and fails with a typed
//! [`RegistryError`] instead of hanging.
//!
//! # Example
//!
//! ```ignore
//! use package_info_registry::{DownloadSource, NpmDownloads, RetryPolicy};
//! use std::time::Duration;
//!
//! let downloads = NpmDownloads::new(NpmDownloads::DEFAULT_URL, Duration::from_secs(10), RetryPolicy::default())?;
//! let today = chrono::Local::now().date_naive();
//! for month in downloads.fetch_counts("lodash", today).await? {
//!     println!("{}: {}", month.period.label(), month.downloads);
//! }
//! ```

mod downloads;
mod error;
pub mod github;
mod metadata;
mod months;
mod retry;

pub use downloads::{
    DownloadSource, MonthlyDownloadCount, NpmDownloads, fetch_monthly_counts, parse_downloads_body,
};
pub use error::RegistryError;
pub use metadata::{MetadataSource, PackageMetadata, RegistryCli, RegistryTool, parse_view_output};
pub use months::{MONTHS, MonthRange, month_ranges};
pub use retry::{RetryPolicy, with_timeout};
