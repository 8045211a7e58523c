//! Description, repository and download trend for npm packages named in a
//! text selection.
//!
//! A query such as `"lodash moment/request"` is split into package names,
//! each name is resolved concurrently (cache first, otherwise registry
//! metadata and twelve months of download counts fetched together), and the
//! caller gets one [`Resolution`] per name: a [`PackageRecord`] or a
//! [`NamedFailure`]. One package failing never discards the others.
//!
//! # Example
//!
//! ```ignore
//! use package_info::{Aggregator, PackageInfoConfig};
//! use std::path::Path;
//!
//! let config = PackageInfoConfig::load(Path::new("."), None)?;
//! let aggregator = Aggregator::from_config(&config)?;
//! for resolution in aggregator.resolve_query("lodash moment/request").await {
//!     println!("{}: {}", resolution.name(), resolution.is_found());
//! }
//! ```

pub mod aggregate;
pub mod commands;
pub mod config;
pub mod output;
pub mod tokenize;

pub use aggregate::{
    Aggregator, BuildError, CachedPackage, NamedFailure, PackageRecord, Resolution,
};
pub use config::{ConfigError, PackageInfoConfig};
pub use tokenize::{PackageName, SEPARATORS, tokenize};
