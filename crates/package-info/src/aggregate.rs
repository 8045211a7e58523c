//! Resolve package names to records: cache lookup, concurrent fetch, merge.

use crate::config::PackageInfoConfig;
use crate::tokenize::{PackageName, tokenize};
use chrono::NaiveDate;
use futures::future::join_all;
use package_info_cache::ResultCache;
use package_info_registry::github::{GithubRepo, GithubSearch, RepoInfoSource, repo_slug};
use package_info_registry::{
    DownloadSource, MetadataSource, MonthlyDownloadCount, NpmDownloads, RegistryCli, RegistryError,
    RegistryTool,
};
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;

/// What the cache stores per package name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPackage {
    pub counts: Vec<MonthlyDownloadCount>,
    pub description: Option<String>,
    pub repository_url: Option<String>,
    pub github: Option<GithubRepo>,
}

/// A resolved package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageRecord {
    pub name: String,
    pub description: Option<String>,
    pub repository_url: Option<String>,
    /// Twelve months, oldest first.
    pub counts: Vec<MonthlyDownloadCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubRepo>,
}

impl PackageRecord {
    fn from_cached(name: &str, cached: CachedPackage) -> Self {
        Self {
            name: name.to_string(),
            description: cached.description,
            repository_url: cached.repository_url,
            counts: cached.counts,
            github: cached.github,
        }
    }

    pub fn total_downloads(&self) -> u64 {
        self.counts.iter().map(|c| c.downloads).sum()
    }
}

/// A package that could not be resolved.
#[derive(Debug, Serialize)]
pub struct NamedFailure {
    pub name: String,
    #[serde(serialize_with = "serialize_error")]
    pub error: RegistryError,
}

fn serialize_error<S: Serializer>(error: &RegistryError, serializer: S) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    struct Tagged<'a> {
        kind: &'a str,
        message: String,
    }
    Tagged {
        kind: error.kind(),
        message: error.to_string(),
    }
    .serialize(serializer)
}

/// Outcome for one requested name.
#[derive(Debug, Serialize)]
#[serde(tag = "status")]
pub enum Resolution {
    #[serde(rename = "ok")]
    Found(PackageRecord),
    #[serde(rename = "error")]
    Failed(NamedFailure),
}

impl Resolution {
    pub fn name(&self) -> &str {
        match self {
            Resolution::Found(record) => &record.name,
            Resolution::Failed(failure) => &failure.name,
        }
    }

    pub fn record(&self) -> Option<&PackageRecord> {
        match self {
            Resolution::Found(record) => Some(record),
            Resolution::Failed(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }
}

/// Resolves package names against the registry, sharing one result cache.
pub struct Aggregator {
    metadata: Arc<dyn MetadataSource>,
    downloads: Arc<dyn DownloadSource>,
    github: Option<Arc<dyn RepoInfoSource>>,
    cache: Arc<ResultCache<CachedPackage>>,
}

impl Aggregator {
    pub fn new(
        metadata: Arc<dyn MetadataSource>,
        downloads: Arc<dyn DownloadSource>,
        cache: Arc<ResultCache<CachedPackage>>,
    ) -> Self {
        Self {
            metadata,
            downloads,
            github: None,
            cache,
        }
    }

    /// Attach repository stats to every freshly fetched record.
    pub fn with_github(mut self, github: Arc<dyn RepoInfoSource>) -> Self {
        self.github = Some(github);
        self
    }

    /// Build the production sources described by `config`.
    pub fn from_config(config: &PackageInfoConfig) -> Result<Self, BuildError> {
        let timeout = config.timeout();
        let retry = config.retry_policy();

        let metadata = match config.registry.tool.as_deref() {
            Some(name) => {
                let tool = RegistryTool::from_name(name)
                    .ok_or_else(|| BuildError::UnknownTool(name.to_string()))?;
                RegistryCli::new(tool, timeout, retry)
            }
            None => RegistryCli::detect(timeout, retry),
        };
        let downloads = NpmDownloads::new(&config.registry.downloads_url, timeout, retry)?;
        let cache = Arc::new(ResultCache::new(config.cache_config()));

        let aggregator = Self::new(Arc::new(metadata), Arc::new(downloads), cache);
        if !config.github.enabled {
            return Ok(aggregator);
        }
        let github = GithubSearch::new(
            &config.github.api_url,
            &config.github.user_agent,
            timeout,
            retry,
        )?;
        Ok(aggregator.with_github(Arc::new(github)))
    }

    pub fn cache(&self) -> &ResultCache<CachedPackage> {
        &self.cache
    }

    /// Tokenize `query` and resolve every name in it.
    ///
    /// A query without names returns an empty list and makes no external call.
    pub async fn resolve_query(&self, query: &str) -> Vec<Resolution> {
        let names = tokenize(query);
        if names.is_empty() {
            tracing::debug!("empty query, nothing to resolve");
            return Vec::new();
        }
        self.resolve(&names).await
    }

    /// Resolve `names` with download history ending in the current month.
    pub async fn resolve(&self, names: &[PackageName]) -> Vec<Resolution> {
        self.resolve_at(names, chrono::Local::now().date_naive()).await
    }

    /// Resolve `names` concurrently with download history ending in the month
    /// containing `today`.
    ///
    /// Returns one [`Resolution`] per name in input order. A failure for one
    /// name never affects the others.
    pub async fn resolve_at(&self, names: &[PackageName], today: NaiveDate) -> Vec<Resolution> {
        let resolutions = join_all(names.iter().map(|name| async move {
            match self.resolve_one(name.as_str(), today).await {
                Ok(record) => Resolution::Found(record),
                Err(error) => {
                    tracing::warn!(package = %name, %error, "resolution failed");
                    Resolution::Failed(NamedFailure {
                        name: name.to_string(),
                        error,
                    })
                }
            }
        }))
        .await;

        let found = resolutions.iter().filter(|r| r.is_found()).count();
        tracing::info!(
            requested = names.len(),
            found,
            failed = names.len() - found,
            "resolved packages"
        );
        resolutions
    }

    /// Resolve a single name: cache hit, or both fetches then cache fill.
    pub async fn resolve_one(&self, name: &str, today: NaiveDate) -> Result<PackageRecord, RegistryError> {
        if let Some(cached) = self.cache.get(name) {
            tracing::debug!(package = name, "cache hit");
            return Ok(PackageRecord::from_cached(name, cached));
        }
        tracing::debug!(package = name, "cache miss");

        let (counts, metadata) = tokio::try_join!(
            self.downloads.fetch_counts(name, today),
            self.metadata.fetch_metadata(name)
        )?;

        let github = match (&self.github, metadata.repository_url.as_deref()) {
            (Some(source), Some(url)) => self.enrich(source.as_ref(), name, url).await,
            _ => None,
        };

        let cached = CachedPackage {
            counts,
            description: metadata.description,
            repository_url: metadata.repository_url,
            github,
        };
        self.cache.set(name, cached.clone());
        Ok(PackageRecord::from_cached(name, cached))
    }

    /// Repository stats, or `None` if they cannot be had.
    async fn enrich(&self, source: &dyn RepoInfoSource, name: &str, url: &str) -> Option<GithubRepo> {
        let Some(slug) = repo_slug(url) else {
            tracing::debug!(package = name, url, "repository is not on github");
            return None;
        };
        match source.fetch_repo(name, &slug).await {
            Ok(repo) => Some(repo),
            Err(error) => {
                tracing::warn!(package = name, %error, "github enrichment failed");
                None
            }
        }
    }
}

/// Failure to assemble an [`Aggregator`] from configuration.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("unknown registry tool '{0}' (expected npm, pnpm or yarn)")]
    UnknownTool(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
