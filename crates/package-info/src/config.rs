//! Configuration for package-info.
//!
//! Layers, later overriding earlier key by key:
//! 1. Built-in defaults
//! 2. Global: ~/.config/package-info/config.toml
//! 3. Per-project: .package-info/config.toml
//! 4. A file passed with `--config`
//!
//! Example config.toml:
//! ```toml
//! [cache]
//! capacity = 100
//! ttl_secs = 3600
//!
//! [registry]
//! tool = "npm"
//! timeout_secs = 10
//!
//! [github]
//! enabled = true
//! ```

use package_info_cache::CacheConfig;
use package_info_registry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(#[from] toml::de::Error),
}

/// Result cache sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Maximum number of cached packages.
    pub capacity: usize,
    /// Seconds before a cached package is fetched again.
    pub ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            capacity: package_info_cache::DEFAULT_CAPACITY,
            ttl_secs: package_info_cache::DEFAULT_TTL.as_secs(),
        }
    }
}

/// Registry tool and download API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    /// npm, pnpm or yarn. Unset: first one found in PATH.
    pub tool: Option<String>,
    /// Prefix of the point-downloads endpoint.
    pub downloads_url: String,
    /// Bound for every subprocess and HTTP call.
    pub timeout_secs: u64,
    /// Total attempts per external call; 1 disables retry.
    pub attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            tool: None,
            downloads_url: package_info_registry::NpmDownloads::DEFAULT_URL.to_string(),
            timeout_secs: 10,
            attempts: 1,
            retry_backoff_ms: 250,
        }
    }
}

/// Repository stats enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubSection {
    pub enabled: bool,
    pub api_url: String,
    pub user_agent: String,
}

impl Default for GithubSection {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: package_info_registry::github::GithubSearch::DEFAULT_URL.to_string(),
            user_agent: "package-info".to_string(),
        }
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageInfoConfig {
    pub cache: CacheSection,
    pub registry: RegistrySection,
    pub github: GithubSection,
}

impl PackageInfoConfig {
    /// Load global, per-project and explicit config for `root`.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_global(Self::global_config_path(), root, explicit)
    }

    /// Like [`load`](Self::load) with the global file location supplied.
    pub fn load_with_global(
        global: Option<PathBuf>,
        root: &Path,
        explicit: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut merged = toml::Table::new();

        if let Some(global) = global {
            if let Some(table) = Self::load_optional(&global)? {
                merge_tables(&mut merged, table);
            }
        }

        let project = root.join(".package-info").join("config.toml");
        if let Some(table) = Self::load_optional(&project)? {
            merge_tables(&mut merged, table);
        }

        if let Some(path) = explicit {
            merge_tables(&mut merged, Self::load_file(path)?);
        }

        Ok(toml::Value::Table(merged).try_into()?)
    }

    /// Get the global config path.
    fn global_config_path() -> Option<PathBuf> {
        let config_home = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;
        Some(config_home.join("package-info").join("config.toml"))
    }

    /// A missing file is not an error; an unreadable or malformed one is.
    fn load_optional(path: &Path) -> Result<Option<toml::Table>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        tracing::debug!(path = %path.display(), "loading config");
        Self::load_file(path).map(Some)
    }

    fn load_file(path: &Path) -> Result<toml::Table, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        content.parse::<toml::Table>().map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new(self.cache.capacity, Duration::from_secs(self.cache.ttl_secs))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.registry.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.registry.attempts,
            Duration::from_millis(self.registry.retry_backoff_ms),
        )
    }
}

/// Recursively merge `other` into `base`; `other` wins on conflicts.
fn merge_tables(base: &mut toml::Table, other: toml::Table) {
    for (key, value) in other {
        match value {
            toml::Value::Table(incoming) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, incoming);
                } else {
                    base.insert(key, toml::Value::Table(incoming));
                }
            }
            value => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut file = std::fs::File::create(path).unwrap();
        writeln!(file, "{}", content).unwrap();
    }

    #[test]
    fn test_default_config() {
        let config = PackageInfoConfig::default();
        assert_eq!(config.cache.capacity, 100);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.registry.timeout_secs, 10);
        assert_eq!(config.registry.attempts, 1);
        assert_eq!(config.registry.downloads_url, "https://api.npmjs.org/downloads/point");
        assert!(config.registry.tool.is_none());
        assert!(!config.github.enabled);
    }

    #[test]
    fn test_no_files_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = PackageInfoConfig::load_with_global(None, dir.path(), None).unwrap();
        assert_eq!(config, PackageInfoConfig::default());
    }

    #[test]
    fn test_partial_sections_merge_key_by_key() {
        let dir = TempDir::new().unwrap();
        let global = dir.path().join("global.toml");
        write_file(
            &global,
            r#"
[cache]
capacity = 10
ttl_secs = 60

[registry]
tool = "pnpm"
"#,
        );
        write_file(
            &dir.path().join(".package-info").join("config.toml"),
            r#"
[cache]
ttl_secs = 5
"#,
        );

        let config = PackageInfoConfig::load_with_global(Some(global), dir.path(), None).unwrap();
        assert_eq!(config.cache.capacity, 10); // from global
        assert_eq!(config.cache.ttl_secs, 5); // project overrides
        assert_eq!(config.registry.tool.as_deref(), Some("pnpm"));
        assert_eq!(config.registry.timeout_secs, 10); // default
    }

    #[test]
    fn test_explicit_file_wins() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir.path().join(".package-info").join("config.toml"),
            "[github]\nenabled = false\n",
        );
        let explicit = dir.path().join("ci.toml");
        write_file(&explicit, "[github]\nenabled = true\nuser_agent = \"ci-bot\"\n");

        let config =
            PackageInfoConfig::load_with_global(None, dir.path(), Some(&explicit)).unwrap();
        assert!(config.github.enabled);
        assert_eq!(config.github.user_agent, "ci-bot");
        assert_eq!(config.github.api_url, "https://api.github.com");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = PackageInfoConfig::load_with_global(None, dir.path(), Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_malformed_project_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir.path().join(".package-info").join("config.toml"),
            "[cache\ncapacity = ",
        );
        let err = PackageInfoConfig::load_with_global(None, dir.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_wrong_type_is_an_error() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir.path().join(".package-info").join("config.toml"),
            "[cache]\ncapacity = \"lots\"\n",
        );
        let err = PackageInfoConfig::load_with_global(None, dir.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_derived_settings() {
        let mut config = PackageInfoConfig::default();
        config.registry.attempts = 3;
        config.registry.retry_backoff_ms = 100;
        assert_eq!(config.retry_policy(), RetryPolicy::new(3, Duration::from_millis(100)));
        assert_eq!(config.cache_config().ttl, Duration::from_secs(3600));
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = PackageInfoConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: PackageInfoConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
