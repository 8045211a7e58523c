//! Print the effective configuration.

use crate::config::PackageInfoConfig;
use std::path::Path;

pub fn cmd_config(root: &Path, explicit: Option<&Path>) -> anyhow::Result<i32> {
    let config = PackageInfoConfig::load(root, explicit)?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(0)
}
