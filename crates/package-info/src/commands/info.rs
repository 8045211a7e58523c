//! Resolve the packages named in a query and print them.

use crate::aggregate::{Aggregator, Resolution};
use crate::config::PackageInfoConfig;
use crate::output::{format_human, format_json};
use anyhow::Context;
use std::io::Read;
use std::path::Path;

/// Where the query text comes from.
pub enum QuerySource {
    Args(Vec<String>),
    Stdin,
}

impl QuerySource {
    fn read(self) -> anyhow::Result<String> {
        match self {
            QuerySource::Args(words) => Ok(words.join(" ")),
            QuerySource::Stdin => {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .context("failed to read query from stdin")?;
                Ok(text)
            }
        }
    }
}

pub async fn cmd_info(
    source: QuerySource,
    root: &Path,
    explicit_config: Option<&Path>,
    json: bool,
) -> anyhow::Result<i32> {
    let config = PackageInfoConfig::load(root, explicit_config)?;
    let aggregator = Aggregator::from_config(&config)?;
    let query = source.read()?;

    let resolutions = aggregator.resolve_query(&query).await;
    if resolutions.is_empty() {
        eprintln!("no package names in query");
        return Ok(0);
    }

    if json {
        println!("{}", format_json(&resolutions)?);
    } else {
        print!("{}", format_human(&resolutions));
    }
    Ok(exit_code(&resolutions))
}

/// Non-zero only when nothing resolved.
pub fn exit_code(resolutions: &[Resolution]) -> i32 {
    if !resolutions.is_empty() && !resolutions.iter().any(Resolution::is_found) {
        1
    } else {
        0
    }
}
