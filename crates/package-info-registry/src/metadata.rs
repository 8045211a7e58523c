//! Package description and repository URL from a registry CLI.

use crate::{RegistryError, RetryPolicy, with_timeout};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Registry metadata for one package.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub description: Option<String>,
    pub repository_url: Option<String>,
}

/// Source of [`PackageMetadata`].
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Resolve with the metadata or fail with
    /// [`RegistryError::MetadataUnavailable`] / [`RegistryError::Timeout`].
    async fn fetch_metadata(&self, package: &str) -> Result<PackageMetadata, RegistryError>;
}

/// A command-line tool that can print registry metadata as JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryTool {
    Npm,
    Pnpm,
    Yarn,
}

impl RegistryTool {
    /// Detection order.
    pub const ALL: [RegistryTool; 3] = [RegistryTool::Npm, RegistryTool::Pnpm, RegistryTool::Yarn];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "npm" => Some(RegistryTool::Npm),
            "pnpm" => Some(RegistryTool::Pnpm),
            "yarn" => Some(RegistryTool::Yarn),
            _ => None,
        }
    }

    pub fn program(&self) -> &'static str {
        match self {
            RegistryTool::Npm => "npm",
            RegistryTool::Pnpm => "pnpm",
            RegistryTool::Yarn => "yarn",
        }
    }

    /// `--` keeps a name like `-g` or `--json` from being read as an option.
    fn view_args<'a>(&self, package: &'a str) -> [&'a str; 4] {
        let verb = match self {
            RegistryTool::Npm | RegistryTool::Pnpm => "view",
            RegistryTool::Yarn => "info",
        };
        [verb, "--json", "--", package]
    }

    /// Full path of this tool's executable, if it is in PATH.
    pub fn locate(&self) -> Option<PathBuf> {
        which(self.program())
    }

    /// First tool found in PATH, with its executable.
    pub fn detect() -> Option<(Self, PathBuf)> {
        Self::ALL
            .into_iter()
            .find_map(|tool| tool.locate().map(|path| (tool, path)))
    }
}

/// Metadata via `npm view <pkg> --json` (or the pnpm/yarn equivalent).
#[derive(Debug, Clone)]
pub struct RegistryCli {
    tool: Option<RegistryTool>,
    /// Executable to spawn; `None` runs the tool's bare name.
    program: Option<PathBuf>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl RegistryCli {
    pub fn new(tool: RegistryTool, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            tool: Some(tool),
            program: tool.locate(),
            timeout,
            retry,
        }
    }

    /// Use the first registry tool found in PATH. When none is installed every
    /// fetch fails with [`RegistryError::MetadataUnavailable`].
    pub fn detect(timeout: Duration, retry: RetryPolicy) -> Self {
        let detected = RegistryTool::detect();
        if detected.is_none() {
            tracing::warn!("no registry tool (npm, pnpm, yarn) found in PATH");
        }
        let (tool, program) = detected.unzip();
        Self {
            tool,
            program,
            timeout,
            retry,
        }
    }

    /// Spawn `program` instead of the tool found in PATH, with the same
    /// arguments and output handling (e.g. a wrapper script).
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    pub fn tool(&self) -> Option<RegistryTool> {
        self.tool
    }

    async fn run_once(&self, tool: RegistryTool, package: &str) -> Result<PackageMetadata, RegistryError> {
        let program = match &self.program {
            Some(path) => path.as_os_str(),
            None => OsStr::new(tool.program()),
        };
        let args = tool.view_args(package);
        tracing::debug!(program = %program.to_string_lossy(), ?args, "running registry tool");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| unavailable(package, format!("cannot run {}: {}", tool.program(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("404") || stderr.contains("not found") {
                return Err(unavailable(package, "package not found in registry"));
            }
            return Err(unavailable(
                package,
                format!("{} exited with {}: {}", tool.program(), output.status, stderr.trim()),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_view_output(tool, &stdout).map_err(|reason| unavailable(package, reason))
    }
}

#[async_trait]
impl MetadataSource for RegistryCli {
    async fn fetch_metadata(&self, package: &str) -> Result<PackageMetadata, RegistryError> {
        let Some(tool) = self.tool else {
            return Err(unavailable(package, "no registry tool (npm, pnpm, yarn) found in PATH"));
        };
        let operation = format!("{} view {}", tool.program(), package);
        self.retry
            .run(&operation, || {
                with_timeout(self.timeout, operation.clone(), self.run_once(tool, package))
            })
            .await
    }
}

fn unavailable(package: &str, reason: impl Into<String>) -> RegistryError {
    RegistryError::MetadataUnavailable {
        package: package.to_string(),
        reason: reason.into(),
    }
}

/// Parse the JSON a registry tool prints for a package.
pub fn parse_view_output(tool: RegistryTool, output: &str) -> Result<PackageMetadata, String> {
    let mut v: serde_json::Value =
        serde_json::from_str(output).map_err(|e| format!("invalid JSON: {}", e))?;

    // Yarn wraps output: {"type":"inspect","data":{...}}
    if tool == RegistryTool::Yarn {
        if let Some(data) = v.get_mut("data") {
            v = data.take();
        }
    }

    // Version ranges print one object per matching version; the last is newest.
    if let serde_json::Value::Array(items) = v {
        v = items
            .into_iter()
            .last()
            .ok_or_else(|| "empty result".to_string())?;
    }

    if !v.is_object() {
        return Err("expected a JSON object".to_string());
    }

    let description = v.get("description").and_then(|d| d.as_str()).map(String::from);

    let repository_url = v.get("repository").and_then(|r| {
        if let Some(url) = r.as_str() {
            Some(url.to_string())
        } else {
            r.get("url").and_then(|u| u.as_str()).map(String::from)
        }
    });

    Ok(PackageMetadata {
        description,
        repository_url,
    })
}

/// Find a command in PATH.
fn which(cmd: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    let pathext = std::env::var("PATHEXT").ok();
    which_in(cmd, &paths, pathext_for_platform(pathext.as_deref()))
}

fn which_in(cmd: &str, paths: &OsStr, pathext: Option<&str>) -> Option<PathBuf> {
    let names = candidate_names(cmd, pathext);
    std::env::split_paths(paths).find_map(|dir| {
        names
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file() && is_executable(path))
    })
}

/// On Windows `npm` is installed as `npm.cmd`.
#[cfg(windows)]
fn pathext_for_platform(pathext: Option<&str>) -> Option<&str> {
    Some(pathext.unwrap_or(".COM;.EXE;.BAT;.CMD"))
}

#[cfg(not(windows))]
fn pathext_for_platform(_pathext: Option<&str>) -> Option<&str> {
    None
}

/// `cmd` itself, then `cmd` with each extension in `pathext`.
fn candidate_names(cmd: &str, pathext: Option<&str>) -> Vec<String> {
    let mut names = vec![cmd.to_string()];
    if let Some(pathext) = pathext {
        names.extend(
            pathext
                .split(';')
                .filter(|ext| !ext.is_empty())
                .map(|ext| format!("{}{}", cmd, ext.to_ascii_lowercase())),
        );
    }
    names
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
