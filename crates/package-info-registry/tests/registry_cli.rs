#![cfg(unix)]

use package_info_registry::{MetadataSource, RegistryCli, RegistryError, RegistryTool, RetryPolicy};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Write an executable shell script standing in for the registry tool.
fn fake_tool(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-npm");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn cli(program: PathBuf, timeout: Duration) -> RegistryCli {
    RegistryCli::new(RegistryTool::Npm, timeout, RetryPolicy::none()).with_program(program)
}

fn reason(err: RegistryError) -> String {
    match err {
        RegistryError::MetadataUnavailable { reason, .. } => reason,
        other => panic!("expected MetadataUnavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_reads_tool_output() {
    let dir = TempDir::new().unwrap();
    let program = fake_tool(
        dir.path(),
        r#"printf '%s\n' "$@" > "$(dirname "$0")/args"
echo '{"description":"fake","repository":{"url":"git+https://github.com/a/b.git"}}'"#,
    );

    let meta = cli(program, Duration::from_secs(5))
        .fetch_metadata("-g")
        .await
        .unwrap();
    assert_eq!(meta.description.as_deref(), Some("fake"));
    assert_eq!(meta.repository_url.as_deref(), Some("git+https://github.com/a/b.git"));

    let args = std::fs::read_to_string(dir.path().join("args")).unwrap();
    assert_eq!(args, "view\n--json\n--\n-g\n");
}

#[tokio::test]
async fn test_not_found_in_registry() {
    let dir = TempDir::new().unwrap();
    let program = fake_tool(
        dir.path(),
        "echo 'npm ERR! 404 Not Found - GET https://registry.npmjs.org/nope' >&2\nexit 1",
    );

    let err = cli(program, Duration::from_secs(5))
        .fetch_metadata("nope")
        .await
        .unwrap_err();
    assert_eq!(reason(err), "package not found in registry");
}

#[tokio::test]
async fn test_nonzero_exit_reports_stderr() {
    let dir = TempDir::new().unwrap();
    let program = fake_tool(dir.path(), "echo 'registry unreachable' >&2\nexit 3");

    let err = cli(program, Duration::from_secs(5))
        .fetch_metadata("lodash")
        .await
        .unwrap_err();
    let reason = reason(err);
    assert!(reason.contains("exited with"), "{}", reason);
    assert!(reason.contains("registry unreachable"), "{}", reason);
}

#[tokio::test]
async fn test_malformed_stdout() {
    let dir = TempDir::new().unwrap();
    let program = fake_tool(dir.path(), "echo 'not json'");

    let err = cli(program, Duration::from_secs(5))
        .fetch_metadata("lodash")
        .await
        .unwrap_err();
    assert!(reason(err).starts_with("invalid JSON"));
}

#[tokio::test]
async fn test_slow_tool_times_out_and_is_killed() {
    let dir = TempDir::new().unwrap();
    let program = fake_tool(dir.path(), "sleep 1\ntouch \"$(dirname \"$0\")/finished\"");

    let started = Instant::now();
    let err = cli(program, Duration::from_millis(200))
        .fetch_metadata("lodash")
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Timeout { .. }), "{:?}", err);
    assert!(started.elapsed() < Duration::from_secs(1));

    // The script would have finished by now had it not been killed.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!dir.path().join("finished").exists());
}
