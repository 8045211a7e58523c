use assert_cmd::Command;
use tempfile::TempDir;

fn cli(root: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("package-info").unwrap();
    cmd.env("XDG_CONFIG_HOME", root.path().join("xdg"))
        .env_remove("RUST_LOG")
        .arg("--root")
        .arg(root.path());
    cmd
}

#[test]
fn test_config_prints_defaults() {
    let dir = TempDir::new().unwrap();
    let output = cli(&dir).arg("config").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("[cache]"));
    assert!(stdout.contains("capacity = 100"));
    assert!(stdout.contains("ttl_secs = 3600"));
    assert!(stdout.contains("downloads_url = \"https://api.npmjs.org/downloads/point\""));
}

#[test]
fn test_config_applies_project_file() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".package-info")).unwrap();
    std::fs::write(
        dir.path().join(".package-info").join("config.toml"),
        "[cache]\ncapacity = 5\n",
    )
    .unwrap();

    let output = cli(&dir).arg("config").output().unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("capacity = 5"));
    assert!(stdout.contains("ttl_secs = 3600"));
}

#[test]
fn test_malformed_config_fails() {
    let dir = TempDir::new().unwrap();
    let bad = dir.path().join("bad.toml");
    std::fs::write(&bad, "[cache\n").unwrap();

    let output = cli(&dir).arg("--config").arg(&bad).arg("config").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("invalid config"));
}

#[test]
fn test_separator_only_query_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let output = cli(&dir).args(["info", "//", "::"]).output().unwrap();
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("no package names in query"));
}

#[test]
fn test_stdin_query_with_no_names() {
    let dir = TempDir::new().unwrap();
    let output = cli(&dir)
        .args(["info", "--stdin", "--json"])
        .write_stdin("  \n  ")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}
