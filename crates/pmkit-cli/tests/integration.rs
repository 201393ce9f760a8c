#![allow(deprecated)]
use assert_cmd::Command;
use base64::Engine;
use mockito::{Matcher, Server, ServerGuard};
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

const REPO: &str = "/repos/kv0906/pm-kit";

struct Env {
    project: TempDir,
    home: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            project: TempDir::new().unwrap(),
            home: TempDir::new().unwrap(),
        }
    }

    fn path(&self, rel: &str) -> std::path::PathBuf {
        self.project.path().join(rel)
    }

    fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path(rel)).unwrap()
    }
}

/// Command isolated from the real home directory, GitHub and any terminal.
fn pmkit(env: &Env, api_url: &str) -> Command {
    let mut cmd = Command::cargo_bin("pm-kit").unwrap();
    cmd.current_dir(env.project.path())
        .env("PMKIT_ROOT", env.project.path())
        .env("PMKIT_HOME", env.home.path())
        .env("PMKIT_GITHUB_API_URL", api_url)
        .env("GITHUB_TOKEN", "test-token")
        .env("NO_UPDATE_NOTIFIER", "1")
        .env("PMKIT_NO_ANIMATION", "1")
        .env_remove("GH_TOKEN")
        .env_remove("PMKIT_REPO")
        .env_remove("DEBUG")
        .env_remove("RUST_LOG");
    cmd
}

/// Nothing listens here; network checks fail fast.
const OFFLINE: &str = "http://127.0.0.1:9";

fn release(tag: &str) -> Value {
    json!({
        "tag_name": tag,
        "name": tag,
        "body": format!("Release {tag}\n\n- improvements"),
        "published_at": "2026-03-01T12:00:00Z",
        "html_url": format!("https://github.com/kv0906/pm-kit/releases/tag/{tag}"),
        "prerelease": false,
        "draft": false
    })
}

fn file_body(path: &str, content: &str) -> String {
    json!({
        "type": "file",
        "path": path,
        "encoding": "base64",
        "content": base64::engine::general_purpose::STANDARD.encode(content),
    })
    .to_string()
}

fn entry(path: &str, kind: &str) -> Value {
    let name = path.rsplit('/').next().unwrap();
    json!({ "name": name, "path": path, "type": kind })
}

/// A kit repository whose latest release is `tag`, serving a small payload.
fn kit_server(tag: &str, claude_md: &str) -> ServerGuard {
    let mut server = Server::new();
    let contents = |path: &str| format!("{REPO}/contents/{path}");
    let at_tag = || Matcher::UrlEncoded("ref".into(), tag.into());

    server
        .mock("GET", "/user")
        .with_body(r#"{"login":"octo"}"#)
        .create();
    server
        .mock("GET", format!("{REPO}/releases/latest").as_str())
        .with_body(release(tag).to_string())
        .create();
    server
        .mock("GET", format!("{REPO}/releases").as_str())
        .match_query(Matcher::Any)
        .with_body(json!([release(tag), release("v1.0.0")]).to_string())
        .create();
    server
        .mock("GET", contents("CLAUDE.md").as_str())
        .match_query(at_tag())
        .with_body(file_body("CLAUDE.md", claude_md))
        .create();
    server
        .mock("GET", contents(".claude").as_str())
        .match_query(at_tag())
        .with_body(
            json!([
                entry(".claude/workflows", "dir"),
                entry(".claude/settings.json", "file")
            ])
            .to_string(),
        )
        .create();
    server
        .mock("GET", contents(".claude/workflows").as_str())
        .match_query(at_tag())
        .with_body(json!([entry(".claude/workflows/prd.md", "file")]).to_string())
        .create();
    server
        .mock("GET", contents(".claude/workflows/prd.md").as_str())
        .match_query(at_tag())
        .with_body(file_body(".claude/workflows/prd.md", "# PRD workflow\n"))
        .create();
    server
        .mock("GET", contents(".claude/settings.json").as_str())
        .match_query(at_tag())
        .with_body(file_body(".claude/settings.json", "{}\n"))
        .create();
    server
}

fn init_at(env: &Env, tag: &str) -> ServerGuard {
    let server = kit_server(tag, "# PM Kit\n");
    pmkit(env, &server.url()).arg("init").assert().success();
    server
}

// ---------------------------------------------------------------------------
// top level
// ---------------------------------------------------------------------------

#[test]
fn no_arguments_prints_help() {
    let env = Env::new();
    pmkit(&env, OFFLINE)
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_prints_cli_version() {
    let env = Env::new();
    pmkit(&env, OFFLINE)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pm-kit-cli v"));
}

#[test]
fn version_flag_reports_newer_release() {
    let env = Env::new();
    let mut server = Server::new();
    server
        .mock("GET", "/repos/kv0906/pm-kit-cli/releases/latest")
        .with_body(r#"{"tag_name":"v999.0.0"}"#)
        .create();
    pmkit(&env, &server.url())
        .env_remove("NO_UPDATE_NOTIFIER")
        .arg("-v")
        .assert()
        .success()
        .stdout(predicate::str::contains("Update available!"))
        .stdout(predicate::str::contains("999.0.0"));
    assert!(env.home.path().join(".pm-kit/cache/version-check.json").is_file());
}

// ---------------------------------------------------------------------------
// pm-kit init
// ---------------------------------------------------------------------------

#[test]
fn init_installs_payload_and_records_state() {
    let env = Env::new();
    let server = kit_server("v1.0.0", "# PM Kit\n");
    pmkit(&env, &server.url())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Authenticated as"))
        .stdout(predicate::str::contains("Installation Complete"));

    assert_eq!(env.read("CLAUDE.md"), "# PM Kit\n");
    assert_eq!(env.read(".claude/workflows/prd.md"), "# PRD workflow\n");
    assert!(env.path("prds/active").is_dir());
    assert!(env.path("outputs/evidence-logs").is_dir());
    assert!(env.read(".gitignore").contains("# PM Kit"));

    let mcp: Value = serde_json::from_str(&env.read(".mcp.json")).unwrap();
    assert_eq!(mcp["mcpServers"]["gemini"]["disabled"], true);

    let meta: Value = serde_json::from_str(&env.read(".pm-kit/metadata.json")).unwrap();
    assert_eq!(meta["version"], "v1.0.0");
    assert_eq!(meta["mode"], "full");

    let baseline: Value = serde_json::from_str(&env.read(".pm-kit/file-hashes.json")).unwrap();
    assert!(baseline.get("CLAUDE.md").is_some());
}

#[test]
fn init_exclusion_skips_matching_files() {
    let env = Env::new();
    let server = kit_server("v1.0.0", "# PM Kit\n");
    pmkit(&env, &server.url())
        .args(["init", "--exclude", ".claude/workflows/**"])
        .assert()
        .success();
    assert!(env.path("CLAUDE.md").is_file());
    assert!(!env.path(".claude/workflows/prd.md").exists());
    assert!(env.path(".claude/settings.json").is_file());
}

#[test]
fn reinit_without_terminal_keeps_existing_install() {
    let env = Env::new();
    let server = init_at(&env, "v1.0.0");
    std::fs::write(env.path("CLAUDE.md"), "mine").unwrap();

    pmkit(&env, &server.url())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Installation cancelled"));
    assert_eq!(env.read("CLAUDE.md"), "mine");
}

#[test]
fn init_force_overwrites_existing_install() {
    let env = Env::new();
    let server = init_at(&env, "v1.0.0");
    std::fs::write(env.path("CLAUDE.md"), "mine").unwrap();

    pmkit(&env, &server.url())
        .args(["init", "--force"])
        .assert()
        .success();
    assert_eq!(env.read("CLAUDE.md"), "# PM Kit\n");
}

#[test]
fn init_without_token_fails_with_hint() {
    let env = Env::new();
    let server = kit_server("v1.0.0", "# PM Kit\n");
    pmkit(&env, &server.url())
        .env_remove("GITHUB_TOKEN")
        .env("PATH", "")
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("GitHub authentication required"))
        .stderr(predicate::str::contains("hint:"));
}

#[test]
fn invalid_token_is_reported() {
    let env = Env::new();
    let mut server = Server::new();
    server.mock("GET", "/user").with_status(401).create();
    pmkit(&env, &server.url())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid GitHub token"));
}

#[test]
fn reconfigure_api_requires_installation() {
    let env = Env::new();
    pmkit(&env, OFFLINE)
        .args(["init", "--reconfigure-api"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

// ---------------------------------------------------------------------------
// pm-kit update
// ---------------------------------------------------------------------------

#[test]
fn update_requires_initialization() {
    let env = Env::new();
    pmkit(&env, OFFLINE)
        .arg("update")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"))
        .stderr(predicate::str::contains("pm-kit init"));
}

#[test]
fn update_reports_up_to_date() {
    let env = Env::new();
    let server = init_at(&env, "v1.0.0");
    pmkit(&env, &server.url())
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("already on the latest version"));
}

#[test]
fn update_dry_run_changes_nothing() {
    let env = Env::new();
    let _old = init_at(&env, "v1.0.0");
    let server = kit_server("v1.1.0", "# PM Kit 1.1\n");

    pmkit(&env, &server.url())
        .args(["update", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry Run"))
        .stdout(predicate::str::contains(".claude/**"));
    assert_eq!(env.read("CLAUDE.md"), "# PM Kit\n");
}

#[test]
fn update_applies_newer_release() {
    let env = Env::new();
    let _old = init_at(&env, "v1.0.0");
    let server = kit_server("v1.1.0", "# PM Kit 1.1\n");

    pmkit(&env, &server.url())
        .args(["update", "--backup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Update Complete"))
        .stdout(predicate::str::contains("v1.0.0 to v1.1.0"));

    assert_eq!(env.read("CLAUDE.md"), "# PM Kit 1.1\n");
    let meta: Value = serde_json::from_str(&env.read(".pm-kit/metadata.json")).unwrap();
    assert_eq!(meta["version"], "v1.1.0");
    let backups = std::fs::read_dir(env.project.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".pm-kit-backup-"))
        .count();
    assert_eq!(backups, 1);
}

#[test]
fn update_keeps_local_edits_without_terminal() {
    let env = Env::new();
    let _old = init_at(&env, "v1.0.0");
    std::fs::write(env.path("CLAUDE.md"), "my notes").unwrap();
    let server = kit_server("v1.1.0", "# PM Kit 1.1\n");

    pmkit(&env, &server.url())
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("CLAUDE.md"))
        .stdout(predicate::str::contains("local changes kept"));
    assert_eq!(env.read("CLAUDE.md"), "my notes");
}

#[test]
fn update_force_overwrites_local_edits() {
    let env = Env::new();
    let _old = init_at(&env, "v1.0.0");
    std::fs::write(env.path("CLAUDE.md"), "my notes").unwrap();
    let server = kit_server("v1.1.0", "# PM Kit 1.1\n");

    pmkit(&env, &server.url())
        .args(["update", "--force"])
        .assert()
        .success();
    assert_eq!(env.read("CLAUDE.md"), "# PM Kit 1.1\n");
}

#[test]
fn update_to_unknown_version_fails() {
    let env = Env::new();
    let mut server = init_at(&env, "v1.0.0");
    server
        .mock("GET", format!("{REPO}/releases/tags/v9.9.9").as_str())
        .with_status(404)
        .create();

    pmkit(&env, &server.url())
        .args(["update", "--version", "v9.9.9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("version not found"));
}

// ---------------------------------------------------------------------------
// pm-kit versions
// ---------------------------------------------------------------------------

#[test]
fn versions_lists_releases_newest_first() {
    let env = Env::new();
    let server = kit_server("v1.1.0", "# PM Kit\n");
    pmkit(&env, &server.url())
        .args(["versions", "--verbose"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 2 version(s)"))
        .stdout(predicate::str::contains("latest"))
        .stdout(predicate::str::contains("Release v1.1.0"));
}

// ---------------------------------------------------------------------------
// pm-kit config
// ---------------------------------------------------------------------------

#[test]
fn config_set_get_and_delete_local_value() {
    let env = Env::new();
    pmkit(&env, OFFLINE)
        .args(["config", "set", "theme", "dark"])
        .assert()
        .success();
    let doc: Value = serde_json::from_str(&env.read(".pm-kit/local-config.json")).unwrap();
    assert_eq!(doc["theme"], "dark");
    assert!(doc.get("lastUpdated").is_some());

    pmkit(&env, OFFLINE)
        .args(["config", "get", "theme"])
        .assert()
        .success()
        .stdout(predicate::str::contains("theme (local): dark"));

    pmkit(&env, OFFLINE)
        .args(["config", "delete", "theme"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted theme"));
    pmkit(&env, OFFLINE)
        .args(["config", "get", "theme"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not found"));
}

#[test]
fn config_list_masks_sensitive_values() {
    let env = Env::new();
    pmkit(&env, OFFLINE)
        .args(["config", "set", "global.serviceToken", "abcdefghijklmnop"])
        .assert()
        .success();
    pmkit(&env, OFFLINE)
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("abcd********mnop"))
        .stdout(predicate::str::contains("abcdefghijklmnop").not());
}

#[test]
fn config_set_github_token_uses_credential_file() {
    let env = Env::new();
    pmkit(&env, OFFLINE)
        .args(["config", "set", "github-token", "ghp_secret_value"])
        .assert()
        .success()
        .stdout(predicate::str::contains("GitHub token saved"));
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        let creds = std::fs::read_to_string(env.home.path().join(".pm-kit/.credentials")).unwrap();
        assert!(creds.contains("ghp_secret_value"));
    }
}

#[test]
fn config_rejects_unknown_action() {
    let env = Env::new();
    pmkit(&env, OFFLINE)
        .args(["config", "frobnicate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid action: frobnicate"));
}

#[test]
fn config_get_requires_key() {
    let env = Env::new();
    pmkit(&env, OFFLINE)
        .args(["config", "get"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Key is required for get action"));
}

// ---------------------------------------------------------------------------
// pm-kit doctor
// ---------------------------------------------------------------------------

#[test]
fn doctor_fails_on_empty_project() {
    let env = Env::new();
    pmkit(&env, OFFLINE)
        .arg("doctor")
        .assert()
        .failure()
        .stdout(predicate::str::contains("File Structure"))
        .stderr(predicate::str::contains("issue(s) found"));
}

#[test]
fn doctor_json_is_machine_readable() {
    let env = Env::new();
    let out = pmkit(&env, OFFLINE)
        .args(["doctor", "--json"])
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let report: Value = serde_json::from_slice(&out).unwrap();
    assert!(report["issues"].as_u64().unwrap() > 0);
    let names: Vec<&str> = report["categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["category"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"File Structure"));
    assert!(names.contains(&"Connectivity"));
}

#[test]
fn doctor_fix_creates_missing_directories() {
    let env = Env::new();
    pmkit(&env, OFFLINE)
        .args(["doctor", "--fix"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created prds/active"));
    assert!(env.path("decisions/logs").is_dir());
}

// ---------------------------------------------------------------------------
// pm-kit uninstall
// ---------------------------------------------------------------------------

#[test]
fn uninstall_with_nothing_installed() {
    let env = Env::new();
    pmkit(&env, OFFLINE)
        .arg("uninstall")
        .assert()
        .success()
        .stdout(predicate::str::contains("No PM Kit installations found."));
}

#[test]
fn uninstall_without_terminal_is_declined() {
    let env = Env::new();
    let _server = init_at(&env, "v1.0.0");
    pmkit(&env, OFFLINE)
        .arg("uninstall")
        .assert()
        .success()
        .stdout(predicate::str::contains("Uninstall cancelled"));
    assert!(env.path(".claude").is_dir());
}

#[test]
fn uninstall_yes_removes_installation() {
    let env = Env::new();
    let _server = init_at(&env, "v1.0.0");
    std::fs::write(env.path("notes.md"), "keep me").unwrap();

    pmkit(&env, OFFLINE)
        .args(["uninstall", "-y"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uninstall Complete"));

    for gone in [".claude", "CLAUDE.md", ".mcp.json", ".pm-kit"] {
        assert!(!env.path(gone).exists(), "{gone} should be removed");
    }
    assert!(env.path("notes.md").is_file());
}
