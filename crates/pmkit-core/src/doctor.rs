//! Installation diagnostics (`pm-kit doctor`).

use crate::detect::ChangeSource;
use crate::error::Result;
use crate::exclusion::ExclusionSet;
use crate::io;
use crate::mcp::{self, McpConfig, CATALOG};
use crate::metadata::InstallMetadata;
use crate::paths::{self, REQUIRED_DIRS};
use crate::system;
use crate::update::detect_local_changes;
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, SystemTime};

pub const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(5);

/// Minimum `.md` file counts per payload directory.
pub const EXPECTED_FILES: &[(&str, &str, usize)] = &[
    ("Workflows", ".claude/workflows", 18),
    ("Agents", ".claude/agents", 10),
    ("Commands", ".claude/commands", 16),
    ("Skills", ".claude/skills", 5),
];

#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub name: String,
    pub passed: bool,
    pub message: String,
    /// Optional checks never count as issues.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

impl Check {
    fn new(name: impl Into<String>, passed: bool, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            message: message.into(),
            optional: false,
        }
    }

    fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    fn presence(name: &str, present: bool) -> Self {
        Self::new(name, present, if present { "Present" } else { "Missing" })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub category: String,
    pub checks: Vec<Check>,
    pub passed: bool,
    /// Failures in a warning category are reported but are not issues.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub warning: bool,
}

impl Category {
    fn new(name: &str, checks: Vec<Check>) -> Self {
        let passed = checks.iter().filter(|c| !c.optional).all(|c| c.passed);
        Self {
            category: name.to_string(),
            checks,
            passed,
            warning: false,
        }
    }

    fn as_warning(mut self) -> Self {
        self.warning = true;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorReport {
    pub categories: Vec<Category>,
}

impl DoctorReport {
    pub fn issues(&self) -> usize {
        self.categories
            .iter()
            .filter(|c| !c.warning)
            .flat_map(|c| &c.checks)
            .filter(|c| !c.passed && !c.optional)
            .count()
    }

    pub fn warnings(&self) -> usize {
        self.categories
            .iter()
            .map(|cat| {
                cat.checks
                    .iter()
                    .filter(|c| !c.passed && (cat.warning || c.optional))
                    .count()
            })
            .sum()
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.category == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DoctorOptions {
    pub verbose: bool,
    /// Endpoint probed for connectivity; `None` skips the category.
    pub api_url: Option<String>,
}

pub fn run(root: &Path, opts: &DoctorOptions) -> Result<DoctorReport> {
    let mut categories = vec![
        check_file_structure(root),
        check_api_configuration(root),
        check_claude_cli(),
        check_permissions(root),
    ];
    if let Some(url) = &opts.api_url {
        categories.push(check_connectivity(url, CONNECTIVITY_TIMEOUT));
    }
    if opts.verbose {
        categories.push(check_drift(root)?);
    }
    Ok(DoctorReport { categories })
}

fn count_md(dir: &Path) -> usize {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|x| x == "md"))
        .count()
}

pub fn check_file_structure(root: &Path) -> Category {
    let mut checks = vec![
        Check::presence("CLAUDE.md", paths::claude_md_path(root).is_file()),
        Check::presence(".claude/ directory", paths::claude_dir(root).is_dir()),
        Check::presence(".mcp.json", paths::mcp_config_path(root).is_file()),
    ];
    for (name, dir, expected) in EXPECTED_FILES {
        let path = root.join(dir);
        let exists = path.is_dir();
        let count = if exists { count_md(&path) } else { 0 };
        let suffix = if exists { "" } else { " (directory missing)" };
        checks.push(Check::new(
            *name,
            count >= *expected,
            format!("{count}/{expected} files{suffix}"),
        ));
    }
    let outputs_present = REQUIRED_DIRS
        .iter()
        .filter(|d| d.starts_with("outputs/"))
        .all(|d| root.join(d).is_dir());
    checks.push(Check::new(
        "Output directories",
        outputs_present,
        if outputs_present { "All present" } else { "Some missing" },
    ));
    Category::new("File Structure", checks)
}

pub fn check_api_configuration(root: &Path) -> Category {
    const NAME: &str = "API Configuration";
    let path = paths::mcp_config_path(root);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(_) => {
            return Category::new(NAME, vec![Check::new("MCP Configuration", false, ".mcp.json not found")]);
        }
    };
    let doc: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(doc) => doc,
        Err(e) => {
            return Category::new(NAME, vec![Check::new("MCP Configuration", false, e.to_string())]);
        }
    };

    let valid = mcp::validate(&doc);
    let mut checks = vec![Check::new(
        "MCP Configuration",
        valid,
        if valid { "Valid" } else { "Invalid structure" },
    )];
    let config = serde_json::from_value::<McpConfig>(doc).unwrap_or_default();
    for spec in CATALOG {
        let status = config.check_server(spec.name);
        let check = Check::new(spec.name, status.is_ok(), status.message());
        checks.push(if spec.required { check } else { check.optional() });
    }
    Category::new(NAME, checks)
}

pub fn check_claude_cli() -> Category {
    let checks = match system::claude_cli_version() {
        Some(version) => vec![Check::new("Claude CLI", true, format!("Installed ({version})"))],
        None => vec![
            Check::new("Claude CLI", false, "Not found"),
            Check::new(
                "Installation",
                false,
                format!("Install from {}", system::CLAUDE_INSTALL_URL),
            ),
        ],
    };
    Category::new("Claude CLI", checks).as_warning()
}

/// Read/write access on the working directories. `docs/` and `outputs/` are
/// created when missing.
pub fn check_permissions(root: &Path) -> Category {
    let targets = [
        (".claude", ".claude/ directory", false),
        ("docs", "docs/ directory", true),
        ("outputs", "outputs/ directory", true),
        (".", "Current directory", false),
    ];
    let checks = targets
        .into_iter()
        .map(|(rel, name, create)| {
            let path = root.join(rel);
            if create && !path.exists() {
                if let Err(e) = io::ensure_dir(&path) {
                    tracing::debug!(error = %e, "could not create {rel}");
                }
            }
            if !path.exists() {
                return Check::new(name, false, "Does not exist");
            }
            let readable = io::is_readable(&path);
            let writable = io::is_writable(&path);
            Check::new(
                name,
                readable && writable,
                format!(
                    "{}{}",
                    if readable { 'R' } else { '-' },
                    if writable { 'W' } else { '-' }
                ),
            )
        })
        .collect();
    Category::new("Permissions", checks)
}

/// A 401 still proves the endpoint is reachable.
pub fn check_connectivity(url: &str, timeout: Duration) -> Category {
    let check = match reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(format!("pm-kit-cli/{}", crate::metadata::CLI_VERSION))
        .build()
        .and_then(|c| c.get(url).send())
    {
        Ok(resp) => {
            let status = resp.status();
            let message = if status.is_success() {
                "Reachable".to_string()
            } else {
                format!("Status {}", status.as_u16())
            };
            Check::new("GitHub API", status.is_success() || status.as_u16() == 401, message)
        }
        Err(e) => {
            tracing::debug!(error = %e, "connectivity probe failed");
            let message = if e.is_timeout() { "Timed out" } else { "Unreachable" };
            Check::new("GitHub API", false, message)
        }
    };
    Category::new("Connectivity", vec![check])
}

/// Payload files changed since the last install or update.
pub fn check_drift(root: &Path) -> Result<Category> {
    let extra = InstallMetadata::load(root)
        .ok()
        .flatten()
        .map(|m| m.exclusions)
        .unwrap_or_default();
    let exclusions = ExclusionSet::new(extra).unwrap_or_default();
    let changes = detect_local_changes(root, &exclusions, SystemTime::now())?;
    let mut checks: Vec<Check> = changes
        .modifications
        .iter()
        .map(|m| Check::new(&m.path, false, m.status.to_string()))
        .collect();
    if checks.is_empty() {
        let message = match changes.source {
            ChangeSource::Baseline => "Matches the recorded baseline",
            ChangeSource::RecencyHeuristic => "No baseline; no recent edits",
        };
        checks.push(Check::new("Local changes", true, message));
    }
    Ok(Category::new("Local Changes", checks).as_warning())
}

/// Create every missing required directory. Returns the ones created.
pub fn fix(root: &Path) -> Result<Vec<String>> {
    let mut created = Vec::new();
    for dir in REQUIRED_DIRS {
        let path = root.join(dir);
        if !path.is_dir() {
            io::ensure_dir(&path)?;
            created.push(dir.to_string());
        }
    }
    Ok(created)
}
