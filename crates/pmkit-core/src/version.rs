use serde::Serialize;
use std::cmp::Ordering;

/// Where the installed version stands relative to a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    Current,
    Outdated,
    /// Installed is newer than the target; moving to it is a downgrade.
    Ahead,
}

impl std::fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionStatus::Current => f.write_str("current"),
            VersionStatus::Outdated => f.write_str("outdated"),
            VersionStatus::Ahead => f.write_str("ahead"),
        }
    }
}

/// Dotted numeric core plus an optional pre-release label.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Parsed {
    core: Vec<u64>,
    pre: Option<String>,
}

fn parse(version: &str) -> Option<Parsed> {
    let v = version.trim();
    let v = v.strip_prefix(['v', 'V']).unwrap_or(v);
    let v = v.split('+').next().unwrap_or(v);
    let (core, pre) = match v.split_once('-') {
        Some((c, p)) => (c, Some(p.to_string())),
        None => (v, None),
    };
    let core = core
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    Some(Parsed { core, pre })
}

fn cmp_parsed(a: &Parsed, b: &Parsed) -> Ordering {
    let len = a.core.len().max(b.core.len());
    for i in 0..len {
        let x = a.core.get(i).copied().unwrap_or(0);
        let y = b.core.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    // A pre-release sorts before its release.
    match (&a.pre, &b.pre) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => x.cmp(y),
    }
}

/// Compare two version strings (`v1.2.3`, `1.2`, `2.0.0-rc.1`).
///
/// Unparseable versions compare equal only when identical; otherwise the
/// installed one is assumed to be behind.
pub fn compare(installed: &str, target: &str) -> VersionStatus {
    match (parse(installed), parse(target)) {
        (Some(a), Some(b)) => match cmp_parsed(&a, &b) {
            Ordering::Equal => VersionStatus::Current,
            Ordering::Less => VersionStatus::Outdated,
            Ordering::Greater => VersionStatus::Ahead,
        },
        _ if installed.trim() == target.trim() => VersionStatus::Current,
        _ => VersionStatus::Outdated,
    }
}

/// True when `candidate` is strictly newer than `current`.
pub fn is_newer(current: &str, candidate: &str) -> bool {
    compare(current, candidate) == VersionStatus::Outdated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_ordering() {
        assert_eq!(compare("v1.0.0", "1.0.0"), VersionStatus::Current);
        assert_eq!(compare("1.0.0", "1.0.1"), VersionStatus::Outdated);
        assert_eq!(compare("2.0.0", "1.9.9"), VersionStatus::Ahead);
        assert_eq!(compare("1.2", "1.2.0"), VersionStatus::Current);
        assert_eq!(compare("1.10.0", "1.9.0"), VersionStatus::Ahead);
    }

    #[test]
    fn prerelease_sorts_before_release() {
        assert_eq!(compare("2.0.0-rc.1", "2.0.0"), VersionStatus::Outdated);
        assert_eq!(compare("2.0.0", "2.0.0-rc.1"), VersionStatus::Ahead);
    }

    #[test]
    fn unparseable_versions() {
        assert_eq!(compare("main", "main"), VersionStatus::Current);
        assert_eq!(compare("main", "v1.0.0"), VersionStatus::Outdated);
    }

    #[test]
    fn newer_check() {
        assert!(is_newer("0.1.0", "0.2.0"));
        assert!(!is_newer("0.2.0", "0.2.0"));
    }
}
