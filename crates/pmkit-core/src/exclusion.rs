//! Glob patterns protecting paths from being overwritten.
//!
//! Matching follows gitignore-flavoured glob rules: `*` stays within one path
//! segment, `**` crosses segments, literal segments match exactly. A pattern
//! ending in `/**` also covers the directory itself, so `outputs/**` protects
//! both `outputs` and everything under it.
//!
//! The built-in defaults are always part of the set and cannot be removed.

use crate::error::{PmKitError, Result};
use crate::paths::{DEFAULT_EXCLUSIONS, MINIMAL_EXCLUSIONS};
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};

#[derive(Debug, Clone)]
pub struct ExclusionSet {
    patterns: Vec<String>,
    matcher: GlobSet,
    /// `owners[i]` is the index in `patterns` that compiled glob `i` came from.
    owners: Vec<usize>,
}

impl ExclusionSet {
    /// The built-in defaults only.
    pub fn with_defaults() -> Self {
        let defaults: Vec<String> = DEFAULT_EXCLUSIONS.iter().map(|p| p.to_string()).collect();
        Self::compile(defaults).expect("built-in exclusion patterns are valid globs")
    }

    /// Defaults followed by `extra`, in order.
    pub fn new<I, S>(extra: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut patterns: Vec<String> = DEFAULT_EXCLUSIONS.iter().map(|p| p.to_string()).collect();
        patterns.extend(
            extra
                .into_iter()
                .map(Into::into)
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
        );
        Self::compile(patterns)
    }

    /// Append more patterns after the current ones.
    pub fn extend<I, S>(&self, extra: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut patterns = self.patterns.clone();
        patterns.extend(extra.into_iter().map(Into::into));
        Self::compile(patterns)
    }

    /// Defaults, the minimal-install extras, then `extra`.
    pub fn minimal<I, S>(extra: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_defaults()
            .extend(MINIMAL_EXCLUSIONS.iter().copied())?
            .extend(extra)
    }

    fn compile(patterns: Vec<String>) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        let mut owners = Vec::new();
        for (idx, pattern) in patterns.iter().enumerate() {
            builder.add(build_glob(pattern)?);
            owners.push(idx);
            if let Some(dir) = pattern.strip_suffix("/**") {
                if !dir.is_empty() {
                    builder.add(build_glob(dir)?);
                    owners.push(idx);
                }
            }
        }
        let matcher = builder
            .build()
            .map_err(|e| PmKitError::ValidationError(format!("invalid exclusion patterns: {e}")))?;
        Ok(Self {
            patterns,
            matcher,
            owners,
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// True iff any pattern matches `path`.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.matcher.is_match(normalize(path))
    }

    /// Patterns that match at least one of `candidates`, in set order.
    pub fn matching_patterns<'a, I>(&self, candidates: I) -> Vec<&str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut hit = vec![false; self.patterns.len()];
        for candidate in candidates {
            for glob_idx in self.matcher.matches(normalize(candidate)) {
                hit[self.owners[glob_idx]] = true;
            }
        }
        self.patterns
            .iter()
            .zip(hit)
            .filter_map(|(p, h)| h.then_some(p.as_str()))
            .collect()
    }
}

impl Default for ExclusionSet {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn build_glob(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| PmKitError::ValidationError(format!("invalid exclusion pattern '{pattern}': {e}")))
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches("./").to_string()
}

/// Split comma-separated `--exclude` input into trimmed, non-empty patterns.
pub fn parse_patterns(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}
