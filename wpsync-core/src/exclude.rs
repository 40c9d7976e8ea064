//! Exclusion rules for deployment and backup.
//!
//! An [`ExclusionSet`] is a union of glob rules, each tagged with where it
//! came from. Rules follow ignore-file conventions:
//!
//! - `*` and `?` never cross `/`; `**` does.
//! - A trailing `/` restricts the rule to directories.
//! - A rule containing `/` is anchored at the project root; otherwise it
//!   matches the final component of any path.
//! - Excluding a directory excludes everything below it.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::CONFIG_FILE_NAME;
use crate::error::ExcludeError;

/// Rules every deployment carries: VCS metadata, dependency caches, editor
/// state and local secrets.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git/",
    ".svn/",
    ".hg/",
    ".gitignore",
    ".gitattributes",
    "node_modules/",
    ".sass-cache/",
    ".idea/",
    ".vscode/",
    "*.swp",
    "*.swo",
    "*~",
    "*.log",
    ".env",
    ".env.*",
];

/// Files and directories operating systems scatter through project trees.
pub const OS_ARTIFACT_EXCLUDES: &[&str] = &[
    ".DS_Store",
    "._*",
    ".AppleDouble/",
    ".LSOverride",
    ".Spotlight-V100/",
    ".Trashes/",
    ".fseventsd/",
    ".TemporaryItems/",
    ".DocumentRevisions-V100/",
    ".com.apple.timemachine.donotpresent",
    "Backups.backupdb/",
    "Thumbs.db",
    "ehthumbs.db",
    "desktop.ini",
    "$RECYCLE.BIN/",
];

/// The tool's own control files; never deployed.
pub const CONTROL_FILES: &[&str] = &[CONFIG_FILE_NAME, "wpsync.yml", ".wpsync.yaml"];

/// Shape of archive names written by the archiver.
pub const ARCHIVE_NAME_PATTERN: &str = "*_v*_????-??-??_??.??.??.*";

/// Where a rule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    BuiltIn,
    OsArtifact,
    IgnoreFile,
    /// Control files and archives; present regardless of other configuration.
    SelfProtection,
    BackupConfig,
}

/// A single parsed pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionRule {
    /// The pattern as written.
    pub pattern: String,
    pub provenance: Provenance,
    pub dir_only: bool,
    pub anchored: bool,
    glob: String,
}

impl ExclusionRule {
    /// Parse one pattern. Blank patterns yield `Ok(None)`.
    pub fn parse(pattern: &str, provenance: Provenance) -> Result<Option<Self>, ExcludeError> {
        let raw = pattern.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        let dir_only = raw.ends_with('/');
        let body = raw.trim_end_matches('/');
        let anchored = body.contains('/');
        let glob = body.trim_start_matches('/').to_string();
        if glob.is_empty() {
            return Ok(None);
        }
        // Validate eagerly so a bad rule is reported against its own text.
        compile(&glob).map_err(|source| ExcludeError::Glob {
            pattern: raw.to_string(),
            source,
        })?;
        Ok(Some(Self {
            pattern: raw.to_string(),
            provenance,
            dir_only,
            anchored,
            glob,
        }))
    }
}

fn compile(glob: &str) -> Result<globset::Glob, globset::Error> {
    GlobBuilder::new(glob).literal_separator(true).build()
}

/// Compiled union of exclusion rules.
#[derive(Debug, Clone)]
pub struct ExclusionSet {
    rules: Vec<ExclusionRule>,
    matcher: GlobSet,
}

impl Default for ExclusionSet {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            matcher: GlobSet::empty(),
        }
    }
}

impl ExclusionSet {
    /// Compile `rules`, dropping later duplicates of the same pattern.
    pub fn new(rules: Vec<ExclusionRule>) -> Result<Self, ExcludeError> {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(rules.len());
        let mut builder = GlobSetBuilder::new();
        for rule in rules {
            if !seen.insert(rule.pattern.clone()) {
                continue;
            }
            let glob = compile(&rule.glob).map_err(|source| ExcludeError::Glob {
                pattern: rule.pattern.clone(),
                source,
            })?;
            builder.add(glob);
            kept.push(rule);
        }
        let matcher = builder.build().map_err(|source| ExcludeError::Glob {
            pattern: kept
                .iter()
                .map(|r| r.pattern.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            source,
        })?;
        Ok(Self {
            rules: kept,
            matcher,
        })
    }

    /// Build a set from plain patterns sharing one provenance.
    pub fn from_patterns<S: AsRef<str>>(
        patterns: &[S],
        provenance: Provenance,
    ) -> Result<Self, ExcludeError> {
        let mut rules = Vec::new();
        for pattern in patterns {
            if let Some(rule) = ExclusionRule::parse(pattern.as_ref(), provenance)? {
                rules.push(rule);
            }
        }
        Self::new(rules)
    }

    /// Union of `self` and `other`, keeping `self`'s rules first.
    pub fn union(&self, other: &ExclusionSet) -> Result<Self, ExcludeError> {
        let mut rules = self.rules.clone();
        rules.extend(other.rules.iter().cloned());
        Self::new(rules)
    }

    pub fn rules(&self) -> &[ExclusionRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Patterns contributed by one source.
    pub fn patterns_from(&self, provenance: Provenance) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|r| r.provenance == provenance)
            .map(|r| r.pattern.as_str())
            .collect()
    }

    /// Whether `relative_path` (`/`-separated, relative to the project root)
    /// is excluded, either directly or through an excluded ancestor.
    pub fn is_excluded(&self, relative_path: &str, is_dir: bool) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        let path = relative_path.trim_matches('/');
        if path.is_empty() {
            return false;
        }
        let mut end = 0;
        for segment in path.split('/') {
            if end > 0 {
                end += 1;
            }
            end += segment.len();
            let prefix = &path[..end];
            let prefix_is_dir = end < path.len() || is_dir;
            if self.matches_entry(prefix, prefix_is_dir) {
                return true;
            }
        }
        false
    }

    /// Match a single entry without looking at its ancestors.
    fn matches_entry(&self, path: &str, is_dir: bool) -> bool {
        let name = path.rsplit('/').next().unwrap_or(path);
        let full = self.matcher.matches(path);
        let base = if name.len() == path.len() {
            full.clone()
        } else {
            self.matcher.matches(name)
        };
        let applies = |idx: &usize| {
            let rule = &self.rules[*idx];
            !rule.dir_only || is_dir
        };
        full.iter()
            .filter(|idx| self.rules[**idx].anchored)
            .any(applies)
            || base
                .iter()
                .filter(|idx| !self.rules[**idx].anchored)
                .any(applies)
    }
}

/// Build the deployment [`ExclusionSet`].
///
/// Union of [`DEFAULT_EXCLUDES`], [`OS_ARTIFACT_EXCLUDES`], the project's
/// ignore file (if it exists) and the self-protection rules. Malformed lines
/// in the ignore file are skipped with a warning.
pub fn resolve_exclusions(
    local_root: &Path,
    ignore_file: &Path,
    backup_dir: &Path,
) -> Result<ExclusionSet, ExcludeError> {
    let mut rules = Vec::new();
    push_all(&mut rules, DEFAULT_EXCLUDES, Provenance::BuiltIn)?;
    push_all(&mut rules, OS_ARTIFACT_EXCLUDES, Provenance::OsArtifact)?;

    match std::fs::read_to_string(ignore_file) {
        Ok(content) => {
            let parsed = parse_ignore_file(&content);
            tracing::debug!(
                path = %ignore_file.display(),
                rules = parsed.len(),
                "ignore file loaded"
            );
            rules.extend(parsed);
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %ignore_file.display(), "no ignore file; using built-in rules");
        }
        Err(source) => {
            return Err(ExcludeError::Io {
                path: ignore_file.to_path_buf(),
                source,
            })
        }
    }

    push_all(&mut rules, CONTROL_FILES, Provenance::SelfProtection)?;
    push_all(&mut rules, &[ARCHIVE_NAME_PATTERN], Provenance::SelfProtection)?;
    if let Some(pattern) = anchored_pattern(local_root, ignore_file, false) {
        push_all(&mut rules, &[pattern], Provenance::SelfProtection)?;
    }
    if let Some(pattern) = anchored_pattern(local_root, backup_dir, true) {
        push_all(&mut rules, &[pattern], Provenance::SelfProtection)?;
    }

    ExclusionSet::new(rules)
}

/// Parse ignore-file text into rules.
///
/// Blank lines and `#` comments are skipped. Negations (`!pattern`) are not
/// supported and are dropped with a warning, as are invalid globs.
pub fn parse_ignore_file(content: &str) -> Vec<ExclusionRule> {
    let mut rules = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('!') {
            tracing::warn!(pattern = line, "negated ignore patterns are not supported; skipped");
            continue;
        }
        match ExclusionRule::parse(line, Provenance::IgnoreFile) {
            Ok(Some(rule)) => rules.push(rule),
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "skipping ignore pattern"),
        }
    }
    rules
}

fn push_all<S: AsRef<str>>(
    rules: &mut Vec<ExclusionRule>,
    patterns: &[S],
    provenance: Provenance,
) -> Result<(), ExcludeError> {
    for pattern in patterns {
        if let Some(rule) = ExclusionRule::parse(pattern.as_ref(), provenance)? {
            rules.push(rule);
        }
    }
    Ok(())
}

/// Root-anchored, glob-escaped rule for `path` when it lies inside `root`.
///
/// `dir` appends the trailing `/` that restricts the rule to directories.
pub fn anchored_pattern(root: &Path, path: &Path, dir: bool) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| globset::escape(&c.as_os_str().to_string_lossy()))
        .collect();
    if parts.is_empty() {
        return None;
    }
    let suffix = if dir { "/" } else { "" };
    Some(format!("/{}{suffix}", parts.join("/")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn set(patterns: &[&str]) -> ExclusionSet {
        ExclusionSet::from_patterns(patterns, Provenance::IgnoreFile).unwrap()
    }

    #[test]
    fn basename_rule_matches_at_any_depth() {
        let s = set(&["*.map"]);
        assert!(s.is_excluded("app.js.map", false));
        assert!(s.is_excluded("assets/js/app.js.map", false));
        assert!(!s.is_excluded("assets/js/app.js", false));
    }

    #[test]
    fn dir_only_rule_ignores_files_of_same_name() {
        let s = set(&["build/"]);
        assert!(s.is_excluded("build", true));
        assert!(s.is_excluded("build/app.js", false));
        assert!(!s.is_excluded("build", false));
    }

    #[test]
    fn anchored_rule_only_matches_from_root() {
        let s = set(&["/vendor"]);
        assert!(s.is_excluded("vendor", true));
        assert!(s.is_excluded("vendor/autoload.php", false));
        assert!(!s.is_excluded("lib/vendor", true));
    }

    #[test]
    fn star_does_not_cross_separator() {
        let s = set(&["src/*.scss"]);
        assert!(s.is_excluded("src/main.scss", false));
        assert!(!s.is_excluded("src/parts/header.scss", false));
        let deep = set(&["src/**/*.scss"]);
        assert!(deep.is_excluded("src/parts/header.scss", false));
    }

    #[test]
    fn duplicates_are_dropped() {
        let s = set(&["*.log", "*.log", "tmp/"]);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn invalid_glob_is_an_error() {
        let err = ExclusionSet::from_patterns(&["a[b"], Provenance::BackupConfig).unwrap_err();
        assert!(matches!(err, ExcludeError::Glob { .. }));
    }

    #[test]
    fn ignore_file_parsing_skips_comments_and_negations() {
        let rules = parse_ignore_file("# comment\n\n*.zip\n!keep.zip\nsrc/\n");
        let patterns: Vec<_> = rules.iter().map(|r| r.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["*.zip", "src/"]);
    }

    #[test]
    fn archive_pattern_matches_archiver_names() {
        let s = ExclusionSet::from_patterns(&[ARCHIVE_NAME_PATTERN], Provenance::SelfProtection)
            .unwrap();
        assert!(s.is_excluded("my-plugin_v1.2.0_2024-03-01_10.15.00.tar.gz", false));
        assert!(s.is_excluded("my-plugin_v_2024-03-01_10.15.00.tar.gz", false));
        assert!(!s.is_excluded("my-plugin.php", false));
    }
}
