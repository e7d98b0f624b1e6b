// src/watch/patterns.rs

use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

use crate::fs::FileSystem;
use crate::watch::path_utils::relative_str;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// One include pattern together with the directory its matches are
/// relative to.
#[derive(Clone)]
struct IncludePattern {
    pattern: String,
    matcher: GlobMatcher,
    base: PathBuf,
}

/// Compiled include/exclude globs for a single path-set.
///
/// Patterns are relative to the project root and use `/` separators; `*`
/// does not cross directory boundaries, `**` does. A pattern starting with
/// `!` excludes whatever it matches.
#[derive(Clone)]
pub struct PathSetMatcher {
    includes: Vec<IncludePattern>,
    include_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for PathSetMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let patterns: Vec<&str> = self.includes.iter().map(|i| i.pattern.as_str()).collect();
        f.debug_struct("PathSetMatcher")
            .field("includes", &patterns)
            .finish_non_exhaustive()
    }
}

impl PathSetMatcher {
    /// Compile the patterns of the path-set called `name`.
    pub fn compile(name: &str, patterns: &[String]) -> Result<Self> {
        let mut includes = Vec::new();
        let mut include_builder = GlobSetBuilder::new();
        let mut exclude_builder = GlobSetBuilder::new();
        let mut has_excludes = false;

        for raw in patterns {
            let raw = raw.trim();
            if let Some(negated) = raw.strip_prefix('!') {
                let glob = build_glob(negated.trim_start_matches("./"))
                    .with_context(|| format!("building exclude pattern for path-set {name}"))?;
                exclude_builder.add(glob);
                has_excludes = true;
            } else {
                let raw = raw.trim_start_matches("./");
                let glob = build_glob(raw)
                    .with_context(|| format!("building watch pattern for path-set {name}"))?;
                include_builder.add(glob.clone());
                includes.push(IncludePattern {
                    pattern: raw.to_string(),
                    matcher: glob.compile_matcher(),
                    base: glob_base(raw),
                });
            }
        }

        let exclude_set = if has_excludes {
            Some(exclude_builder.build()?)
        } else {
            None
        };

        Ok(Self {
            includes,
            include_set: include_builder.build()?,
            exclude_set,
        })
    }

    /// Returns true if the path (relative to the project root, e.g.
    /// `"src/index.html"`) belongs to this path-set.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }

    /// Base directory of the first include pattern matching `rel_path`.
    ///
    /// Copies preserve the structure below this directory.
    pub fn base_for(&self, rel_path: &str) -> Option<&Path> {
        if !self.matches(rel_path) {
            return None;
        }
        self.includes
            .iter()
            .find(|inc| inc.matcher.is_match(rel_path))
            .map(|inc| inc.base.as_path())
    }

    /// Distinct base directories, with nested bases folded into their parent.
    pub fn roots(&self) -> Vec<PathBuf> {
        let all: BTreeSet<PathBuf> = self.includes.iter().map(|i| i.base.clone()).collect();
        all.iter()
            .filter(|candidate| {
                !all.iter()
                    .any(|other| other != *candidate && candidate.starts_with(other))
            })
            .cloned()
            .collect()
    }

    /// The include patterns, as written.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.includes.iter().map(|i| i.pattern.as_str())
    }
}

fn build_glob(pattern: &str) -> Result<globset::Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))
}

/// Literal directory prefix of a glob pattern.
///
/// `src/*.html` → `src`, `src/fonts/**` → `src/fonts`, `**/*.ts` → ``.
/// A pattern without wildcards names a file, so its parent is the base.
pub fn glob_base(pattern: &str) -> PathBuf {
    let components: Vec<&str> = pattern.split('/').filter(|c| !c.is_empty()).collect();
    let literal: Vec<&str> = components
        .iter()
        .take_while(|c| !c.contains(GLOB_META))
        .copied()
        .collect();

    let literal = if literal.len() == components.len() {
        &literal[..literal.len().saturating_sub(1)]
    } else {
        &literal[..]
    };

    literal
        .iter()
        .filter(|c| **c != ".")
        .collect::<PathBuf>()
}

/// Collect all files under `root` that belong to the path-set.
///
/// Only the pattern base directories are walked. Missing bases are skipped,
/// so a path-set with nothing on disk yields an empty list.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    matcher: &PathSetMatcher,
) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for base in matcher.roots() {
        let start = root.join(&base);
        if !fs.is_dir(&start) {
            continue;
        }

        let mut stack = vec![start];
        while let Some(dir) = stack.pop() {
            for path in fs.read_dir(&dir)? {
                if fs.is_dir(&path) {
                    stack.push(path);
                } else if fs.is_file(&path) {
                    if let Some(rel) = relative_str(root, &path) {
                        if matcher.matches(&rel) {
                            files.push(path);
                        }
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(patterns: &[&str]) -> PathSetMatcher {
        let patterns: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
        PathSetMatcher::compile("test", &patterns).unwrap()
    }

    #[test]
    fn glob_base_stops_at_first_wildcard() {
        assert_eq!(glob_base("src/*.html"), PathBuf::from("src"));
        assert_eq!(glob_base("src/fonts/**"), PathBuf::from("src/fonts"));
        assert_eq!(glob_base("./src/**/*.ts"), PathBuf::from("src"));
        assert_eq!(glob_base("**/*.ts"), PathBuf::new());
        assert_eq!(glob_base("src/index.html"), PathBuf::from("src"));
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let m = matcher(&["src/*.html"]);
        assert!(m.matches("src/index.html"));
        assert!(!m.matches("src/pages/about.html"));
    }

    #[test]
    fn negated_patterns_exclude() {
        let m = matcher(&["src/css/**", "!src/css/*.css"]);
        assert!(m.matches("src/css/img/logo.png"));
        assert!(!m.matches("src/css/site.css"));
        assert_eq!(m.base_for("src/css/img/logo.png"), Some(Path::new("src/css")));
        assert_eq!(m.base_for("src/css/site.css"), None);
    }

    #[test]
    fn nested_roots_are_folded() {
        let m = matcher(&["src/**/*.ts", "src/demo/*.ts", "lib/*.js"]);
        assert_eq!(m.roots(), vec![PathBuf::from("lib"), PathBuf::from("src")]);
    }
}
