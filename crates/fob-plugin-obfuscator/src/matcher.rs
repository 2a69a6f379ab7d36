//! Path matchers for the include/exclude rules
//!
//! User configuration arrives as [`MatcherInput`]: a single value or a list of
//! values, each being a path string (literal or glob), a regular expression, or
//! a predicate. [`MatcherSet::normalize`] turns that into a list of [`Matcher`]s
//! with string values resolved against the working directory.
//!
//! ```rust
//! use fob_plugin_obfuscator::MatcherSet;
//!
//! let include = MatcherSet::default_include();
//! assert!(include.matches("src/app.js"));
//! assert!(!include.matches("styles/site.css"));
//! ```

use crate::error::{ObfuscatorError, Result};
use globset::{GlobBuilder, GlobMatcher};
use path_clean::PathClean;
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Source extensions picked up when no include rule is configured
pub const DEFAULT_INCLUDE_PATTERN: &str = r"\.(jsx?|tsx?|cjs|mjs)$";

/// Dependency and framework output directories skipped when no exclude rule is configured
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &["node_modules", r"\.nuxt"];

/// Predicate over a candidate file name
pub type MatchPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A single user-supplied matcher value, before normalization
#[derive(Clone)]
pub enum MatcherValue {
    /// Path string, either a literal file path or a glob
    String(String),
    Regex(Regex),
    Predicate(MatchPredicate),
}

impl MatcherValue {
    /// Wrap a closure as a predicate matcher
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }
}

impl fmt::Debug for MatcherValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.debug_tuple("String").field(s).finish(),
            Self::Regex(re) => f.debug_tuple("Regex").field(&re.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<&str> for MatcherValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for MatcherValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Regex> for MatcherValue {
    fn from(value: Regex) -> Self {
        Self::Regex(value)
    }
}

/// One matcher value or an ordered list of them
#[derive(Debug, Clone)]
pub enum MatcherInput {
    One(MatcherValue),
    Many(Vec<MatcherValue>),
}

impl MatcherInput {
    /// Flatten into a list, wrapping a single value
    pub fn into_values(self) -> Vec<MatcherValue> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

impl From<MatcherValue> for MatcherInput {
    fn from(value: MatcherValue) -> Self {
        Self::One(value)
    }
}

impl From<&str> for MatcherInput {
    fn from(value: &str) -> Self {
        Self::One(value.into())
    }
}

impl From<String> for MatcherInput {
    fn from(value: String) -> Self {
        Self::One(value.into())
    }
}

impl From<Regex> for MatcherInput {
    fn from(value: Regex) -> Self {
        Self::One(value.into())
    }
}

impl<T: Into<MatcherValue>> From<Vec<T>> for MatcherInput {
    fn from(values: Vec<T>) -> Self {
        Self::Many(values.into_iter().map(Into::into).collect())
    }
}

/// A normalized matcher
#[derive(Clone)]
pub enum Matcher {
    /// Exact file name
    Literal(String),
    /// Glob pattern; `*` stays within one path segment, `**` crosses segments
    Glob {
        pattern: String,
        matcher: GlobMatcher,
        /// Pattern segments that start with `.` and may name hidden segments
        dot_segments: Vec<GlobMatcher>,
    },
    Regex(Regex),
    Predicate(MatchPredicate),
}

impl Matcher {
    /// Build a matcher from an already-resolved path string.
    ///
    /// Strings containing glob metacharacters compile to [`Matcher::Glob`],
    /// anything else compares by equality.
    pub fn from_path(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if is_glob(&path) {
            Self::glob(path)
        } else {
            Ok(Self::Literal(path))
        }
    }

    pub fn glob(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        let glob = GlobBuilder::new(&pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| ObfuscatorError::invalid_glob(&pattern, e))?;
        let dot_segments = pattern
            .split('/')
            .filter(|segment| is_hidden(segment))
            .map(|segment| {
                GlobBuilder::new(segment)
                    .build()
                    .map(|glob| glob.compile_matcher())
                    .map_err(|e| ObfuscatorError::invalid_glob(&pattern, e))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::Glob {
            matcher: glob.compile_matcher(),
            dot_segments,
            pattern,
        })
    }

    pub fn regex(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(Self::Regex)
            .map_err(|e| ObfuscatorError::invalid_regex(pattern, e))
    }

    /// Test a candidate, letting wildcards match segments that start with `.`
    pub fn matches(&self, candidate: &str) -> bool {
        self.matches_with(candidate, true)
    }

    /// Test a candidate.
    ///
    /// With `dot` off, a glob only matches a segment starting with `.` when the
    /// pattern spells that segment with a leading `.` itself, so `src/*.js`
    /// skips `src/.hidden.js` and `**` does not descend into `.cache/`.
    pub fn matches_with(&self, candidate: &str, dot: bool) -> bool {
        match self {
            Self::Literal(path) => path == candidate,
            Self::Glob {
                pattern,
                matcher,
                dot_segments,
            } => {
                if pattern == candidate {
                    return true;
                }
                matcher.is_match(candidate)
                    && (dot
                        || candidate
                            .split('/')
                            .filter(|segment| is_hidden(segment))
                            .all(|segment| dot_segments.iter().any(|m| m.is_match(segment))))
            }
            Self::Regex(re) => re.is_match(candidate),
            Self::Predicate(predicate) => predicate(candidate),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(path) => f.debug_tuple("Literal").field(path).finish(),
            Self::Glob { pattern, .. } => f.debug_tuple("Glob").field(pattern).finish(),
            Self::Regex(re) => f.debug_tuple("Regex").field(&re.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Glob { pattern: a, .. }, Self::Glob { pattern: b, .. }) => a == b,
            (Self::Regex(a), Self::Regex(b)) => a.as_str() == b.as_str(),
            (Self::Predicate(a), Self::Predicate(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Ordered list of matchers; matches when any element does
///
/// Wildcards skip segments starting with `.` unless the set is built
/// [`with_dot`](MatcherSet::with_dot). Exclude sets turn it on so hidden build
/// directories are still caught.
#[derive(Debug, Clone, PartialEq)]
pub struct MatcherSet {
    matchers: Vec<Matcher>,
    dot: bool,
}

impl MatcherSet {
    pub fn new(matchers: Vec<Matcher>) -> Self {
        Self {
            matchers,
            dot: false,
        }
    }

    /// Let wildcards match segments starting with `.`
    pub fn with_dot(mut self, dot: bool) -> Self {
        self.dot = dot;
        self
    }

    /// Normalize user input against `cwd`.
    ///
    /// Strings are resolved to absolute, lexically cleaned paths with `/`
    /// separators. Regexes and predicates pass through unchanged.
    pub fn normalize(input: impl Into<MatcherInput>, cwd: &Path) -> Result<Self> {
        let matchers = input
            .into()
            .into_values()
            .into_iter()
            .map(|value| match value {
                MatcherValue::String(s) => Matcher::from_path(resolve_path(&s, cwd)),
                MatcherValue::Regex(re) => Ok(Matcher::Regex(re)),
                MatcherValue::Predicate(p) => Ok(Matcher::Predicate(p)),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(matchers))
    }

    /// Normalize against the process working directory
    pub fn normalize_in_cwd(input: impl Into<MatcherInput>) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::normalize(input, &cwd)
    }

    /// JS/TS source extensions
    pub fn default_include() -> Self {
        Self::new(vec![Matcher::Regex(builtin_regex(DEFAULT_INCLUDE_PATTERN))])
    }

    /// `node_modules` and `.nuxt` anywhere in the path
    pub fn default_exclude() -> Self {
        Self::new(
            DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(|pattern| Matcher::Regex(builtin_regex(pattern)))
                .collect(),
        )
        .with_dot(true)
    }

    /// Test a file name; backslashes are treated as `/`
    pub fn matches(&self, candidate: &str) -> bool {
        let candidate = candidate.replace('\\', "/");
        self.matchers
            .iter()
            .any(|m| m.matches_with(&candidate, self.dot))
    }

    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    pub fn dot(&self) -> bool {
        self.dot
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

/// Resolve `path` against `cwd` the way `path.resolve(".", path)` does
pub fn resolve_path(path: &str, cwd: &Path) -> String {
    cwd.join(path).clean().to_string_lossy().replace('\\', "/")
}

fn is_hidden(segment: &str) -> bool {
    segment.starts_with('.') && segment != "." && segment != ".."
}

fn is_glob(path: &str) -> bool {
    path.contains(['*', '?', '[', '{'])
}

fn builtin_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern is valid")
}
