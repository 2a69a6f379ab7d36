//! Plugin configuration
//!
//! [`ObfuscatorPluginOptions`] is the programmatic form and accepts every
//! matcher kind, predicates included. [`ObfuscatorConfig`] is the file form:
//! it deserializes from JSON and environment variables and converts into
//! plugin options.
//!
//! ```json
//! {
//!   "include": ["src/**/*.js", { "regex": "\\.mjs$" }],
//!   "exclude": { "regex": "vendor" },
//!   "options": { "sourceMap": true, "stringArray": true },
//!   "debugger": true,
//!   "apply": "build"
//! }
//! ```

use crate::error::{ObfuscatorError, Result};
use crate::matcher::{MatcherInput, MatcherValue};
use crate::options::ObfuscatorOptions;
use figment::{
    providers::{Env, Format as _, Json},
    Figment,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Config file looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "obfuscator.config.json";

/// Environment variable prefix for top-level config keys
pub const ENV_PREFIX: &str = "FOB_OBFUSCATOR_";

/// Which command the bundler is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Dev server, in-memory output
    Serve,
    /// Production build written to disk
    Build,
}

/// What the apply gate sees for one build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyContext {
    pub mode: BuildMode,
    /// Whether the host is about to write the bundle to disk
    pub is_write: bool,
}

pub type ApplyPredicate = Arc<dyn Fn(&ApplyContext) -> bool + Send + Sync>;

/// Gate deciding whether the hook runs for a build
#[derive(Clone, Default)]
pub enum Apply {
    #[default]
    Always,
    Serve,
    Build,
    Predicate(ApplyPredicate),
}

impl Apply {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&ApplyContext) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    pub fn allows(&self, ctx: &ApplyContext) -> bool {
        match self {
            Self::Always => true,
            Self::Serve => ctx.mode == BuildMode::Serve,
            Self::Build => ctx.mode == BuildMode::Build,
            Self::Predicate(predicate) => predicate(ctx),
        }
    }
}

impl fmt::Debug for Apply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => f.write_str("Always"),
            Self::Serve => f.write_str("Serve"),
            Self::Build => f.write_str("Build"),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<BuildMode> for Apply {
    fn from(mode: BuildMode) -> Self {
        match mode {
            BuildMode::Serve => Self::Serve,
            BuildMode::Build => Self::Build,
        }
    }
}

/// What an exclude match does to the rest of the bundle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExcludeBehavior {
    /// Stop processing the bundle at the first excluded file
    #[default]
    #[serde(rename = "abort")]
    AbortBundle,
    /// Leave the excluded file alone and keep going
    #[serde(rename = "skip")]
    SkipEntry,
}

/// Programmatic plugin options
#[derive(Debug, Clone, Default)]
pub struct ObfuscatorPluginOptions {
    /// Files eligible for obfuscation; JS/TS sources when unset
    pub include: Option<MatcherInput>,
    /// Files never obfuscated; `node_modules` and `.nuxt` when unset
    pub exclude: Option<MatcherInput>,
    pub options: ObfuscatorOptions,
    /// Log include/exclude decisions per file at `info` level.
    ///
    /// Only these decision events are gated. Engine timings and the pass
    /// summary are `debug` events and follow the subscriber's level filter.
    pub debugger: bool,
    pub apply: Apply,
    pub exclude_behavior: ExcludeBehavior,
}

impl ObfuscatorPluginOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_include(mut self, include: impl Into<MatcherInput>) -> Self {
        self.include = Some(include.into());
        self
    }

    pub fn with_exclude(mut self, exclude: impl Into<MatcherInput>) -> Self {
        self.exclude = Some(exclude.into());
        self
    }

    pub fn with_options(mut self, options: ObfuscatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_debugger(mut self, enabled: bool) -> Self {
        self.debugger = enabled;
        self
    }

    pub fn with_apply(mut self, apply: impl Into<Apply>) -> Self {
        self.apply = apply.into();
        self
    }

    pub fn with_exclude_behavior(mut self, behavior: ExcludeBehavior) -> Self {
        self.exclude_behavior = behavior;
        self
    }
}

/// Matcher as written in a config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatcherSpec {
    /// Literal path or glob
    Path(String),
    Regex { regex: String },
}

impl MatcherSpec {
    fn into_value(self) -> Result<MatcherValue> {
        match self {
            Self::Path(path) => Ok(MatcherValue::String(path)),
            Self::Regex { regex } => Regex::new(&regex)
                .map(MatcherValue::Regex)
                .map_err(|e| ObfuscatorError::invalid_regex(regex, e)),
        }
    }
}

/// One matcher spec or a list of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatcherSpecInput {
    One(MatcherSpec),
    Many(Vec<MatcherSpec>),
}

impl MatcherSpecInput {
    fn into_input(self) -> Result<MatcherInput> {
        Ok(match self {
            Self::One(spec) => MatcherInput::One(spec.into_value()?),
            Self::Many(specs) => MatcherInput::Many(
                specs
                    .into_iter()
                    .map(MatcherSpec::into_value)
                    .collect::<Result<Vec<_>>>()?,
            ),
        })
    }
}

/// File and environment form of the plugin options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObfuscatorConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<MatcherSpecInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<MatcherSpecInput>,
    pub options: ObfuscatorOptions,
    /// See [`ObfuscatorPluginOptions::debugger`]
    pub debugger: bool,
    /// `"serve"` or `"build"`; runs for every build when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apply: Option<BuildMode>,
    #[serde(alias = "exclude_behavior")]
    pub exclude_behavior: ExcludeBehavior,
}

impl ObfuscatorConfig {
    /// Load configuration.
    /// Priority: environment variables > config file > defaults
    ///
    /// Without `config_path`, `obfuscator.config.json` in the working
    /// directory is used when it exists. Environment variables cover
    /// top-level keys, e.g. `FOB_OBFUSCATOR_DEBUGGER=true`.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        let config_file = config_path.map(Path::to_path_buf).or_else(|| {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            default_path.exists().then(|| default_path.to_path_buf())
        });

        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ObfuscatorError::config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Json::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        figment
            .extract()
            .map_err(|e| ObfuscatorError::config(e.to_string()))
    }

    /// Parse a JSON document without touching the environment
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ObfuscatorError::config(e.to_string()))
    }

    /// Compile regex specs and build plugin options
    pub fn into_plugin_options(self) -> Result<ObfuscatorPluginOptions> {
        Ok(ObfuscatorPluginOptions {
            include: self.include.map(MatcherSpecInput::into_input).transpose()?,
            exclude: self.exclude.map(MatcherSpecInput::into_input).transpose()?,
            options: self.options,
            debugger: self.debugger,
            apply: self.apply.map(Apply::from).unwrap_or_default(),
            exclude_behavior: self.exclude_behavior,
        })
    }
}
