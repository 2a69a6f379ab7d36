//! Rolldown plugin that obfuscates output chunks
//!
//! This crate provides a Rolldown plugin that replaces the code of selected
//! output chunks with an obfuscated equivalent. It uses the `generate_bundle`
//! hook, so it sees every chunk after all other transformations are done.
//!
//! ## Architecture
//!
//! ```text
//! Rolldown → generate_bundle → exclude? → include + chunk? → engine → asset
//!                                  ↓                ↓
//!                           stop the pass      leave as-is
//! ```
//!
//! Matching is configured with include/exclude rules (paths, globs, regexes
//! or predicates). Obfuscation goes through the [`Obfuscator`] trait; the
//! default engine is [`OxcObfuscator`].
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fob_plugin_obfuscator::{
//!     BuildMode, FobObfuscatorPlugin, ObfuscatorOptions, ObfuscatorPluginOptions,
//! };
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = ObfuscatorPluginOptions::new()
//!     .with_include("src/**/*.js")
//!     .with_options(ObfuscatorOptions::new().with_source_map(true))
//!     .with_apply(BuildMode::Build)
//!     .with_debugger(true);
//!
//! // Use with your Rolldown bundler configuration
//! let plugin = Arc::new(FobObfuscatorPlugin::with_options(options)?);
//! # Ok(())
//! # }
//! ```

use rolldown_plugin::{HookGenerateBundleArgs, HookNoopReturn, HookUsage, Plugin, PluginContext};
use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

mod bundle;
mod config;
mod error;
mod hook;
mod matcher;
mod obfuscator;
mod options;

pub use bundle::{BundleHost, EmittedAsset, EntryKind, OutputBundle, OutputEntry};
pub use config::{
    Apply, ApplyContext, ApplyPredicate, BuildMode, ExcludeBehavior, MatcherSpec,
    MatcherSpecInput, ObfuscatorConfig, ObfuscatorPluginOptions, DEFAULT_CONFIG_FILE, ENV_PREFIX,
};
pub use error::{ObfuscatorError, Result};
pub use hook::{BundleTransformer, HookReport};
pub use matcher::{
    resolve_path, MatchPredicate, Matcher, MatcherInput, MatcherSet, MatcherValue,
    DEFAULT_EXCLUDE_PATTERNS, DEFAULT_INCLUDE_PATTERN,
};
pub use obfuscator::{ObfuscationResult, Obfuscator, OxcObfuscator};
pub use options::{ObfuscatorOptions, SourceMapMode};

/// Plugin name reported to Rolldown
pub const PLUGIN_NAME: &str = "fob-obfuscator";

/// Rolldown plugin that obfuscates matching output chunks
///
/// Matchers are normalized once at construction and reused for every build
/// the plugin takes part in.
#[derive(Clone)]
pub struct FobObfuscatorPlugin {
    transformer: BundleTransformer,
    apply: Apply,
    /// Fixed build mode; derived from `is_write` when unset
    mode: Option<BuildMode>,
}

impl FobObfuscatorPlugin {
    /// Create a plugin with default matchers and options
    ///
    /// # Example
    ///
    /// ```rust
    /// use fob_plugin_obfuscator::FobObfuscatorPlugin;
    ///
    /// let plugin = FobObfuscatorPlugin::new();
    /// ```
    pub fn new() -> Self {
        Self {
            transformer: BundleTransformer::new(
                MatcherSet::default_include(),
                MatcherSet::default_exclude(),
                Arc::new(OxcObfuscator::new()),
            ),
            apply: Apply::Always,
            mode: None,
        }
    }

    /// Create a plugin from options, resolving string matchers against the
    /// process working directory
    pub fn with_options(options: ObfuscatorPluginOptions) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::with_options_in(options, &cwd)
    }

    /// Create a plugin from options, resolving string matchers against `cwd`
    pub fn with_options_in(options: ObfuscatorPluginOptions, cwd: &Path) -> Result<Self> {
        let include = match options.include {
            Some(input) => MatcherSet::normalize(input, cwd)?,
            None => MatcherSet::default_include(),
        };
        let exclude = match options.exclude {
            Some(input) => MatcherSet::normalize(input, cwd)?.with_dot(true),
            None => MatcherSet::default_exclude(),
        };

        let mut transformer =
            BundleTransformer::new(include, exclude, Arc::new(OxcObfuscator::new()));
        transformer.options = options.options;
        transformer.debugger = options.debugger;
        transformer.exclude_behavior = options.exclude_behavior;

        Ok(Self {
            transformer,
            apply: options.apply,
            mode: None,
        })
    }

    /// Create a plugin from `obfuscator.config.json` and `FOB_OBFUSCATOR_*`
    pub fn from_config_file(config_path: Option<&Path>) -> Result<Self> {
        let options = ObfuscatorConfig::load(config_path)?.into_plugin_options()?;
        Self::with_options(options)
    }

    /// Replace the obfuscation engine
    pub fn with_engine(mut self, engine: impl Obfuscator + 'static) -> Self {
        self.transformer.engine = Arc::new(engine);
        self
    }

    /// Pin the build mode seen by the apply gate
    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Resolved matchers, options and engine used by the hook
    pub fn transformer(&self) -> &BundleTransformer {
        &self.transformer
    }

    /// Build the gate context for one build
    pub fn apply_context(&self, is_write: bool) -> ApplyContext {
        let mode = self.mode.unwrap_or(if is_write {
            BuildMode::Build
        } else {
            BuildMode::Serve
        });
        ApplyContext { mode, is_write }
    }

    /// Run the hook against any bundle host.
    ///
    /// Returns `Ok(None)` without touching the bundle when the apply gate is
    /// closed for this build.
    pub fn process_bundle(
        &self,
        bundle: &mut dyn BundleHost,
        is_write: bool,
    ) -> anyhow::Result<Option<HookReport>> {
        let ctx = self.apply_context(is_write);
        if !self.apply.allows(&ctx) {
            debug!("[fob-obfuscator] Skipping bundle for {:?} build", ctx.mode);
            return Ok(None);
        }
        self.transformer.run(bundle).map(Some)
    }
}

impl Default for FobObfuscatorPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FobObfuscatorPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FobObfuscatorPlugin")
            .field("transformer", &self.transformer)
            .field("apply", &self.apply)
            .field("mode", &self.mode)
            .finish()
    }
}

impl Plugin for FobObfuscatorPlugin {
    /// Returns the plugin name for debugging and logging
    fn name(&self) -> Cow<'static, str> {
        PLUGIN_NAME.into()
    }

    /// We only use the generate_bundle hook
    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::GenerateBundle
    }

    /// Obfuscate matching chunks once the bundle is final
    ///
    /// The pass itself is synchronous; engine errors fail the build.
    fn generate_bundle(
        &self,
        _ctx: &PluginContext,
        args: &mut HookGenerateBundleArgs<'_>,
    ) -> impl std::future::Future<Output = HookNoopReturn> + Send {
        let outcome = self.process_bundle(&mut *args.bundle, args.is_write);
        async move { outcome.map(|_| ()) }
    }
}
