//! The filter-and-transform pass over an output bundle
//!
//! ## How It Works
//!
//! 1. Snapshot the bundle's file names, so emitted assets are never revisited
//! 2. For each file name, test the exclude set first. A match ends the whole
//!    pass with [`ExcludeBehavior::AbortBundle`] (the default) or skips just
//!    that file with [`ExcludeBehavior::SkipEntry`]
//! 3. Chunks matching the include set are sent to the engine; the original
//!    entry is removed and an asset with the obfuscated code is emitted under
//!    the same file name. A separate source map is referenced from the code as
//!    `<file>.map`, the name hosts give the sibling map file
//! 4. Everything else is left untouched
//!
//! Engine errors end the pass immediately and are returned unchanged.
//!
//! Per-file decisions are logged only with `debugger` on. The pass summary is a
//! `debug!` event left to the subscriber's level filter.

use crate::bundle::{BundleHost, EmittedAsset, EntryKind};
use crate::config::ExcludeBehavior;
use crate::matcher::MatcherSet;
use crate::obfuscator::Obfuscator;
use crate::options::ObfuscatorOptions;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// What one pass did, in visiting order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookReport {
    pub transformed: Vec<String>,
    pub excluded: Vec<String>,
    pub unmatched: Vec<String>,
    /// Excluded file that ended the pass early
    pub aborted_at: Option<String>,
}

/// Resolved matchers, options and engine for the hook
#[derive(Clone)]
pub struct BundleTransformer {
    pub(crate) include: MatcherSet,
    pub(crate) exclude: MatcherSet,
    pub(crate) options: ObfuscatorOptions,
    pub(crate) debugger: bool,
    pub(crate) exclude_behavior: ExcludeBehavior,
    pub(crate) engine: Arc<dyn Obfuscator>,
}

impl BundleTransformer {
    pub fn new(include: MatcherSet, exclude: MatcherSet, engine: Arc<dyn Obfuscator>) -> Self {
        Self {
            include,
            exclude,
            options: ObfuscatorOptions::default(),
            debugger: false,
            exclude_behavior: ExcludeBehavior::default(),
            engine,
        }
    }

    pub fn include(&self) -> &MatcherSet {
        &self.include
    }

    pub fn exclude(&self) -> &MatcherSet {
        &self.exclude
    }

    pub fn options(&self) -> &ObfuscatorOptions {
        &self.options
    }

    /// Run one pass over `bundle`
    pub fn run(&self, bundle: &mut dyn BundleHost) -> anyhow::Result<HookReport> {
        let mut report = HookReport::default();

        for file_name in bundle.file_names() {
            if self.exclude.matches(&file_name) {
                self.log_decision("exclude", &file_name);
                report.excluded.push(file_name.clone());
                match self.exclude_behavior {
                    ExcludeBehavior::AbortBundle => {
                        report.aborted_at = Some(file_name);
                        break;
                    }
                    ExcludeBehavior::SkipEntry => continue,
                }
            }

            if self.include.matches(&file_name)
                && bundle.entry_kind(&file_name) == Some(EntryKind::Chunk)
            {
                self.log_decision("include matched", &file_name);

                let Some(code) = bundle.chunk_code(&file_name) else {
                    continue;
                };
                let result = self.engine.obfuscate(&file_name, code, &self.options)?;
                let (mut code, map) = result.into_parts();
                let source_map = if self.options.wants_separate_source_map() {
                    map
                } else {
                    None
                };
                if source_map.is_some() {
                    code.push_str(&source_mapping_comment(&file_name));
                }

                bundle.remove(&file_name);
                bundle.emit_asset(EmittedAsset {
                    file_name: file_name.clone(),
                    source: code,
                    source_map,
                });
                report.transformed.push(file_name);
                continue;
            }

            self.log_decision("not matched", &file_name);
            report.unmatched.push(file_name);
        }

        debug!(
            "[fob-obfuscator] {} transformed, {} excluded, {} not matched{}",
            report.transformed.len(),
            report.excluded.len(),
            report.unmatched.len(),
            report
                .aborted_at
                .as_deref()
                .map(|name| format!(", stopped at {}", name))
                .unwrap_or_default()
        );

        Ok(report)
    }

    fn log_decision(&self, decision: &str, file_name: &str) {
        if self.debugger {
            info!("[fob-obfuscator]::{} {}", decision, file_name);
        }
    }
}

/// `//# sourceMappingURL=` line pointing at the map next to `file_name`
fn source_mapping_comment(file_name: &str) -> String {
    let base_name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    format!("\n//# sourceMappingURL={}.map", base_name)
}

impl fmt::Debug for BundleTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleTransformer")
            .field("include", &self.include)
            .field("exclude", &self.exclude)
            .field("options", &self.options)
            .field("debugger", &self.debugger)
            .field("exclude_behavior", &self.exclude_behavior)
            .finish_non_exhaustive()
    }
}
