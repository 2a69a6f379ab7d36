//! Obfuscator options
//!
//! Field names follow the camelCase spelling of javascript-obfuscator so a
//! config file written for that tool deserializes as-is. Fields this crate does
//! not know about are kept in [`ObfuscatorOptions::extra`] and handed to the
//! engine untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where a produced source map ends up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMapMode {
    /// Separate map artifact
    #[default]
    Separate,
    /// Map embedded in the code as a data URL comment
    Inline,
}

/// Options passed to the obfuscation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObfuscatorOptions {
    /// Emit code on as few lines as possible
    #[serde(default = "default_compact")]
    pub compact: bool,

    /// Also rename top-level declarations
    #[serde(default)]
    pub rename_globals: bool,

    /// Produce a source map
    #[serde(default)]
    pub source_map: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_map_mode: Option<SourceMapMode>,

    /// File name recorded in the source map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_map_file_name: Option<String>,

    /// Engine-specific options, passed through verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_compact() -> bool {
    true
}

impl Default for ObfuscatorOptions {
    fn default() -> Self {
        Self {
            compact: default_compact(),
            rename_globals: false,
            source_map: false,
            source_map_mode: None,
            source_map_file_name: None,
            extra: Map::new(),
        }
    }
}

impl ObfuscatorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compact(mut self, enabled: bool) -> Self {
        self.compact = enabled;
        self
    }

    pub fn with_rename_globals(mut self, enabled: bool) -> Self {
        self.rename_globals = enabled;
        self
    }

    pub fn with_source_map(mut self, enabled: bool) -> Self {
        self.source_map = enabled;
        self
    }

    pub fn with_source_map_mode(mut self, mode: SourceMapMode) -> Self {
        self.source_map_mode = Some(mode);
        self
    }

    /// Set an engine-specific option
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Whether the map should be taken from the engine result as a separate artifact.
    ///
    /// True only when maps are enabled and the mode is not inline.
    pub fn wants_separate_source_map(&self) -> bool {
        self.source_map && self.source_map_mode != Some(SourceMapMode::Inline)
    }

    /// Whether the engine should embed the map into the code
    pub fn wants_inline_source_map(&self) -> bool {
        self.source_map && self.source_map_mode == Some(SourceMapMode::Inline)
    }
}
