//! Output bundle access
//!
//! The hook works against [`BundleHost`], the host's mutable file name → entry
//! mapping for the duration of one call. Two hosts ship with the crate:
//!
//! - [`OutputBundle`]: an ordered in-memory mapping, used by embedders that
//!   drive the hook themselves and by the tests
//! - `Vec<Output>`: Rolldown's `generate_bundle` output list

use indexmap::IndexMap;
use rolldown_common::{Output, OutputAsset};
use std::sync::Arc;

/// Entry discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Chunk,
    Asset,
}

/// An asset registered by the hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedAsset {
    pub file_name: String,
    pub source: String,
    /// Source map JSON produced alongside `source`
    pub source_map: Option<String>,
}

/// The host's output mapping, borrowed for one hook call
pub trait BundleHost {
    /// Snapshot of file names in iteration order
    fn file_names(&self) -> Vec<String>;

    fn entry_kind(&self, file_name: &str) -> Option<EntryKind>;

    /// Generated code of a chunk; `None` for assets and unknown names
    fn chunk_code(&self, file_name: &str) -> Option<&str>;

    /// Remove an entry, returning whether it existed
    fn remove(&mut self, file_name: &str) -> bool;

    fn emit_asset(&mut self, asset: EmittedAsset);
}

/// A single output entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEntry {
    Chunk {
        code: String,
    },
    Asset {
        source: String,
        source_map: Option<String>,
    },
}

impl OutputEntry {
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Chunk { .. } => EntryKind::Chunk,
            Self::Asset { .. } => EntryKind::Asset,
        }
    }

    /// Chunk code or asset source
    pub fn content(&self) -> &str {
        match self {
            Self::Chunk { code } => code,
            Self::Asset { source, .. } => source,
        }
    }
}

/// In-memory output bundle keyed by file name, in build order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputBundle {
    entries: IndexMap<String, OutputEntry>,
}

impl OutputBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_chunk(&mut self, file_name: impl Into<String>, code: impl Into<String>) {
        self.entries.insert(
            file_name.into(),
            OutputEntry::Chunk { code: code.into() },
        );
    }

    pub fn insert_asset(&mut self, file_name: impl Into<String>, source: impl Into<String>) {
        self.entries.insert(
            file_name.into(),
            OutputEntry::Asset {
                source: source.into(),
                source_map: None,
            },
        );
    }

    /// Builder-style [`OutputBundle::insert_chunk`]
    pub fn with_chunk(mut self, file_name: impl Into<String>, code: impl Into<String>) -> Self {
        self.insert_chunk(file_name, code);
        self
    }

    /// Builder-style [`OutputBundle::insert_asset`]
    pub fn with_asset(mut self, file_name: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert_asset(file_name, source);
        self
    }

    pub fn get(&self, file_name: &str) -> Option<&OutputEntry> {
        self.entries.get(file_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OutputEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl BundleHost for OutputBundle {
    fn file_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn entry_kind(&self, file_name: &str) -> Option<EntryKind> {
        self.entries.get(file_name).map(OutputEntry::kind)
    }

    fn chunk_code(&self, file_name: &str) -> Option<&str> {
        match self.entries.get(file_name)? {
            OutputEntry::Chunk { code } => Some(code),
            OutputEntry::Asset { .. } => None,
        }
    }

    fn remove(&mut self, file_name: &str) -> bool {
        self.entries.shift_remove(file_name).is_some()
    }

    fn emit_asset(&mut self, asset: EmittedAsset) {
        self.entries.insert(
            asset.file_name,
            OutputEntry::Asset {
                source: asset.source,
                source_map: asset.source_map,
            },
        );
    }
}

/// Rolldown's bundle. A source map on an emitted asset becomes a sibling
/// `<file>.map` asset, since `OutputAsset` carries no map of its own.
impl BundleHost for Vec<Output> {
    fn file_names(&self) -> Vec<String> {
        self.iter().map(|output| output.filename().to_string()).collect()
    }

    fn entry_kind(&self, file_name: &str) -> Option<EntryKind> {
        self.iter()
            .find(|output| output.filename() == file_name)
            .map(|output| match output {
                Output::Chunk(_) => EntryKind::Chunk,
                Output::Asset(_) => EntryKind::Asset,
            })
    }

    fn chunk_code(&self, file_name: &str) -> Option<&str> {
        self.iter().find_map(|output| match output {
            Output::Chunk(chunk) if chunk.filename.as_str() == file_name => {
                Some(chunk.code.as_str())
            }
            _ => None,
        })
    }

    fn remove(&mut self, file_name: &str) -> bool {
        match self.iter().position(|output| output.filename() == file_name) {
            Some(index) => {
                self.remove(index);
                true
            }
            None => false,
        }
    }

    fn emit_asset(&mut self, asset: EmittedAsset) {
        if let Some(map) = asset.source_map {
            self.push(rolldown_asset(format!("{}.map", asset.file_name), map));
        }
        self.push(rolldown_asset(asset.file_name, asset.source));
    }
}

fn rolldown_asset(filename: String, source: String) -> Output {
    Output::Asset(Arc::new(OutputAsset {
        names: vec![],
        original_file_names: vec![],
        filename: filename.into(),
        source: source.into(),
    }))
}
