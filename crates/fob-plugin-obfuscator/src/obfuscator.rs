//! Obfuscation engines
//!
//! The plugin only talks to the [`Obfuscator`] trait. [`OxcObfuscator`] is the
//! engine used when nothing else is configured: it parses the chunk with OXC,
//! mangles identifiers, compresses, and prints compact code with an optional
//! source map.

use crate::error::ObfuscatorError;
use crate::options::ObfuscatorOptions;
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{CompressOptions, MangleOptions, Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;

/// Output of one engine call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObfuscationResult {
    code: String,
    source_map: Option<String>,
}

impl ObfuscationResult {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            source_map: None,
        }
    }

    pub fn with_source_map(mut self, map: impl Into<String>) -> Self {
        self.source_map = Some(map.into());
        self
    }

    pub fn obfuscated_code(&self) -> &str {
        &self.code
    }

    /// Source map as JSON, if the engine produced a separate one
    pub fn source_map(&self) -> Option<&str> {
        self.source_map.as_deref()
    }

    pub fn into_parts(self) -> (String, Option<String>) {
        (self.code, self.source_map)
    }
}

/// An obfuscation engine.
///
/// Errors are returned as-is to the bundler; the hook does not wrap them.
pub trait Obfuscator: Send + Sync {
    fn obfuscate(
        &self,
        file_name: &str,
        code: &str,
        options: &ObfuscatorOptions,
    ) -> anyhow::Result<ObfuscationResult>;
}

impl<F> Obfuscator for F
where
    F: Fn(&str, &str, &ObfuscatorOptions) -> anyhow::Result<ObfuscationResult> + Send + Sync,
{
    fn obfuscate(
        &self,
        file_name: &str,
        code: &str,
        options: &ObfuscatorOptions,
    ) -> anyhow::Result<ObfuscationResult> {
        self(file_name, code, options)
    }
}

/// Engine backed by the OXC minifier
#[derive(Debug, Clone, Copy, Default)]
pub struct OxcObfuscator;

impl OxcObfuscator {
    pub fn new() -> Self {
        Self
    }
}

impl Obfuscator for OxcObfuscator {
    fn obfuscate(
        &self,
        file_name: &str,
        code: &str,
        options: &ObfuscatorOptions,
    ) -> anyhow::Result<ObfuscationResult> {
        let started = Instant::now();
        let allocator = Allocator::default();
        let source_type = SourceType::from_path(file_name).unwrap_or_else(|_| SourceType::mjs());

        let parsed = Parser::new(&allocator, code, source_type).parse();
        if !parsed.errors.is_empty() {
            let messages: Vec<String> = parsed.errors.iter().map(|e| format!("{:?}", e)).collect();
            return Err(ObfuscatorError::parse(file_name, messages.join(", ")).into());
        }
        let mut program = parsed.program;

        let minifier_options = MinifierOptions {
            mangle: Some(MangleOptions {
                top_level: options.rename_globals,
                ..MangleOptions::default()
            }),
            compress: Some(CompressOptions::default()),
        };
        let minified = Minifier::new(minifier_options).minify(&allocator, &mut program);

        let source_map_path = options.source_map.then(|| {
            PathBuf::from(
                options
                    .source_map_file_name
                    .as_deref()
                    .unwrap_or(file_name),
            )
        });
        let codegen_options = CodegenOptions {
            minify: options.compact,
            source_map_path,
            ..CodegenOptions::default()
        };
        let generated = Codegen::new()
            .with_options(codegen_options)
            .with_scoping(minified.scoping)
            .build(&program);

        let mut output = generated.code;
        let mut separate_map = None;
        if let Some(map) = generated.map {
            if options.wants_inline_source_map() {
                output.push_str("\n//# sourceMappingURL=");
                output.push_str(&map.to_data_url());
            } else {
                separate_map = Some(map.to_json_string());
            }
        }

        debug!(
            "[fob-obfuscator] {} obfuscated ({} → {} bytes) in {:?}",
            file_name,
            code.len(),
            output.len(),
            started.elapsed()
        );

        let result = ObfuscationResult::new(output);
        Ok(match separate_map {
            Some(map) => result.with_source_map(map),
            None => result,
        })
    }
}
