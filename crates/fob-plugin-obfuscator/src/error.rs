//! Error types for the obfuscator plugin

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while configuring the plugin or running the bundled engine
#[derive(Error, Debug, Diagnostic)]
pub enum ObfuscatorError {
    /// A string matcher could not be compiled as a glob
    #[error("Invalid glob pattern '{pattern}': {source}")]
    #[diagnostic(
        code(fob::obfuscator::invalid_glob),
        help("Check the include/exclude patterns for unbalanced brackets or braces")
    )]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// A regex matcher could not be compiled
    #[error("Invalid regular expression '{pattern}': {source}")]
    #[diagnostic(code(fob::obfuscator::invalid_regex))]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The chunk handed to the engine is not valid JavaScript
    #[error("Failed to parse {file_name}: {message}")]
    #[diagnostic(
        code(fob::obfuscator::parse_error),
        help("The bundler produced code the obfuscator cannot parse. Exclude this file or check earlier plugins.")
    )]
    Parse { file_name: String, message: String },

    /// Working directory lookup or config file access failed
    #[error("I/O error: {0}")]
    #[diagnostic(code(fob::obfuscator::io))]
    Io(#[from] std::io::Error),

    /// Configuration could not be extracted from file or environment
    #[error("Invalid obfuscator configuration: {message}")]
    #[diagnostic(
        code(fob::obfuscator::config),
        help("Check obfuscator.config.json syntax and FOB_OBFUSCATOR_* variables")
    )]
    Config { message: String },
}

impl ObfuscatorError {
    pub fn invalid_glob(pattern: impl Into<String>, source: globset::Error) -> Self {
        Self::InvalidGlob {
            pattern: pattern.into(),
            source,
        }
    }

    pub fn invalid_regex(pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidRegex {
            pattern: pattern.into(),
            source,
        }
    }

    pub fn parse(file_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            file_name: file_name.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Result type alias for plugin construction
pub type Result<T> = std::result::Result<T, ObfuscatorError>;
