//! The formatter seam: code-style formatting is delegated to an injected collaborator.

use std::fmt;
use std::io;
use std::path::Path;

use thiserror::Error;

/// Why a formatter could not format the emitted text.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The formatter program is missing or could not be started.
    #[error("formatter is not available: {0}")]
    Unavailable(String),

    /// The formatter ran but rejected the input.
    #[error("formatter rejected the output: {0}")]
    Syntax(String),

    /// Talking to the formatter failed.
    #[error("formatter I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Formats a complete TypeScript buffer.
pub trait Formatter: fmt::Debug {
    /// Format `source`, honoring `style_config` when given. When it is `None` the
    /// formatter may search the usual project locations for a configuration.
    fn format(&self, source: &str, style_config: Option<&Path>) -> Result<String, FormatError>;
}

/// Returns the text exactly as emitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unformatted;

impl Formatter for Unformatted {
    fn format(&self, source: &str, _style_config: Option<&Path>) -> Result<String, FormatError> {
        Ok(source.to_string())
    }
}

/// The formatter failed; `unformatted` holds the full emitted text.
#[derive(Debug, Error)]
#[error("post-processing failed: {source}")]
pub struct PostProcessingError {
    /// The formatter's error.
    pub source: FormatError,
    /// Everything the printer emitted, unformatted.
    pub unformatted: String,
}
