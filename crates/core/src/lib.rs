//! OpenAPI 2/3 and raw JSON Schema to TypeScript declaration compiler.
//!
//! The pipeline is: pointer index ([`resolver`]) → declaration assembly ([`assembler`]),
//! which drives the type builder ([`builder`]) → printing ([`emit`]) through an injected
//! [`Formatter`]. The crate performs no I/O of its own.
#![forbid(unsafe_code)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]

use std::path::PathBuf;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

pub mod assembler;
pub mod builder;
pub mod emit;
pub mod error;
pub mod format;
pub mod naming;
pub mod pointer;
pub mod resolver;
pub mod schema;
pub mod types;

pub use assembler::{Assembly, SchemaVersion, assemble, verify_closure};
pub use emit::{BANNER, Emit, PrintOptions, print};
pub use error::{CompileError, Warning, WarningKind};
pub use format::{FormatError, Formatter, PostProcessingError, Unformatted};
pub use pointer::Pointer;
pub use resolver::{PointerIndex, ResolvedRef};
pub use types::{Declaration, DeclarationKind, TsType};

/// Settings for one compilation.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Treat the document as a bare map of named schemas instead of an API document.
    pub raw_schema: bool,
    /// Dialect of a raw schema (2 or 3). Required when `raw_schema` is set.
    pub version: Option<u8>,
    /// Formatter style configuration; `None` lets the formatter search for one.
    pub style_config: Option<PathBuf>,
}

/// A successful compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiled {
    /// The generated TypeScript source.
    pub text: String,
    /// Recoverable problems found along the way.
    pub warnings: Vec<Warning>,
}

/// Compile `document` without a formatter.
pub fn compile(document: &Value, options: &CompileOptions) -> Result<Compiled, CompileError> {
    compile_with(document, options, &Unformatted)
}

/// Compile `document`, passing the printed text through `formatter`.
///
/// A formatter failure is not fatal: the unformatted text is returned along with a
/// [`WarningKind::PostProcessing`] warning.
pub fn compile_with(
    document: &Value,
    options: &CompileOptions,
    formatter: &dyn Formatter,
) -> Result<Compiled, CompileError> {
    let started = Instant::now();

    let (version, index) = if options.raw_schema {
        let version = SchemaVersion::from_number(options.version.ok_or(CompileError::MissingVersion)?)?;
        if !document.is_object() {
            return Err(CompileError::UnrecognizedDocument {
                at: Pointer::root(),
                reason: "a raw schema must be an object of named schemas".into(),
            });
        }
        let index = PointerIndex::build(document).with_root_alias(version.schemas_prefix());
        (version, index)
    } else {
        (SchemaVersion::detect(document)?, PointerIndex::build(document))
    };
    debug!(?version, raw_schema = options.raw_schema, "Compiling document.");

    let Assembly {
        declarations,
        mut warnings,
    } = assemble(&index, version, options.raw_schema)?;

    let print_options = PrintOptions {
        raw_schema: options.raw_schema,
        style_config: options.style_config.as_deref(),
    };
    let text = match print(&declarations, &print_options, formatter) {
        Ok(text) => text,
        Err(err) => {
            warn!(error = %err.source, "Formatter failed, keeping unformatted output.");
            warnings.push(Warning {
                kind: WarningKind::PostProcessing,
                pointer: None,
                message: err.source.to_string(),
            });
            err.unformatted
        }
    };

    debug!(
        declarations = declarations.len(),
        warnings = warnings.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Compiled document."
    );
    Ok(Compiled { text, warnings })
}
