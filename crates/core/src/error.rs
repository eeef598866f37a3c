//! Fatal compilation errors and recoverable warnings.

use std::fmt;

use thiserror::Error;

use crate::pointer::Pointer;

/// A fatal compilation error. No output is produced when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A `$ref` points at a location that does not exist in the document.
    #[error("unresolved reference `{reference}` at {at}")]
    UnresolvedReference {
        /// The reference string as written in the document.
        reference: String,
        /// Location of the node carrying the `$ref`.
        at: Pointer,
    },

    /// Raw schema mode was requested without an explicit schema version.
    #[error("a schema version is required when compiling a raw schema (use version 2 or 3)")]
    MissingVersion,

    /// The explicit raw schema version is not one the compiler understands.
    #[error("unsupported schema version {version} (expected 2 or 3)")]
    UnsupportedVersion {
        /// The version that was requested.
        version: u8,
    },

    /// The document is neither Swagger 2 nor OpenAPI 3 and raw mode was not requested.
    #[error("unrecognized document at {at}: {reason}")]
    UnrecognizedDocument {
        /// Offending location, usually the root.
        at: Pointer,
        /// Human readable explanation.
        reason: String,
    },

    /// A named reference was emitted without a matching declaration.
    #[error("type `{name}` is referenced at {at} but never declared")]
    DanglingReference {
        /// The referenced declaration name.
        name: String,
        /// Declaration whose body contains the reference.
        at: Pointer,
    },
}

impl CompileError {
    /// The document location responsible for the error, if there is one.
    pub fn pointer(&self) -> Option<&Pointer> {
        match self {
            Self::UnresolvedReference { at, .. }
            | Self::UnrecognizedDocument { at, .. }
            | Self::DanglingReference { at, .. } => Some(at),
            Self::MissingVersion | Self::UnsupportedVersion { .. } => None,
        }
    }
}

/// Category of a recoverable problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// A schema shape with no TypeScript equivalent was replaced by `unknown`.
    UnsupportedShape,
    /// A schema combines keywords in a way with no agreed meaning; replaced by `unknown`.
    AmbiguousShape,
    /// The formatter failed; the unformatted text was returned instead.
    PostProcessing,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::UnsupportedShape => "unsupported shape",
            Self::AmbiguousShape => "ambiguous shape",
            Self::PostProcessing => "post-processing",
        };
        f.write_str(label)
    }
}

/// A recoverable problem attached to a successful compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// What went wrong.
    pub kind: WarningKind,
    /// Where it happened, when the problem is tied to a document location.
    pub pointer: Option<Pointer>,
    /// Human readable detail.
    pub message: String,
}

impl Warning {
    pub(crate) fn at(kind: WarningKind, pointer: &Pointer, message: impl Into<String>) -> Self {
        Self {
            kind,
            pointer: Some(pointer.clone()),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pointer {
            Some(pointer) => write!(f, "{} at {}: {}", self.kind, pointer, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}
