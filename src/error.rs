#![forbid(unsafe_code)]

//! Error taxonomy shared by the path resolver, mapping model, and both
//! compilers.
//!
//! Every compile error is fatal for the call that raised it: nothing is
//! cached and no partial expression is returned.

use std::fmt;

use thiserror::Error;

/// Convenience alias for compiler results.
pub type Result<T> = std::result::Result<T, CompileError>;

/// Structured errors emitted while resolving paths, building expressions,
/// or compiling projections and filters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A path segment does not exist on the current type, or was applied to a
    /// type that has no fields.
    #[error("cannot resolve '{segment}' of path '{path}' on type '{on_type}'")]
    PathResolution {
        /// Full dotted path supplied by the caller.
        path: String,
        /// Offending segment.
        segment: String,
        /// Type the segment was looked up on.
        on_type: String,
    },
    /// A mapping (or mapping list) is malformed.
    #[error("invalid mapping '{to}': {reason}")]
    InvalidMapping {
        /// Output field name of the mapping.
        to: String,
        /// Why the mapping was rejected.
        reason: String,
    },
    /// A filter literal could not be converted to the property's type.
    #[error("cannot convert '{raw}' to {target}: {reason}")]
    ValueConversion {
        /// Raw literal as supplied.
        raw: String,
        /// Canonical name of the target type.
        target: String,
        /// Parser diagnostic.
        reason: String,
    },
    /// Operator not recognised by the filter compiler.
    #[error("unsupported filter operator '{operator}'")]
    UnsupportedOperator {
        /// Operator name as supplied.
        operator: String,
    },
    /// Expression node built over operands of incompatible types.
    #[error("{context} is not defined for {found}")]
    TypeMismatch {
        /// Operation being built.
        context: &'static str,
        /// Offending operand type(s).
        found: String,
    },
    /// Schema lookup or schema document failure.
    #[error("schema error: {0}")]
    Schema(String),
    /// Malformed filter or entity document.
    #[error("malformed document: {0}")]
    Document(String),
    /// Runtime failure while evaluating a compiled expression in memory.
    #[error("evaluation error: {0}")]
    Evaluation(String),
}

impl CompileError {
    /// Builds a [`CompileError::PathResolution`].
    pub fn path(path: &str, segment: &str, on_type: impl fmt::Display) -> Self {
        CompileError::PathResolution {
            path: path.to_owned(),
            segment: segment.to_owned(),
            on_type: on_type.to_string(),
        }
    }

    /// Builds a [`CompileError::InvalidMapping`].
    pub fn mapping(to: impl Into<String>, reason: impl Into<String>) -> Self {
        CompileError::InvalidMapping {
            to: to.into(),
            reason: reason.into(),
        }
    }

    /// Builds a [`CompileError::ValueConversion`].
    pub fn conversion(
        raw: impl Into<String>,
        target: impl fmt::Display,
        reason: impl fmt::Display,
    ) -> Self {
        CompileError::ValueConversion {
            raw: raw.into(),
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Builds a [`CompileError::TypeMismatch`].
    pub fn mismatch(context: &'static str, found: impl fmt::Display) -> Self {
        CompileError::TypeMismatch {
            context,
            found: found.to_string(),
        }
    }

    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::PathResolution { .. } => "PathResolution",
            CompileError::InvalidMapping { .. } => "InvalidMapping",
            CompileError::ValueConversion { .. } => "ValueConversion",
            CompileError::UnsupportedOperator { .. } => "UnsupportedOperator",
            CompileError::TypeMismatch { .. } => "TypeMismatch",
            CompileError::Schema(_) => "Schema",
            CompileError::Document(_) => "Document",
            CompileError::Evaluation(_) => "Evaluation",
        }
    }
}

/// Convenience wrapper that formats compile errors with their codes.
pub struct CompileErrorWithCode<'a>(pub &'a CompileError);

impl fmt::Display for CompileErrorWithCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.0.code(), self.0)
    }
}
