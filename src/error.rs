//! Error types for synthesis runs.
//!
//! An empty NBAIC after pruning is a valid negative result and is reported
//! through [`crate::nbaic::Nbaic::is_empty`], not through these types.

use thiserror::Error;

/// A fatal error of a synthesis run. Synthesis is all-or-nothing: no error
/// is recovered inside the core and partial results are never emitted.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// A plant or property file could not be parsed.
    #[error("parse error in {file}:{line}: {message}")]
    InputParse {
        file: String,
        line: usize,
        message: String,
    },

    /// The plant references an undeclared state or gives an event
    /// conflicting attributes.
    #[error("inconsistent model: {0}")]
    InconsistentModel(String),

    /// The property file names an unknown information-state property kind.
    #[error("unsupported information-state property '{0}'")]
    PropertyUnsupported(String),

    /// An internal invariant was violated. This indicates a bug.
    #[error("internal invariant violation: {0}")]
    InternalInvariantViolation(String),

    /// An I/O error while reading inputs or writing results.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SynthesisError {
    pub(crate) fn parse(file: &str, line: usize, message: impl Into<String>) -> Self {
        Self::InputParse {
            file: file.to_owned(),
            line,
            message: message.into(),
        }
    }
}
