//! Error types for hdfmap-core.
//!
//! Absence (unknown names, missing datasets, broken links) is not an error
//! anywhere in this crate: lookups return `Option` or a caller default.
//! Errors are reserved for expression evaluation and for failures reported
//! by the hierarchy backend while reading data.

use thiserror::Error;

/// Result type alias for hdfmap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for hdfmap operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Expression or template evaluation failed.
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),

    /// Index outside the extent of an axis.
    #[error("index {index} out of bounds for axis {axis} with length {len}")]
    IndexOutOfBounds { index: isize, axis: usize, len: usize },

    /// Selection does not fit the dataset dimensionality.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// The backend was asked to read an address it cannot resolve.
    #[error("object not found: {0}")]
    NotFound(String),

    /// The backend failed while reading a dataset.
    #[error("failed to read '{address}': {source}")]
    Read {
        address: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Values could not be combined into one table.
    #[error("shape error: {0}")]
    Shape(String),
}

/// Errors raised while evaluating expressions and format templates.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// A free name is not present in the namespace.
    #[error("name '{0}' is not defined")]
    UnresolvedName(String),

    /// A called function does not exist.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// The expression could not be parsed.
    #[error("syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    /// Operands have incompatible types.
    #[error("type error: {0}")]
    Type(String),

    /// Operands cannot be broadcast together.
    #[error("operands could not be broadcast together with shapes {left:?} {right:?}")]
    Shape { left: Vec<usize>, right: Vec<usize> },

    /// Subscript outside the value or of the wrong kind.
    #[error("index error: {0}")]
    Index(String),

    /// Unsupported or malformed format specifier.
    #[error("invalid format specifier '{0}'")]
    FormatSpec(String),
}

impl Error {
    /// Wrap a backend error raised while reading `address`.
    pub fn read<E>(address: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Read {
            address: address.into(),
            source: source.into(),
        }
    }
}
