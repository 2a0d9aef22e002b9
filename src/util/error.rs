//! Error types for the dataset import layer.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for dataset import operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid magic bytes at start of file
    #[error("Invalid NetCDF file: expected 'CDF' magic bytes")]
    InvalidMagic,

    /// Unsupported container format version
    #[error("Unsupported NetCDF version byte: {0}")]
    UnsupportedVersion(u8),

    /// File is truncated or corrupted
    #[error("Unexpected end of file at position {0}")]
    UnexpectedEof(u64),

    /// Structurally invalid content (header, declared sizes, element data)
    #[error("Invalid file structure: {0}")]
    InvalidStructure(String),

    /// Parameter file content that cannot be parsed
    #[error("Parse error at line {line}: {msg}")]
    Parse { line: usize, msg: String },

    /// Variable not found by name
    #[error("Variable not found: {0}")]
    VariableNotFound(String),

    /// Global attribute not found by name
    #[error("Attribute not found: {0}")]
    AttributeNotFound(String),

    /// Dimension not found by name or id
    #[error("Dimension not found: {0}")]
    DimensionNotFound(String),

    /// Type mismatch when reading data
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Failure reported by a CGNS library backend
    #[error("CGNS error: {0}")]
    Cgns(String),

    /// Write operation failed
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Map an I/O error from opening `path`, turning `NotFound` into [`Error::FileNotFound`].
    pub fn from_open(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound(path.into())
        } else {
            Self::Io(err)
        }
    }

    /// True for the "path does not resolve" class of failures.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound(_)
                | Self::VariableNotFound(_)
                | Self::AttributeNotFound(_)
                | Self::DimensionNotFound(_)
        )
    }

    /// True for structurally invalid content.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidMagic
                | Self::UnsupportedVersion(_)
                | Self::UnexpectedEof(_)
                | Self::InvalidStructure(_)
                | Self::Parse { .. }
        )
    }
}

/// Result type alias for dataset operations.
pub type Result<T> = std::result::Result<T, Error>;
