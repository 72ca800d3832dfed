//! Unified error types for the CVRF to CSAF conversion.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for conversion operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConvertError {
    /// XML input could not be read or parsed into an element tree
    #[error("XML parse error: {0}")]
    Xml(String),

    /// A mandatory element is missing from the source tree
    #[error("missing element '{tag}' under '{parent}' (line {line})")]
    MissingElement {
        tag: String,
        parent: String,
        line: u64,
    },

    /// A mandatory attribute is missing
    #[error("missing attribute '{name}' on '{tag}' (line {line})")]
    MissingAttribute {
        name: String,
        tag: String,
        line: u64,
    },

    /// An element that must carry text content is empty
    #[error("element '{tag}' has no text content (line {line})")]
    MissingText { tag: String, line: u64 },

    /// A source value does not fit the target schema
    #[error("invalid value for {field}: '{value}'")]
    InvalidValue { field: String, value: String },

    /// Configuration errors
    #[error("invalid configuration: {0}")]
    Config(String),

    /// IO errors with path context
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    /// Create an invalid-value error
    pub fn invalid_value(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: Some(path.into()),
            source,
        }
    }
}

impl From<std::io::Error> for ConvertError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            source: err,
        }
    }
}

/// Convenient Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConvertError::MissingElement {
            tag: "ID".into(),
            parent: "Identification".into(),
            line: 12,
        };
        let display = err.to_string();
        assert!(display.contains("ID"));
        assert!(display.contains("line 12"));

        let err = ConvertError::invalid_value("publisher category", "Reseller");
        assert!(err.to_string().contains("Reseller"));
    }

    #[test]
    fn test_io_error_keeps_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err = ConvertError::io("/tmp/advisory.xml", io_err);
        assert!(err.to_string().contains("advisory.xml"));
    }
}
