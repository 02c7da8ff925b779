//! Error types for safedata.

use std::path::PathBuf;

/// Result type alias for safedata operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`].
///
/// The pipeline aborts on [`ErrorKind::DataLoad`] and [`ErrorKind::Config`];
/// [`ErrorKind::Render`] failures are logged and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input file missing, unreadable or malformed.
    DataLoad,
    /// Missing or invalid configuration.
    Config,
    /// Failure while computing over an already-loaded dataset.
    Processing,
    /// Failure while producing a presentation artifact.
    Render,
}

/// Errors that can occur in safedata operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        /// The path where the error occurred, if known.
        path: Option<PathBuf>,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Arrow error while reading, writing or computing over batches.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error during file operations.
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Dataset has no batches or no data rows.
    #[error("Dataset is empty")]
    EmptyDataset,

    /// Unsupported file format.
    #[error("Unsupported format: {format}")]
    UnsupportedFormat {
        /// The unsupported format name or extension.
        format: String,
    },

    /// Schema mismatch between batches or datasets.
    #[error("Schema mismatch: {message}")]
    SchemaMismatch {
        /// Description of the schema mismatch.
        message: String,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Configuration could not be read or deserialized.
    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// Column not found in schema.
    #[error("Column '{name}' not found in schema")]
    ColumnNotFound {
        /// The name of the missing column.
        name: String,
    },

    /// Transform error.
    #[error("Transform error: {message}")]
    Transform {
        /// Description of the transform error.
        message: String,
    },

    /// Data error.
    #[error("Data error: {message}")]
    Data {
        /// Description of the data error.
        message: String,
    },

    /// Report or artifact rendering failed.
    #[error("Render error: {message}")]
    Render {
        /// Description of the rendering failure.
        message: String,
    },
}

impl Error {
    /// Create an I/O error with a path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            path: Some(path.into()),
            source,
        }
    }

    /// Create a column not found error.
    pub fn column_not_found(name: impl Into<String>) -> Self {
        Self::ColumnNotFound { name: name.into() }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an unsupported format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Create a schema mismatch error.
    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
        }
    }

    /// Create a transform error.
    pub fn transform(message: impl Into<String>) -> Self {
        Self::Transform {
            message: message.into(),
        }
    }

    /// Create a data error.
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
        }
    }

    /// Create a render error.
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. }
            | Self::Arrow(_)
            | Self::Parquet(_)
            | Self::EmptyDataset
            | Self::UnsupportedFormat { .. }
            | Self::SchemaMismatch { .. } => ErrorKind::DataLoad,
            Self::InvalidConfig { .. } | Self::Figment(_) => ErrorKind::Config,
            Self::ColumnNotFound { .. } | Self::Transform { .. } | Self::Data { .. } => {
                ErrorKind::Processing
            }
            Self::Render { .. } => ErrorKind::Render,
        }
    }

    /// Returns true if the pipeline must stop on this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::DataLoad | ErrorKind::Config)
    }
}
