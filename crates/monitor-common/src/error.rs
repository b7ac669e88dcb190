//! Error types for the monitoring dashboard.

use thiserror::Error;

/// Result type alias using MonitorError.
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Primary error type for dashboard operations.
#[derive(Debug, Error)]
pub enum MonitorError {
    // === Upload / Request Errors ===
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("Unsupported file extension '{extension}' for {kind} upload")]
    UnsupportedExtension { kind: String, extension: String },

    #[error("{0}")]
    NotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Upload exceeds the {limit} byte limit")]
    UploadTooLarge { limit: usize },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    // === Script Execution Errors ===
    #[error("Interpreter '{0}' not found. Please ensure Python is installed and in the PATH.")]
    InterpreterNotFound(String),

    #[error("An unexpected error occurred while running the script: {0}")]
    ExecutionFailed(String),

    // === Data Errors ===
    #[error("Failed to parse data file: {0}")]
    ParseError(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Format not supported for display: {0}")]
    UnsupportedFormat(String),

    #[error("Rendering failed: {0}")]
    RenderError(String),

    // === Infrastructure Errors ===
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl MonitorError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            MonitorError::InvalidFileName(_)
            | MonitorError::UnsupportedExtension { .. }
            | MonitorError::NotADirectory(_)
            | MonitorError::MissingField(_)
            | MonitorError::InvalidRequest(_)
            | MonitorError::UnsupportedFormat(_) => 400,

            MonitorError::NotFound(_) => 404,

            MonitorError::UploadTooLarge { .. } => 413,

            MonitorError::ParseError(_) | MonitorError::ColumnNotFound(_) => 422,

            _ => 500,
        }
    }

    /// Stable machine-readable code carried in error responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            MonitorError::InvalidFileName(_) => "invalid_file_name",
            MonitorError::UnsupportedExtension { .. } => "unsupported_extension",
            MonitorError::NotFound(_) => "not_found",
            MonitorError::NotADirectory(_) => "not_a_directory",
            MonitorError::UploadTooLarge { .. } => "upload_too_large",
            MonitorError::MissingField(_) => "missing_field",
            MonitorError::InvalidRequest(_) => "invalid_request",
            MonitorError::InterpreterNotFound(_) => "interpreter_not_found",
            MonitorError::ExecutionFailed(_) => "execution_failed",
            MonitorError::ParseError(_) => "parse_error",
            MonitorError::ColumnNotFound(_) => "column_not_found",
            MonitorError::UnsupportedFormat(_) => "unsupported_format",
            MonitorError::RenderError(_) => "render_error",
            MonitorError::ConfigError(_) => "config_error",
            MonitorError::Io(_) => "io_error",
            MonitorError::Internal(_) => "internal_error",
        }
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Internal(format!("JSON error: {}", err))
    }
}
