use thiserror::Error;

#[derive(Error, Debug)]
pub enum PvError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Dataset root folder does not exist: {path}")]
    DatasetRootMissing { path: String },

    #[error("Invalid month key '{value}': expected YYYY_MM")]
    InvalidMonthKey { value: String },

    #[error("Column '{column}' not found")]
    ColumnNotFound { column: String },

    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("Plot rendering failed: {message}")]
    PlotError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Data,
    Configuration,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PvError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PvError::IoError(_) | PvError::DatasetRootMissing { .. } => ErrorCategory::Io,
            PvError::CsvError(_)
            | PvError::ColumnNotFound { .. }
            | PvError::InvalidTimestamp { .. }
            | PvError::ProcessingError { .. }
            | PvError::ValidationError { .. } => ErrorCategory::Data,
            PvError::InvalidMonthKey { .. }
            | PvError::ConfigError { .. }
            | PvError::ConfigValidationError { .. }
            | PvError::InvalidConfigValueError { .. }
            | PvError::MissingConfigError { .. } => ErrorCategory::Configuration,
            PvError::ZipError(_) | PvError::SerializationError(_) | PvError::PlotError { .. } => {
                ErrorCategory::Output
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Output => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            PvError::DatasetRootMissing { .. } => {
                "Check the --root path; it must contain <YYYY>_V3 year folders"
            }
            PvError::InvalidMonthKey { .. } => "Pass months as YYYY_MM, for example 2024_03",
            PvError::ColumnNotFound { .. } => {
                "Inspect the CSV header; the export format may have changed"
            }
            PvError::InvalidTimestamp { .. } => "Use ISO-8601 timestamps such as 2024-06-01",
            PvError::CsvError(_) => "Make sure the file is a comma-separated export with a header",
            PvError::IoError(_) => "Check that the path exists and is readable/writable",
            PvError::ZipError(_) => "Check free disk space in the output folder",
            PvError::PlotError { .. } => "Retry with --no-plots to skip chart rendering",
            PvError::ConfigError { .. }
            | PvError::ConfigValidationError { .. }
            | PvError::InvalidConfigValueError { .. }
            | PvError::MissingConfigError { .. } => "Fix the scenario file and run again",
            PvError::SerializationError(_) => "Report this issue together with the input files",
            PvError::ProcessingError { .. } | PvError::ValidationError { .. } => {
                "Run with --verbose to see which record was rejected"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            PvError::DatasetRootMissing { path } => {
                format!("The master folder does not exist: {}", path)
            }
            PvError::IoError(e) => format!("File access failed: {}", e),
            PvError::CsvError(e) => format!("Could not read CSV data: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PvError>;
