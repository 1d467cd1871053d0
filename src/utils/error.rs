use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Commuter profile not found: {id}")]
    NotFound { id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Language model request failed: {message}")]
    Upstream { message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Data,
    Configuration,
    Upstream,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AdvisorError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } | Self::Validation { .. } | Self::CsvError(_) => {
                ErrorCategory::Data
            }
            Self::Configuration { .. } | Self::InvalidConfigValue { .. } => {
                ErrorCategory::Configuration
            }
            Self::Upstream { .. } => ErrorCategory::Upstream,
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotFound { .. } => ErrorSeverity::Low,
            Self::Upstream { .. } => ErrorSeverity::Medium,
            Self::Validation { .. }
            | Self::CsvError(_)
            | Self::Configuration { .. }
            | Self::InvalidConfigValue { .. } => ErrorSeverity::High,
            Self::IoError(_) => ErrorSeverity::Critical,
        }
    }

    /// Whether the same request may succeed if the caller tries again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "Run `commute-advisor profiles` to list the known commuter IDs",
            Self::Validation { .. } | Self::CsvError(_) => {
                "Check the dataset: every row needs a unique CommuterID and all three scores inside the configured scale"
            }
            Self::Configuration { .. } | Self::InvalidConfigValue { .. } => {
                "Review commute-advisor.toml and the command-line overrides"
            }
            Self::Upstream { .. } => {
                "Check GEMINI_API_KEY and network connectivity, then send the message again"
            }
            Self::IoError(_) => "Make sure the dataset and config paths exist and are readable",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::NotFound { id } => format!("No commuter profile with ID '{}'", id),
            Self::Validation { message } => format!("The commuter data is invalid: {}", message),
            Self::Configuration { message } => format!("Invalid settings: {}", message),
            Self::InvalidConfigValue { field, reason, .. } => {
                format!("Invalid setting '{}': {}", field, reason)
            }
            Self::Upstream { message } => {
                format!("The assistant is unavailable right now ({})", message)
            }
            Self::CsvError(e) => format!("Could not read the commuter dataset: {}", e),
            Self::IoError(e) => format!("File access failed: {}", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, AdvisorError>;
