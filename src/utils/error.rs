use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpscaleError {
    #[error("Invalid argument '{field}': {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("Could not probe '{path}': {message}")]
    ProbeFailure { path: String, message: String },

    #[error("Format conversion failed: {message}")]
    ConversionFailure { message: String },

    #[error("Upscaler failed: {message}")]
    UpscaleFailure { message: String },

    #[error("Upscaler exceeded its deadline of {:.3}s", deadline.as_secs_f64())]
    UpscaleTimeout { deadline: Duration },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Probe,
    Conversion,
    Upscale,
    Filesystem,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl UpscaleError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        UpscaleError::InvalidArgument {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            UpscaleError::InvalidArgument { .. } => ErrorCategory::Input,
            UpscaleError::ProbeFailure { .. } => ErrorCategory::Probe,
            UpscaleError::ConversionFailure { .. } => ErrorCategory::Conversion,
            UpscaleError::UpscaleFailure { .. } | UpscaleError::UpscaleTimeout { .. } => {
                ErrorCategory::Upscale
            }
            UpscaleError::IoError(_) => ErrorCategory::Filesystem,
            UpscaleError::ConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input | ErrorCategory::Configuration => ErrorSeverity::Medium,
            ErrorCategory::Probe | ErrorCategory::Conversion | ErrorCategory::Upscale => {
                ErrorSeverity::High
            }
            ErrorCategory::Filesystem => ErrorSeverity::Critical,
        }
    }

    /// Process exit status for this failure. Never zero.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    /// Whether rerunning the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            UpscaleError::UpscaleTimeout { .. } | UpscaleError::IoError(_)
        )
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            UpscaleError::InvalidArgument { field, reason } => {
                format!("The request is invalid ({}): {}", field, reason)
            }
            UpscaleError::ProbeFailure { path, .. } => {
                format!("Could not read image dimensions from {}", path)
            }
            UpscaleError::ConversionFailure { .. } => {
                "The source image could not be converted to PNG".to_string()
            }
            UpscaleError::UpscaleFailure { .. } => "The upscaler did not finish".to_string(),
            UpscaleError::UpscaleTimeout { deadline } => format!(
                "Upscaling took longer than {:.1} seconds and was stopped",
                deadline.as_secs_f64()
            ),
            UpscaleError::IoError(e) => format!("A filesystem operation failed: {}", e),
            UpscaleError::ConfigError { message } => {
                format!("The configuration is invalid: {}", message)
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => {
                "Check the source/destination paths and use either a scale factor or target sizes, not both"
            }
            ErrorCategory::Probe => {
                "Make sure the source is a readable image and the probe backend is installed"
            }
            ErrorCategory::Conversion => {
                "Make sure ImageMagick is installed or try the native converter backend"
            }
            ErrorCategory::Upscale => {
                "Check the upscaler executable and model path, or raise the timeout"
            }
            ErrorCategory::Filesystem => "Check permissions and free space at the destination",
            ErrorCategory::Configuration => "Fix the configuration file and try again",
        }
    }
}

pub type Result<T> = std::result::Result<T, UpscaleError>;
