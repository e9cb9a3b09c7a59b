use thiserror::Error;

/// 定位相關錯誤，對應瀏覽器 Geolocation API 的錯誤代碼
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable")]
    PositionUnavailable,

    #[error("location request timed out")]
    Timeout,

    #[error("geolocation unsupported")]
    Unsupported,
}

impl GeolocationError {
    /// 一次性定位請求顯示給使用者的訊息
    pub fn user_message(&self) -> &'static str {
        match self {
            GeolocationError::PermissionDenied => {
                "Permission denied. Please enable location access in your browser settings."
            }
            GeolocationError::PositionUnavailable => "Location information is unavailable.",
            GeolocationError::Timeout => "The request to get user location timed out.",
            GeolocationError::Unsupported => "Geolocation is not supported by this browser",
        }
    }

    /// 持續追蹤 (watch) 模式下顯示的訊息
    pub fn watch_message(&self) -> &'static str {
        match self {
            GeolocationError::PermissionDenied => "Permission denied for location access.",
            GeolocationError::PositionUnavailable => "Location information is unavailable.",
            GeolocationError::Unsupported => "Geolocation is not supported by this browser",
            GeolocationError::Timeout => "Unknown error occurred",
        }
    }
}

#[derive(Error, Debug)]
pub enum ProxiError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Geolocation error: {0}")]
    Geolocation(#[from] GeolocationError),

    #[error("Backend returned {status}: {message}")]
    BackendError { status: u16, message: String },

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

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Push payload encryption failed: {message}")]
    PushEncryption { message: String },

    #[error("VAPID error: {message}")]
    Vapid { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    Location,
    Push,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// 命令列的退出碼；Low 視為成功
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl ProxiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProxiError::ApiError(_) | ProxiError::BackendError { .. } => ErrorCategory::Network,
            ProxiError::ConfigError { .. }
            | ProxiError::ConfigValidationError { .. }
            | ProxiError::InvalidConfigValueError { .. }
            | ProxiError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ProxiError::CsvError(_)
            | ProxiError::SerializationError(_)
            | ProxiError::ValidationError { .. } => ErrorCategory::Data,
            ProxiError::Geolocation(_) => ErrorCategory::Location,
            ProxiError::PushEncryption { .. } | ProxiError::Vapid { .. } => ErrorCategory::Push,
            ProxiError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Location | ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Push => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 給終端使用者看的簡短訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            ProxiError::Geolocation(e) => e.user_message().to_string(),
            ProxiError::ApiError(_) => "Could not reach the backend service.".to_string(),
            ProxiError::BackendError { status, .. } => {
                format!("The backend rejected the request (HTTP {}).", status)
            }
            ProxiError::MissingConfigError { field } => {
                format!("Missing required setting: {}", field)
            }
            ProxiError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid setting '{}': {}", field, reason)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check the backend URL, API key and network connectivity.",
            ErrorCategory::Configuration => "Review the configuration file and environment variables.",
            ErrorCategory::Data => "Inspect the input data for malformed or missing fields.",
            ErrorCategory::Location => "Enable location access or pass --lat/--lng explicitly.",
            ErrorCategory::Push => "Verify the VAPID key pair and the subscription keys.",
            ErrorCategory::System => "Check file permissions and available disk space.",
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geolocation_messages() {
        assert_eq!(
            GeolocationError::Timeout.user_message(),
            "The request to get user location timed out."
        );
        assert_eq!(
            GeolocationError::PermissionDenied.watch_message(),
            "Permission denied for location access."
        );
    }

    #[test]
    fn test_severity_by_category() {
        let err = ProxiError::MissingConfigError {
            field: "backend.url".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::Critical);

        let err = ProxiError::from(GeolocationError::PositionUnavailable);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.user_friendly_message(), "Location information is unavailable.");
    }

    #[test]
    fn test_location_failures_exit_non_zero() {
        let err = ProxiError::from(GeolocationError::Unsupported);
        assert_eq!(err.severity().exit_code(), 2);
        assert_eq!(ErrorSeverity::Critical.exit_code(), 3);
        assert_eq!(ErrorSeverity::Low.exit_code(), 0);
    }
}
