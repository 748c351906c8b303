use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid channel ID: {channel_id}")]
    InvalidChannel { channel_id: String },

    #[error("Invalid Discord token: {reason}")]
    InvalidToken { reason: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Report error: {path} - {message}")]
    Report { path: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Custom result type
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn invalid_channel(channel_id: &str) -> Self {
        Self::InvalidChannel {
            channel_id: channel_id.to_string(),
        }
    }

    pub fn invalid_token(reason: &str) -> Self {
        Self::InvalidToken {
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_build_expected_variants() {
        assert!(matches!(
            AppError::invalid_channel("abc"),
            AppError::InvalidChannel { channel_id } if channel_id == "abc"
        ));
        assert!(matches!(
            AppError::invalid_token("empty"),
            AppError::InvalidToken { .. }
        ));
    }

    #[test]
    fn test_error_messages() {
        let err = AppError::validation("channel", "must be numeric");
        assert_eq!(err.to_string(), "Validation error: channel - must be numeric");

        let err = AppError::Report {
            path: "report.txt".to_string(),
            message: "denied".to_string(),
        };
        assert_eq!(err.to_string(), "Report error: report.txt - denied");
    }
}
