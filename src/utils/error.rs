use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned status {status} for {url}")]
    ApiStatusError { url: String, status: u16 },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration for {field}: {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Source unavailable: {message}")]
    SourceUnavailable { message: String },

    #[error("No result URL found: {message}")]
    NoResultUrl { message: String },

    #[error("Result file at {url} is empty or invalid")]
    InvalidResultFile { url: String },
}

impl IntakeError {
    /// 上游來源未配置（例如缺少 API key），呼叫端應改用靜態資料
    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, IntakeError::SourceUnavailable { .. })
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            IntakeError::ApiError(_) | IntakeError::ApiStatusError { .. } => {
                "Could not reach the scraping service".to_string()
            }
            IntakeError::SourceUnavailable { .. } => {
                "The scraping agent is not configured".to_string()
            }
            IntakeError::NoResultUrl { .. } | IntakeError::InvalidResultFile { .. } => {
                "No results yet. The agent may need to run first.".to_string()
            }
            IntakeError::ConfigError { .. }
            | IntakeError::InvalidConfigValueError { .. }
            | IntakeError::ConfigValidationError { .. } => {
                format!("Configuration problem: {}", self)
            }
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IntakeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_unavailable_is_distinguishable() {
        let err = IntakeError::SourceUnavailable {
            message: "no api key".to_string(),
        };
        assert!(err.is_source_unavailable());

        let other = IntakeError::NoResultUrl {
            message: "agent never ran".to_string(),
        };
        assert!(!other.is_source_unavailable());
    }

    #[test]
    fn test_user_friendly_message_hides_details() {
        let err = IntakeError::ApiStatusError {
            url: "https://api.example.com/agents/fetch".to_string(),
            status: 503,
        };
        assert_eq!(err.user_friendly_message(), "Could not reach the scraping service");
    }
}
