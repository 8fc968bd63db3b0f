use crate::core::extract::{
    AgePolicy, DEFAULT_PROFILE_URL_TEMPLATE, DEFAULT_URL_MARKER, USERNAME_PLACEHOLDER,
};
use crate::core::raw_output::DEFAULT_REMOTE_PREFIX;
use crate::utils::error::{IntakeError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

pub const API_KEY_ENV: &str = "PHANTOMBUSTER_API_KEY";
pub const AGENT_ID_ENV: &str = "PHANTOMBUSTER_FOLLOWER_COLLECTOR_ID";
pub const DEFAULT_API_BASE: &str = "https://api.phantombuster.com/api/v2";
pub const DEFAULT_ID_PREFIX: &str = "ig_pb";
pub const DEFAULT_MAX_ROWS: usize = 7000;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern"));

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub normalizer: NormalizerConfig,
    pub fetch: FetchConfig,
    pub store: StoreConfig,
}

/// 爬蟲代理（Phantombuster agent）連線設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub agent_id: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            agent_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub id_prefix: String,
    /// Object-store prefix that result-file URLs must start with.
    pub remote_prefix: String,
    pub url_marker: String,
    pub profile_url_template: String,
    pub age_policy: AgePolicy,
    /// Pins the year used by the birth-year heuristic; defaults to now.
    pub current_year: Option<i32>,
    pub max_rows: Option<usize>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
            remote_prefix: DEFAULT_REMOTE_PREFIX.to_string(),
            url_marker: DEFAULT_URL_MARKER.to_string(),
            profile_url_template: DEFAULT_PROFILE_URL_TEMPLATE.to_string(),
            age_policy: AgePolicy::default(),
            current_year: None,
            max_rows: Some(DEFAULT_MAX_ROWS),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 15,
            retry_attempts: 1,
            retry_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "./data/instagram_profiles.csv".to_string(),
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(IntakeError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| IntakeError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PHANTOMBUSTER_API_KEY})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    /// 檔案未提供的金鑰由環境變數補上
    pub fn with_env_overrides(mut self) -> Self {
        if self.agent.api_key.is_none() {
            self.agent.api_key = non_empty_env(API_KEY_ENV);
        }
        if self.agent.agent_id.is_none() {
            self.agent.agent_id = non_empty_env(AGENT_ID_ENV);
        }
        self
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("agent.api_base", &self.agent.api_base)?;
        validation::validate_url("normalizer.remote_prefix", &self.normalizer.remote_prefix)?;
        validation::validate_non_empty_string("normalizer.id_prefix", &self.normalizer.id_prefix)?;
        validation::validate_non_empty_string("normalizer.url_marker", &self.normalizer.url_marker)?;
        validation::validate_template(
            "normalizer.profile_url_template",
            &self.normalizer.profile_url_template,
            USERNAME_PLACEHOLDER,
        )?;
        if let Some(max_rows) = self.normalizer.max_rows {
            validation::validate_positive_number("normalizer.max_rows", max_rows, 1)?;
        }
        validation::validate_range("fetch.timeout_seconds", self.fetch.timeout_seconds, 1, 300)?;
        validation::validate_range("fetch.retry_attempts", self.fetch.retry_attempts, 0, 5)?;
        validation::validate_path("store.path", &self.store.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.agent.api_base, DEFAULT_API_BASE);
        assert_eq!(config.normalizer.id_prefix, "ig_pb");
        assert_eq!(config.normalizer.max_rows, Some(7000));
        assert_eq!(config.normalizer.age_policy, AgePolicy::TokenThenYear);
        assert_eq!(config.fetch.retry_attempts, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::from_toml_str(
            r#"
[agent]
agent_id = "1234"

[normalizer]
age_policy = "year_then_token"
current_year = 2026

[fetch]
timeout_seconds = 5
"#,
        )
        .unwrap();

        assert_eq!(config.agent.agent_id.as_deref(), Some("1234"));
        assert_eq!(config.agent.api_base, DEFAULT_API_BASE);
        assert_eq!(config.normalizer.age_policy, AgePolicy::YearThenToken);
        assert_eq!(config.normalizer.current_year, Some(2026));
        assert_eq!(config.fetch.timeout_seconds, 5);
        assert_eq!(config.fetch.retry_delay_ms, 500);
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("PROFILE_INTAKE_TEST_KEY", "secret-value");
        let config = AppConfig::from_toml_str(
            r#"
[agent]
api_key = "${PROFILE_INTAKE_TEST_KEY}"
agent_id = "${PROFILE_INTAKE_TEST_UNSET_VAR}"
"#,
        )
        .unwrap();

        assert_eq!(config.agent.api_key.as_deref(), Some("secret-value"));
        assert_eq!(
            config.agent.agent_id.as_deref(),
            Some("${PROFILE_INTAKE_TEST_UNSET_VAR}")
        );
    }

    #[test]
    fn test_invalid_toml() {
        let err = AppConfig::from_toml_str("[agent\napi_base = 1").unwrap_err();
        assert!(matches!(err, IntakeError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.normalizer.profile_url_template = "https://www.instagram.com/".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.fetch.timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.agent.api_base = "not a url".to_string();
        assert!(config.validate().is_err());
    }
}
