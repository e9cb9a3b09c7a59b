use crate::core::geolocation::CACHE_DURATION_MS;
use crate::core::radius::{RadiusScale, DEFAULT_RADIUS_KM};
use crate::utils::error::{ProxiError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_url, validate_vapid_subject, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "proxilink.toml";
pub const DEFAULT_VAPID_SUBJECT: &str = "mailto:support@proxilink.com";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: Option<BackendConfig>,
    pub location: LocationConfig,
    pub search: SearchConfig,
    pub push: Option<PushConfig>,
    pub demo: DemoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub cache_dir: String,
    pub cache_ttl_seconds: u64,
    pub watch_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub scale: RadiusScale,
    pub default_radius_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    pub vapid_public_key: String,
    pub vapid_private_key: String,
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub enabled: bool,
    pub vendor_count: usize,
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_subject() -> String {
    DEFAULT_VAPID_SUBJECT.to_string()
}

fn default_ttl_seconds() -> u64 {
    86_400
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            cache_dir: "./.proxilink".to_string(),
            cache_ttl_seconds: (CACHE_DURATION_MS / 1000) as u64,
            watch_interval_ms: 1_000,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            scale: RadiusScale::default(),
            default_radius_km: DEFAULT_RADIUS_KM,
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            vendor_count: crate::core::demo::DEFAULT_DEMO_VENDOR_COUNT,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl LocationConfig {
    pub fn cache_duration_ms(&self) -> i64 {
        (self.cache_ttl_seconds as i64).saturating_mul(1000)
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ProxiError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 指定路徑優先；否則讀取目前目錄的 proxilink.toml，沒有就使用預設值
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => {
                tracing::debug!("No configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ProxiError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SUPABASE_URL})，找不到的保留原字串
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ProxiError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        if let Some(backend) = &self.backend {
            validate_url("backend.url", &backend.url)?;
            validate_non_empty_string("backend.api_key", &backend.api_key)?;
            reject_unresolved("backend.api_key", &backend.api_key)?;
            validate_positive_number("backend.timeout_seconds", backend.timeout_seconds as usize, 1)?;
        }

        validate_path("location.cache_dir", &self.location.cache_dir)?;
        validate_positive_number(
            "location.cache_ttl_seconds",
            self.location.cache_ttl_seconds as usize,
            1,
        )?;
        validate_positive_number(
            "location.watch_interval_ms",
            self.location.watch_interval_ms as usize,
            1,
        )?;

        validate_range(
            "search.default_radius_km",
            self.search.default_radius_km,
            0.01,
            5.0,
        )?;

        if let Some(push) = &self.push {
            validate_non_empty_string("push.vapid_public_key", &push.vapid_public_key)?;
            validate_non_empty_string("push.vapid_private_key", &push.vapid_private_key)?;
            reject_unresolved("push.vapid_public_key", &push.vapid_public_key)?;
            reject_unresolved("push.vapid_private_key", &push.vapid_private_key)?;
            validate_vapid_subject("push.subject", &push.subject)?;
        }

        if self.demo.enabled {
            validate_positive_number("demo.vendor_count", self.demo.vendor_count, 1)?;
        }

        Ok(())
    }
}

/// 未被替換的 ${VAR} 代表環境變數沒有設定
fn reject_unresolved(field_name: &str, value: &str) -> Result<()> {
    if value.contains("${") {
        return Err(ProxiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "environment variable is not set".to_string(),
        });
    }
    Ok(())
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
