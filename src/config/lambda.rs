use crate::config::toml_config::DEFAULT_VAPID_SUBJECT;
use crate::utils::error::{ProxiError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_url, validate_vapid_subject,
    Validate,
};
use std::env;
use std::time::Duration;

/// Push 發送函式的設定，全部從環境變數讀取
#[derive(Debug, Clone)]
pub struct LambdaConfig {
    pub backend_url: String,
    pub service_key: String,
    pub vapid_public_key: String,
    pub vapid_private_key: String,
    pub vapid_subject: String,
    pub ttl_seconds: u64,
    pub timeout_seconds: u64,
}

impl LambdaConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 以任意查詢函式讀取設定（測試時可不碰行程環境）
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ProxiError::MissingConfigError {
                    field: name.to_string(),
                })
        };
        let number = |name: &str, default: u64| -> Result<u64> {
            match lookup(name) {
                Some(raw) => raw.trim().parse().map_err(|_| ProxiError::InvalidConfigValueError {
                    field: name.to_string(),
                    value: raw.clone(),
                    reason: "expected a whole number".to_string(),
                }),
                None => Ok(default),
            }
        };

        Ok(Self {
            backend_url: required("BACKEND_URL")?,
            service_key: required("BACKEND_SERVICE_KEY")?,
            vapid_public_key: required("VAPID_PUBLIC_KEY")?,
            vapid_private_key: required("VAPID_PRIVATE_KEY")?,
            vapid_subject: lookup("VAPID_SUBJECT")
                .unwrap_or_else(|| DEFAULT_VAPID_SUBJECT.to_string()),
            ttl_seconds: number("PUSH_TTL_SECONDS", 86_400)?,
            timeout_seconds: number("HTTP_TIMEOUT_SECONDS", 10)?,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Validate for LambdaConfig {
    fn validate(&self) -> Result<()> {
        validate_url("BACKEND_URL", &self.backend_url)?;
        validate_non_empty_string("BACKEND_SERVICE_KEY", &self.service_key)?;
        validate_vapid_subject("VAPID_SUBJECT", &self.vapid_subject)?;
        validate_positive_number("HTTP_TIMEOUT_SECONDS", self.timeout_seconds as usize, 1)?;

        tracing::debug!("✅ Lambda configuration validation passed");
        Ok(())
    }
}
