use crate::config::env::database_url_from_env;
use crate::core::dashboard::DEFAULT_EMPLOYED_MARKER;
use crate::core::ConfigProvider;
use crate::utils::error::{DashboardError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub database: DatabaseConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Falls back to the `DATABASE_URL` / `DB_*` environment when unset.
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub acquire_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub employed_marker: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DashboardError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DashboardError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATABASE_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DashboardError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_database_url("database.url", &self.database_url())?;
        validation::validate_range("database.max_connections", self.max_connections(), 1, 100)?;
        validation::validate_range(
            "database.acquire_timeout_seconds",
            self.acquire_timeout_seconds(),
            1,
            300,
        )?;
        validation::validate_non_empty_string("metrics.employed_marker", self.employed_marker())?;
        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn database_url(&self) -> String {
        self.database
            .url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(database_url_from_env)
    }

    fn max_connections(&self) -> u32 {
        self.database
            .max_connections
            .unwrap_or(DEFAULT_MAX_CONNECTIONS)
    }

    fn acquire_timeout_seconds(&self) -> u64 {
        self.database
            .acquire_timeout_seconds
            .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECONDS)
    }

    fn employed_marker(&self) -> &str {
        self.metrics
            .employed_marker
            .as_deref()
            .unwrap_or(DEFAULT_EMPLOYED_MARKER)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
