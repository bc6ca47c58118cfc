use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use anyhow::{bail, Context, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_sso_url")]
    pub sso_url: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            sso_url: default_sso_url(),
            api_url: default_api_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries after the first attempt; 0 disables retrying.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_defaults_path")]
    pub path: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self { path: default_defaults_path() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for timestamped log files. Logs go to stderr when unset.
    #[serde(default)]
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

fn default_sso_url() -> String { "https://sso.dynatrace.com/sso/oauth2/token".to_string() }
fn default_api_url() -> String { "https://api.dynatrace.com".to_string() }
fn default_timeout_secs() -> u64 { 30 }
fn default_max_retries() -> u32 { 3 }
fn default_backoff_ms() -> u64 { 500 }
fn default_defaults_path() -> String { "default_permissions.json".to_string() }
fn default_bind() -> String { "127.0.0.1:5000".to_string() }
fn default_log_level() -> String { "info".to_string() }

pub const ENV_CONFIG: &str = "DTPERM_CONFIG";
pub const ENV_ACCOUNT: &str = "DT_ACCOUNT_NUM";
pub const ENV_CLIENT_ID: &str = "DT_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "DT_CLIENT_SECRET";

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn default_path() -> String {
        std::env::var(ENV_CONFIG)
            .unwrap_or_else(|_| "./config/default.toml".to_string())
    }

    /// Loads `.env`, then the config file if present, then applies
    /// environment overrides and validates the result.
    pub fn resolve(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = if Path::new(path).exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_ACCOUNT) {
            self.account.uuid = v;
        }
        if let Some(v) = lookup(ENV_CLIENT_ID) {
            self.account.client_id = v;
        }
        if let Some(v) = lookup(ENV_CLIENT_SECRET) {
            self.account.client_secret = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.account.uuid.trim().is_empty() {
            bail!("account id missing: set [account].uuid or {}", ENV_ACCOUNT);
        }
        if self.account.client_id.trim().is_empty() || self.account.client_secret.trim().is_empty() {
            bail!("client credentials missing: set {} and {}", ENV_CLIENT_ID, ENV_CLIENT_SECRET);
        }
        Ok(())
    }
}
