use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Prefix of environment variables, e.g. `TABLE_BROWSER_BACKEND__KIND=mysql`
const ENV_PREFIX: &str = "TABLE_BROWSER";

/// Optional configuration file in the working directory (`browser-server.toml`)
const CONFIG_FILE: &str = "browser-server";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (default: 127.0.0.1:3000)
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Path the browser API is mounted under (default: root)
    #[serde(default)]
    pub base_path: String,

    #[serde(default)]
    pub backend: BackendConfig,

    /// Log filter used when RUST_LOG is unset (default: info)
    #[serde(default = "default_log")]
    pub log: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Mysql,
    Proxy,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,

    #[serde(default)]
    pub sqlite: SqliteConfig,

    #[serde(default)]
    pub mysql: MySqlConfig,

    #[serde(default)]
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SqliteConfig {
    /// Directory holding `<name>.db` files
    #[serde(default = "default_sqlite_directory")]
    pub directory: PathBuf,

    /// Create and fill `demo.db` on startup if it does not exist
    #[serde(default = "default_true")]
    pub seed_demo: bool,

    /// Database used by rows requests that name none
    #[serde(default)]
    pub default_database: Option<String>,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            directory: default_sqlite_directory(),
            seed_demo: true,
            default_database: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MySqlConfig {
    #[serde(default = "default_mysql_host")]
    pub host: String,

    #[serde(default = "default_mysql_port")]
    pub port: u16,

    #[serde(default = "default_mysql_user")]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Database used when a request names none
    #[serde(default)]
    pub database: Option<String>,
}

impl Default for MySqlConfig {
    fn default() -> Self {
        Self {
            host: default_mysql_host(),
            port: default_mysql_port(),
            user: default_mysql_user(),
            password: String::new(),
            database: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// URL of the query proxy
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub project_id: String,

    /// Dataset used when a request names none
    #[serde(default)]
    pub dataset_id: Option<String>,

    /// Bearer token sent with every call
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_proxy_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            project_id: String::new(),
            dataset_id: None,
            token: None,
            timeout_seconds: default_proxy_timeout(),
        }
    }
}

impl ProxyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_bind_address() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_log() -> String {
    "info".to_string()
}

fn default_sqlite_directory() -> PathBuf {
    PathBuf::from("./data")
}

fn default_true() -> bool {
    true
}

fn default_mysql_host() -> String {
    "localhost".to_string()
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_mysql_user() -> String {
    "root".to_string()
}

fn default_proxy_timeout() -> u64 {
    30
}

impl ServerConfig {
    /// Load configuration from `browser-server.toml` (optional) overlaid
    /// with `TABLE_BROWSER_*` environment variables
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(environment())
            .build()
            .context("Failed to read configuration")?;

        let config: ServerConfig = config
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.backend.kind == BackendKind::Proxy {
            let proxy = &self.backend.proxy;
            if proxy.endpoint.as_deref().map_or(true, |endpoint| endpoint.trim().is_empty()) {
                bail!("backend.proxy.endpoint is required for the proxy backend");
            }
            if proxy.project_id.is_empty() {
                bail!("backend.proxy.project_id is required for the proxy backend");
            }
            if proxy.token.as_deref().map_or(true, str::is_empty) {
                bail!("backend.proxy.token is required for the proxy backend");
            }
            if proxy.timeout_seconds == 0 {
                bail!("backend.proxy.timeout_seconds must be positive");
            }
        }
        Ok(())
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
