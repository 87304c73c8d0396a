use core_types::Market;
use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub dashboard: DashboardConfig,
    pub logging: LoggingConfig,
}

/// Where the remote services live.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base of the same-origin API: auth, users, funds and portfolios.
    pub base_url: String,
    /// Base of the stock/script service: stock prices and custom calculations.
    pub data_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            data_url: "http://localhost:8000/api".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Credentials used when a command needs an authenticated session.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Log in with the configured credentials when the session check fails.
    pub auto_login: bool,
    /// Cookie jar kept between commands, so a login lasts until logout.
    pub session_file: PathBuf,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            auto_login: true,
            session_file: PathBuf::from(".qtfund_session.json"),
        }
    }
}

impl AuthConfig {
    /// Returns the configured credentials, if both halves are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

/// Settings for the stock table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// The `limit` sent with every stock list request.
    pub page_size: u32,
    /// Markets shown when no `--market` filter is given.
    pub markets: Vec<Market>,
    /// Restrict the list to active listings when set.
    pub is_active: Option<bool>,
    /// JSON file holding the column visibility settings.
    pub column_config_path: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            page_size: 200,
            markets: Market::ALL.to_vec(),
            is_active: None,
            column_config_path: PathBuf::from("dashboard_column_config.json"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// The directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<PathBuf>,
}
