use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{ApiConfig, AuthConfig, Config, DashboardConfig, LogLevel, LoggingConfig};

/// Loads the application configuration from `config.toml` and the environment.
///
/// The file is optional: every setting has a default. Environment variables
/// prefixed with `DASHBOARD_` override the file, with `__` separating nested
/// keys (e.g. `DASHBOARD_API__DATA_URL`, `DASHBOARD_AUTH__PASSWORD`).
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(Path::new("config.toml"))
}

/// Same as [`load_config`] but reads the given file instead of `config.toml`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix("DASHBOARD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("dashboard.markets"),
        )
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    validate(&config)?;

    tracing::debug!(
        base_url = %config.api.base_url,
        data_url = %config.api.data_url,
        "Configuration loaded."
    );
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.api.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError("api.base_url must not be empty".to_string()));
    }
    if config.api.data_url.trim().is_empty() {
        return Err(ConfigError::ValidationError("api.data_url must not be empty".to_string()));
    }
    if config.dashboard.page_size == 0 {
        return Err(ConfigError::ValidationError(
            "dashboard.page_size must be greater than zero".to_string(),
        ));
    }
    if config.api.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "api.timeout_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
