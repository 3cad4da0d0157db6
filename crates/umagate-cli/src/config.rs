use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use umagate_auth::AuthConfig;

const DEFAULT_CONFIG_FILE: &str = "umagate.toml";
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            bail!(
                "logging.level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.logging.level
            );
        }
        self.auth.validate().context("invalid auth configuration")?;
        Ok(())
    }

    /// Copy that is safe to print.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.auth.provider.client_secret.is_empty() {
            copy.auth.provider.client_secret = "[REDACTED]".to_string();
        }
        copy
    }
}

/// Loads the config file, overlaid by `UMAGATE__SECTION__KEY` variables.
///
/// An explicit path must exist; the default `umagate.toml` is optional.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut builder = Config::builder();
    match path {
        Some(p) => {
            if !p.exists() {
                bail!("config file not found: {}", p.display());
            }
            builder = builder.add_source(File::from(p.to_path_buf()));
        }
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                builder = builder.add_source(File::from(default_path));
            }
        }
    }
    // e.g. UMAGATE__AUTH__PROVIDER__CLIENT_ID=@!1234
    builder = builder.add_source(
        Environment::with_prefix("UMAGATE")
            .try_parsing(true)
            .separator("__"),
    );

    let merged: AppConfig = builder
        .build()
        .context("config build error")?
        .try_deserialize()
        .context("config deserialize error")?;
    merged.validate()?;
    Ok(merged)
}
