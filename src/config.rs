//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PULSE_HUB_CONFIG_PATH";
/// Cookie carrying the external session by default.
const DEFAULT_SESSION_COOKIE: &str = "JSESSIONID";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    bypass_authentication: bool,
    allowed_origins: Vec<String>,
    allow_credentials: bool,
    session_cookie: String,
}

impl AppConfig {
    pub fn new(
        bypass_authentication: bool,
        allowed_origins: Vec<String>,
        allow_credentials: bool,
        session_cookie: impl Into<String>,
    ) -> Self {
        Self {
            bypass_authentication,
            allowed_origins,
            allow_credentials,
            session_cookie: session_cookie.into(),
        }
    }

    /// Load the application configuration from disk, falling back to the
    /// built-in defaults when the file is absent or unreadable.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        if config.bypass_authentication {
            warn!("authentication bypass is ENABLED - should only be used in development");
        }

        config
    }

    pub fn bypass_authentication(&self) -> bool {
        self.bypass_authentication
    }

    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    pub fn allow_credentials(&self) -> bool {
        self.allow_credentials
    }

    pub fn session_cookie(&self) -> &str {
        &self.session_cookie
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bypass_authentication: false,
            allowed_origins: Vec::new(),
            allow_credentials: false,
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    bypass_authentication: bool,
    #[serde(default)]
    allowed_origins: Vec<String>,
    #[serde(default)]
    allow_credentials: bool,
    #[serde(default = "default_session_cookie")]
    session_cookie: String,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        Self {
            bypass_authentication: raw.bypass_authentication,
            allowed_origins: raw.allowed_origins,
            allow_credentials: raw.allow_credentials,
            session_cookie: raw.session_cookie,
        }
    }
}

fn default_session_cookie() -> String {
    DEFAULT_SESSION_COOKIE.to_string()
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
