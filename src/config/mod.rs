//! Configuration management for `gh_issues_local`.
//!
//! Configuration is layered with `figment`, last wins:
//! - Built-in defaults
//! - YAML file named by `CONFIG_FILE` (or `--config`)
//! - `GH_ISSUES_LOCAL_*` environment variables (`__` separates nested keys,
//!   and `GH_ISSUES_LOCAL_TOKEN` sets `auth.token`)
//! - CLI flags ([`CliOverrides`])

use std::fs;
use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::value::{Dict, Map, Value};
use figment::{Figment, Metadata, Profile, Provider};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const CONFIG_FILE_ENV: &str = "CONFIG_FILE";
/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "GH_ISSUES_LOCAL_";
pub const DATA_DIR_ENV: &str = "GH_ISSUES_LOCAL_DATA_DIR";
pub const PUBLIC_URL_ENV: &str = "GH_ISSUES_LOCAL_PUBLIC_URL";
pub const TOKEN_ENV: &str = "GH_ISSUES_LOCAL_TOKEN";

/// Bind address that keeps the server local-only.
pub const LOCALHOST: &str = "127.0.0.1";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Extract(#[from] Box<figment::Error>),
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allow any CORS origin.
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: LOCALHOST.to_string(),
            port: 8000,
            cors_permissive: false,
        }
    }
}

/// Snapshot file settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSONL file, relative to the data directory. `None` keeps everything in memory.
    pub file: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            file: Some(PathBuf::from("issues.jsonl")),
        }
    }
}

/// Bearer token gate settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Require a token even on localhost.
    pub required: bool,
    /// Fixed token; otherwise one is kept in the data directory.
    pub token: Option<String>,
    /// Set by `--no-auth`.
    #[serde(skip)]
    pub disabled: bool,
}

/// Identity recorded on every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub login: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            login: "local-user".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

/// Complete service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Defaults to the home directory.
    pub data_dir: Option<PathBuf>,
    /// Base URL used in rendered links instead of the request's `Host`.
    pub public_url: Option<String>,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub user: UserConfig,
    pub logging: LoggingConfig,
    /// Config path that was named but did not exist.
    #[serde(skip)]
    pub missing_file: Option<PathBuf>,
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub no_auth: bool,
    pub log_json: bool,
}

impl Provider for CliOverrides {
    fn metadata(&self) -> Metadata {
        Metadata::named("command-line flags")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        let mut dict = Dict::new();
        if let Some(dir) = &self.data_dir {
            dict.insert(
                "data_dir".to_string(),
                Value::from(dir.to_string_lossy().into_owned()),
            );
        }

        let mut server = Dict::new();
        if let Some(host) = &self.host {
            server.insert("host".to_string(), Value::from(host.clone()));
        }
        if let Some(port) = self.port {
            server.insert("port".to_string(), Value::from(port));
        }
        if !server.is_empty() {
            dict.insert("server".to_string(), Value::from(server));
        }

        if self.log_json {
            let mut logging = Dict::new();
            logging.insert("format".to_string(), Value::from("json"));
            dict.insert("logging".to_string(), Value::from(logging));
        }
        Ok(Profile::Default.collect(dict))
    }
}

/// `GH_ISSUES_LOCAL_*` variables, with `TOKEN` mapped into the auth section.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).split("__").map(|key| {
        if key.as_str().eq_ignore_ascii_case("token") {
            "auth.token".into()
        } else {
            key.as_str().into()
        }
    })
}

/// Whether `path` names a file with something other than whitespace in it.
fn has_content(path: &Path) -> Result<bool, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(!text.trim().is_empty())
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

impl Config {
    /// Load configuration from every layer.
    ///
    /// A config path that does not exist falls back to defaults and is
    /// remembered in `missing_file` so it can be reported once logging is up.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read, or if any layer
    /// holds a malformed or mistyped value.
    pub fn load(overrides: &CliOverrides) -> Result<Self, ConfigError> {
        let path = overrides.config.clone().or_else(|| {
            std::env::var_os(CONFIG_FILE_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        });

        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        let mut missing_file = None;
        match path {
            Some(path) if path.is_file() => {
                if has_content(&path)? {
                    debug!(path = %path.display(), "loading config file");
                    figment = figment.merge(Yaml::file(&path));
                }
            }
            Some(path) => {
                warn!(path = %path.display(), "config file not found; using defaults");
                missing_file = Some(path);
            }
            None => {}
        }

        let mut config: Self = figment
            .merge(env_provider())
            .merge(overrides.clone())
            .extract()
            .map_err(Box::new)?;
        config.auth.disabled = overrides.no_auth;
        config.missing_file = missing_file;
        Ok(config)
    }

    /// Parse a YAML config file over the defaults. An empty file yields
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !has_content(path)? {
            return Ok(Self::default());
        }
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Yaml::file(path))
            .extract()
            .map_err(|err| ConfigError::Extract(Box::new(err)))
    }

    /// Directory holding the snapshot and the token file.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(home_dir)
    }

    /// Resolved snapshot path, or `None` for a memory-only store.
    #[must_use]
    pub fn storage_path(&self) -> Option<PathBuf> {
        self.storage.file.as_ref().map(|file| {
            if file.is_absolute() {
                file.clone()
            } else {
                self.data_dir().join(file)
            }
        })
    }

    /// Whether requests to data endpoints must carry a bearer token.
    ///
    /// `auth.required` always enables the gate. Otherwise it is on for any
    /// non-localhost bind unless `--no-auth` was given.
    #[must_use]
    pub fn auth_enabled(&self) -> bool {
        self.auth.required || (self.server.host != LOCALHOST && !self.auth.disabled)
    }
}
