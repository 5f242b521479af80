//! Configuration management for Artbot
//!
//! Two sources are supported: a TOML file (used by `artbot-post`) and the
//! deployment environment (used by `artbot-lambda`, whose infrastructure sets
//! `BUCKET`, `BUCKET_KEY` and `DB_NAME`).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Number of collisions tolerated before a duplicate is accepted
pub const DEFAULT_TOLERANCE: usize = 5;

/// Bluesky's post length limit
pub const DEFAULT_MAX_POST_LENGTH: usize = 300;

pub const DEFAULT_SECRET_ID: &str = "bsky-artbot-credentials";

pub const DEFAULT_BSKY_SERVICE: &str = "https://bsky.social";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub bluesky: BlueskyConfig,
    #[serde(default)]
    pub invocation: InvocationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CatalogConfig {
    S3 { bucket: String, key: String },
    File { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum LedgerConfig {
    Dynamodb { table: String },
    Sqlite { path: String },
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_tolerance")]
    pub tolerance: usize,
    #[serde(default = "default_max_post_length")]
    pub max_post_length: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_post_length: DEFAULT_MAX_POST_LENGTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CredentialsConfig {
    SecretsManager {
        #[serde(default = "default_secret_id")]
        secret_id: String,
    },
    Env,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        CredentialsConfig::SecretsManager {
            secret_id: default_secret_id(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueskyConfig {
    #[serde(default = "default_bsky_service")]
    pub service: String,
}

impl Default for BlueskyConfig {
    fn default() -> Self {
        Self {
            service: default_bsky_service(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationConfig {
    /// Abort the whole invocation after this many seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_tolerance() -> usize {
    DEFAULT_TOLERANCE
}

fn default_max_post_length() -> usize {
    DEFAULT_MAX_POST_LENGTH
}

fn default_secret_id() -> String {
    DEFAULT_SECRET_ID.to_string()
}

fn default_bsky_service() -> String {
    DEFAULT_BSKY_SERVICE.to_string()
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Build the Lambda configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Build the Lambda configuration from an arbitrary variable lookup
    ///
    /// Required: `BUCKET`, `BUCKET_KEY`, `DB_NAME`. Optional:
    /// `ARTBOT_TOLERANCE`, `ARTBOT_MAX_POST_LENGTH`, `ARTBOT_SECRET_ID`,
    /// `ARTBOT_BSKY_SERVICE`, `ARTBOT_TIMEOUT_SECS`.
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| -> Result<String> {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingField(name.to_string()).into())
        };

        let mut selection = SelectionConfig::default();
        if let Some(tolerance) = parse_env_number(&lookup, "ARTBOT_TOLERANCE")? {
            selection.tolerance = tolerance;
        }
        if let Some(max_len) = parse_env_number(&lookup, "ARTBOT_MAX_POST_LENGTH")? {
            selection.max_post_length = max_len;
        }

        let config = Config {
            catalog: CatalogConfig::S3 {
                bucket: required("BUCKET")?,
                key: required("BUCKET_KEY")?,
            },
            ledger: LedgerConfig::Dynamodb {
                table: required("DB_NAME")?,
            },
            selection,
            credentials: CredentialsConfig::SecretsManager {
                secret_id: lookup("ARTBOT_SECRET_ID").unwrap_or_else(default_secret_id),
            },
            bluesky: BlueskyConfig {
                service: lookup("ARTBOT_BSKY_SERVICE").unwrap_or_else(default_bsky_service),
            },
            invocation: InvocationConfig {
                timeout_secs: parse_env_number::<u64, _>(&lookup, "ARTBOT_TIMEOUT_SECS")?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.selection.max_post_length == 0 {
            return Err(ConfigError::InvalidValue {
                name: "selection.max_post_length".to_string(),
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }

        match &self.catalog {
            CatalogConfig::S3 { bucket, key } if bucket.is_empty() || key.is_empty() => {
                return Err(ConfigError::MissingField("catalog.bucket/catalog.key".to_string()).into())
            }
            CatalogConfig::File { path } if path.is_empty() => {
                return Err(ConfigError::MissingField("catalog.path".to_string()).into())
            }
            _ => {}
        }

        match &self.ledger {
            LedgerConfig::Dynamodb { table } if table.is_empty() => {
                Err(ConfigError::MissingField("ledger.table".to_string()).into())
            }
            LedgerConfig::Sqlite { path } if path.is_empty() => {
                Err(ConfigError::MissingField("ledger.path".to_string()).into())
            }
            _ => Ok(()),
        }
    }
}

fn parse_env_number<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            ConfigError::InvalidValue {
                name: name.to_string(),
                reason: e.to_string(),
            }
            .into()
        }),
    }
}

/// Expand `~` in a configured path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("ARTBOT_CONFIG") {
        return Ok(expand_path(&path));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("artbot").join("config.toml"))
}
