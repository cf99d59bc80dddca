use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::Deserialize;
use std::path::PathBuf;

use super::keys::{decode_private_key, decode_public_key};
use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 8090;
pub const DEFAULT_SCHEME: &str = "https";

pub const ENV_CONFIG: &str = "RSERVE_CONFIG";
pub const ENV_HOST: &str = "RSERVE_HOST";
pub const ENV_SCHEME: &str = "RSERVE_SCHEME";
pub const ENV_PUBLIC_KEY: &str = "RSERVE_PUBLIC_KEY";
pub const ENV_PRIVATE_KEY: &str = "RSERVE_PRIVATE_KEY";
pub const ENV_REMOTE: &str = "RSERVE_REMOTE";
pub const ENV_PORT: &str = "RSERVE_PORT";
pub const ENV_STORAGE_ROOT: &str = "RSERVE_STORAGE_ROOT";
pub const ENV_BIND_REMOTE: &str = "RSERVE_BIND_REMOTE";

/// Raw, unvalidated settings: an optional YAML file overlaid by environment.
#[derive(Debug, Default, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub host: Option<String>,
    pub scheme: Option<String>,
    pub public_key: Option<String>,
    pub private_key: Option<String>,
    pub remote: Option<String>,
    pub port: Option<u16>,
    pub storage_root: Option<PathBuf>,
    pub bind_remote: Option<bool>,
}

impl Settings {
    /// Load settings through `lookup`, which stands in for the process
    /// environment. If `RSERVE_CONFIG` names a file it is read first.
    pub fn load<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut settings = match get(ENV_CONFIG) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        if let Some(v) = get(ENV_HOST) {
            settings.host = Some(v);
        }
        if let Some(v) = get(ENV_SCHEME) {
            settings.scheme = Some(v);
        }
        if let Some(v) = get(ENV_PUBLIC_KEY) {
            settings.public_key = Some(v);
        }
        if let Some(v) = get(ENV_PRIVATE_KEY) {
            settings.private_key = Some(v);
        }
        if let Some(v) = get(ENV_REMOTE) {
            settings.remote = Some(v);
        }
        if let Some(v) = get(ENV_PORT) {
            settings.port = Some(parse_value(ENV_PORT, &v)?);
        }
        if let Some(v) = get(ENV_STORAGE_ROOT) {
            settings.storage_root = Some(PathBuf::from(v));
        }
        if let Some(v) = get(ENV_BIND_REMOTE) {
            settings.bind_remote = Some(parse_value(ENV_BIND_REMOTE, &v)?);
        }

        Ok(settings)
    }

    /// Load settings from the real process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(|key| std::env::var(key).ok())
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;

        let settings = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;

        tracing::debug!(path, "Loaded config file");
        Ok(settings)
    }

    fn require(value: &Option<String>, field: &'static str) -> Result<String, ConfigError> {
        value.clone().ok_or(ConfigError::Missing(field))
    }

    fn scheme(&self) -> Result<String, ConfigError> {
        let scheme = self.scheme.as_deref().unwrap_or(DEFAULT_SCHEME);
        match scheme {
            "http" | "https" => Ok(scheme.to_string()),
            other => Err(ConfigError::InvalidValue {
                field: ENV_SCHEME,
                value: other.to_string(),
            }),
        }
    }
}

fn parse_value<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            field,
            value: value.to_string(),
        })
}

/// Validated configuration for the verifying server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub verifying_key: VerifyingKey,
    pub remote: String,
    pub port: u16,
    pub storage_root: PathBuf,
    /// Include the remote name in the signed message.
    pub bind_remote: bool,
}

impl ServerConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let host = Settings::require(&settings.host, ENV_HOST)?;
        let public_key = Settings::require(&settings.public_key, ENV_PUBLIC_KEY)?;
        let remote = Settings::require(&settings.remote, ENV_REMOTE)?;

        Ok(Self {
            host,
            verifying_key: decode_public_key(ENV_PUBLIC_KEY, &public_key)?,
            remote,
            port: settings.port.unwrap_or(DEFAULT_PORT),
            storage_root: settings
                .storage_root
                .clone()
                .unwrap_or_else(|| PathBuf::from(".")),
            bind_remote: settings.bind_remote.unwrap_or(false),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_settings(&Settings::from_env()?)
    }
}

/// Validated configuration for issuing signed URLs.
#[derive(Debug, Clone)]
pub struct IssuerConfig {
    pub host: String,
    pub scheme: String,
    pub signing_key: SigningKey,
    pub remote: String,
    pub bind_remote: bool,
}

impl IssuerConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let host = Settings::require(&settings.host, ENV_HOST)?;
        let private_key = Settings::require(&settings.private_key, ENV_PRIVATE_KEY)?;
        let remote = Settings::require(&settings.remote, ENV_REMOTE)?;

        Ok(Self {
            host,
            scheme: settings.scheme()?,
            signing_key: decode_private_key(ENV_PRIVATE_KEY, &private_key)?,
            remote,
            bind_remote: settings.bind_remote.unwrap_or(false),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_settings(&Settings::from_env()?)
    }

    /// `scheme://host` with no trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host.trim_end_matches('/'))
    }
}
