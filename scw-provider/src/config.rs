//! Provider configuration
//!
//! Credentials and defaults come from three layers, highest precedence first:
//! explicit builder calls, `SCW_*` environment variables, and the active
//! profile of the Scaleway CLI configuration file
//! (`~/.config/scw/config.yaml`).

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use scw_core::identifier::IdentifierError;
use scw_core::locality::{LocalityDefaults, Region, Zone};
use scw_core::provider::{ErrorKind, ProviderError};
use scw_core::schema::validate_uuid;
use scw_core::waiter::WaitConfig;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.scaleway.com";
pub const DEFAULT_REGION: &str = "fr-par";

pub const ENV_ACCESS_KEY: &str = "SCW_ACCESS_KEY";
pub const ENV_SECRET_KEY: &str = "SCW_SECRET_KEY";
pub const ENV_DEFAULT_PROJECT_ID: &str = "SCW_DEFAULT_PROJECT_ID";
pub const ENV_DEFAULT_ORGANIZATION_ID: &str = "SCW_DEFAULT_ORGANIZATION_ID";
pub const ENV_DEFAULT_REGION: &str = "SCW_DEFAULT_REGION";
pub const ENV_DEFAULT_ZONE: &str = "SCW_DEFAULT_ZONE";
pub const ENV_API_URL: &str = "SCW_API_URL";
pub const ENV_CONFIG_PATH: &str = "SCW_CONFIG_PATH";
pub const ENV_PROFILE: &str = "SCW_PROFILE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("profile '{0}' is not defined in the config file")]
    UnknownProfile(String),

    #[error(transparent)]
    Locality(#[from] IdentifierError),

    #[error("secret key is not a valid UUID")]
    InvalidSecretKey,
}

impl From<ConfigError> for ProviderError {
    fn from(err: ConfigError) -> Self {
        ProviderError::with_kind(ErrorKind::Configuration, err.to_string()).with_cause(err)
    }
}

/// One profile of the CLI config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Profile {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub default_organization_id: Option<String>,
    pub default_project_id: Option<String>,
    pub default_region: Option<String>,
    pub default_zone: Option<String>,
    pub api_url: Option<String>,
}

impl Profile {
    /// `other`'s keys take precedence over `self`'s
    fn overlay(self, other: Profile) -> Profile {
        Profile {
            access_key: other.access_key.or(self.access_key),
            secret_key: other.secret_key.or(self.secret_key),
            default_organization_id: other
                .default_organization_id
                .or(self.default_organization_id),
            default_project_id: other.default_project_id.or(self.default_project_id),
            default_region: other.default_region.or(self.default_region),
            default_zone: other.default_zone.or(self.default_zone),
            api_url: other.api_url.or(self.api_url),
        }
    }

    fn from_env(env: &dyn Fn(&str) -> Option<String>) -> Profile {
        let var = |name: &str| env(name).filter(|v| !v.is_empty());
        Profile {
            access_key: var(ENV_ACCESS_KEY),
            secret_key: var(ENV_SECRET_KEY),
            default_organization_id: var(ENV_DEFAULT_ORGANIZATION_ID),
            default_project_id: var(ENV_DEFAULT_PROJECT_ID),
            default_region: var(ENV_DEFAULT_REGION),
            default_zone: var(ENV_DEFAULT_ZONE),
            api_url: var(ENV_API_URL),
        }
    }
}

/// Layout of `config.yaml`: top-level keys plus named profiles
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(flatten)]
    pub defaults: Profile,
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl ConfigFile {
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Top-level keys overlaid with `name`, else with `active_profile`
    pub fn profile(&self, name: Option<&str>) -> Result<Profile, ConfigError> {
        let Some(name) = name.or(self.active_profile.as_deref()) else {
            return Ok(self.defaults.clone());
        };
        let profile = self
            .profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))?;
        Ok(self.defaults.clone().overlay(profile.clone()))
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("scw").join("config.yaml"))
}

/// Settings shared by every resource handler
#[derive(Clone)]
pub struct ScwConfig {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub default_project_id: Option<String>,
    pub default_organization_id: Option<String>,
    pub default_region: Region,
    pub default_zone: Zone,
    pub api_url: String,
    /// Replaces every per-resource wait retry interval when set
    pub wait_retry_interval: Option<Duration>,
}

impl fmt::Debug for ScwConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScwConfig")
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("default_project_id", &self.default_project_id)
            .field("default_organization_id", &self.default_organization_id)
            .field("default_region", &self.default_region)
            .field("default_zone", &self.default_zone)
            .field("api_url", &self.api_url)
            .field("wait_retry_interval", &self.wait_retry_interval)
            .finish()
    }
}

impl Default for ScwConfig {
    fn default() -> Self {
        let defaults = LocalityDefaults::default();
        Self {
            access_key: None,
            secret_key: None,
            default_project_id: None,
            default_organization_id: None,
            default_region: defaults.region,
            default_zone: defaults.zone,
            api_url: DEFAULT_API_URL.to_string(),
            wait_retry_interval: None,
        }
    }
}

impl ScwConfig {
    /// Load from the process environment and the CLI config file
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(&|name| std::env::var(name).ok())
    }

    /// Load with `env` standing in for the process environment
    pub fn load_with(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let explicit_path = env(ENV_CONFIG_PATH).filter(|p| !p.is_empty());
        let path = explicit_path
            .as_ref()
            .map(PathBuf::from)
            .or_else(default_config_path);

        let file_profile = match path {
            Some(path) => match std::fs::read_to_string(&path) {
                Ok(content) => {
                    log::debug!("Loading Scaleway config from {}", path.display());
                    let profile_name = env(ENV_PROFILE).filter(|p| !p.is_empty());
                    ConfigFile::parse(&content, &path)?.profile(profile_name.as_deref())?
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound && explicit_path.is_none() => {
                    Profile::default()
                }
                Err(source) => return Err(ConfigError::Io { path, source }),
            },
            None => Profile::default(),
        };

        Self::from_profile(file_profile.overlay(Profile::from_env(env)))
    }

    /// Build and validate a configuration from merged profile values.
    ///
    /// Without an explicit zone, the first zone of the default region is used.
    pub fn from_profile(profile: Profile) -> Result<Self, ConfigError> {
        let region = match &profile.default_region {
            Some(region) => Region::parse(region)?,
            None => Region::parse(DEFAULT_REGION)?,
        };
        let zone = match &profile.default_zone {
            Some(zone) => Zone::parse(zone)?,
            None => region.first_zone(),
        };

        let config = Self {
            access_key: profile.access_key,
            secret_key: profile.secret_key,
            default_project_id: profile.default_project_id,
            default_organization_id: profile.default_organization_id,
            default_region: region,
            default_zone: zone,
            api_url: profile
                .api_url
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            wait_retry_interval: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(secret) = &self.secret_key
            && validate_uuid(secret).is_err()
        {
            return Err(ConfigError::InvalidSecretKey);
        }
        Ok(())
    }

    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    pub fn with_default_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.default_project_id = Some(project_id.into());
        self
    }

    pub fn with_default_organization_id(mut self, organization_id: impl Into<String>) -> Self {
        self.default_organization_id = Some(organization_id.into());
        self
    }

    pub fn with_default_region(mut self, region: Region) -> Self {
        self.default_region = region;
        self
    }

    pub fn with_default_zone(mut self, zone: Zone) -> Self {
        self.default_zone = zone;
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_wait_retry_interval(mut self, interval: Duration) -> Self {
        self.wait_retry_interval = Some(interval);
        self
    }

    pub fn locality_defaults(&self) -> LocalityDefaults {
        LocalityDefaults::new(self.default_zone.clone(), self.default_region.clone())
    }

    pub fn wait_config(&self) -> WaitConfig {
        WaitConfig {
            retry_interval_override: self.wait_retry_interval,
        }
    }
}
