//! Broker configuration.
//!
//! Defaults and environment variable names used to locate the path registry
//! and to override individual install paths.

use std::path::PathBuf;

/// Environment variable names.
pub mod env_vars {
    /// Overrides the runtime directory from the registry.
    pub const RUNTIME_OVERRIDE: &str = "VR_OVERRIDE";
    /// Overrides the config directory from the registry.
    pub const CONFIG_OVERRIDE: &str = "VR_CONFIG_PATH";
    /// Overrides the log directory from the registry.
    pub const LOG_OVERRIDE: &str = "VR_LOG_PATH";
    /// Explicit path registry file.
    pub const PATH_REGISTRY: &str = "VRBROKER_PATH_REGISTRY";
}

/// Registry file name and location constants.
pub mod registry {
    pub const FILE_NAME: &str = "openvrpaths.vrpath";
    pub const JSON_ID: &str = "vrpathreg";
    pub const FORMAT_VERSION: u32 = 1;
}

/// Default location of the path registry for the current platform.
///
/// Returns `None` when the platform directory cannot be determined.
pub fn default_registry_file() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        dirs::data_local_dir().map(|dir| dir.join("openvr").join(registry::FILE_NAME))
    }

    #[cfg(target_os = "macos")]
    {
        dirs::data_dir().map(|dir| {
            dir.join("OpenVR")
                .join(".openvr")
                .join(registry::FILE_NAME)
        })
    }

    #[cfg(not(any(windows, target_os = "macos")))]
    {
        dirs::config_dir().map(|dir| dir.join("openvr").join(registry::FILE_NAME))
    }
}

/// Per-field overrides applied on top of the registry contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathOverrides {
    pub runtime: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub log: Option<PathBuf>,
}

impl PathOverrides {
    /// Read overrides from the environment. Empty values are ignored.
    pub fn from_env() -> Self {
        Self {
            runtime: env_path(env_vars::RUNTIME_OVERRIDE),
            config: env_path(env_vars::CONFIG_OVERRIDE),
            log: env_path(env_vars::LOG_OVERRIDE),
        }
    }

    /// True when every field is overridden and the registry file is not needed.
    pub fn is_complete(&self) -> bool {
        self.runtime.is_some() && self.config.is_some() && self.log.is_some()
    }
}

/// Configuration for a broker backed by the on-disk registry.
#[derive(Debug, Clone, Default)]
pub struct BrokerConfig {
    /// Registry file; the platform default when `None`.
    pub registry_file: Option<PathBuf>,

    /// Install path overrides.
    pub overrides: PathOverrides,
}

impl BrokerConfig {
    /// Build the configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            registry_file: env_path(env_vars::PATH_REGISTRY),
            overrides: PathOverrides::from_env(),
        }
    }

    /// Use an explicit registry file.
    pub fn with_registry_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry_file = Some(path.into());
        self
    }

    /// Replace the path overrides.
    pub fn with_overrides(mut self, overrides: PathOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Registry file that will actually be read.
    pub fn resolved_registry_file(&self) -> Option<PathBuf> {
        self.registry_file.clone().or_else(default_registry_file)
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
