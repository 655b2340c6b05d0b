//! Path registry access and install path validation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{self, BrokerConfig, PathOverrides};
use crate::error::{InitError, Result};
use crate::platform::ModuleLayout;

/// Paths declared by the registry, not yet validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryPaths {
    pub runtime: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub log: Option<PathBuf>,
}

/// Validated install paths of the backend runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    /// Runtime installation directory. Always an existing directory.
    pub runtime: PathBuf,
    pub config: Option<PathBuf>,
    pub log: Option<PathBuf>,
}

/// Source of the registered install paths.
pub trait PathRegistry: Send + Sync {
    /// Read the registry. `None` means the registry is unavailable.
    fn read_paths(&self) -> Option<RegistryPaths>;
}

/// Runtime directory if the registry names one that exists on disk.
///
/// Does not check the `bin` layout.
pub fn installed_runtime_dir(registry: &dyn PathRegistry) -> Option<PathBuf> {
    let runtime = registry.read_paths()?.runtime?;
    if runtime.is_dir() {
        Some(runtime)
    } else {
        None
    }
}

/// Read and validate the install paths for the given layout.
pub fn resolve_install_paths(
    registry: &dyn PathRegistry,
    layout: &ModuleLayout,
) -> Result<InstallPaths> {
    let paths = registry.read_paths().ok_or(InitError::PathRegistryNotFound)?;
    let runtime = paths.runtime.ok_or(InitError::PathRegistryNotFound)?;

    if !runtime.is_dir() {
        tracing::debug!(runtime = %runtime.display(), "Runtime directory does not exist");
        return Err(InitError::InstallationNotFound);
    }

    let bin_dir = layout.bin_dir(&runtime);
    if !bin_dir.is_dir() {
        tracing::debug!(bin = %bin_dir.display(), "Runtime bin directory missing");
        return Err(InitError::InstallationCorrupt);
    }

    Ok(InstallPaths {
        runtime,
        config: paths.config,
        log: paths.log,
    })
}

/// On-disk registry document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VrPathDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,

    #[serde(default)]
    pub runtime: Vec<String>,

    #[serde(default)]
    pub config: Vec<String>,

    #[serde(default)]
    pub log: Vec<String>,

    #[serde(default)]
    pub external_drivers: Option<Vec<String>>,
}

impl VrPathDocument {
    /// First entry of a list. An empty string counts as no entry.
    fn first(entries: &[String]) -> Option<PathBuf> {
        entries
            .first()
            .filter(|entry| !entry.is_empty())
            .map(PathBuf::from)
    }
}

/// Registry stored as a JSON file, with environment overrides per field.
#[derive(Debug, Clone)]
pub struct FilePathRegistry {
    file: Option<PathBuf>,
    overrides: PathOverrides,
}

impl FilePathRegistry {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(file.into()),
            overrides: PathOverrides::default(),
        }
    }

    pub fn from_config(config: &BrokerConfig) -> Self {
        Self {
            file: config.resolved_registry_file(),
            overrides: config.overrides.clone(),
        }
    }

    pub fn with_overrides(mut self, overrides: PathOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Registry file location, if one could be determined.
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Parse the registry file.
    pub fn load_document(&self) -> std::io::Result<VrPathDocument> {
        let file = self.file.as_deref().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no path registry location for this platform",
            )
        })?;
        let contents = fs::read_to_string(file)?;
        serde_json::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Register `runtime` as the active runtime directory.
    ///
    /// Other entries of an existing registry are preserved.
    pub fn set_runtime(&self, runtime: &Path) -> std::io::Result<()> {
        let file = self.file.as_deref().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no path registry location for this platform",
            )
        })?;

        let mut document = self.load_document().unwrap_or_default();
        document.jsonid = Some(config::registry::JSON_ID.to_string());
        document.version = Some(config::registry::FORMAT_VERSION);

        let runtime = runtime.to_string_lossy().into_owned();
        document.runtime.retain(|entry| *entry != runtime);
        document.runtime.insert(0, runtime);

        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&document)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(file, contents)?;

        tracing::info!(registry = %file.display(), "Registered runtime directory");
        Ok(())
    }
}

impl Default for FilePathRegistry {
    fn default() -> Self {
        Self::from_config(&BrokerConfig::from_env())
    }
}

impl PathRegistry for FilePathRegistry {
    fn read_paths(&self) -> Option<RegistryPaths> {
        if self.overrides.is_complete() {
            return Some(RegistryPaths {
                runtime: self.overrides.runtime.clone(),
                config: self.overrides.config.clone(),
                log: self.overrides.log.clone(),
            });
        }

        let document = match self.load_document() {
            Ok(document) => document,
            Err(e) => {
                tracing::debug!(
                    registry = ?self.file,
                    error = %e,
                    "Path registry unavailable"
                );
                return None;
            }
        };

        let runtime = self
            .overrides
            .runtime
            .clone()
            .or_else(|| VrPathDocument::first(&document.runtime));

        // A registry without a runtime entry is as good as no registry.
        if runtime.is_none() {
            return None;
        }

        Some(RegistryPaths {
            runtime,
            config: self
                .overrides
                .config
                .clone()
                .or_else(|| VrPathDocument::first(&document.config)),
            log: self
                .overrides
                .log
                .clone()
                .or_else(|| VrPathDocument::first(&document.log)),
        })
    }
}

/// Registry returning fixed paths.
#[derive(Debug, Clone, Default)]
pub struct StaticPathRegistry {
    paths: Option<RegistryPaths>,
}

impl StaticPathRegistry {
    /// Registry that names only a runtime directory.
    pub fn runtime(runtime: impl Into<PathBuf>) -> Self {
        Self {
            paths: Some(RegistryPaths {
                runtime: Some(runtime.into()),
                ..RegistryPaths::default()
            }),
        }
    }

    pub fn with_paths(paths: RegistryPaths) -> Self {
        Self { paths: Some(paths) }
    }

    /// Registry that can never be read.
    pub fn unavailable() -> Self {
        Self { paths: None }
    }
}

impl PathRegistry for StaticPathRegistry {
    fn read_paths(&self) -> Option<RegistryPaths> {
        self.paths.clone()
    }
}
