//! Backend module loading.
//!
//! Finds the backend library inside a validated installation, loads it and
//! resolves its factory, then binds the client core.

use std::path::Path;

use crate::error::{InitError, Result};
use crate::factory::{resolve_client_core, ClientCore, InterfaceFactory};
use crate::paths::{resolve_install_paths, InstallPaths, PathRegistry};
use crate::platform::ModuleLayout;

/// Exported name of the factory entry point.
pub const FACTORY_SYMBOL: &str = "VRClientCoreFactory";

/// Loads backend libraries.
pub trait ModuleLoader: Send + Sync {
    /// Load the library at `path`.
    ///
    /// Fails with `VRClientDLLNotFound` when the library cannot be loaded.
    fn load(&self, path: &Path) -> Result<Box<dyn BackendModule>>;
}

/// A loaded backend library. Dropping it unloads the library.
pub trait BackendModule: Send + Sync {
    /// Path the module was loaded from.
    fn path(&self) -> &Path;

    /// Resolve the factory entry point, if exported.
    ///
    /// The returned factory must not outlive the module.
    fn factory(&self) -> Option<Box<dyn InterfaceFactory>>;
}

/// Load the backend module of a validated installation and resolve its factory.
pub fn load_backend_module(
    loader: &dyn ModuleLoader,
    layout: &ModuleLayout,
    paths: &InstallPaths,
) -> Result<(Box<dyn BackendModule>, Box<dyn InterfaceFactory>)> {
    let module_path = layout.module_path(&paths.runtime);
    tracing::debug!(path = %module_path.display(), "Loading backend module");

    let module = loader.load(&module_path)?;

    match module.factory() {
        Some(factory) => Ok((module, factory)),
        None => {
            tracing::warn!(
                path = %module.path().display(),
                symbol = FACTORY_SYMBOL,
                "Backend module does not export the factory"
            );
            drop(module);
            Err(InitError::FactoryNotFound)
        }
    }
}

/// A backend module together with its client core.
///
/// Field order matters: the client core is dropped before the module that
/// implements it.
pub struct LoadedBackend {
    core: Box<dyn ClientCore>,
    module: Box<dyn BackendModule>,
}

impl LoadedBackend {
    pub fn core(&self) -> &dyn ClientCore {
        self.core.as_ref()
    }

    pub fn module_path(&self) -> &Path {
        self.module.path()
    }
}

/// Run path resolution, module loading and client-core resolution.
///
/// Partially acquired resources are released on failure.
pub fn load_backend(
    registry: &dyn PathRegistry,
    loader: &dyn ModuleLoader,
    layout: &ModuleLayout,
) -> Result<LoadedBackend> {
    let paths = resolve_install_paths(registry, layout)?;
    let (module, factory) = load_backend_module(loader, layout, &paths)?;

    let core = resolve_client_core(factory.as_ref());
    drop(factory);

    match core {
        Ok(core) => {
            tracing::debug!(path = %module.path().display(), "Backend client core resolved");
            Ok(LoadedBackend { core, module })
        }
        Err(e) => {
            drop(module);
            Err(e)
        }
    }
}
