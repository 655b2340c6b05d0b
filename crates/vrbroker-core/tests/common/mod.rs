//! In-memory backend used by the broker tests.
//!
//! `FakeLoader` stands in for the dynamic linker. Every module it "loads"
//! shares a `FakeStats` so tests can observe loads, unloads and client-core
//! calls.

#![allow(dead_code)]

use std::collections::HashMap;
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use tempfile::TempDir;
use vrbroker_core::factory::{ClientCore, FactoryOutput, InterfaceFactory};
use vrbroker_core::hooks::HookInstaller;
use vrbroker_core::module::{BackendModule, ModuleLoader};
use vrbroker_core::paths::StaticPathRegistry;
use vrbroker_core::platform::ModuleLayout;
use vrbroker_core::{ApplicationType, Broker, InitError, InterfaceHandle, Result};

pub fn handle(addr: usize) -> InterfaceHandle {
    InterfaceHandle::from_raw(addr as *mut c_void).unwrap()
}

/// Counters shared by a loader and everything it produces.
#[derive(Debug, Default)]
pub struct FakeStats {
    pub loads: AtomicUsize,
    pub unloads: AtomicUsize,
    pub core_inits: AtomicUsize,
    pub cleanups: AtomicUsize,
    pub loaded_paths: Mutex<Vec<PathBuf>>,
    pub init_args: Mutex<Vec<(ApplicationType, Option<String>)>>,
    /// Broker token seen by each cleanup, when the core knows its broker.
    pub cleanup_tokens: Mutex<Vec<u32>>,
}

impl FakeStats {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn unloads(&self) -> usize {
        self.unloads.load(Ordering::SeqCst)
    }

    pub fn live_modules(&self) -> usize {
        self.loads() - self.unloads()
    }

    pub fn core_inits(&self) -> usize {
        self.core_inits.load(Ordering::SeqCst)
    }

    pub fn cleanups(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }
}

/// Broker call the fake client core makes from inside its own methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reentry {
    /// Shut the broker down.
    Shutdown,
    /// Resolve `IVRCompositor_027` and read an error symbol.
    Lookup,
}

/// Interface version whose lookup triggers the configured re-entry.
pub const REENTRANT_VERSION: &str = "IVRSystem_022";

/// Behaviour of the fake backend.
#[derive(Debug, Clone)]
pub struct FakeBackend {
    pub loadable: bool,
    pub exports_factory: bool,
    pub provides_core: bool,
    pub core_init_error: Option<InitError>,
    pub hmd_present: bool,
    /// Interfaces the client core hands out, by version name.
    pub interfaces: HashMap<String, usize>,
    /// Re-entry made when `REENTRANT_VERSION` is resolved or presence is
    /// queried while loaded.
    pub reentry: Option<Reentry>,
    /// Broker the core calls back into.
    pub broker: Arc<OnceLock<&'static Broker>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        let mut interfaces = HashMap::new();
        interfaces.insert("IVRSystem_022".to_string(), 0x1000);
        interfaces.insert("FnTable:IVRSystem_022".to_string(), 0x1100);
        interfaces.insert("IVRCore_001".to_string(), 0x2000);
        interfaces.insert("FnTable:IVRCore_001".to_string(), 0x2100);
        interfaces.insert("IVRCompositor_027".to_string(), 0x3000);

        Self {
            loadable: true,
            exports_factory: true,
            provides_core: true,
            core_init_error: None,
            hmd_present: true,
            interfaces,
            reentry: None,
            broker: Arc::new(OnceLock::new()),
        }
    }
}

#[derive(Clone)]
pub struct FakeLoader {
    pub backend: FakeBackend,
    pub stats: Arc<FakeStats>,
}

impl FakeLoader {
    pub fn new(backend: FakeBackend) -> Self {
        Self {
            backend,
            stats: Arc::new(FakeStats::default()),
        }
    }
}

impl ModuleLoader for FakeLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn BackendModule>> {
        if !self.backend.loadable {
            return Err(InitError::VRClientDLLNotFound);
        }
        self.stats.loads.fetch_add(1, Ordering::SeqCst);
        self.stats.loaded_paths.lock().unwrap().push(path.to_path_buf());
        Ok(Box::new(FakeModule {
            path: path.to_path_buf(),
            backend: self.backend.clone(),
            stats: self.stats.clone(),
        }))
    }
}

struct FakeModule {
    path: PathBuf,
    backend: FakeBackend,
    stats: Arc<FakeStats>,
}

impl BackendModule for FakeModule {
    fn path(&self) -> &Path {
        &self.path
    }

    fn factory(&self) -> Option<Box<dyn InterfaceFactory>> {
        if !self.backend.exports_factory {
            return None;
        }
        Some(Box::new(FakeFactory {
            backend: self.backend.clone(),
            stats: self.stats.clone(),
        }))
    }
}

impl Drop for FakeModule {
    fn drop(&mut self) {
        self.stats.unloads.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeFactory {
    backend: FakeBackend,
    stats: Arc<FakeStats>,
}

impl InterfaceFactory for FakeFactory {
    fn create(&self, version: &str) -> FactoryOutput {
        if version == vrbroker_core::interfaces::CLIENT_CORE_VERSION && self.backend.provides_core {
            FactoryOutput::found(handle(0xC0DE))
        } else {
            FactoryOutput::missing(InitError::InterfaceNotFound.code())
        }
    }

    fn bind_client_core(&self, _handle: InterfaceHandle) -> Box<dyn ClientCore> {
        Box::new(FakeCore {
            backend: self.backend.clone(),
            stats: self.stats.clone(),
        })
    }
}

struct FakeCore {
    backend: FakeBackend,
    stats: Arc<FakeStats>,
}

impl FakeCore {
    fn reenter(&self) {
        let (Some(reentry), Some(broker)) = (self.backend.reentry, self.backend.broker.get()) else {
            return;
        };
        match reentry {
            Reentry::Shutdown => broker.shutdown(),
            Reentry::Lookup => {
                broker.get_generic_interface("IVRCompositor_027").unwrap();
                broker.error_symbol(InitError::HmdNotFound);
            }
        }
    }
}

impl ClientCore for FakeCore {
    fn init(&self, app_type: ApplicationType, startup_info: Option<&str>) -> Result<()> {
        self.stats.core_inits.fetch_add(1, Ordering::SeqCst);
        self.stats
            .init_args
            .lock()
            .unwrap()
            .push((app_type, startup_info.map(str::to_string)));
        match self.backend.core_init_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn cleanup(&self) {
        self.stats.cleanups.fetch_add(1, Ordering::SeqCst);
        if let Some(broker) = self.backend.broker.get() {
            self.stats
                .cleanup_tokens
                .lock()
                .unwrap()
                .push(broker.init_token().value());
        }
    }

    fn is_interface_version_valid(&self, version: &str) -> Result<()> {
        if self.backend.interfaces.contains_key(version) {
            Ok(())
        } else {
            Err(InitError::InterfaceNotFound)
        }
    }

    fn generic_interface(&self, version: &str) -> Result<InterfaceHandle> {
        if version == REENTRANT_VERSION {
            self.reenter();
        }
        self.backend
            .interfaces
            .get(version)
            .map(|addr| handle(*addr))
            .ok_or(InitError::InterfaceNotFound)
    }

    fn is_hmd_present(&self) -> bool {
        self.reenter();
        self.backend.hmd_present
    }

    fn english_string_for_error(&self, error: InitError) -> String {
        format!("backend: {}", error.description())
    }

    fn id_for_error(&self, error: InitError) -> String {
        format!("backend:{}", error.symbol())
    }
}

/// Hook installer that records every call.
#[derive(Debug, Default)]
pub struct RecordingHooks {
    pub installed: Mutex<Vec<(String, InterfaceHandle)>>,
    pub inits: AtomicUsize,
    pub shutdowns: AtomicUsize,
}

impl RecordingHooks {
    pub fn names(&self) -> Vec<String> {
        self.installed
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl HookInstaller for RecordingHooks {
    fn on_init(&self) {
        self.inits.fetch_add(1, Ordering::SeqCst);
    }

    fn on_shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }

    fn install(&self, version: &str, interface: InterfaceHandle) {
        self.installed
            .lock()
            .unwrap()
            .push((version.to_string(), interface));
    }
}

/// A runtime directory with the host `bin` layout.
pub fn install_tree() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(ModuleLayout::host().bin_dir(dir.path())).unwrap();
    dir
}

/// Everything a broker test needs.
pub struct Harness {
    pub broker: Broker,
    pub stats: Arc<FakeStats>,
    pub hooks: Arc<RecordingHooks>,
    pub runtime: TempDir,
}

impl Harness {
    pub fn new(backend: FakeBackend) -> Self {
        let runtime = install_tree();
        Self::with_registry(backend, StaticPathRegistry::runtime(runtime.path()), runtime)
    }

    pub fn with_registry(backend: FakeBackend, registry: StaticPathRegistry, runtime: TempDir) -> Self {
        let loader = FakeLoader::new(backend);
        let stats = loader.stats.clone();
        let hooks = Arc::new(RecordingHooks::default());
        let broker = Broker::builder()
            .path_registry(registry)
            .module_loader(loader)
            .hooks(hooks.clone())
            .build();

        Self {
            broker,
            stats,
            hooks,
            runtime,
        }
    }
}

/// Harness whose broker lives for the whole process, so the fake backend
/// can call back into it.
pub struct StaticHarness {
    pub broker: &'static Broker,
    pub stats: Arc<FakeStats>,
    pub hooks: Arc<RecordingHooks>,
    pub runtime: TempDir,
}

impl StaticHarness {
    pub fn new(backend: FakeBackend) -> Self {
        let runtime = install_tree();
        let slot = backend.broker.clone();
        let loader = FakeLoader::new(backend);
        let stats = loader.stats.clone();
        let hooks = Arc::new(RecordingHooks::default());
        let broker: &'static Broker = Box::leak(Box::new(
            Broker::builder()
                .path_registry(StaticPathRegistry::runtime(runtime.path()))
                .module_loader(loader)
                .hooks(hooks.clone())
                .build(),
        ));
        slot.set(broker).unwrap();

        Self {
            broker,
            stats,
            hooks,
            runtime,
        }
    }
}
