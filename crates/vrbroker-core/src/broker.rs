//! The broker: owner of the loaded backend and the init token.
//!
//! All state transitions run under one re-entrant lock, so hook installers
//! and other callbacks may re-enter the broker from the same thread.

use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::ReentrantMutex;

use crate::config::BrokerConfig;
use crate::error::{InitError, Result};
use crate::hooks::{HookInstaller, NoopHooks};
use crate::interfaces::{ApplicationType, InterfaceHandle, InterfaceName};
use crate::module::{load_backend, LoadedBackend, ModuleLoader};
use crate::native::NativeModuleLoader;
use crate::paths::{installed_runtime_dir, FilePathRegistry, PathRegistry};
use crate::platform::ModuleLayout;

/// Generation token handed out by a successful init.
///
/// Every init and shutdown produces a new value; a cache built under one
/// token is stale as soon as the broker reports another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct InitToken(u32);

impl InitToken {
    /// The token of a broker that was never initialized.
    pub const NONE: InitToken = InitToken(0);

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for InitToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of copying the runtime path into a caller buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimePathCopy {
    /// Whether a runtime directory is installed.
    pub found: bool,
    /// Buffer size needed for the path and its NUL terminator.
    pub required_size: u32,
}

/// The loaded backend is shared so that calls into it can run without a
/// `RefCell` borrow; a backend may re-enter the broker during any call.
#[derive(Default)]
struct BrokerState {
    backend: Option<Arc<LoadedBackend>>,
}

/// Process-wide broker for backend interfaces.
pub struct Broker {
    state: ReentrantMutex<RefCell<BrokerState>>,
    token: AtomicU32,
    registry: Box<dyn PathRegistry>,
    loader: Box<dyn ModuleLoader>,
    hooks: Arc<dyn HookInstaller>,
    layout: ModuleLayout,
}

static GLOBAL_BROKER: OnceCell<Broker> = OnceCell::new();

impl Broker {
    /// Broker using the on-disk registry, environment overrides and the
    /// native module loader.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn from_config(config: &BrokerConfig) -> Self {
        Self::builder()
            .path_registry(FilePathRegistry::from_config(config))
            .build()
    }

    pub fn builder() -> BrokerBuilder {
        BrokerBuilder::default()
    }

    /// The process-wide broker, created on first use.
    pub fn global() -> &'static Broker {
        GLOBAL_BROKER.get_or_init(Broker::new)
    }

    /// Install a custom process-wide broker.
    ///
    /// Fails, returning the broker, if the global one already exists.
    pub fn install_global(broker: Broker) -> std::result::Result<(), Broker> {
        GLOBAL_BROKER.set(broker)
    }

    /// Current init token. Readable without taking the broker lock.
    pub fn init_token(&self) -> InitToken {
        InitToken(self.token.load(Ordering::Acquire))
    }

    pub fn layout(&self) -> ModuleLayout {
        self.layout
    }

    fn bump_token(&self) -> InitToken {
        let previous = self.token.fetch_add(1, Ordering::AcqRel);
        InitToken(previous.wrapping_add(1))
    }

    /// Loaded backend, cloned out of the state so no borrow outlives the call.
    fn current(&self, state: &RefCell<BrokerState>) -> Option<Arc<LoadedBackend>> {
        state.borrow().backend.clone()
    }

    /// Whether `backend` is still the one held in the state.
    fn is_current(&self, state: &RefCell<BrokerState>, backend: &Arc<LoadedBackend>) -> bool {
        state
            .borrow()
            .backend
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, backend))
    }

    /// Whether a backend is currently loaded.
    pub fn is_loaded(&self) -> bool {
        let guard = self.state.lock();
        let loaded = guard.borrow().backend.is_some();
        loaded
    }

    /// Path of the loaded backend module.
    pub fn loaded_module_path(&self) -> Option<PathBuf> {
        let guard = self.state.lock();
        let backend = self.current(&guard);
        backend.map(|backend| backend.module_path().to_path_buf())
    }

    /// Load and initialize the backend.
    ///
    /// Returns the current token without reloading when a backend is already
    /// loaded. Failures leave the broker unloaded and the token untouched.
    pub fn init(&self, app_type: ApplicationType, startup_info: Option<&str>) -> Result<InitToken> {
        let guard = self.state.lock();

        if guard.borrow().backend.is_some() {
            let token = self.init_token();
            tracing::debug!(%token, "Backend already loaded, reusing");
            return Ok(token);
        }

        tracing::debug!(%app_type, layout = %self.layout, "Initializing backend");
        self.hooks.on_init();

        // The hook may have initialized the broker itself.
        if guard.borrow().backend.is_some() {
            let token = self.init_token();
            tracing::debug!(%token, "Backend loaded during init hook, reusing");
            return Ok(token);
        }

        let backend = load_backend(self.registry.as_ref(), self.loader.as_ref(), &self.layout)
            .map_err(|e| {
                tracing::warn!(error = %e, code = e.code(), "Failed to load backend");
                e
            })?;

        if let Err(e) = backend.core().init(app_type, startup_info) {
            tracing::warn!(error = %e, code = e.code(), "Backend client core init failed");
            drop(backend);
            return Err(e);
        }

        if guard.borrow().backend.is_some() {
            // The backend re-entered init on this thread and won.
            tracing::debug!("Backend loaded during client core init, discarding ours");
            backend.core().cleanup();
            drop(backend);
            return Ok(self.init_token());
        }
        guard.borrow_mut().backend = Some(Arc::new(backend));

        let token = self.bump_token();
        tracing::info!(%token, %app_type, "Backend initialized");
        Ok(token)
    }

    /// Release the backend and invalidate every outstanding token.
    ///
    /// The token advances before teardown, so interfaces are stale before
    /// the module goes away. Safe to call when nothing is loaded; the token
    /// still advances.
    pub fn shutdown(&self) {
        let guard = self.state.lock();
        self.hooks.on_shutdown();

        let token = self.bump_token();

        let backend = guard.borrow_mut().backend.take();
        if let Some(backend) = backend {
            tracing::debug!(path = %backend.module_path().display(), "Cleaning up backend");
            backend.core().cleanup();
            // A call still running further up this thread's stack keeps the
            // module mapped until it returns.
            drop(backend);
        }

        tracing::info!(%token, "Backend shut down");
    }

    /// Resolve an interface by version name, passing it through the hooks.
    ///
    /// For a `FnTable:<name>` request the underlying `<name>` is resolved and
    /// hooked first; its result is discarded.
    pub fn get_generic_interface(&self, version: &str) -> Result<InterfaceHandle> {
        let guard = self.state.lock();

        if guard.borrow().backend.is_none() {
            tracing::debug!(version, "Interface requested before init");
            return Err(InitError::NotInitialized);
        }

        if let Some(underlying) = InterfaceName::parse(version).underlying() {
            if let Err(e) = self.resolve_and_hook(&guard, underlying) {
                tracing::debug!(underlying, error = %e, "Underlying interface not resolved");
            }
        }

        self.resolve_and_hook(&guard, version)
    }

    fn resolve_and_hook(
        &self,
        state: &RefCell<BrokerState>,
        version: &str,
    ) -> Result<InterfaceHandle> {
        let backend = self.current(state).ok_or(InitError::NotInitialized)?;
        let handle = backend.core().generic_interface(version)?;

        // The backend may have shut the broker down while resolving.
        if !self.is_current(state, &backend) {
            tracing::debug!(version, "Backend unloaded during resolution");
            return Err(InitError::NotInitialized);
        }
        drop(backend);

        self.hooks.install(version, handle);
        Ok(handle)
    }

    /// Whether the loaded backend provides `version`. False when unloaded.
    pub fn is_interface_version_valid(&self, version: &str) -> bool {
        let guard = self.state.lock();
        match self.current(&guard) {
            Some(backend) => backend.core().is_interface_version_valid(version).is_ok(),
            None => false,
        }
    }

    /// Whether a head-mounted display is present.
    ///
    /// Without a loaded backend this loads one temporarily, asks, and unloads
    /// it again. The probe holds the broker lock and never touches the token.
    pub fn is_hmd_present(&self) -> bool {
        let guard = self.state.lock();

        if let Some(backend) = self.current(&guard) {
            return backend.core().is_hmd_present();
        }

        match load_backend(self.registry.as_ref(), self.loader.as_ref(), &self.layout) {
            Ok(backend) => {
                let present = backend.core().is_hmd_present();
                tracing::debug!(present, "Presence probe finished");
                drop(backend);
                present
            }
            Err(e) => {
                tracing::debug!(error = %e, "Presence probe could not load backend");
                false
            }
        }
    }

    /// Whether a runtime is installed. Does not require a successful load.
    pub fn is_runtime_installed(&self) -> bool {
        let guard = self.state.lock();
        if guard.borrow().backend.is_some() {
            return true;
        }
        installed_runtime_dir(self.registry.as_ref()).is_some()
    }

    /// Installed runtime directory, if any.
    pub fn runtime_path(&self) -> Option<PathBuf> {
        installed_runtime_dir(self.registry.as_ref())
    }

    /// Copy the runtime path, NUL-terminated, into `buffer`.
    ///
    /// If it does not fit, `buffer` receives an empty string and
    /// `required_size` tells the caller how much room is needed.
    pub fn copy_runtime_path(&self, buffer: &mut [u8]) -> RuntimePathCopy {
        let Some(runtime) = self.runtime_path() else {
            return RuntimePathCopy {
                found: false,
                required_size: 0,
            };
        };

        let runtime = runtime.to_string_lossy();
        let bytes = runtime.as_bytes();
        let required_size = u32::try_from(bytes.len() + 1).unwrap_or(u32::MAX);

        if bytes.len() >= buffer.len() {
            if let Some(first) = buffer.first_mut() {
                *first = 0;
            }
        } else {
            buffer[..bytes.len()].copy_from_slice(bytes);
            buffer[bytes.len()] = 0;
        }

        RuntimePathCopy {
            found: true,
            required_size,
        }
    }

    /// Symbolic name of an error, from the backend when loaded.
    pub fn error_symbol(&self, error: InitError) -> String {
        let guard = self.state.lock();
        match self.current(&guard) {
            Some(backend) => backend.core().id_for_error(error),
            None => error.symbol(),
        }
    }

    /// English description of an error, from the backend when loaded.
    pub fn error_description(&self, error: InitError) -> String {
        let guard = self.state.lock();
        match self.current(&guard) {
            Some(backend) => backend.core().english_string_for_error(error),
            None => error.description(),
        }
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("token", &self.init_token())
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Broker`] with injectable collaborators.
pub struct BrokerBuilder {
    registry: Option<Box<dyn PathRegistry>>,
    loader: Box<dyn ModuleLoader>,
    hooks: Arc<dyn HookInstaller>,
    layout: ModuleLayout,
}

impl Default for BrokerBuilder {
    fn default() -> Self {
        Self {
            registry: None,
            loader: Box::new(NativeModuleLoader::new()),
            hooks: Arc::new(NoopHooks),
            layout: ModuleLayout::host(),
        }
    }
}

impl BrokerBuilder {
    pub fn path_registry(mut self, registry: impl PathRegistry + 'static) -> Self {
        self.registry = Some(Box::new(registry));
        self
    }

    pub fn module_loader(mut self, loader: impl ModuleLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn HookInstaller>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn layout(mut self, layout: ModuleLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn build(self) -> Broker {
        let registry = self
            .registry
            .unwrap_or_else(|| Box::new(FilePathRegistry::default()));

        Broker {
            state: ReentrantMutex::new(RefCell::new(BrokerState::default())),
            token: AtomicU32::new(0),
            registry,
            loader: self.loader,
            hooks: self.hooks,
            layout: self.layout,
        }
    }
}
