//! Native backend access through `libloading`.
//!
//! All foreign calls live here. The client core is a C++ object whose first
//! field is a vtable pointer; methods are called through that table with the
//! object pointer as the first argument.

use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::path::{Path, PathBuf};

use libloading::Library;

use crate::error::{InitError, Result};
use crate::factory::{ClientCore, FactoryOutput, InterfaceFactory};
use crate::interfaces::{ApplicationType, InterfaceHandle};
use crate::module::{BackendModule, ModuleLoader, FACTORY_SYMBOL};

/// Signature of the exported factory.
pub type ClientCoreFactoryFn =
    unsafe extern "C" fn(interface_name: *const c_char, return_code: *mut c_int) -> *mut c_void;

/// Client-core object layout: a single vtable pointer.
#[repr(C)]
pub struct RawClientCore {
    pub vtable: *const ClientCoreVtable,
}

/// Client-core virtual method table, in declaration order.
#[repr(C)]
pub struct ClientCoreVtable {
    pub init: unsafe extern "C" fn(
        this: *mut RawClientCore,
        application_type: c_int,
        startup_info: *const c_char,
    ) -> c_int,
    pub cleanup: unsafe extern "C" fn(this: *mut RawClientCore),
    pub is_interface_version_valid:
        unsafe extern "C" fn(this: *mut RawClientCore, version: *const c_char) -> c_int,
    pub get_generic_interface: unsafe extern "C" fn(
        this: *mut RawClientCore,
        version: *const c_char,
        error: *mut c_int,
    ) -> *mut c_void,
    pub is_hmd_present: unsafe extern "C" fn(this: *mut RawClientCore) -> bool,
    pub english_string_for_error:
        unsafe extern "C" fn(this: *mut RawClientCore, error: c_int) -> *const c_char,
    pub id_for_error: unsafe extern "C" fn(this: *mut RawClientCore, error: c_int) -> *const c_char,
}

/// Loader backed by the platform dynamic linker.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeModuleLoader;

impl NativeModuleLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ModuleLoader for NativeModuleLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn BackendModule>> {
        // SAFETY: loading runs the library's initializers. The backend is
        // trusted to the extent the user installed it.
        let library = unsafe { Library::new(path) }.map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Failed to load backend module");
            InitError::VRClientDLLNotFound
        })?;

        tracing::debug!(path = %path.display(), "Backend module loaded");
        Ok(Box::new(NativeModule {
            library,
            path: path.to_path_buf(),
        }))
    }
}

/// A backend library loaded with `libloading`.
pub struct NativeModule {
    library: Library,
    path: PathBuf,
}

impl BackendModule for NativeModule {
    fn path(&self) -> &Path {
        &self.path
    }

    fn factory(&self) -> Option<Box<dyn InterfaceFactory>> {
        // SAFETY: the symbol is declared with the factory signature by the
        // backend ABI. The copied function pointer is only used while the
        // module is alive.
        let func = unsafe {
            self.library
                .get::<ClientCoreFactoryFn>(FACTORY_SYMBOL.as_bytes())
                .map(|symbol| *symbol)
        };

        match func {
            Ok(func) => Some(Box::new(NativeFactory { func })),
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "Factory symbol lookup failed");
                None
            }
        }
    }
}

impl Drop for NativeModule {
    fn drop(&mut self) {
        tracing::debug!(path = %self.path.display(), "Unloading backend module");
    }
}

struct NativeFactory {
    func: ClientCoreFactoryFn,
}

impl InterfaceFactory for NativeFactory {
    fn create(&self, version: &str) -> FactoryOutput {
        let Ok(version) = CString::new(version) else {
            return FactoryOutput::missing(InitError::InvalidInterface.code());
        };

        let mut return_code: c_int = 0;
        // SAFETY: valid NUL-terminated name and a writable return code slot.
        let ptr = unsafe { (self.func)(version.as_ptr(), &mut return_code) };

        FactoryOutput {
            interface: InterfaceHandle::from_raw(ptr),
            return_code,
        }
    }

    fn bind_client_core(&self, handle: InterfaceHandle) -> Box<dyn ClientCore> {
        Box::new(NativeClientCore {
            raw: handle.as_ptr().cast::<RawClientCore>(),
        })
    }
}

/// Client core living inside a native backend module.
pub struct NativeClientCore {
    raw: *mut RawClientCore,
}

// SAFETY: the backend's client core is only called from whichever thread
// holds the broker lock; it carries no thread affinity.
unsafe impl Send for NativeClientCore {}
unsafe impl Sync for NativeClientCore {}

impl NativeClientCore {
    fn vtable(&self) -> &ClientCoreVtable {
        // SAFETY: `raw` came from the factory for the client-core version and
        // stays valid until the module is unloaded, which happens only after
        // this value is dropped.
        unsafe { &*(*self.raw).vtable }
    }

    fn owned_string(ptr: *const c_char) -> Option<String> {
        if ptr.is_null() {
            return None;
        }
        // SAFETY: the backend returns static NUL-terminated strings.
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }
}

impl ClientCore for NativeClientCore {
    fn init(&self, app_type: ApplicationType, startup_info: Option<&str>) -> Result<()> {
        let startup_info = startup_info
            .map(CString::new)
            .transpose()
            .map_err(|_| InitError::Unknown)?;
        let startup_ptr = startup_info
            .as_ref()
            .map_or(std::ptr::null(), |info| info.as_ptr());

        // SAFETY: see `vtable`.
        let code = unsafe { (self.vtable().init)(self.raw, app_type.as_raw(), startup_ptr) };
        InitError::check(code)
    }

    fn cleanup(&self) {
        // SAFETY: see `vtable`.
        unsafe { (self.vtable().cleanup)(self.raw) }
    }

    fn is_interface_version_valid(&self, version: &str) -> Result<()> {
        let version = CString::new(version).map_err(|_| InitError::InvalidInterface)?;
        // SAFETY: see `vtable`.
        let code = unsafe { (self.vtable().is_interface_version_valid)(self.raw, version.as_ptr()) };
        InitError::check(code)
    }

    fn generic_interface(&self, version: &str) -> Result<InterfaceHandle> {
        let version = CString::new(version).map_err(|_| InitError::InvalidInterface)?;
        let mut error: c_int = 0;
        // SAFETY: see `vtable`.
        let ptr = unsafe {
            (self.vtable().get_generic_interface)(self.raw, version.as_ptr(), &mut error)
        };

        match InterfaceHandle::from_raw(ptr) {
            Some(handle) => Ok(handle),
            None => Err(InitError::from_code(error).unwrap_or(InitError::InterfaceNotFound)),
        }
    }

    fn is_hmd_present(&self) -> bool {
        // SAFETY: see `vtable`.
        unsafe { (self.vtable().is_hmd_present)(self.raw) }
    }

    fn english_string_for_error(&self, error: InitError) -> String {
        // SAFETY: see `vtable`.
        let ptr = unsafe { (self.vtable().english_string_for_error)(self.raw, error.code()) };
        Self::owned_string(ptr).unwrap_or_else(|| error.description())
    }

    fn id_for_error(&self, error: InitError) -> String {
        // SAFETY: see `vtable`.
        let ptr = unsafe { (self.vtable().id_for_error)(self.raw, error.code()) };
        Self::owned_string(ptr).unwrap_or_else(|| error.symbol())
    }
}
