//! Factory protocol and the client-core interface.
//!
//! The backend exports a single factory. Given an interface version name it
//! returns a pointer to that interface, or null together with a return code.

use crate::error::{InitError, Result, INIT_ERROR_NONE};
use crate::interfaces::{ApplicationType, InterfaceHandle, CLIENT_CORE_VERSION};

/// Raw result of one factory call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactoryOutput {
    pub interface: Option<InterfaceHandle>,
    pub return_code: i32,
}

impl FactoryOutput {
    pub fn found(interface: InterfaceHandle) -> Self {
        Self {
            interface: Some(interface),
            return_code: INIT_ERROR_NONE,
        }
    }

    pub fn missing(return_code: i32) -> Self {
        Self {
            interface: None,
            return_code,
        }
    }
}

/// Factory entry point resolved from a backend module.
pub trait InterfaceFactory {
    /// Call the factory for `version`.
    fn create(&self, version: &str) -> FactoryOutput;

    /// Bind a client-core pointer previously returned by [`create`](Self::create).
    fn bind_client_core(&self, handle: InterfaceHandle) -> Box<dyn ClientCore>;
}

/// Root interface of a loaded backend.
///
/// Every other capability interface is reached through it. Calls may
/// re-enter the broker from the calling thread.
pub trait ClientCore: Send + Sync {
    /// Initialize the backend for an application.
    fn init(&self, app_type: ApplicationType, startup_info: Option<&str>) -> Result<()>;

    /// Release backend resources. The interface must not be used afterwards.
    fn cleanup(&self);

    /// Check whether the backend provides `version`.
    fn is_interface_version_valid(&self, version: &str) -> Result<()>;

    /// Resolve a capability interface by version name.
    fn generic_interface(&self, version: &str) -> Result<InterfaceHandle>;

    /// Whether a head-mounted display is attached.
    fn is_hmd_present(&self) -> bool;

    /// Backend's English description of an error.
    fn english_string_for_error(&self, error: InitError) -> String;

    /// Backend's symbolic name of an error.
    fn id_for_error(&self, error: InitError) -> String;
}

/// Resolve an interface through the factory.
///
/// A null pointer is `InterfaceNotFound` whatever the return code says.
pub fn resolve_interface(factory: &dyn InterfaceFactory, version: &str) -> Result<InterfaceHandle> {
    let output = factory.create(version);
    match output.interface {
        Some(handle) => {
            if output.return_code != INIT_ERROR_NONE {
                tracing::debug!(
                    version,
                    code = output.return_code,
                    "Factory returned an interface with a non-zero code"
                );
            }
            Ok(handle)
        }
        None => {
            tracing::warn!(
                version,
                code = output.return_code,
                "Factory returned no interface"
            );
            Err(InitError::InterfaceNotFound)
        }
    }
}

/// Resolve and bind the root client-core interface.
pub fn resolve_client_core(factory: &dyn InterfaceFactory) -> Result<Box<dyn ClientCore>> {
    let handle = resolve_interface(factory, CLIENT_CORE_VERSION)?;
    Ok(factory.bind_client_core(handle))
}
