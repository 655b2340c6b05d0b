//! Runtime interface broker.
//!
//! Locates an installed backend runtime, loads its client library, resolves
//! versioned interfaces through the exported factory and hands them out
//! through a hook layer. Callers cache interfaces per init token with
//! [`InterfaceContext`] and re-resolve whenever the token changes.

pub mod api;
pub mod broker;
pub mod config;
pub mod context;
pub mod error;
pub mod factory;
pub mod hooks;
pub mod interfaces;
pub mod module;
pub mod native;
pub mod paths;
pub mod platform;

pub use broker::{Broker, BrokerBuilder, InitToken, RuntimePathCopy};
pub use context::InterfaceContext;
pub use error::{InitError, Result};
pub use interfaces::{ApplicationType, Capability, InterfaceHandle, InterfaceName};

/// Re-exports commonly used types.
pub mod prelude {
    // Broker and caching
    pub use crate::broker::{Broker, BrokerBuilder, InitToken};
    pub use crate::context::InterfaceContext;

    // Error handling
    pub use crate::error::{InitError, Result};

    // Collaborators
    pub use crate::factory::{ClientCore, FactoryOutput, InterfaceFactory};
    pub use crate::hooks::{HookInstaller, NoopHooks, TracingHooks};
    pub use crate::module::{BackendModule, ModuleLoader};
    pub use crate::paths::{InstallPaths, PathRegistry, RegistryPaths};

    // Interfaces
    pub use crate::interfaces::{
        ApplicationType, Capability, InterfaceHandle, CLIENT_CORE_VERSION,
    };
}
