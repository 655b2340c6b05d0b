//! Hook interposition point.
//!
//! Every interface resolved through the broker is passed to a
//! [`HookInstaller`] before the caller sees it, giving the installer a chance
//! to patch or wrap it.

use crate::interfaces::InterfaceHandle;

/// Receives resolved interfaces and lifecycle notifications.
///
/// Calls are made while the broker lock is held; an installer may call back
/// into the broker from the same thread.
pub trait HookInstaller: Send + Sync {
    /// Called at the start of every init.
    fn on_init(&self) {}

    /// Called at the start of every shutdown.
    fn on_shutdown(&self) {}

    /// Called once per successful resolution of `version`.
    fn install(&self, version: &str, interface: InterfaceHandle);
}

/// Installer that leaves interfaces untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl HookInstaller for NoopHooks {
    fn install(&self, _version: &str, _interface: InterfaceHandle) {}
}

/// Installer that only logs what passes through it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHooks;

impl HookInstaller for TracingHooks {
    fn on_init(&self) {
        tracing::trace!("Hooks: init");
    }

    fn on_shutdown(&self) {
        tracing::trace!("Hooks: shutdown");
    }

    fn install(&self, version: &str, interface: InterfaceHandle) {
        tracing::debug!(version, interface = ?interface, "Hooking interface");
    }
}
