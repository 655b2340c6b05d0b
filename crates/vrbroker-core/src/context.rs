//! Per-caller interface cache.
//!
//! A context remembers the init token its interfaces were resolved under.
//! Before every access it compares that token with the broker's and drops
//! everything it holds on mismatch, so interfaces from an earlier
//! generation are never handed out.
//!
//! Contexts are not synchronized; each caller keeps its own.

use std::collections::HashMap;

use crate::broker::{Broker, InitToken};
use crate::error::{InitError, Result};
use crate::interfaces::{ApplicationType, Capability, InterfaceHandle};

/// Lazily populated interface cache bound to one broker.
#[derive(Debug)]
pub struct InterfaceContext<'b> {
    broker: &'b Broker,
    token: InitToken,
    /// Failed resolutions are kept until the next token change.
    slots: HashMap<String, Result<InterfaceHandle>>,
    last_error: Option<InitError>,
}

impl InterfaceContext<'static> {
    /// Context over the process-wide broker.
    pub fn global() -> Self {
        Self::new(Broker::global())
    }
}

impl<'b> InterfaceContext<'b> {
    pub fn new(broker: &'b Broker) -> Self {
        Self {
            broker,
            token: broker.init_token(),
            slots: HashMap::new(),
            last_error: None,
        }
    }

    pub fn broker(&self) -> &'b Broker {
        self.broker
    }

    /// Token the cached interfaces belong to.
    pub fn token(&self) -> InitToken {
        self.token
    }

    /// Drop every cached interface.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.last_error = None;
    }

    /// Number of cached slots, including failed lookups.
    pub fn cached_len(&self) -> usize {
        self.slots.len()
    }

    fn check_clear(&mut self) {
        let current = self.broker.init_token();
        if current != self.token {
            tracing::trace!(old = %self.token, new = %current, "Init token changed, clearing interfaces");
            self.slots.clear();
            self.token = current;
        }
    }

    /// Error of the most recent access, `None` if it succeeded.
    pub fn last_error(&self) -> Option<InitError> {
        self.last_error
    }

    /// Interface for `version`, resolved on first use.
    ///
    /// Failures are logged and remembered; the lookup is not retried until
    /// the token changes. A lookup while the broker is unloaded fails with
    /// `NotInitialized`.
    pub fn try_interface(&mut self, version: &str) -> Result<InterfaceHandle> {
        self.check_clear();

        let resolved = match self.slots.get(version) {
            Some(slot) => *slot,
            None => {
                let resolved = self.broker.get_generic_interface(version);
                if let Err(e) = resolved {
                    tracing::warn!(version, error = %e, "Interface not available");
                }
                self.slots.insert(version.to_string(), resolved);
                resolved
            }
        };

        self.last_error = resolved.err();
        resolved
    }

    /// Like [`try_interface`](Self::try_interface); the error stays
    /// available through [`last_error`](Self::last_error).
    pub fn interface(&mut self, version: &str) -> Option<InterfaceHandle> {
        self.try_interface(version).ok()
    }

    pub fn try_get(&mut self, capability: Capability) -> Result<InterfaceHandle> {
        self.try_interface(capability.version())
    }

    pub fn get(&mut self, capability: Capability) -> Option<InterfaceHandle> {
        self.interface(capability.version())
    }

    pub fn system(&mut self) -> Option<InterfaceHandle> {
        self.get(Capability::System)
    }

    pub fn chaperone(&mut self) -> Option<InterfaceHandle> {
        self.get(Capability::Chaperone)
    }

    pub fn chaperone_setup(&mut self) -> Option<InterfaceHandle> {
        self.get(Capability::ChaperoneSetup)
    }

    pub fn compositor(&mut self) -> Option<InterfaceHandle> {
        self.get(Capability::Compositor)
    }

    pub fn overlay(&mut self) -> Option<InterfaceHandle> {
        self.get(Capability::Overlay)
    }

    pub fn render_models(&mut self) -> Option<InterfaceHandle> {
        self.get(Capability::RenderModels)
    }

    pub fn extended_display(&mut self) -> Option<InterfaceHandle> {
        self.get(Capability::ExtendedDisplay)
    }

    pub fn settings(&mut self) -> Option<InterfaceHandle> {
        self.get(Capability::Settings)
    }

    pub fn applications(&mut self) -> Option<InterfaceHandle> {
        self.get(Capability::Applications)
    }

    pub fn tracked_camera(&mut self) -> Option<InterfaceHandle> {
        self.get(Capability::TrackedCamera)
    }

    pub fn notifications(&mut self) -> Option<InterfaceHandle> {
        self.get(Capability::Notifications)
    }

    /// Initialize the broker and return the system interface.
    ///
    /// The context adopts the new token. If the backend does not provide the
    /// expected system interface version the broker is shut down again.
    pub fn initialize(
        &mut self,
        app_type: ApplicationType,
        startup_info: Option<&str>,
    ) -> Result<InterfaceHandle> {
        let result = self.broker.init(app_type, startup_info);
        self.clear();

        let token = match result {
            Ok(token) => token,
            Err(e) => {
                self.token = InitToken::NONE;
                self.last_error = Some(e);
                return Err(e);
            }
        };
        self.token = token;

        let system = Capability::System.version();
        if !self.broker.is_interface_version_valid(system) {
            tracing::warn!(version = system, "Backend does not provide the system interface");
            self.broker.shutdown();
            self.last_error = Some(InitError::InterfaceNotFound);
            return Err(InitError::InterfaceNotFound);
        }

        self.try_get(Capability::System)
    }

    /// Shut the broker down. Cached interfaces become stale immediately.
    pub fn shutdown(&mut self) {
        self.broker.shutdown();
    }
}
