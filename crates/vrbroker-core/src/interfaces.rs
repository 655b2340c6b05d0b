//! Interface handles, version names and application types.

use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;
use std::str::FromStr;

/// Version name of the root client-core interface.
pub const CLIENT_CORE_VERSION: &str = "IVRClientCore_003";

/// Prefix of derived binding names (`FnTable:<interface>`).
pub const FN_TABLE_PREFIX: &str = "FnTable";

/// Delimiter between the prefix and the underlying interface name.
pub const FN_TABLE_DELIMITER: char = ':';

/// Opaque, non-null pointer to an interface owned by the backend.
///
/// The broker never dereferences it; validity is bounded by the init token
/// under which it was resolved.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfaceHandle(NonNull<c_void>);

// SAFETY: the handle is an address handed out by the backend. It is only
// dereferenced by code that knows the concrete interface type, and the
// backend interfaces are callable from any thread.
unsafe impl Send for InterfaceHandle {}
unsafe impl Sync for InterfaceHandle {}

impl InterfaceHandle {
    /// Wrap a raw pointer, returning `None` for null.
    pub fn from_raw(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }

    /// Address of the interface, for logging and comparison.
    pub fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }
}

impl fmt::Debug for InterfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InterfaceHandle({:#x})", self.addr())
    }
}

/// Parsed form of a requested interface name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceName<'a> {
    /// A plain versioned interface, e.g. `IVRSystem_022`.
    Native(&'a str),
    /// A C function-table binding of an underlying native interface.
    FnTable { underlying: &'a str },
}

impl<'a> InterfaceName<'a> {
    pub fn parse(name: &'a str) -> Self {
        name.strip_prefix(FN_TABLE_PREFIX)
            .and_then(|rest| rest.strip_prefix(FN_TABLE_DELIMITER))
            .filter(|underlying| !underlying.is_empty())
            .map(|underlying| InterfaceName::FnTable { underlying })
            .unwrap_or(InterfaceName::Native(name))
    }

    /// Native interface that must be resolved before this one, if any.
    pub fn underlying(&self) -> Option<&'a str> {
        match self {
            InterfaceName::Native(_) => None,
            InterfaceName::FnTable { underlying } => Some(underlying),
        }
    }
}

/// Derived binding name for a native interface.
pub fn fn_table_name(version: &str) -> String {
    format!("{}{}{}", FN_TABLE_PREFIX, FN_TABLE_DELIMITER, version)
}

/// Capability interfaces with dedicated accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    System,
    Chaperone,
    ChaperoneSetup,
    Compositor,
    Overlay,
    RenderModels,
    ExtendedDisplay,
    Settings,
    Applications,
    TrackedCamera,
    Notifications,
}

impl Capability {
    pub const ALL: [Capability; 11] = [
        Capability::System,
        Capability::Chaperone,
        Capability::ChaperoneSetup,
        Capability::Compositor,
        Capability::Overlay,
        Capability::RenderModels,
        Capability::ExtendedDisplay,
        Capability::Settings,
        Capability::Applications,
        Capability::TrackedCamera,
        Capability::Notifications,
    ];

    /// Interface version name requested from the backend.
    pub fn version(self) -> &'static str {
        match self {
            Capability::System => "IVRSystem_022",
            Capability::Chaperone => "IVRChaperone_004",
            Capability::ChaperoneSetup => "IVRChaperoneSetup_006",
            Capability::Compositor => "IVRCompositor_027",
            Capability::Overlay => "IVROverlay_027",
            Capability::RenderModels => "IVRRenderModels_006",
            Capability::ExtendedDisplay => "IVRExtendedDisplay_001",
            Capability::Settings => "IVRSettings_003",
            Capability::Applications => "IVRApplications_007",
            Capability::TrackedCamera => "IVRTrackedCamera_006",
            Capability::Notifications => "IVRNotifications_002",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.version())
    }
}

/// Kind of application initializing the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum ApplicationType {
    Other = 0,
    #[default]
    Scene = 1,
    Overlay = 2,
    Background = 3,
    Utility = 4,
    VRMonitor = 5,
    SteamWatchdog = 6,
    Bootstrapper = 7,
    WebHelper = 8,
    OpenXRInstance = 9,
    OpenXRScene = 10,
    OpenXROverlay = 11,
    Prism = 12,
    RoomView = 13,
}

impl ApplicationType {
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationType::Other => "other",
            ApplicationType::Scene => "scene",
            ApplicationType::Overlay => "overlay",
            ApplicationType::Background => "background",
            ApplicationType::Utility => "utility",
            ApplicationType::VRMonitor => "vr-monitor",
            ApplicationType::SteamWatchdog => "steam-watchdog",
            ApplicationType::Bootstrapper => "bootstrapper",
            ApplicationType::WebHelper => "web-helper",
            ApplicationType::OpenXRInstance => "openxr-instance",
            ApplicationType::OpenXRScene => "openxr-scene",
            ApplicationType::OpenXROverlay => "openxr-overlay",
            ApplicationType::Prism => "prism",
            ApplicationType::RoomView => "room-view",
        }
    }

    const ALL: [ApplicationType; 14] = [
        ApplicationType::Other,
        ApplicationType::Scene,
        ApplicationType::Overlay,
        ApplicationType::Background,
        ApplicationType::Utility,
        ApplicationType::VRMonitor,
        ApplicationType::SteamWatchdog,
        ApplicationType::Bootstrapper,
        ApplicationType::WebHelper,
        ApplicationType::OpenXRInstance,
        ApplicationType::OpenXRScene,
        ApplicationType::OpenXROverlay,
        ApplicationType::Prism,
        ApplicationType::RoomView,
    ];
}

impl FromStr for ApplicationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == wanted)
            .ok_or_else(|| {
                let valid: Vec<_> = Self::ALL.iter().map(|ty| ty.as_str()).collect();
                format!("unknown application type '{}', expected one of: {}", s, valid.join(", "))
            })
    }
}

impl fmt::Display for ApplicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
