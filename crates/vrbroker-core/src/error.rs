//! Init error codes shared by every broker operation.
//!
//! The numeric values match the backend's own error enumeration, so codes
//! coming back through the factory or the client core map onto the same type.

/// Reason an operation did not produce a usable result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum InitError {
    /// Unspecified failure.
    #[error("Unknown error (1)")]
    Unknown,

    /// The registered runtime directory does not exist.
    #[error("Installation Not Found (100)")]
    InstallationNotFound,

    /// The runtime directory lacks the expected `bin` layout.
    #[error("Installation Corrupt (101)")]
    InstallationCorrupt,

    /// The backend shared library could not be loaded.
    #[error("vrclient Shared Lib Not Found (102)")]
    VRClientDLLNotFound,

    #[error("File Not Found (103)")]
    FileNotFound,

    /// The backend does not export the factory entry point.
    #[error("Factory Function Not Found (104)")]
    FactoryNotFound,

    /// The factory or client core returned no interface for a version name.
    #[error("Interface Not Found (105)")]
    InterfaceNotFound,

    #[error("Invalid Interface (106)")]
    InvalidInterface,

    #[error("User Config Directory Invalid (107)")]
    UserConfigDirectoryInvalid,

    #[error("Hmd Not Found (108)")]
    HmdNotFound,

    /// A lookup was made while no backend is loaded.
    #[error("Not Initialized (109)")]
    NotInitialized,

    /// The path registry could not be read.
    #[error("Installation path could not be located (110)")]
    PathRegistryNotFound,

    #[error("Config path could not be located (111)")]
    NoConfigPath,

    #[error("Log path could not be located (112)")]
    NoLogPath,

    /// A backend-defined code with no dedicated variant.
    #[error("Unknown error ({0})")]
    Other(i32),
}

/// Result type alias for broker operations.
pub type Result<T> = std::result::Result<T, InitError>;

/// Raw value of the success code.
pub const INIT_ERROR_NONE: i32 = 0;

impl InitError {
    /// Numeric code as understood by the backend.
    pub fn code(self) -> i32 {
        match self {
            InitError::Unknown => 1,
            InitError::InstallationNotFound => 100,
            InitError::InstallationCorrupt => 101,
            InitError::VRClientDLLNotFound => 102,
            InitError::FileNotFound => 103,
            InitError::FactoryNotFound => 104,
            InitError::InterfaceNotFound => 105,
            InitError::InvalidInterface => 106,
            InitError::UserConfigDirectoryInvalid => 107,
            InitError::HmdNotFound => 108,
            InitError::NotInitialized => 109,
            InitError::PathRegistryNotFound => 110,
            InitError::NoConfigPath => 111,
            InitError::NoLogPath => 112,
            InitError::Other(code) => code,
        }
    }

    /// Map a raw code to an error. `0` is success and yields `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        let err = match code {
            INIT_ERROR_NONE => return None,
            1 => InitError::Unknown,
            100 => InitError::InstallationNotFound,
            101 => InitError::InstallationCorrupt,
            102 => InitError::VRClientDLLNotFound,
            103 => InitError::FileNotFound,
            104 => InitError::FactoryNotFound,
            105 => InitError::InterfaceNotFound,
            106 => InitError::InvalidInterface,
            107 => InitError::UserConfigDirectoryInvalid,
            108 => InitError::HmdNotFound,
            109 => InitError::NotInitialized,
            110 => InitError::PathRegistryNotFound,
            111 => InitError::NoConfigPath,
            112 => InitError::NoLogPath,
            other => InitError::Other(other),
        };
        Some(err)
    }

    /// Turn a raw code into a `Result`.
    pub fn check(code: i32) -> Result<()> {
        match Self::from_code(code) {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Symbolic name from the built-in table, e.g. `VRInitError_Init_NotInitialized`.
    pub fn symbol(self) -> String {
        let name = match self {
            InitError::Unknown => "Unknown",
            InitError::InstallationNotFound => "Init_InstallationNotFound",
            InitError::InstallationCorrupt => "Init_InstallationCorrupt",
            InitError::VRClientDLLNotFound => "Init_VRClientDLLNotFound",
            InitError::FileNotFound => "Init_FileNotFound",
            InitError::FactoryNotFound => "Init_FactoryNotFound",
            InitError::InterfaceNotFound => "Init_InterfaceNotFound",
            InitError::InvalidInterface => "Init_InvalidInterface",
            InitError::UserConfigDirectoryInvalid => "Init_UserConfigDirectoryInvalid",
            InitError::HmdNotFound => "Init_HmdNotFound",
            InitError::NotInitialized => "Init_NotInitialized",
            InitError::PathRegistryNotFound => "Init_PathRegistryNotFound",
            InitError::NoConfigPath => "Init_NoConfigPath",
            InitError::NoLogPath => "Init_NoLogPath",
            InitError::Other(code) => return format!("Unknown error ({})", code),
        };
        format!("VRInitError_{}", name)
    }

    /// English description from the built-in table.
    pub fn description(self) -> String {
        self.to_string()
    }
}

/// Symbol for a raw code, including the success code.
pub fn symbol_for_code(code: i32) -> String {
    match InitError::from_code(code) {
        None => "VRInitError_None".to_string(),
        Some(err) => err.symbol(),
    }
}

/// English description for a raw code, including the success code.
pub fn description_for_code(code: i32) -> String {
    match InitError::from_code(code) {
        None => "No Error (0)".to_string(),
        Some(err) => err.description(),
    }
}
