//! Platform-specific layout of a runtime installation.
//!
//! The backend library lives under `<runtime>/bin`, in a per-platform
//! subdirectory on 64-bit Linux, with a file name that differs by operating
//! system and pointer width.

use std::fmt;
use std::path::{Path, PathBuf};

/// Operating system family of the backend build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetOs {
    Windows,
    Linux,
    MacOs,
}

/// CPU architecture of the backend build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetArch {
    X86,
    X86_64,
    Aarch64,
}

impl TargetArch {
    pub fn is_64_bit(self) -> bool {
        matches!(self, TargetArch::X86_64 | TargetArch::Aarch64)
    }
}

/// Where the backend library sits inside a runtime directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleLayout {
    pub os: TargetOs,
    pub arch: TargetArch,
}

impl ModuleLayout {
    pub const fn new(os: TargetOs, arch: TargetArch) -> Self {
        Self { os, arch }
    }

    /// Layout matching the running process.
    pub fn host() -> Self {
        let os = if cfg!(windows) {
            TargetOs::Windows
        } else if cfg!(target_os = "macos") {
            TargetOs::MacOs
        } else {
            TargetOs::Linux
        };

        let arch = if cfg!(target_arch = "aarch64") {
            TargetArch::Aarch64
        } else if cfg!(target_pointer_width = "64") {
            TargetArch::X86_64
        } else {
            TargetArch::X86
        };

        Self { os, arch }
    }

    /// Platform subdirectory under `bin`, if any.
    pub fn platform_subdir(&self) -> Option<&'static str> {
        match (self.os, self.arch) {
            (TargetOs::Linux, TargetArch::X86_64) => Some("linux64"),
            (TargetOs::Linux, TargetArch::Aarch64) => Some("linuxarm64"),
            _ => None,
        }
    }

    /// Directory that must exist for the installation to be considered intact.
    pub fn bin_dir(&self, runtime: &Path) -> PathBuf {
        let bin = runtime.join("bin");
        match self.platform_subdir() {
            Some(subdir) => bin.join(subdir),
            None => bin,
        }
    }

    /// Extension used for shared libraries, including the leading dot.
    pub fn library_extension(&self) -> &'static str {
        match self.os {
            TargetOs::Windows => ".dll",
            TargetOs::Linux => ".so",
            TargetOs::MacOs => ".dylib",
        }
    }

    /// File name of the backend library.
    pub fn module_file_name(&self) -> String {
        let stem = match (self.os, self.arch.is_64_bit()) {
            (TargetOs::Windows, true) => "vrclient_x64",
            _ => "vrclient",
        };
        format!("{}{}", stem, self.library_extension())
    }

    /// Full path of the backend library for a runtime directory.
    pub fn module_path(&self, runtime: &Path) -> PathBuf {
        self.bin_dir(runtime).join(self.module_file_name())
    }
}

impl Default for ModuleLayout {
    fn default() -> Self {
        Self::host()
    }
}

impl fmt::Display for ModuleLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", self.os, self.arch)
    }
}
