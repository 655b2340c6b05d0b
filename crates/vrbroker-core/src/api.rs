//! Free functions over the process-wide broker.

use std::path::PathBuf;

use crate::broker::{Broker, InitToken, RuntimePathCopy};
use crate::error::{description_for_code, symbol_for_code, InitError, Result};
use crate::interfaces::{ApplicationType, InterfaceHandle};

/// Load and initialize the backend.
pub fn init(app_type: ApplicationType, startup_info: Option<&str>) -> Result<InitToken> {
    Broker::global().init(app_type, startup_info)
}

/// Unload the backend. Interfaces obtained earlier must not be used.
pub fn shutdown() {
    Broker::global().shutdown()
}

pub fn init_token() -> InitToken {
    Broker::global().init_token()
}

pub fn get_generic_interface(version: &str) -> Result<InterfaceHandle> {
    Broker::global().get_generic_interface(version)
}

pub fn is_interface_version_valid(version: &str) -> bool {
    Broker::global().is_interface_version_valid(version)
}

pub fn is_hmd_present() -> bool {
    Broker::global().is_hmd_present()
}

pub fn is_runtime_installed() -> bool {
    Broker::global().is_runtime_installed()
}

pub fn runtime_path() -> Option<PathBuf> {
    Broker::global().runtime_path()
}

pub fn copy_runtime_path(buffer: &mut [u8]) -> RuntimePathCopy {
    Broker::global().copy_runtime_path(buffer)
}

/// Symbolic name for a raw error code, `0` included.
pub fn init_error_as_symbol(code: i32) -> String {
    match InitError::from_code(code) {
        Some(error) => Broker::global().error_symbol(error),
        None => symbol_for_code(code),
    }
}

/// English description for a raw error code, `0` included.
pub fn init_error_as_english_description(code: i32) -> String {
    match InitError::from_code(code) {
        Some(error) => Broker::global().error_description(error),
        None => description_for_code(code),
    }
}
