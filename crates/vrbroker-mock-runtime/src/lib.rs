//! Mock backend runtime
//!
//! A stand-in for the runtime's client library. It exports the factory
//! symbol and a client core that hands out a fixed set of interfaces, so the
//! native loading path can be exercised without a real runtime installed.
//!
//! Copy the built library to `ModuleLayout::module_path` inside a runtime
//! directory and point the path registry at that directory.

use std::ffi::{c_char, c_int, c_void, CStr};
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

use vrbroker_core::error::{InitError, INIT_ERROR_NONE};
use vrbroker_core::interfaces::CLIENT_CORE_VERSION;
use vrbroker_core::native::{ClientCoreVtable, RawClientCore};

/// Interfaces served by the mock client core.
pub const PROVIDED_INTERFACES: &[&str] = &[
    "IVRSystem_022",
    "FnTable:IVRSystem_022",
    "IVRCompositor_027",
    "FnTable:IVRCompositor_027",
    "IVRSettings_003",
];

/// Placeholder object behind every served interface.
#[repr(C)]
#[allow(dead_code)]
struct MockInterface {
    index: usize,
}

static INTERFACES: [MockInterface; 5] = [
    MockInterface { index: 0 },
    MockInterface { index: 1 },
    MockInterface { index: 2 },
    MockInterface { index: 3 },
    MockInterface { index: 4 },
];

static INIT_CALLS: AtomicUsize = AtomicUsize::new(0);
static CLEANUP_CALLS: AtomicUsize = AtomicUsize::new(0);
static LAST_APP_TYPE: AtomicI32 = AtomicI32::new(-1);

static VTABLE: ClientCoreVtable = ClientCoreVtable {
    init,
    cleanup,
    is_interface_version_valid,
    get_generic_interface,
    is_hmd_present,
    english_string_for_error,
    id_for_error,
};

struct CoreCell(RawClientCore);

// SAFETY: the core is immutable; it only points at the static vtable.
unsafe impl Sync for CoreCell {}

static CLIENT_CORE: CoreCell = CoreCell(RawClientCore { vtable: &VTABLE });

fn interface_index(version: *const c_char) -> Option<usize> {
    if version.is_null() {
        return None;
    }
    // SAFETY: callers pass NUL-terminated strings.
    let version = unsafe { CStr::from_ptr(version) }.to_str().ok()?;
    PROVIDED_INTERFACES.iter().position(|name| *name == version)
}

unsafe extern "C" fn init(
    _this: *mut RawClientCore,
    application_type: c_int,
    _startup_info: *const c_char,
) -> c_int {
    INIT_CALLS.fetch_add(1, Ordering::SeqCst);
    LAST_APP_TYPE.store(application_type, Ordering::SeqCst);
    INIT_ERROR_NONE
}

unsafe extern "C" fn cleanup(_this: *mut RawClientCore) {
    CLEANUP_CALLS.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "C" fn is_interface_version_valid(
    _this: *mut RawClientCore,
    version: *const c_char,
) -> c_int {
    match interface_index(version) {
        Some(_) => INIT_ERROR_NONE,
        None => InitError::InterfaceNotFound.code(),
    }
}

unsafe extern "C" fn get_generic_interface(
    _this: *mut RawClientCore,
    version: *const c_char,
    error: *mut c_int,
) -> *mut c_void {
    let (ptr, code) = match interface_index(version) {
        Some(index) => (
            &INTERFACES[index] as *const MockInterface as *mut c_void,
            INIT_ERROR_NONE,
        ),
        None => (std::ptr::null_mut(), InitError::InterfaceNotFound.code()),
    };
    if !error.is_null() {
        *error = code;
    }
    ptr
}

unsafe extern "C" fn is_hmd_present(_this: *mut RawClientCore) -> bool {
    true
}

unsafe extern "C" fn english_string_for_error(
    _this: *mut RawClientCore,
    error: c_int,
) -> *const c_char {
    if error == INIT_ERROR_NONE {
        c"No Error (0)".as_ptr()
    } else {
        c"Mock runtime error".as_ptr()
    }
}

/// Returns null so callers fall back to their own names.
unsafe extern "C" fn id_for_error(_this: *mut RawClientCore, _error: c_int) -> *const c_char {
    std::ptr::null()
}

/// Factory entry point looked up by the broker.
///
/// # Safety
///
/// `interface_name` must be null or NUL-terminated; `return_code` must be
/// null or writable.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn VRClientCoreFactory(
    interface_name: *const c_char,
    return_code: *mut c_int,
) -> *mut c_void {
    let is_core = !interface_name.is_null()
        && CStr::from_ptr(interface_name).to_bytes() == CLIENT_CORE_VERSION.as_bytes();

    let (ptr, code) = if is_core {
        (
            &CLIENT_CORE.0 as *const RawClientCore as *mut c_void,
            INIT_ERROR_NONE,
        )
    } else {
        (std::ptr::null_mut(), InitError::InterfaceNotFound.code())
    };

    if !return_code.is_null() {
        *return_code = code;
    }
    ptr
}

/// Number of client-core init calls since the library was loaded.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn VRMockRuntime_InitCalls() -> usize {
    INIT_CALLS.load(Ordering::SeqCst)
}

/// Number of client-core cleanup calls since the library was loaded.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn VRMockRuntime_CleanupCalls() -> usize {
    CLEANUP_CALLS.load(Ordering::SeqCst)
}

/// Application type passed to the last init, or `-1`.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn VRMockRuntime_LastAppType() -> c_int {
    LAST_APP_TYPE.load(Ordering::SeqCst)
}
