//! Public C ABI surface (§6, §7): opaque handles and error codes over [`FilterFederate`]
//! for out-of-scope language bindings. Only the contracts this subsystem exposes are
//! covered here — no attempt is made to mirror the rest of HELICS's much larger public
//! API surface.
//!
//! Every entry point is `catch_unwind`-wrapped so a panic inside Rust (an invariant
//! violation, not an expected error) turns into an error code at the boundary instead of
//! unwinding into the caller's C frames, which is undefined behavior.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use helics_core::endpoint::FilterKind;
use helics_core::error::HelicsError;
use helics_core::ids::{BrokerId, FederateId, InterfaceHandle};
use helics_core::message::Message;
use helics_core::time::Time;

use crate::filter_federate::FilterFederate;
use crate::filters::{self, FilterOperation, FilterOperationKind};

/// Mirrors the error taxonomy of §7, flattened to a stable numeric ABI.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelicsStatus {
    Ok = 0,
    InvalidIdentifier = 1,
    InvalidParameter = 2,
    InvalidFunctionCall = 3,
    RegistrationFailure = 4,
    SystemFailure = 5,
}

impl From<&HelicsError> for HelicsStatus {
    fn from(err: &HelicsError) -> Self {
        match err {
            HelicsError::InvalidIdentifier(_) => Self::InvalidIdentifier,
            HelicsError::InvalidParameter(_) => Self::InvalidParameter,
            HelicsError::InvalidFunctionCall(_) => Self::InvalidFunctionCall,
            HelicsError::RegistrationFailure(_) => Self::RegistrationFailure,
            _ => Self::SystemFailure,
        }
    }
}

/// Opaque handle to a [`FilterFederate`]; the only way a caller across the ABI can refer
/// to one. Freed exactly once, by [`helics_filter_federate_free`].
pub struct HelicsFilterFederate {
    inner: FilterFederate,
}

/// An interface handle, returned by registration calls, passed back into per-interface
/// operations. Not a pointer: it is the same process-local `i64` used internally, so it
/// remains valid for the lifetime of the owning federate with no extra bookkeeping.
pub type HelicsHandle = i64;

/// Invalid-handle sentinel returned on registration failure.
pub const HELICS_INVALID_HANDLE: HelicsHandle = -1;

fn guard<R>(default: R, f: impl FnOnce() -> R) -> R {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or(default)
}

unsafe fn str_from_c(ptr: *const c_char) -> Result<&'static str, HelicsStatus> {
    if ptr.is_null() {
        return Err(HelicsStatus::InvalidParameter);
    }
    CStr::from_ptr(ptr).to_str().map_err(|_| HelicsStatus::InvalidParameter)
}

/// Create a filter federate for core `core_id`, federate `fed_id`, named `name`. Returns
/// a heap-allocated handle the caller owns and must eventually pass to
/// [`helics_filter_federate_free`].
///
/// # Safety
/// `name` must be a valid NUL-terminated C string for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn helics_filter_federate_new(
    fed_id: i64,
    core_id: i64,
    name: *const c_char,
) -> *mut HelicsFilterFederate {
    guard(std::ptr::null_mut(), || {
        let Ok(name) = str_from_c(name) else { return std::ptr::null_mut() };
        let inner = FilterFederate::new(FederateId::new(fed_id), name, BrokerId::new(core_id));
        Box::into_raw(Box::new(HelicsFilterFederate { inner }))
    })
}

/// Release a filter federate handle. Passing the same pointer twice, or a pointer not
/// returned by [`helics_filter_federate_new`], is undefined behavior.
///
/// # Safety
/// `federate` must be a live pointer returned by [`helics_filter_federate_new`] that has
/// not already been freed.
#[no_mangle]
pub unsafe extern "C" fn helics_filter_federate_free(federate: *mut HelicsFilterFederate) {
    if !federate.is_null() {
        drop(Box::from_raw(federate));
    }
}

/// Advance the federate's lifecycle state. Returns [`HelicsStatus::InvalidFunctionCall`]
/// on an illegal transition.
///
/// # Safety
/// `federate` must be a live pointer returned by [`helics_filter_federate_new`].
#[no_mangle]
pub unsafe extern "C" fn helics_filter_federate_enter_initializing(federate: *mut HelicsFilterFederate) -> HelicsStatus {
    guard(HelicsStatus::SystemFailure, || {
        let Some(federate) = federate.as_mut() else { return HelicsStatus::InvalidIdentifier };
        match federate.inner.enter_initializing() {
            Ok(()) => HelicsStatus::Ok,
            Err(e) => HelicsStatus::from(&e),
        }
    })
}

/// # Safety
/// `federate` must be a live pointer returned by [`helics_filter_federate_new`].
#[no_mangle]
pub unsafe extern "C" fn helics_filter_federate_enter_executing(federate: *mut HelicsFilterFederate) -> HelicsStatus {
    guard(HelicsStatus::SystemFailure, || {
        let Some(federate) = federate.as_mut() else { return HelicsStatus::InvalidIdentifier };
        match federate.inner.enter_executing() {
            Ok(()) => HelicsStatus::Ok,
            Err(e) => HelicsStatus::from(&e),
        }
    })
}

/// Register a new endpoint. Returns [`HELICS_INVALID_HANDLE`] on a null/invalid name.
///
/// # Safety
/// `federate` must be a live pointer; `name` a valid NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn helics_register_endpoint(
    federate: *mut HelicsFilterFederate,
    name: *const c_char,
) -> HelicsHandle {
    guard(HELICS_INVALID_HANDLE, || {
        let Some(federate) = federate.as_mut() else { return HELICS_INVALID_HANDLE };
        let Ok(name) = str_from_c(name) else { return HELICS_INVALID_HANDLE };
        let local_handle = InterfaceHandle::new(federate.inner.handle_count());
        federate.inner.register_endpoint(name, local_handle);
        local_handle.value()
    })
}

/// Identifies which [`FilterOperation`] a filter created across the ABI runs, since the
/// C side has no way to construct a trait object directly.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelicsFilterType {
    Delay = 0,
    RandomDrop = 1,
    Reroute = 2,
    Clone = 3,
}

impl From<HelicsFilterType> for FilterOperationKind {
    fn from(kind: HelicsFilterType) -> Self {
        match kind {
            HelicsFilterType::Delay => Self::Delay,
            HelicsFilterType::RandomDrop => Self::RandomDrop,
            HelicsFilterType::Reroute => Self::Reroute,
            HelicsFilterType::Clone => Self::Clone,
        }
    }
}

fn build_operation(kind: HelicsFilterType) -> Arc<dyn FilterOperation> {
    filters::build(kind.into())
}

/// Register a new filter of the given type, attached (source-side unless `cloning` is
/// set on the destination) to `target`. Returns [`HELICS_INVALID_HANDLE`] on a null or
/// invalid name/target.
///
/// # Safety
/// `federate` must be a live pointer; `name` and `target` valid NUL-terminated C strings.
#[no_mangle]
pub unsafe extern "C" fn helics_register_filter(
    federate: *mut HelicsFilterFederate,
    kind: HelicsFilterType,
    name: *const c_char,
    target: *const c_char,
    cloning: bool,
    source_side: bool,
) -> HelicsHandle {
    guard(HELICS_INVALID_HANDLE, || {
        let Some(federate) = federate.as_mut() else { return HELICS_INVALID_HANDLE };
        let Ok(name) = str_from_c(name) else { return HELICS_INVALID_HANDLE };
        let Ok(target) = str_from_c(target) else { return HELICS_INVALID_HANDLE };
        let filter_kind = if source_side { FilterKind::Source } else { FilterKind::Destination };
        let local_handle = InterfaceHandle::new(federate.inner.handle_count());
        let operation = build_operation(kind);
        let key = federate
            .inner
            .create_filter(name, local_handle, filter_kind, target, cloning, operation);
        federate.inner.filter_handle(key).map(|h| h.value()).unwrap_or(HELICS_INVALID_HANDLE)
    })
}

/// Set a numeric property (e.g. `"delay"`) on a previously registered filter.
///
/// # Safety
/// `federate` must be a live pointer; `property` a valid NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn helics_filter_set_property(
    federate: *mut HelicsFilterFederate,
    filter: HelicsHandle,
    property: *const c_char,
    value: f64,
) -> HelicsStatus {
    guard(HelicsStatus::SystemFailure, || {
        let Some(federate) = federate.as_mut() else { return HelicsStatus::InvalidIdentifier };
        let Ok(property) = str_from_c(property) else { return HelicsStatus::InvalidParameter };
        match federate.inner.set_filter_property(InterfaceHandle::new(filter), property, value) {
            Ok(()) => HelicsStatus::Ok,
            Err(e) => HelicsStatus::from(&e),
        }
    })
}

/// Run `payload` (as a raw byte buffer) through `endpoint_name`'s source filter chain,
/// returning the delivery time of the (possibly retimed) primary message, or a negative
/// value if the message was dropped.
///
/// # Safety
/// `federate` must be a live pointer; `endpoint_name`/`destination` valid NUL-terminated
/// C strings; `payload` must point to at least `payload_len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn helics_send_message(
    federate: *mut HelicsFilterFederate,
    endpoint_name: *const c_char,
    destination: *const c_char,
    payload: *const u8,
    payload_len: usize,
    send_time: f64,
) -> f64 {
    guard(-1.0, || {
        let Some(federate) = federate.as_mut() else { return -1.0 };
        let Ok(endpoint_name) = str_from_c(endpoint_name) else { return -1.0 };
        let Ok(destination) = str_from_c(destination) else { return -1.0 };
        if payload.is_null() && payload_len > 0 {
            return -1.0;
        }
        let bytes = if payload_len == 0 { Vec::new() } else { std::slice::from_raw_parts(payload, payload_len).to_vec() };
        let message = Message::new(endpoint_name, destination, bytes, Time::new(send_time));
        match federate.inner.process_message(endpoint_name, message) {
            (Some(delivered), _) => delivered.time.as_seconds(),
            (None, _) => -1.0,
        }
    })
}

/// Translate a status code into a static, human-readable description. The returned
/// pointer is valid for the lifetime of the process and must not be freed.
#[no_mangle]
pub extern "C" fn helics_status_describe(status: HelicsStatus) -> *const c_char {
    static DESCRIPTIONS: [&str; 6] = [
        "ok\0",
        "invalid identifier\0",
        "invalid parameter\0",
        "invalid function call\0",
        "registration failure\0",
        "system failure\0",
    ];
    let index = status as usize;
    DESCRIPTIONS
        .get(index)
        .map(|s| s.as_ptr() as *const c_char)
        .unwrap_or_else(|| DESCRIPTIONS[0].as_ptr() as *const c_char)
}

/// Allocate a C string copy of `text`; caller must free it with
/// [`helics_free_string`]. Used by bindings that need an owned error message rather than
/// a status code.
pub fn to_owned_c_string(text: &str) -> *mut c_char {
    CString::new(text).map(CString::into_raw).unwrap_or(std::ptr::null_mut())
}

/// # Safety
/// `ptr` must have been returned by [`to_owned_c_string`] and not already freed.
#[no_mangle]
pub unsafe extern "C" fn helics_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn lifecycle_round_trips_through_the_abi() {
        unsafe {
            let name = CString::new("fed").unwrap();
            let federate = helics_filter_federate_new(1, 1, name.as_ptr());
            assert!(!federate.is_null());
            assert_eq!(helics_filter_federate_enter_initializing(federate), HelicsStatus::Ok);
            assert_eq!(helics_filter_federate_enter_executing(federate), HelicsStatus::Ok);

            let endpoint = CString::new("port2").unwrap();
            let handle = helics_register_endpoint(federate, endpoint.as_ptr());
            assert_ne!(handle, HELICS_INVALID_HANDLE);

            helics_filter_federate_free(federate);
        }
    }

    #[test]
    fn null_name_is_rejected_without_panicking() {
        unsafe {
            let federate = helics_filter_federate_new(1, 1, std::ptr::null());
            assert!(federate.is_null());
        }
    }

    #[test]
    fn status_descriptions_are_nul_terminated() {
        let ptr = helics_status_describe(HelicsStatus::InvalidParameter);
        let text = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap();
        assert_eq!(text, "invalid parameter");
    }
}
