//! macOS-specific helpers.

pub mod menu;

use cocoa::base::{id, nil};
use cocoa::foundation::NSString;
use std::ffi::CStr;

/// Converts an `NSString` into an owned string. `nil` and empty become `None`.
///
/// # Safety
/// `s` must be `nil` or a valid `NSString`.
pub(crate) unsafe fn ns_to_string(s: id) -> Option<String> {
    if s == nil {
        return None;
    }
    let ptr = s.UTF8String();
    if ptr.is_null() {
        return None;
    }
    let value = CStr::from_ptr(ptr).to_string_lossy().into_owned();
    (!value.is_empty()).then_some(value)
}
