//! Runtime permission checks.
//!
//! The [`PermissionGate`] holds the fixed set of permissions the camera
//! flow needs and consults a [`PermissionRegistry`] every time it is asked.
//! Nothing is cached between checks.

mod gate;
mod registry;

pub use gate::{GateDecision, PermissionGate, REQUEST_CODE_PERMISSIONS, REQUIRED_PERMISSIONS};
#[cfg(feature = "camera")]
pub use registry::NokhwaPermissions;
pub use registry::{
    MemoryPermissions, Permission, PermissionRegistry, PermissionStatus, TerminalPermissions,
};
