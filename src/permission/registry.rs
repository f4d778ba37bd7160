//! Permission registries.
//!
//! A registry answers whether a permission is granted right now and can
//! ask the user for it. Requests block, so callers run them off the UI
//! context.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

/// Runtime permissions the activity may need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Access to the camera device.
    Camera,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Camera => f.write_str("camera"),
        }
    }
}

/// Grant state of a single permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionStatus {
    /// The user allowed it.
    Granted,
    /// The user refused it.
    Denied,
    /// Not decided yet; a request will ask.
    #[default]
    Prompt,
}

/// Source of truth for permission grants.
pub trait PermissionRegistry: Send + Sync {
    /// Returns true if `permission` is currently granted.
    fn check_granted(&self, permission: Permission) -> bool;

    /// Asks for `permissions` and records the answers. Blocks until done.
    fn request(&self, permissions: &[Permission]);
}

/// In-memory permission table.
///
/// Undecided permissions resolve to a fixed answer when requested.
#[derive(Debug, Default)]
pub struct MemoryPermissions {
    statuses: RwLock<HashMap<Permission, PermissionStatus>>,
    grant_on_request: bool,
    requests: AtomicUsize,
}

impl MemoryPermissions {
    /// Every permission undecided; requests deny.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial status of `permission`.
    pub fn with_status(self, permission: Permission, status: PermissionStatus) -> Self {
        self.set(permission, status);
        self
    }

    /// Makes requests grant undecided permissions.
    pub fn granting_on_request(mut self) -> Self {
        self.grant_on_request = true;
        self
    }

    /// Records `status` for `permission`.
    pub fn set(&self, permission: Permission, status: PermissionStatus) {
        if let Ok(mut statuses) = self.statuses.write() {
            statuses.insert(permission, status);
        }
    }

    /// Current status of `permission`.
    pub fn status(&self, permission: Permission) -> PermissionStatus {
        self.statuses
            .read()
            .ok()
            .and_then(|statuses| statuses.get(&permission).copied())
            .unwrap_or_default()
    }

    /// Number of requests issued so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl PermissionRegistry for MemoryPermissions {
    fn check_granted(&self, permission: Permission) -> bool {
        self.status(permission) == PermissionStatus::Granted
    }

    fn request(&self, permissions: &[Permission]) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let answer = if self.grant_on_request {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };
        for &permission in permissions {
            if self.status(permission) == PermissionStatus::Prompt {
                self.set(permission, answer);
            }
        }
    }
}

/// Asks on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPermissions {
    store: MemoryPermissions,
}

impl TerminalPermissions {
    /// Starts with every permission undecided.
    pub fn new() -> Self {
        Self::default()
    }

    fn ask(&self, permission: Permission) -> io::Result<bool> {
        let mut stdout = io::stdout();
        write!(stdout, "Allow access to the {permission}? [y/N] ")?;
        stdout.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(matches!(
            answer.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    }
}

impl PermissionRegistry for TerminalPermissions {
    fn check_granted(&self, permission: Permission) -> bool {
        self.store.check_granted(permission)
    }

    fn request(&self, permissions: &[Permission]) {
        for &permission in permissions {
            if self.store.check_granted(permission) {
                continue;
            }
            let granted = self.ask(permission).unwrap_or_else(|e| {
                tracing::warn!(%permission, error = %e, "Could not read permission answer");
                false
            });
            let status = if granted {
                PermissionStatus::Granted
            } else {
                PermissionStatus::Denied
            };
            self.store.set(permission, status);
        }
    }
}

/// Camera authorization as reported by the operating system.
///
/// Only macOS gates camera access at this level; elsewhere `nokhwa`
/// reports access as granted.
#[cfg(feature = "camera")]
#[derive(Debug, Default)]
pub struct NokhwaPermissions;

#[cfg(feature = "camera")]
impl PermissionRegistry for NokhwaPermissions {
    fn check_granted(&self, permission: Permission) -> bool {
        match permission {
            Permission::Camera => nokhwa::nokhwa_check(),
        }
    }

    fn request(&self, permissions: &[Permission]) {
        if !permissions.contains(&Permission::Camera) {
            return;
        }
        let (tx, rx) = std::sync::mpsc::channel();
        nokhwa::nokhwa_initialize(move |granted| {
            let _ = tx.send(granted);
        });
        match rx.recv() {
            Ok(granted) => tracing::debug!(granted, "System camera authorization answered"),
            Err(_) => tracing::warn!("System camera authorization never answered"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undecided_is_not_granted() {
        let permissions = MemoryPermissions::new();
        assert_eq!(permissions.status(Permission::Camera), PermissionStatus::Prompt);
        assert!(!permissions.check_granted(Permission::Camera));
    }

    #[test]
    fn test_request_resolves_prompt() {
        let granting = MemoryPermissions::new().granting_on_request();
        granting.request(&[Permission::Camera]);
        assert!(granting.check_granted(Permission::Camera));

        let denying = MemoryPermissions::new();
        denying.request(&[Permission::Camera]);
        assert_eq!(denying.status(Permission::Camera), PermissionStatus::Denied);
        assert_eq!(denying.request_count(), 1);
    }

    #[test]
    fn test_request_keeps_decided_status() {
        let permissions = MemoryPermissions::new()
            .with_status(Permission::Camera, PermissionStatus::Denied)
            .granting_on_request();
        permissions.request(&[Permission::Camera]);
        assert!(!permissions.check_granted(Permission::Camera));
    }
}
