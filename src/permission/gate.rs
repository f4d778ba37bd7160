//! Permission gate in front of camera initialization.

use super::{Permission, PermissionRegistry};
use crate::activity::{ActivityEvent, EventSender};
use crate::session::LifecycleOwner;
use std::sync::Arc;
use std::thread;
use tokio::sync::oneshot;

/// Request code attached to the gate's permission requests.
pub const REQUEST_CODE_PERMISSIONS: u32 = 20;

/// Permissions the camera flow cannot run without.
pub const REQUIRED_PERMISSIONS: &[Permission] = &[Permission::Camera];

/// What to do with a permission result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The result belongs to a request this gate did not issue.
    Ignored,
    /// Every required permission is granted.
    Granted,
    /// At least one required permission is missing.
    Denied,
}

/// Decides whether camera initialization may proceed.
pub struct PermissionGate {
    registry: Arc<dyn PermissionRegistry>,
    required: Vec<Permission>,
    request_code: u32,
}

impl PermissionGate {
    /// Gate over [`REQUIRED_PERMISSIONS`].
    pub fn new(registry: Arc<dyn PermissionRegistry>) -> Self {
        Self::with_required(registry, REQUIRED_PERMISSIONS.to_vec(), REQUEST_CODE_PERMISSIONS)
    }

    /// Gate over `required`, answering results tagged `request_code`.
    pub fn with_required(
        registry: Arc<dyn PermissionRegistry>,
        required: Vec<Permission>,
        request_code: u32,
    ) -> Self {
        Self {
            registry,
            required,
            request_code,
        }
    }

    /// Code attached to this gate's requests.
    pub fn request_code(&self) -> u32 {
        self.request_code
    }

    /// True iff every required permission is granted right now.
    pub fn all_permissions_granted(&self) -> bool {
        self.required
            .iter()
            .all(|&permission| self.registry.check_granted(permission))
    }

    /// Asks for the required permissions on a detached thread.
    ///
    /// The answer arrives as [`ActivityEvent::PermissionsResult`] unless the
    /// lifecycle ends first.
    pub fn request_permissions(&self, owner: &LifecycleOwner, events: &EventSender) {
        let registry = Arc::clone(&self.registry);
        let permissions = self.required.clone();
        let request_code = self.request_code;
        let events = events.clone();

        tracing::info!(?permissions, request_code, "Requesting permissions");
        // Never joined: an unanswered prompt must not hold up runtime shutdown
        let (answered_tx, answered) = oneshot::channel();
        let spawned = thread::Builder::new()
            .name("snapcam-permissions".into())
            .spawn(move || {
                registry.request(&permissions);
                let _ = answered_tx.send(());
            });
        if let Err(e) = spawned {
            tracing::warn!(error = %e, "Could not start permission request");
        }

        owner.spawn(async move {
            if answered.await.is_err() {
                tracing::warn!("Permission request ended without an answer");
            }
            let _ = events.send(ActivityEvent::PermissionsResult { request_code });
        });
    }

    /// Interprets a permission result delivered for `request_code`.
    pub fn on_request_permissions_result(&self, request_code: u32) -> GateDecision {
        if request_code != self.request_code {
            tracing::debug!(request_code, "Ignoring result for a foreign permission request");
            return GateDecision::Ignored;
        }
        if self.all_permissions_granted() {
            GateDecision::Granted
        } else {
            GateDecision::Denied
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::{MemoryPermissions, PermissionStatus};
    use proptest::prelude::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn memory(status: PermissionStatus) -> Arc<MemoryPermissions> {
        Arc::new(MemoryPermissions::new().with_status(Permission::Camera, status))
    }

    #[test]
    fn test_granted_passes() {
        let gate = PermissionGate::new(memory(PermissionStatus::Granted));
        assert!(gate.all_permissions_granted());
    }

    #[test]
    fn test_undecided_fails() {
        let gate = PermissionGate::new(memory(PermissionStatus::Prompt));
        assert!(!gate.all_permissions_granted());
    }

    #[test]
    fn test_empty_required_set_passes() {
        let gate = PermissionGate::with_required(memory(PermissionStatus::Denied), vec![], 1);
        assert!(gate.all_permissions_granted());
    }

    #[test]
    fn test_foreign_request_code_ignored() {
        let gate = PermissionGate::new(memory(PermissionStatus::Granted));
        assert_eq!(
            gate.on_request_permissions_result(REQUEST_CODE_PERMISSIONS + 1),
            GateDecision::Ignored
        );
        assert_eq!(
            gate.on_request_permissions_result(REQUEST_CODE_PERMISSIONS),
            GateDecision::Granted
        );
    }

    #[test]
    fn test_status_is_read_fresh() {
        let registry = memory(PermissionStatus::Denied);
        let gate = PermissionGate::new(registry.clone());
        assert_eq!(
            gate.on_request_permissions_result(REQUEST_CODE_PERMISSIONS),
            GateDecision::Denied
        );

        registry.set(Permission::Camera, PermissionStatus::Granted);
        assert!(gate.all_permissions_granted());
    }

    #[tokio::test]
    async fn test_request_delivers_result_event() {
        let registry = Arc::new(MemoryPermissions::new().granting_on_request());
        let gate = PermissionGate::new(registry.clone());
        let owner = LifecycleOwner::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        gate.request_permissions(&owner, &tx);

        match rx.recv().await {
            Some(ActivityEvent::PermissionsResult { request_code }) => {
                assert_eq!(request_code, REQUEST_CODE_PERMISSIONS);
                assert_eq!(
                    gate.on_request_permissions_result(request_code),
                    GateDecision::Granted
                );
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(registry.request_count(), 1);
    }

    /// Blocks in `request` until released.
    struct StalledPrompt(std::sync::Mutex<std::sync::mpsc::Receiver<()>>);

    impl PermissionRegistry for StalledPrompt {
        fn check_granted(&self, _permission: Permission) -> bool {
            false
        }

        fn request(&self, _permissions: &[Permission]) {
            let _ = self.0.lock().unwrap().recv();
        }
    }

    #[test]
    fn test_unanswered_prompt_does_not_block_shutdown() {
        let (release, stalled) = std::sync::mpsc::channel::<()>();
        let gate = PermissionGate::new(Arc::new(StalledPrompt(std::sync::Mutex::new(stalled))));
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        runtime.block_on(async {
            let owner = LifecycleOwner::new();
            gate.request_permissions(&owner, &tx);
            tokio::task::yield_now().await;
            owner.destroy();
        });

        let (dropped_tx, dropped) = std::sync::mpsc::channel();
        thread::spawn(move || {
            drop(runtime);
            let _ = dropped_tx.send(());
        });
        assert!(dropped.recv_timeout(Duration::from_secs(3)).is_ok());
        assert!(rx.try_recv().is_err());

        let _ = release.send(());
    }

    fn any_status() -> impl Strategy<Value = PermissionStatus> {
        prop_oneof![
            Just(PermissionStatus::Granted),
            Just(PermissionStatus::Denied),
            Just(PermissionStatus::Prompt),
        ]
    }

    proptest! {
        #[test]
        fn prop_gate_passes_iff_every_permission_granted(
            copies in 0usize..4,
            status in any_status(),
        ) {
            let required = vec![Permission::Camera; copies];
            let expected = required.is_empty() || status == PermissionStatus::Granted;

            let gate = PermissionGate::with_required(memory(status), required, 7);
            prop_assert_eq!(gate.all_permissions_granted(), expected);
            // Checking never changes the registry
            prop_assert_eq!(gate.all_permissions_granted(), expected);
        }
    }
}
