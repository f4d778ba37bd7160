//! Lifecycle scope for camera outputs and asynchronous continuations.

use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// The scope camera outputs are bound to.
///
/// Tasks spawned through [`LifecycleOwner::spawn`] are dropped at their
/// next suspension point once the owner is destroyed, so a late result
/// never reaches a torn-down activity.
#[derive(Debug, Clone, Default)]
pub struct LifecycleOwner {
    token: CancellationToken,
}

impl LifecycleOwner {
    /// Creates a live lifecycle.
    pub fn new() -> Self {
        Self::default()
    }

    /// True once `destroy` has been called.
    pub fn is_destroyed(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Ends the lifecycle. Idempotent.
    pub fn destroy(&self) {
        if !self.token.is_cancelled() {
            self.token.cancel();
            tracing::debug!("Lifecycle destroyed");
        }
    }

    /// Resolves once the lifecycle has been destroyed.
    pub async fn destroyed(&self) {
        self.token.cancelled().await
    }

    /// Spawns `future` bound to this lifecycle.
    ///
    /// The task resolves to `None` if the lifecycle ended first.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<Option<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                output = future => Some(output),
            }
        })
    }
}
