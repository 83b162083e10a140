//! Scoped resources released when a dispatch ends.

use std::panic::AssertUnwindSafe;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::Mutex;

/// Deferred release of a resource acquired during resolution.
pub type Cleanup = BoxFuture<'static, ()>;

/// Wrap a future as a cleanup.
pub fn cleanup<F>(future: F) -> Cleanup
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    Box::pin(future)
}

/// Cleanups registered during one dispatch, released in reverse order.
#[derive(Default)]
pub struct ResourceScope {
    cleanups: Mutex<Vec<(&'static str, Cleanup)>>,
}

impl ResourceScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, resource: &'static str, cleanup: Cleanup) {
        self.cleanups.lock().await.push((resource, cleanup));
    }

    pub async fn pending(&self) -> usize {
        self.cleanups.lock().await.len()
    }

    /// Run every cleanup, most recent first. A panicking cleanup is logged
    /// and does not prevent the rest from running.
    pub async fn close(&self) {
        let cleanups = std::mem::take(&mut *self.cleanups.lock().await);
        for (resource, cleanup) in cleanups.into_iter().rev() {
            if AssertUnwindSafe(cleanup).catch_unwind().await.is_err() {
                tracing::error!(resource, "Resource cleanup panicked");
            }
        }
    }
}
