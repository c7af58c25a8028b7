//! Provisioning daemon wake-up abstraction

use async_trait::async_trait;

use crate::daemon::DispatchError;

/// Tells the provisioning daemon that pending work exists.
///
/// Implementations:
/// - `DaemonClient`: local TCP line protocol
#[async_trait]
pub trait DaemonNotifier: Send + Sync {
    /// Run one request/acknowledge exchange.
    async fn notify(&self) -> Result<(), DispatchError>;
}
