//! Hosting Core Library
//!
//! Quota reconciliation and provisioning coordination for a multi-tenant
//! hosting control panel:
//! - Tri-state resource limits reconciled against reseller pools
//! - Provisioning status cascades over a customer's domain tree
//! - Mailbox quota proration
//! - Post-commit wake-up of the provisioning daemon
//!
//! Storage is abstracted behind traits; every administrative action runs in a
//! single store transaction and notifies the daemon only after commit.

pub mod cascade;
pub mod daemon;
pub mod error;
pub mod quota;
pub mod services;
pub mod traits;
pub mod types;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use cascade::StatusAction;
pub use daemon::{DaemonClient, DispatchError};
pub use error::{CoreError, CoreResult};
pub use services::ServiceContext;
pub use traits::{DaemonNotifier, HostingStore, LifecycleHooks, NoopHooks, StoreTransaction};
