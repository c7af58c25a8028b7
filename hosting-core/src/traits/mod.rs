//! Storage, notification and hook abstractions

mod daemon_notifier;
mod hosting_store;
mod lifecycle_hooks;

pub use daemon_notifier::DaemonNotifier;
pub use hosting_store::{HostingStore, StoreTransaction};
pub use lifecycle_hooks::{LifecycleAction, LifecycleEvent, LifecycleHooks, NoopHooks};
