//! Quota accounting: reconciliation, pool aggregation, proration and usage

mod aggregator;
mod prorator;
mod reconciler;
mod usage;

pub use aggregator::aggregate_pool;
pub use prorator::{prorate, MailboxQuota, MIB};
pub use reconciler::{fit_plan_to_reseller, reconcile, reconcile_all, ReconcileError};
pub use usage::compute_usage;
