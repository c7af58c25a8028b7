//! Business logic service layer
//!
//! Every administrative action runs inside one store transaction: all row
//! mutations (and the lifecycle hooks) succeed and commit together, or the
//! transaction is rolled back. The provisioning daemon is notified strictly
//! after commit.

mod customer_service;
mod deletion_service;
mod limit_service;
mod mail_quota_service;
mod plan_service;
mod pool_service;
mod status_service;

pub use customer_service::CustomerService;
pub use deletion_service::DeletionService;
pub use limit_service::LimitService;
pub use mail_quota_service::MailQuotaService;
pub use plan_service::PlanService;
pub use pool_service::PoolService;
pub use status_service::StatusService;

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::traits::{
    DaemonNotifier, HostingStore, LifecycleEvent, LifecycleHooks, StoreTransaction,
};
use crate::types::{CoreConfig, CustomerAccount, DispatchOutcome, DomainTree, Reseller};

/// Service context - holds all dependencies
///
/// The platform layer builds it and injects its store implementation.
pub struct ServiceContext {
    pub store: Arc<dyn HostingStore>,
    pub notifier: Arc<dyn DaemonNotifier>,
    pub hooks: Arc<dyn LifecycleHooks>,
    pub config: CoreConfig,
}

impl ServiceContext {
    #[must_use]
    pub fn new(
        store: Arc<dyn HostingStore>,
        notifier: Arc<dyn DaemonNotifier>,
        hooks: Arc<dyn LifecycleHooks>,
        config: CoreConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            hooks,
            config,
        }
    }

    /// Commit on success, roll back on failure.
    ///
    /// A refused commit surfaces as `TransactionFailure`.
    pub(crate) async fn finish<T>(
        &self,
        tx: Box<dyn StoreTransaction>,
        result: CoreResult<T>,
    ) -> CoreResult<T> {
        match result {
            Ok(value) => {
                tx.commit().await.map_err(|e| match e {
                    CoreError::TransactionFailure(_) => e,
                    other => CoreError::TransactionFailure(other.to_string()),
                })?;
                Ok(value)
            }
            Err(err) => {
                if let Err(e) = tx.rollback().await {
                    log::error!("Rollback failed after '{err}': {e}");
                }
                Err(err)
            }
        }
    }

    pub(crate) async fn before(&self, event: &LifecycleEvent<'_>) -> CoreResult<()> {
        self.hooks.before(event).await.map_err(into_hook_rejection)
    }

    pub(crate) async fn after(&self, event: &LifecycleEvent<'_>) -> CoreResult<()> {
        self.hooks.after(event).await.map_err(into_hook_rejection)
    }

    /// Wake the provisioning daemon up. Never fails the calling action.
    pub(crate) async fn dispatch(&self) -> DispatchOutcome {
        match self.notifier.notify().await {
            Ok(()) => DispatchOutcome::Delivered,
            Err(e) => {
                log::error!("Provisioning daemon dispatch failed, pending rows stay queued: {e}");
                DispatchOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Manual dispatch retry.
    pub async fn dispatch_pending(&self) -> CoreResult<()> {
        self.notifier
            .notify()
            .await
            .map_err(|e| CoreError::DispatchFailure(e.to_string()))
    }
}

fn into_hook_rejection(err: CoreError) -> CoreError {
    match err {
        CoreError::HookRejected(_) => err,
        other => CoreError::HookRejected(other.to_string()),
    }
}

/// Log a failed action at the level its error kind calls for.
pub(crate) fn log_failure(action: &str, err: &CoreError) {
    if err.is_expected() {
        log::warn!("{action} rejected: {err}");
    } else {
        log::error!("{action} failed: {err}");
    }
}

pub(crate) async fn lock_customer(
    tx: &mut dyn StoreTransaction,
    customer_id: i64,
) -> CoreResult<CustomerAccount> {
    tx.find_customer_for_update(customer_id)
        .await?
        .ok_or(CoreError::CustomerNotFound(customer_id))
}

pub(crate) async fn lock_reseller(
    tx: &mut dyn StoreTransaction,
    reseller_id: i64,
) -> CoreResult<Reseller> {
    tx.find_reseller_for_update(reseller_id)
        .await?
        .ok_or(CoreError::ResellerNotFound(reseller_id))
}

/// Every customer owns a main domain; a missing one is a broken store.
pub(crate) async fn load_tree(
    tx: &mut dyn StoreTransaction,
    customer: &CustomerAccount,
) -> CoreResult<DomainTree> {
    tx.load_domain_tree(customer.id).await?.ok_or_else(|| {
        CoreError::InconsistentState(format!("Customer {} has no main domain", customer.id))
    })
}

/// Every capped pool entry must stay within its ceiling at commit time.
pub(crate) fn check_pool_invariant(reseller: &Reseller) -> CoreResult<()> {
    let overdrawn = reseller.overdrawn();
    if overdrawn.is_empty() {
        return Ok(());
    }
    let details = overdrawn
        .iter()
        .map(|(label, consumed, max)| format!("{label} {consumed}/{max}"))
        .collect::<Vec<_>>()
        .join(", ");
    Err(CoreError::InconsistentState(format!(
        "Reseller {} pool exceeds its ceiling: {details}",
        reseller.id
    )))
}
