//! Customer limit update service

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::quota::{compute_usage, prorate, reconcile_all, MIB};
use crate::services::{
    check_pool_invariant, load_tree, lock_customer, lock_reseller, log_failure, ServiceContext,
};
use crate::traits::{LifecycleAction, LifecycleEvent, StoreTransaction};
use crate::types::{
    Actor, CascadeSummary, DispatchOutcome, EntityKind, EntityRef, OperationReport,
    ProvisioningStatus, ResourceLimits, UsageOverview,
};

use super::mail_quota_service::mailbox_quotas;

/// Customer limit update service
pub struct LimitService {
    ctx: Arc<ServiceContext>,
}

impl LimitService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Current limits next to current consumption.
    pub async fn usage_overview(
        &self,
        actor: &Actor,
        customer_id: i64,
    ) -> CoreResult<UsageOverview> {
        let mut tx = self.ctx.store.begin().await?;
        let result = self.overview(&mut *tx, actor, customer_id).await;
        self.ctx.finish(tx, result).await
    }

    async fn overview(
        &self,
        tx: &mut dyn StoreTransaction,
        actor: &Actor,
        customer_id: i64,
    ) -> CoreResult<UsageOverview> {
        let customer = lock_customer(tx, customer_id).await?;
        if !actor.owns_or_manages(&customer) {
            return Err(CoreError::PermissionDenied(format!(
                "{actor} cannot view customer {customer_id}"
            )));
        }
        let tree = load_tree(tx, &customer).await?;
        Ok(UsageOverview {
            limits: customer.limits,
            usage: compute_usage(
                &customer,
                &tree,
                self.ctx.config.count_default_email_addresses,
            ),
        })
    }

    /// Replace every limit of a customer.
    ///
    /// Each kind is reconciled against current usage and the reseller pool; any
    /// violation rejects the whole update. A traffic change schedules the domain
    /// and its subdomains `tochange`; a disk change re-prorates mailbox quotas.
    pub async fn change_limits(
        &self,
        actor: &Actor,
        customer_id: i64,
        requested: ResourceLimits,
    ) -> CoreResult<OperationReport> {
        let mut tx = self.ctx.store.begin().await?;
        let result = self.apply(&mut *tx, actor, customer_id, &requested).await;
        let affected = self
            .ctx
            .finish(tx, result)
            .await
            .inspect_err(|e| log_failure("Limit update", e))?;

        log::info!("{actor}: updated limits of customer {customer_id}");
        let dispatch = if affected.total() > 0 {
            self.ctx.dispatch().await
        } else {
            DispatchOutcome::NotRequired
        };
        Ok(OperationReport { affected, dispatch })
    }

    async fn apply(
        &self,
        tx: &mut dyn StoreTransaction,
        actor: &Actor,
        customer_id: i64,
        requested: &ResourceLimits,
    ) -> CoreResult<CascadeSummary> {
        let event = LifecycleEvent {
            action: LifecycleAction::ChangeLimits,
            actor,
            target_id: customer_id,
        };
        requested.validate()?;
        self.ctx.before(&event).await?;

        let mut customer = lock_customer(tx, customer_id).await?;
        if !actor.manages(&customer) {
            return Err(CoreError::PermissionDenied(format!(
                "{actor} cannot edit customer {customer_id}"
            )));
        }
        if customer.status == ProvisioningStatus::ToDelete {
            return Err(CoreError::ValidationError(format!(
                "Customer {customer_id} is scheduled for deletion"
            )));
        }
        let mut reseller = lock_reseller(tx, customer.created_by).await?;
        let tree = load_tree(tx, &customer).await?;
        let usage = compute_usage(
            &customer,
            &tree,
            self.ctx.config.count_default_email_addresses,
        );

        let previous = customer.limits;
        reconcile_all(
            requested,
            &usage,
            &mut customer.limits,
            &mut reseller.pool,
            &reseller.ceilings,
        )?;
        check_pool_invariant(&reseller)?;

        tx.update_customer_limits(customer.id, &customer.limits)
            .await?;
        tx.update_reseller_pool(reseller.id, &reseller.pool).await?;

        let mut affected = CascadeSummary::default();
        if customer.limits.traffic != previous.traffic {
            let targets: Vec<EntityRef> = std::iter::once(&tree.domain)
                .filter(|d| d.status == ProvisioningStatus::Ok)
                .map(|d| EntityRef::new(EntityKind::Domain, d.id))
                .chain(
                    tree.subdomains
                        .iter()
                        .filter(|s| s.status == ProvisioningStatus::Ok)
                        .map(|s| EntityRef::new(EntityKind::Subdomain, s.id)),
                )
                .collect();
            tx.set_status(&targets, ProvisioningStatus::ToChange).await?;
            affected = CascadeSummary::from_refs(&targets);
        }

        if customer.limits.disk != previous.disk {
            let quota = customer.limits.disk.cap().unwrap_or(0).saturating_mul(MIB);
            let changes = prorate(
                &mailbox_quotas(&tree),
                quota,
                self.ctx.config.email_quota_sync_mode,
            );
            if !changes.is_empty() {
                tx.update_mail_quotas(&changes).await?;
                log::debug!("Prorated {} mailbox quotas of customer {customer_id}", changes.len());
            }
        }

        self.ctx.after(&event).await?;
        Ok(affected)
    }
}
