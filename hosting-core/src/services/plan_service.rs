//! Hosting plan service

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::quota::fit_plan_to_reseller;
use crate::services::{lock_reseller, log_failure, ServiceContext};
use crate::traits::{LifecycleAction, LifecycleEvent, StoreTransaction};
use crate::types::{Actor, HostingPlan, ResourceLimits, Role};

/// Hosting plan service
pub struct PlanService {
    ctx: Arc<ServiceContext>,
}

impl PlanService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Replace the limits of a hosting plan, bounded by its reseller.
    ///
    /// Values under a disabled reseller ceiling are silently forced to disabled.
    pub async fn update_hosting_plan(
        &self,
        actor: &Actor,
        plan_id: i64,
        limits: ResourceLimits,
    ) -> CoreResult<HostingPlan> {
        let mut tx = self.ctx.store.begin().await?;
        let result = self.apply(&mut *tx, actor, plan_id, limits).await;
        let plan = self
            .ctx
            .finish(tx, result)
            .await
            .inspect_err(|e| log_failure("Hosting plan update", e))?;

        log::info!("{actor}: updated hosting plan '{}'", plan.name);
        Ok(plan)
    }

    async fn apply(
        &self,
        tx: &mut dyn StoreTransaction,
        actor: &Actor,
        plan_id: i64,
        mut limits: ResourceLimits,
    ) -> CoreResult<HostingPlan> {
        let event = LifecycleEvent {
            action: LifecycleAction::UpdateHostingPlan,
            actor,
            target_id: plan_id,
        };
        limits.validate()?;
        self.ctx.before(&event).await?;

        let mut plan = tx
            .find_hosting_plan_for_update(plan_id)
            .await?
            .ok_or(CoreError::HostingPlanNotFound(plan_id))?;
        let owner =
            actor.is_admin() || (actor.role == Role::Reseller && actor.id == plan.reseller_id);
        if !owner {
            return Err(CoreError::PermissionDenied(format!(
                "{actor} cannot edit hosting plan {plan_id}"
            )));
        }

        let reseller = lock_reseller(tx, plan.reseller_id).await?;
        let violations = fit_plan_to_reseller(&mut limits, &reseller.ceilings, &reseller.pool);
        if !violations.is_empty() {
            return Err(CoreError::QuotaViolation(violations));
        }

        plan.limits = limits;
        tx.update_hosting_plan(&plan).await?;

        self.ctx.after(&event).await?;
        Ok(plan)
    }
}
