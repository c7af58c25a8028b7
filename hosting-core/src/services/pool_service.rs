//! Reseller pool resynchronization service

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::quota::aggregate_pool;
use crate::services::{lock_reseller, log_failure, ServiceContext};
use crate::traits::StoreTransaction;
use crate::types::{Actor, ResellerPool, Role};

/// Reseller pool resynchronization service
pub struct PoolService {
    ctx: Arc<ServiceContext>,
}

impl PoolService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Recompute a reseller's consumed counters from its customers and store them.
    ///
    /// Idempotent. A pool that ends up above a capped ceiling is stored anyway
    /// and reported as a warning: the customers' limits are the source of truth.
    pub async fn resync_reseller_pool(
        &self,
        actor: &Actor,
        reseller_id: i64,
    ) -> CoreResult<ResellerPool> {
        let mut tx = self.ctx.store.begin().await?;
        let result = Self::apply(&mut *tx, actor, reseller_id).await;
        let pool = self
            .ctx
            .finish(tx, result)
            .await
            .inspect_err(|e| log_failure("Pool resync", e))?;

        log::info!("{actor}: resynchronized pool of reseller {reseller_id}");
        Ok(pool)
    }

    async fn apply(
        tx: &mut dyn StoreTransaction,
        actor: &Actor,
        reseller_id: i64,
    ) -> CoreResult<ResellerPool> {
        let allowed = match actor.role {
            Role::Admin => true,
            Role::Reseller => actor.id == reseller_id,
            Role::Customer => false,
        };
        if !allowed {
            return Err(CoreError::PermissionDenied(format!(
                "{actor} cannot resync reseller {reseller_id}"
            )));
        }

        let mut reseller = lock_reseller(tx, reseller_id).await?;
        let customers = tx.list_customers_of_reseller(reseller_id).await?;
        let pool = aggregate_pool(&customers);
        if pool != reseller.pool {
            log::warn!(
                "Reseller {reseller_id} pool drifted: stored {:?}, recomputed {pool:?}",
                reseller.pool
            );
        }
        reseller.pool = pool;
        for (label, consumed, max) in reseller.overdrawn() {
            log::warn!(
                "Reseller {reseller_id} consumes {consumed} {label} over a ceiling of {max}"
            );
        }
        tx.update_reseller_pool(reseller_id, &pool).await?;
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        admin, create_test_context, create_test_context_over, customer, other_reseller, reseller,
        seeded_data, RESELLER_ID,
    };

    #[tokio::test]
    async fn resync_is_idempotent() {
        let (ctx, store, notifier) = create_test_context();
        let service = PoolService::new(Arc::new(ctx));

        let first = service
            .resync_reseller_pool(&admin(), RESELLER_ID)
            .await
            .unwrap();
        let second = service
            .resync_reseller_pool(&reseller(), RESELLER_ID)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.snapshot().await.resellers[&RESELLER_ID].pool, second);
        assert_eq!(notifier.calls(), 0);
    }

    #[tokio::test]
    async fn resync_repairs_drift() {
        let mut data = seeded_data();
        let expected = data.resellers[&RESELLER_ID].pool;
        let drifted = &mut data.resellers.get_mut(&RESELLER_ID).unwrap().pool;
        drifted.mailboxes = 99;
        drifted.domains = 7;
        let (ctx, store, _notifier) = create_test_context_over(data);
        let service = PoolService::new(Arc::new(ctx));

        let pool = service
            .resync_reseller_pool(&admin(), RESELLER_ID)
            .await
            .unwrap();
        assert_eq!(pool, expected);
        assert_eq!(store.snapshot().await.resellers[&RESELLER_ID].pool, expected);
    }

    #[tokio::test]
    async fn only_admin_or_the_reseller_itself() {
        let (ctx, _store, _notifier) = create_test_context();
        let service = PoolService::new(Arc::new(ctx));
        for actor in [other_reseller(), customer()] {
            assert!(matches!(
                service.resync_reseller_pool(&actor, RESELLER_ID).await,
                Err(CoreError::PermissionDenied(_))
            ));
        }
        assert!(matches!(
            service.resync_reseller_pool(&admin(), 77).await,
            Err(CoreError::ResellerNotFound(77))
        ));
    }
}
