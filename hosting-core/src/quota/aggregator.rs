//! Reseller pool recomputation from its customers

use crate::types::{CustomerAccount, ProvisioningStatus, ResellerPool, ResourceKind};

/// Recompute a reseller pool from scratch.
///
/// Customers scheduled for deletion no longer draw from the pool. Disabled and
/// unlimited limits contribute nothing. The domain counter is the number of
/// remaining customers, each owning one main domain.
#[must_use]
pub fn aggregate_pool(customers: &[CustomerAccount]) -> ResellerPool {
    let mut pool = ResellerPool::default();
    for customer in customers
        .iter()
        .filter(|c| c.status != ProvisioningStatus::ToDelete)
    {
        pool.domains += 1;
        for kind in ResourceKind::ALL {
            *pool.get_mut(kind) += customer.limits.get(kind).pool_contribution();
        }
    }
    pool
}
