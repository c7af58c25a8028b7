//! Relational store abstraction

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::quota::MailboxQuota;
use crate::types::{
    CustomerAccount, Domain, DomainAlias, DomainTree, EntityRef, HostingPlan, MailStateChange,
    NewResource, ProvisioningStatus, Reseller, ResellerPool, ResourceLimits,
};

/// Transactional hosting store.
///
/// Platform implementation:
/// - `SqliteStore` (`SeaORM`, hosting-app)
#[async_trait]
pub trait HostingStore: Send + Sync {
    /// Open a transaction. Dropping it without `commit` rolls it back.
    async fn begin(&self) -> CoreResult<Box<dyn StoreTransaction>>;
}

/// One open transaction.
///
/// `*_for_update` reads lock the row until the transaction ends, serializing
/// concurrent writers on the same customer or reseller pool. Updates return the
/// number of affected rows.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn find_customer_for_update(&mut self, id: i64) -> CoreResult<Option<CustomerAccount>>;

    async fn find_reseller_for_update(&mut self, id: i64) -> CoreResult<Option<Reseller>>;

    async fn find_hosting_plan_for_update(&mut self, id: i64) -> CoreResult<Option<HostingPlan>>;

    async fn find_domain(&mut self, id: i64) -> CoreResult<Option<Domain>>;

    async fn find_alias(&mut self, id: i64) -> CoreResult<Option<DomainAlias>>;

    /// Main domain of a customer with every dependent row
    async fn load_domain_tree(&mut self, customer_id: i64) -> CoreResult<Option<DomainTree>>;

    async fn list_customers_of_reseller(
        &mut self,
        reseller_id: i64,
    ) -> CoreResult<Vec<CustomerAccount>>;

    async fn update_customer_limits(
        &mut self,
        customer_id: i64,
        limits: &ResourceLimits,
    ) -> CoreResult<u64>;

    async fn update_reseller_pool(&mut self, reseller_id: i64, pool: &ResellerPool)
        -> CoreResult<u64>;

    async fn update_hosting_plan(&mut self, plan: &HostingPlan) -> CoreResult<u64>;

    /// Set the provisioning status of every referenced row
    async fn set_status(
        &mut self,
        entities: &[EntityRef],
        status: ProvisioningStatus,
    ) -> CoreResult<u64>;

    async fn set_mail_states(&mut self, changes: &[MailStateChange]) -> CoreResult<u64>;

    /// Quotas in bytes
    async fn update_mail_quotas(&mut self, quotas: &[MailboxQuota]) -> CoreResult<u64>;

    /// Insert a customer in `toadd` state
    async fn insert_customer(
        &mut self,
        name: &str,
        created_by: i64,
        limits: &ResourceLimits,
    ) -> CoreResult<CustomerAccount>;

    /// Insert the main domain of a customer in `toadd` state
    async fn insert_domain(&mut self, customer_id: i64, name: &str) -> CoreResult<Domain>;

    async fn insert_resource(
        &mut self,
        domain: &Domain,
        resource: &NewResource,
    ) -> CoreResult<EntityRef>;

    /// Physically remove rows the daemon never provisioned (`ordered` aliases
    /// and their dependents). Customer references are ignored.
    async fn remove_rows(&mut self, entities: &[EntityRef]) -> CoreResult<u64>;

    /// Physically remove the rows the daemon does not own: login sessions,
    /// quota ledger entries and support tickets
    async fn purge_customer_ephemera(&mut self, customer_id: i64) -> CoreResult<u64>;

    async fn commit(self: Box<Self>) -> CoreResult<()>;

    async fn rollback(self: Box<Self>) -> CoreResult<()>;
}
