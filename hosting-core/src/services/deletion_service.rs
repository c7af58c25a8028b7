//! Cascading deletion service

use std::sync::Arc;

use crate::cascade::{deletion_plan, DeletionPlan};
use crate::error::{CoreError, CoreResult};
use crate::quota::aggregate_pool;
use crate::services::{load_tree, lock_customer, lock_reseller, log_failure, ServiceContext};
use crate::traits::{LifecycleAction, LifecycleEvent, StoreTransaction};
use crate::types::{
    Actor, CascadeSummary, CustomerAccount, DispatchOutcome, EntityKind, EntityRef,
    OperationReport, ProvisioningStatus,
};

/// Cascading deletion service
///
/// Provisioned rows are only scheduled `todelete`; the provisioning daemon
/// removes them. Rows still `ordered` are removed at once with their dependents.
/// A deletion is refused while any affected row has work queued for the daemon.
pub struct DeletionService {
    ctx: Arc<ServiceContext>,
}

impl DeletionService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Schedule a customer and everything it owns for deletion.
    ///
    /// Sessions, quota entries and tickets are purged at once. The owning
    /// reseller's pool is recomputed without the customer.
    pub async fn delete_customer(
        &self,
        actor: &Actor,
        customer_id: i64,
    ) -> CoreResult<OperationReport> {
        let mut tx = self.ctx.store.begin().await?;
        let result = self.apply_customer(&mut *tx, actor, customer_id).await;
        let affected = self
            .ctx
            .finish(tx, result)
            .await
            .inspect_err(|e| log_failure("Customer deletion", e))?;

        log::info!(
            "{actor}: scheduled deletion of customer {customer_id} ({} rows)",
            affected.total()
        );
        self.report(affected).await
    }

    /// Schedule a domain alias with its subdomains, mail, DNS, certificates and
    /// FTP users for deletion. An alias still awaiting approval is removed outright.
    pub async fn delete_domain_alias(
        &self,
        actor: &Actor,
        alias_id: i64,
    ) -> CoreResult<OperationReport> {
        let mut tx = self.ctx.store.begin().await?;
        let result = self.apply_alias(&mut *tx, actor, alias_id).await;
        let affected = self
            .ctx
            .finish(tx, result)
            .await
            .inspect_err(|e| log_failure("Alias deletion", e))?;

        log::info!("{actor}: scheduled deletion of alias {alias_id}");
        self.report(affected).await
    }

    /// Schedule an SQL database and its users for deletion.
    pub async fn delete_sql_database(
        &self,
        actor: &Actor,
        domain_id: i64,
        database_id: i64,
    ) -> CoreResult<OperationReport> {
        let mut tx = self.ctx.store.begin().await?;
        let result = self
            .apply_sql_database(&mut *tx, actor, domain_id, database_id)
            .await;
        let affected = self
            .ctx
            .finish(tx, result)
            .await
            .inspect_err(|e| log_failure("SQL database deletion", e))?;

        log::info!("{actor}: scheduled deletion of SQL database {database_id}");
        self.report(affected).await
    }

    async fn report(&self, affected: CascadeSummary) -> CoreResult<OperationReport> {
        let dispatch = if affected.total() > 0 {
            self.ctx.dispatch().await
        } else {
            DispatchOutcome::NotRequired
        };
        Ok(OperationReport { affected, dispatch })
    }

    async fn apply_customer(
        &self,
        tx: &mut dyn StoreTransaction,
        actor: &Actor,
        customer_id: i64,
    ) -> CoreResult<CascadeSummary> {
        let event = LifecycleEvent {
            action: LifecycleAction::DeleteCustomer,
            actor,
            target_id: customer_id,
        };
        self.ctx.before(&event).await?;

        let customer = lock_customer(tx, customer_id).await?;
        if !actor.manages(&customer) {
            return Err(CoreError::PermissionDenied(format!(
                "{actor} cannot delete customer {customer_id}"
            )));
        }
        if customer.status == ProvisioningStatus::ToDelete {
            return Err(CoreError::ValidationError(format!(
                "Customer {customer_id} is already scheduled for deletion"
            )));
        }
        let mut reseller = lock_reseller(tx, customer.created_by).await?;
        let tree = load_tree(tx, &customer).await?;

        let plan = deletion_plan(&tree, EntityRef::new(EntityKind::Customer, customer_id));
        let mut affected = apply_plan(tx, &plan, &format!("Customer {customer_id}")).await?;

        let purged = tx.purge_customer_ephemera(customer_id).await?;
        log::debug!("Purged {purged} session, quota and ticket rows of customer {customer_id}");

        let customer_ref = EntityRef::new(EntityKind::Customer, customer_id);
        tx.set_status(&[customer_ref], ProvisioningStatus::ToDelete)
            .await?;

        let customers: Vec<CustomerAccount> = tx
            .list_customers_of_reseller(reseller.id)
            .await?
            .into_iter()
            .filter(|c| c.id != customer_id)
            .collect();
        reseller.pool = aggregate_pool(&customers);
        tx.update_reseller_pool(reseller.id, &reseller.pool).await?;

        affected.record(EntityKind::Customer, 1);

        self.ctx.after(&event).await?;
        Ok(affected)
    }

    async fn apply_alias(
        &self,
        tx: &mut dyn StoreTransaction,
        actor: &Actor,
        alias_id: i64,
    ) -> CoreResult<CascadeSummary> {
        let event = LifecycleEvent {
            action: LifecycleAction::DeleteDomainAlias,
            actor,
            target_id: alias_id,
        };
        self.ctx.before(&event).await?;

        let alias = tx
            .find_alias(alias_id)
            .await?
            .ok_or(CoreError::AliasNotFound(alias_id))?;
        let domain = tx
            .find_domain(alias.domain_id)
            .await?
            .ok_or(CoreError::DomainNotFound(alias.domain_id))?;
        let customer = lock_customer(tx, domain.customer_id).await?;
        if !actor.owns_or_manages(&customer) {
            return Err(CoreError::PermissionDenied(format!(
                "{actor} cannot delete alias {alias_id}"
            )));
        }

        if alias.status == ProvisioningStatus::ToDelete {
            return Err(CoreError::ValidationError(format!(
                "Alias {} is already scheduled for deletion",
                alias.name
            )));
        }
        let tree = load_tree(tx, &customer).await?;
        let plan = deletion_plan(&tree, EntityRef::new(EntityKind::Alias, alias_id));
        let affected = apply_plan(tx, &plan, &format!("Alias {}", alias.name)).await?;

        self.ctx.after(&event).await?;
        Ok(affected)
    }

    async fn apply_sql_database(
        &self,
        tx: &mut dyn StoreTransaction,
        actor: &Actor,
        domain_id: i64,
        database_id: i64,
    ) -> CoreResult<CascadeSummary> {
        let event = LifecycleEvent {
            action: LifecycleAction::DeleteSqlDatabase,
            actor,
            target_id: database_id,
        };
        self.ctx.before(&event).await?;

        let domain = tx
            .find_domain(domain_id)
            .await?
            .ok_or(CoreError::DomainNotFound(domain_id))?;
        let customer = lock_customer(tx, domain.customer_id).await?;
        if !actor.owns_or_manages(&customer) {
            return Err(CoreError::PermissionDenied(format!(
                "{actor} cannot delete SQL database {database_id}"
            )));
        }
        let tree = load_tree(tx, &customer).await?;
        let database = tree
            .sql_database(database_id)
            .ok_or(CoreError::SqlDatabaseNotFound(database_id))?;
        if database.status == ProvisioningStatus::ToDelete {
            return Err(CoreError::ValidationError(format!(
                "SQL database {} is already scheduled for deletion",
                database.name
            )));
        }

        let plan = deletion_plan(&tree, EntityRef::new(EntityKind::SqlDatabase, database_id));
        let affected = apply_plan(tx, &plan, &format!("SQL database {}", database.name)).await?;

        self.ctx.after(&event).await?;
        Ok(affected)
    }
}

/// Remove the plan's unprovisioned rows and schedule the rest `todelete`.
async fn apply_plan(
    tx: &mut dyn StoreTransaction,
    plan: &DeletionPlan,
    subject: &str,
) -> CoreResult<CascadeSummary> {
    if plan.is_blocked() {
        return Err(CoreError::ValidationError(format!(
            "{subject} has {} rows with pending provisioning work, \
             retry once the daemon has completed it",
            plan.in_flight.len()
        )));
    }
    if !plan.remove.is_empty() {
        let rows = tx.remove_rows(&plan.remove).await?;
        log::debug!("{subject}: removed {rows} unapproved rows");
    }
    tx.set_status(&plan.schedule, ProvisioningStatus::ToDelete)
        .await?;
    Ok(CascadeSummary::from_refs(&plan.schedule))
}
