//! Customer provisioning service
//!
//! Creates customers from hosting plans or explicit limits, adds provisioned
//! resources within the customer's limits, and reviews alias orders.

use std::sync::Arc;

use crate::cascade::{deletion_plan, status_of};
use crate::error::{CoreError, CoreResult};
use crate::quota::{compute_usage, reconcile_all};
use crate::services::{
    check_pool_invariant, load_tree, lock_customer, lock_reseller, log_failure, ServiceContext,
};
use crate::traits::{LifecycleAction, LifecycleEvent, StoreTransaction};
use crate::types::{
    Actor, CascadeSummary, CustomerAccount, CustomerLimitsSource, DispatchOutcome, DomainTree,
    EntityKind, EntityRef, Limit, NewCustomer, NewResource, OperationReport, ProvisioningStatus,
    QuotaViolation, ResourceKind, ResourceLimits, ResourceUsage, Role, ViolationReason,
};

/// Customer provisioning service
pub struct CustomerService {
    ctx: Arc<ServiceContext>,
}

impl CustomerService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    // ===== Customer creation =====

    /// Create a customer with its main domain, drawing its limits from the
    /// acting reseller's pool.
    pub async fn create_customer(
        &self,
        actor: &Actor,
        request: NewCustomer,
    ) -> CoreResult<(CustomerAccount, OperationReport)> {
        let mut tx = self.ctx.store.begin().await?;
        let result = self.apply_create(&mut *tx, actor, &request).await;
        let customer = self
            .ctx
            .finish(tx, result)
            .await
            .inspect_err(|e| log_failure("Customer creation", e))?;

        log::info!(
            "{actor}: scheduled creation of customer '{}' ({})",
            customer.name,
            request.domain_name
        );
        let mut affected = CascadeSummary::default();
        affected.record(EntityKind::Customer, 1);
        affected.record(EntityKind::Domain, 1);
        let dispatch = self.ctx.dispatch().await;
        Ok((customer, OperationReport { affected, dispatch }))
    }

    async fn apply_create(
        &self,
        tx: &mut dyn StoreTransaction,
        actor: &Actor,
        request: &NewCustomer,
    ) -> CoreResult<CustomerAccount> {
        let event = LifecycleEvent {
            action: LifecycleAction::CreateCustomer,
            actor,
            target_id: actor.id,
        };
        if actor.role != Role::Reseller {
            return Err(CoreError::PermissionDenied(format!(
                "{actor} is not a reseller"
            )));
        }
        validate_name("Customer name", &request.name)?;
        validate_name("Domain name", &request.domain_name)?;
        self.ctx.before(&event).await?;

        let mut reseller = lock_reseller(tx, actor.id).await?;
        let requested = match &request.limits {
            CustomerLimitsSource::Plan(plan_id) => {
                let plan = tx
                    .find_hosting_plan_for_update(*plan_id)
                    .await?
                    .ok_or(CoreError::HostingPlanNotFound(*plan_id))?;
                if plan.reseller_id != reseller.id {
                    return Err(CoreError::PermissionDenied(format!(
                        "Hosting plan {plan_id} belongs to another reseller"
                    )));
                }
                plan.limits
            }
            CustomerLimitsSource::Explicit(limits) => *limits,
        };
        requested.validate()?;

        if !reseller.max_domains.admits_one_more(reseller.pool.domains) {
            return Err(CoreError::ValidationError(format!(
                "Reseller {} reached its domain limit ({})",
                reseller.name, reseller.max_domains
            )));
        }

        let mut limits = nothing_granted();
        reconcile_all(
            &requested,
            &ResourceUsage::default(),
            &mut limits,
            &mut reseller.pool,
            &reseller.ceilings,
        )?;
        reseller.pool.domains += 1;
        check_pool_invariant(&reseller)?;

        let customer = tx
            .insert_customer(request.name.trim(), reseller.id, &limits)
            .await?;
        tx.insert_domain(customer.id, request.domain_name.trim())
            .await?;
        tx.update_reseller_pool(reseller.id, &reseller.pool).await?;

        self.ctx.after(&event).await?;
        Ok(customer)
    }

    // ===== Resources =====

    /// Add one provisioned object if the customer's limit admits it.
    ///
    /// Ordered aliases wait for review and are not dispatched.
    pub async fn add_resource(
        &self,
        actor: &Actor,
        customer_id: i64,
        resource: NewResource,
    ) -> CoreResult<(EntityRef, OperationReport)> {
        let mut tx = self.ctx.store.begin().await?;
        let result = self.apply_add(&mut *tx, actor, customer_id, &resource).await;
        let entity = self
            .ctx
            .finish(tx, result)
            .await
            .inspect_err(|e| log_failure("Resource creation", e))?;

        log::info!("{actor}: added {entity} '{}' to customer {customer_id}", resource.name());
        let dispatch = match resource.initial_status() {
            ProvisioningStatus::ToAdd => self.ctx.dispatch().await,
            _ => DispatchOutcome::NotRequired,
        };
        Ok((
            entity,
            OperationReport {
                affected: CascadeSummary::from_refs(&[entity]),
                dispatch,
            },
        ))
    }

    async fn apply_add(
        &self,
        tx: &mut dyn StoreTransaction,
        actor: &Actor,
        customer_id: i64,
        resource: &NewResource,
    ) -> CoreResult<EntityRef> {
        let event = LifecycleEvent {
            action: LifecycleAction::AddResource,
            actor,
            target_id: customer_id,
        };
        self.ctx.before(&event).await?;

        let customer = lock_customer(tx, customer_id).await?;
        if !actor.owns_or_manages(&customer) {
            return Err(CoreError::PermissionDenied(format!(
                "{actor} cannot add resources to customer {customer_id}"
            )));
        }
        if customer.status == ProvisioningStatus::ToDelete {
            return Err(CoreError::ValidationError(format!(
                "Customer {customer_id} is scheduled for deletion"
            )));
        }
        let tree = load_tree(tx, &customer).await?;
        check_references(&tree, resource)?;

        if let Some(kind) = resource.kind() {
            let usage = compute_usage(
                &customer,
                &tree,
                self.ctx.config.count_default_email_addresses,
            );
            admit_one_more(kind, customer.limits.get(kind), usage.in_limit_unit(kind))?;
        }

        let entity = tx.insert_resource(&tree.domain, resource).await?;

        self.ctx.after(&event).await?;
        Ok(entity)
    }

    // ===== Alias orders =====

    /// Approve (`ordered -> toadd`) or reject (remove) an ordered alias.
    pub async fn review_alias_order(
        &self,
        actor: &Actor,
        alias_id: i64,
        approve: bool,
    ) -> CoreResult<OperationReport> {
        let mut tx = self.ctx.store.begin().await?;
        let result = self.apply_review(&mut *tx, actor, alias_id, approve).await;
        let affected = self
            .ctx
            .finish(tx, result)
            .await
            .inspect_err(|e| log_failure("Alias order review", e))?;

        let verdict = if approve { "approved" } else { "rejected" };
        log::info!("{actor}: {verdict} alias order {alias_id}");
        let dispatch = if approve {
            self.ctx.dispatch().await
        } else {
            DispatchOutcome::NotRequired
        };
        Ok(OperationReport { affected, dispatch })
    }

    async fn apply_review(
        &self,
        tx: &mut dyn StoreTransaction,
        actor: &Actor,
        alias_id: i64,
        approve: bool,
    ) -> CoreResult<CascadeSummary> {
        let event = LifecycleEvent {
            action: LifecycleAction::ReviewAliasOrder,
            actor,
            target_id: alias_id,
        };
        self.ctx.before(&event).await?;

        let alias = tx
            .find_alias(alias_id)
            .await?
            .ok_or(CoreError::AliasNotFound(alias_id))?;
        if alias.status != ProvisioningStatus::Ordered {
            return Err(CoreError::ValidationError(format!(
                "Alias {} is not awaiting approval",
                alias.name
            )));
        }
        let domain = tx
            .find_domain(alias.domain_id)
            .await?
            .ok_or(CoreError::DomainNotFound(alias.domain_id))?;
        let customer = lock_customer(tx, domain.customer_id).await?;
        if !actor.manages(&customer) {
            return Err(CoreError::PermissionDenied(format!(
                "{actor} cannot review alias orders of customer {}",
                customer.id
            )));
        }

        let mut affected = CascadeSummary::default();
        if approve {
            let tree = load_tree(tx, &customer).await?;
            let usage = compute_usage(
                &customer,
                &tree,
                self.ctx.config.count_default_email_addresses,
            );
            admit_one_more(ResourceKind::Alias, customer.limits.aliases, usage.aliases)?;
            let alias_ref = EntityRef::new(EntityKind::Alias, alias_id);
            let rows = tx.set_status(&[alias_ref], ProvisioningStatus::ToAdd).await?;
            affected.record(EntityKind::Alias, rows);
        } else {
            // the order never reached the daemon, so its dependents go with it
            let tree = load_tree(tx, &customer).await?;
            let plan = deletion_plan(&tree, EntityRef::new(EntityKind::Alias, alias_id));
            let rows = tx.remove_rows(&plan.remove).await?;
            log::debug!("Rejected alias {}: removed {rows} rows", alias.name);
        }

        self.ctx.after(&event).await?;
        Ok(affected)
    }
}

/// Transient starting point of a new customer: every kind, volumes included,
/// grows from nothing so the whole request is drawn from the pool.
fn nothing_granted() -> ResourceLimits {
    let mut limits = ResourceLimits::none();
    for kind in ResourceKind::ALL {
        *limits.get_mut(kind) = Limit::Disabled;
    }
    limits
}

fn validate_name(label: &str, name: &str) -> CoreResult<()> {
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(CoreError::ValidationError(format!("{label} '{name}' is invalid")));
    }
    Ok(())
}

fn admit_one_more(kind: ResourceKind, limit: Limit, usage: u64) -> CoreResult<()> {
    if limit.admits_one_more(usage) {
        return Ok(());
    }
    let reason = if limit.is_disabled() {
        ViolationReason::ServiceDisabled
    } else {
        ViolationReason::LimitReached
    };
    Err(CoreError::QuotaViolation(vec![QuotaViolation::new(kind, reason)]))
}

/// Parents named by the request must exist in the customer's tree and be
/// neither awaiting approval nor scheduled for deletion.
fn check_references(tree: &DomainTree, resource: &NewResource) -> CoreResult<()> {
    let allow_empty = matches!(resource, NewResource::MailAccount { catchall: true, .. });
    if !allow_empty {
        validate_name("Name", resource.name())?;
    }
    match resource {
        NewResource::AliasSubdomain { alias_id, .. } => {
            let alias = tree.alias(*alias_id).ok_or(CoreError::AliasNotFound(*alias_id))?;
            check_parent_is_live(&format!("Alias {}", alias.name), alias.status)?;
        }
        NewResource::SqlUser { database_id, .. } => {
            let database = tree
                .sql_database(*database_id)
                .ok_or(CoreError::SqlDatabaseNotFound(*database_id))?;
            check_parent_is_live(&format!("SQL database {}", database.name), database.status)?;
        }
        NewResource::MailAccount { owner, .. } => {
            let (Some(host), Some(status)) =
                (tree.host_name(*owner), status_of(tree, EntityRef::from(*owner)))
            else {
                return Err(CoreError::ValidationError(format!(
                    "Mail host {owner:?} does not belong to domain {}",
                    tree.domain.name
                )));
            };
            check_parent_is_live(&format!("Mail host {host}"), status)?;
        }
        NewResource::Subdomain { name } => {
            if tree.subdomains.iter().any(|s| s.name == *name) {
                return Err(CoreError::ValidationError(format!(
                    "Subdomain {name}.{} already exists",
                    tree.domain.name
                )));
            }
        }
        NewResource::Alias { name, .. } => {
            if tree.aliases.iter().any(|a| a.name == *name) {
                return Err(CoreError::ValidationError(format!(
                    "Alias {name} already exists"
                )));
            }
        }
        NewResource::FtpUser { .. } | NewResource::SqlDatabase { .. } => {}
    }
    Ok(())
}

fn check_parent_is_live(parent: &str, status: ProvisioningStatus) -> CoreResult<()> {
    match status {
        ProvisioningStatus::Ordered | ProvisioningStatus::ToDelete => {
            Err(CoreError::ValidationError(format!(
                "{parent} is '{status}' and cannot take new resources"
            )))
        }
        _ => Ok(()),
    }
}
