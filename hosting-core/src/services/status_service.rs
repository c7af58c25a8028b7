//! Customer activation / deactivation service

use std::sync::Arc;

use crate::cascade::{activation_plan, mail_state_changes, StatusAction};
use crate::error::{CoreError, CoreResult};
use crate::services::{load_tree, lock_customer, log_failure, ServiceContext};
use crate::traits::{LifecycleAction, LifecycleEvent, StoreTransaction};
use crate::types::{Actor, CascadeSummary, EntityKind, OperationReport, ProvisioningStatus};

/// Customer activation / deactivation service
pub struct StatusService {
    ctx: Arc<ServiceContext>,
}

impl StatusService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Switch a customer's hosting on or off.
    ///
    /// The main domain, its subdomains, aliases, alias subdomains and DNS
    /// records are scheduled `toenable` / `todisable`; mail accounts lose or
    /// regain POP/IMAP access. Rows that are `ordered` or still waiting for the
    /// daemon keep their status.
    pub async fn change_status(
        &self,
        actor: &Actor,
        customer_id: i64,
        action: StatusAction,
    ) -> CoreResult<OperationReport> {
        let mut tx = self.ctx.store.begin().await?;
        let result = self.apply(&mut *tx, actor, customer_id, action).await;
        let affected = self
            .ctx
            .finish(tx, result)
            .await
            .inspect_err(|e| log_failure("Status change", e))?;

        log::info!(
            "{actor}: scheduled {} of customer {customer_id} ({} rows)",
            action.target_status(),
            affected.total()
        );
        let dispatch = self.ctx.dispatch().await;
        Ok(OperationReport { affected, dispatch })
    }

    async fn apply(
        &self,
        tx: &mut dyn StoreTransaction,
        actor: &Actor,
        customer_id: i64,
        action: StatusAction,
    ) -> CoreResult<CascadeSummary> {
        let event = LifecycleEvent {
            action: match action {
                StatusAction::Activate => LifecycleAction::ActivateCustomer,
                StatusAction::Deactivate => LifecycleAction::DeactivateCustomer,
            },
            actor,
            target_id: customer_id,
        };
        self.ctx.before(&event).await?;

        let customer = lock_customer(tx, customer_id).await?;
        if !actor.manages(&customer) {
            return Err(CoreError::PermissionDenied(format!(
                "{actor} cannot change the status of customer {customer_id}"
            )));
        }
        if customer.status == ProvisioningStatus::ToDelete {
            return Err(CoreError::ValidationError(format!(
                "Customer {customer_id} is scheduled for deletion"
            )));
        }
        let tree = load_tree(tx, &customer).await?;
        let required = action.required_status();
        if tree.domain.status != required {
            return Err(CoreError::ValidationError(format!(
                "Domain {} is '{}', expected '{required}'",
                tree.domain.name, tree.domain.status
            )));
        }

        let plan = activation_plan(&tree, action);
        tx.set_status(&plan, action.target_status()).await?;

        let mails = mail_state_changes(&tree, action, self.ctx.config.hard_mail_suspension);
        let mail_rows = tx.set_mail_states(&mails).await?;

        let mut affected = CascadeSummary::from_refs(&plan);
        affected.record(EntityKind::MailAccount, mail_rows);

        self.ctx.after(&event).await?;
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        admin, create_test_context, create_test_context_over, create_test_context_with,
        other_reseller, reseller, seeded_data, InMemoryStore, RecordingNotifier, CUSTOMER_ID,
    };
    use crate::traits::NoopHooks;
    use crate::types::{CoreConfig, DispatchOutcome};

    fn service_with(
        config: CoreConfig,
    ) -> (StatusService, Arc<InMemoryStore>, Arc<RecordingNotifier>) {
        let (ctx, store, notifier) = create_test_context_with(config, Arc::new(NoopHooks));
        (StatusService::new(Arc::new(ctx)), store, notifier)
    }

    #[tokio::test]
    async fn deactivation_with_hard_suspension() {
        let (service, store, notifier) = service_with(CoreConfig::default());

        let report = service
            .change_status(&reseller(), CUSTOMER_ID, StatusAction::Deactivate)
            .await
            .unwrap();
        assert_eq!(report.dispatch, DispatchOutcome::Delivered);
        assert_eq!(notifier.calls(), 1);
        assert_eq!(report.affected.count(EntityKind::Domain), 1);
        assert_eq!(report.affected.count(EntityKind::Subdomain), 2);
        assert_eq!(report.affected.count(EntityKind::DnsRecord), 2);
        assert_eq!(report.affected.count(EntityKind::MailAccount), 5);
        assert_eq!(report.affected.count(EntityKind::SqlDatabase), 0);

        let data = store.snapshot().await;
        let tree = data.tree(CUSTOMER_ID);
        assert_eq!(tree.domain.status, ProvisioningStatus::ToDisable);
        assert!(tree
            .mail_accounts
            .iter()
            .all(|m| m.status == ProvisioningStatus::ToDisable && !m.po_active));
        assert!(tree
            .sql_databases
            .iter()
            .all(|d| d.status == ProvisioningStatus::Ok));
        assert!(tree.certificates.iter().all(|c| c.status == ProvisioningStatus::Ok));
    }

    #[tokio::test]
    async fn soft_suspension_only_revokes_access() {
        let (service, store, _notifier) = service_with(CoreConfig {
            hard_mail_suspension: false,
            ..CoreConfig::default()
        });

        service
            .change_status(&admin(), CUSTOMER_ID, StatusAction::Deactivate)
            .await
            .unwrap();

        let data = store.snapshot().await;
        assert!(data
            .tree(CUSTOMER_ID)
            .mail_accounts
            .iter()
            .all(|m| m.status == ProvisioningStatus::Ok && !m.po_active));
    }

    #[tokio::test]
    async fn activation_requires_a_disabled_domain() {
        let (ctx, store, notifier) = create_test_context();
        let service = StatusService::new(Arc::new(ctx));

        let result = service
            .change_status(&admin(), CUSTOMER_ID, StatusAction::Activate)
            .await;
        assert!(matches!(result, Err(CoreError::ValidationError(_))));
        assert_eq!(notifier.calls(), 0);

        // simulate the worker acknowledging a deactivation
        let mut data = store.snapshot().await;
        let tree = data.trees.get_mut(&CUSTOMER_ID).unwrap();
        tree.domain.status = ProvisioningStatus::Disabled;
        tree.mail_accounts[0].status = ProvisioningStatus::Disabled;
        let (ctx, store, _notifier) = create_test_context_over(data);
        let service = StatusService::new(Arc::new(ctx));

        service
            .change_status(&admin(), CUSTOMER_ID, StatusAction::Activate)
            .await
            .unwrap();
        let data = store.snapshot().await;
        let tree = data.tree(CUSTOMER_ID);
        assert_eq!(tree.domain.status, ProvisioningStatus::ToEnable);
        assert_eq!(tree.mail_accounts[0].status, ProvisioningStatus::ToEnable);
        assert_eq!(tree.mail_accounts[1].status, ProvisioningStatus::Ok);
        assert!(tree.mail_accounts.iter().all(|m| m.po_active));
    }

    #[tokio::test]
    async fn pending_and_ordered_rows_keep_their_status() {
        let mut data = seeded_data();
        let tree = data.trees.get_mut(&CUSTOMER_ID).unwrap();
        tree.aliases[0].status = ProvisioningStatus::ToDelete;
        tree.subdomains[0].status = ProvisioningStatus::Ordered;
        tree.mail_accounts[1].status = ProvisioningStatus::ToDelete;
        let alias = tree.aliases[0].id;
        let (ctx, store, _notifier) = create_test_context_over(data);
        let service = StatusService::new(Arc::new(ctx));

        let report = service
            .change_status(&admin(), CUSTOMER_ID, StatusAction::Deactivate)
            .await
            .unwrap();
        assert_eq!(report.affected.count(EntityKind::Alias), 0);
        assert_eq!(report.affected.count(EntityKind::Subdomain), 1);
        assert_eq!(report.affected.count(EntityKind::MailAccount), 4);

        let mut data = store.snapshot().await;
        let tree = data.tree(CUSTOMER_ID);
        assert_eq!(tree.aliases[0].status, ProvisioningStatus::ToDelete);
        assert_eq!(tree.subdomains[0].status, ProvisioningStatus::Ordered);
        assert_eq!(tree.subdomains[1].status, ProvisioningStatus::ToDisable);
        assert_eq!(tree.mail_accounts[1].status, ProvisioningStatus::ToDelete);
        assert!(tree.mail_accounts[1].po_active);

        // the daemon disables what was scheduled; the deletion is still pending
        let tree = data.trees.get_mut(&CUSTOMER_ID).unwrap();
        tree.domain.status = ProvisioningStatus::Disabled;
        tree.subdomains[1].status = ProvisioningStatus::Disabled;
        let (ctx, store, _notifier) = create_test_context_over(data);
        let service = StatusService::new(Arc::new(ctx));

        service
            .change_status(&admin(), CUSTOMER_ID, StatusAction::Activate)
            .await
            .unwrap();
        let data = store.snapshot().await;
        let tree = data.tree(CUSTOMER_ID);
        assert_eq!(tree.alias(alias).unwrap().status, ProvisioningStatus::ToDelete);
        assert_eq!(tree.subdomains[0].status, ProvisioningStatus::Ordered);
        assert_eq!(tree.subdomains[1].status, ProvisioningStatus::ToEnable);
        assert_eq!(tree.mail_accounts[1].status, ProvisioningStatus::ToDelete);
    }

    #[tokio::test]
    async fn failure_after_partial_mutation_rolls_back() {
        let (service, store, notifier) = service_with(CoreConfig::default());
        let before = store.snapshot().await;
        store.set_fail_mail_updates(true);

        let result = service
            .change_status(&admin(), CUSTOMER_ID, StatusAction::Deactivate)
            .await;
        assert!(matches!(result, Err(CoreError::StorageError(_))));
        assert_eq!(store.snapshot().await.trees, before.trees);
        assert_eq!(notifier.calls(), 0);
    }

    #[tokio::test]
    async fn unreachable_daemon_keeps_the_change() {
        let (service, store, notifier) = service_with(CoreConfig::default());
        notifier.set_unreachable(true);

        let report = service
            .change_status(&admin(), CUSTOMER_ID, StatusAction::Deactivate)
            .await
            .unwrap();
        assert!(report.dispatch.is_failed());
        assert_eq!(report.warnings().len(), 1);
        assert_eq!(
            store.snapshot().await.tree(CUSTOMER_ID).domain.status,
            ProvisioningStatus::ToDisable
        );
    }

    #[tokio::test]
    async fn unrelated_reseller_is_denied() {
        let (service, _store, _notifier) = service_with(CoreConfig::default());
        let result = service
            .change_status(&other_reseller(), CUSTOMER_ID, StatusAction::Deactivate)
            .await;
        assert!(matches!(result, Err(CoreError::PermissionDenied(_))));
    }
}
