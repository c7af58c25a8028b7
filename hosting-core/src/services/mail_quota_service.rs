//! Mailbox quota proration service

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::quota::{prorate, MailboxQuota};
use crate::services::{load_tree, lock_customer, log_failure, ServiceContext};
use crate::traits::StoreTransaction;
use crate::types::{
    Actor, CascadeSummary, DispatchOutcome, DomainTree, EntityKind, OperationReport,
    ProvisioningStatus,
};

/// Mailboxes taking part in proration: real mailboxes not scheduled for deletion.
pub(crate) fn mailbox_quotas(tree: &DomainTree) -> Vec<MailboxQuota> {
    tree.mail_accounts
        .iter()
        .filter(|m| m.status != ProvisioningStatus::ToDelete)
        .filter_map(|m| {
            m.quota.map(|quota| MailboxQuota {
                mail_id: m.id,
                quota,
            })
        })
        .collect()
}

/// Mailbox quota proration service
pub struct MailQuotaService {
    ctx: Arc<ServiceContext>,
}

impl MailQuotaService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Redistribute `quota_bytes` across the mailboxes of a domain.
    ///
    /// Quotas are read by the mail server directly, no daemon dispatch follows.
    pub async fn prorate_mailbox_quota(
        &self,
        actor: &Actor,
        domain_id: i64,
        quota_bytes: u64,
    ) -> CoreResult<OperationReport> {
        let mut tx = self.ctx.store.begin().await?;
        let result = self.apply(&mut *tx, actor, domain_id, quota_bytes).await;
        let rows = self
            .ctx
            .finish(tx, result)
            .await
            .inspect_err(|e| log_failure("Mailbox quota proration", e))?;

        log::info!("{actor}: prorated {rows} mailbox quotas of domain {domain_id}");
        let mut affected = CascadeSummary::default();
        affected.record(EntityKind::MailAccount, rows);
        Ok(OperationReport {
            affected,
            dispatch: DispatchOutcome::NotRequired,
        })
    }

    async fn apply(
        &self,
        tx: &mut dyn StoreTransaction,
        actor: &Actor,
        domain_id: i64,
        quota_bytes: u64,
    ) -> CoreResult<u64> {
        let domain = tx
            .find_domain(domain_id)
            .await?
            .ok_or(CoreError::DomainNotFound(domain_id))?;
        let customer = lock_customer(tx, domain.customer_id).await?;
        if !actor.manages(&customer) {
            return Err(CoreError::PermissionDenied(format!(
                "{actor} cannot edit domain {domain_id}"
            )));
        }
        let tree = load_tree(tx, &customer).await?;
        let changes = prorate(
            &mailbox_quotas(&tree),
            quota_bytes,
            self.ctx.config.email_quota_sync_mode,
        );
        if changes.is_empty() {
            return Ok(0);
        }
        tx.update_mail_quotas(&changes).await
    }
}
