//! Ownership graph of a customer's domain tree and the status cascades over it
//!
//! ```text
//! Customer -> Domain -> Subdomain       -> Mail, Certificate
//!                    -> Alias           -> AliasSubdomain -> Mail, Certificate
//!                                       -> Mail, DnsRecord, Certificate, FtpUser
//!                    -> Mail, DnsRecord, Certificate, FtpUser
//!                    -> SqlDatabase     -> SqlUser
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{
    DomainTree, EntityKind, EntityRef, FtpUser, HostRef, MailStateChange, ProvisioningStatus,
};

/// Administrative activation switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusAction {
    Activate,
    Deactivate,
}

impl StatusAction {
    /// Status written to the cascaded rows.
    #[must_use]
    pub const fn target_status(self) -> ProvisioningStatus {
        match self {
            Self::Activate => ProvisioningStatus::ToEnable,
            Self::Deactivate => ProvisioningStatus::ToDisable,
        }
    }

    /// Status the main domain must be in for the action to apply.
    #[must_use]
    pub const fn required_status(self) -> ProvisioningStatus {
        match self {
            Self::Activate => ProvisioningStatus::Disabled,
            Self::Deactivate => ProvisioningStatus::Ok,
        }
    }
}

/// Every entity reachable from `root`, root first, each exactly once.
#[must_use]
pub fn walk(tree: &DomainTree, root: EntityRef) -> Vec<EntityRef> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if !visited.insert(node) {
            continue;
        }
        order.push(node);
        let mut next = children(tree, node);
        // keep declaration order when popping
        next.reverse();
        stack.extend(next);
    }
    order
}

/// Direct dependents of one entity.
#[must_use]
pub fn children(tree: &DomainTree, node: EntityRef) -> Vec<EntityRef> {
    let domain_id = tree.domain.id;
    match node.kind {
        EntityKind::Customer if node.id == tree.domain.customer_id => {
            vec![EntityRef::new(EntityKind::Domain, domain_id)]
        }
        EntityKind::Domain if node.id == domain_id => {
            let mut out = refs(EntityKind::Subdomain, tree.subdomains.iter().map(|s| s.id));
            out.extend(refs(EntityKind::Alias, tree.aliases.iter().map(|a| a.id)));
            out.extend(hosted(tree, HostRef::Domain(domain_id)));
            out.extend(refs(
                EntityKind::DnsRecord,
                tree.dns_records
                    .iter()
                    .filter(|r| r.alias_id.is_none())
                    .map(|r| r.id),
            ));
            out.extend(refs(
                EntityKind::FtpUser,
                tree.ftp_users
                    .iter()
                    .filter(|u| owning_alias(tree, u).is_none())
                    .map(|u| u.id),
            ));
            out.extend(refs(EntityKind::SqlDatabase, tree.sql_databases.iter().map(|d| d.id)));
            out
        }
        EntityKind::Subdomain => hosted(tree, HostRef::Subdomain(node.id)),
        EntityKind::Alias => {
            let mut out = refs(
                EntityKind::AliasSubdomain,
                tree.alias_subdomains
                    .iter()
                    .filter(|s| s.alias_id == node.id)
                    .map(|s| s.id),
            );
            out.extend(hosted(tree, HostRef::Alias(node.id)));
            out.extend(refs(
                EntityKind::DnsRecord,
                tree.dns_records
                    .iter()
                    .filter(|r| r.alias_id == Some(node.id))
                    .map(|r| r.id),
            ));
            out.extend(refs(
                EntityKind::FtpUser,
                tree.ftp_users
                    .iter()
                    .filter(|u| owning_alias(tree, u) == Some(node.id))
                    .map(|u| u.id),
            ));
            out
        }
        EntityKind::AliasSubdomain => hosted(tree, HostRef::AliasSubdomain(node.id)),
        EntityKind::SqlDatabase => refs(
            EntityKind::SqlUser,
            tree.sql_users
                .iter()
                .filter(|u| u.database_id == node.id)
                .map(|u| u.id),
        ),
        _ => Vec::new(),
    }
}

fn refs(kind: EntityKind, ids: impl Iterator<Item = i64>) -> Vec<EntityRef> {
    ids.map(|id| EntityRef::new(kind, id)).collect()
}

/// Mail accounts and certificates attached to a host.
fn hosted(tree: &DomainTree, host: HostRef) -> Vec<EntityRef> {
    let mut out = refs(
        EntityKind::MailAccount,
        tree.mail_accounts
            .iter()
            .filter(|m| m.owner == host)
            .map(|m| m.id),
    );
    out.extend(refs(
        EntityKind::Certificate,
        tree.certificates
            .iter()
            .filter(|c| c.owner == host)
            .map(|c| c.id),
    ));
    out
}

/// Alias whose name, or one of whose subdomains, is the FTP login host.
fn owning_alias(tree: &DomainTree, user: &FtpUser) -> Option<i64> {
    let host = user.host()?;
    tree.aliases
        .iter()
        .find(|alias| {
            host == alias.name
                || host
                    .strip_suffix(alias.name.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
        .map(|alias| alias.id)
}

/// Current status of a referenced row, if it is part of the tree.
#[must_use]
pub fn status_of(tree: &DomainTree, entity: EntityRef) -> Option<ProvisioningStatus> {
    macro_rules! find_in {
        ($rows:expr) => {
            $rows.iter().find(|r| r.id == entity.id).map(|r| r.status)
        };
    }
    match entity.kind {
        EntityKind::Customer => None,
        EntityKind::Domain => (tree.domain.id == entity.id).then_some(tree.domain.status),
        EntityKind::Subdomain => find_in!(tree.subdomains),
        EntityKind::Alias => find_in!(tree.aliases),
        EntityKind::AliasSubdomain => find_in!(tree.alias_subdomains),
        EntityKind::MailAccount => find_in!(tree.mail_accounts),
        EntityKind::DnsRecord => find_in!(tree.dns_records),
        EntityKind::Certificate => find_in!(tree.certificates),
        EntityKind::FtpUser => find_in!(tree.ftp_users),
        EntityKind::SqlDatabase => find_in!(tree.sql_databases),
        EntityKind::SqlUser => find_in!(tree.sql_users),
    }
}

/// Rows touched by deleting one entity, sorted by what happens to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionPlan {
    /// Provisioned rows to mark `todelete`
    pub schedule: Vec<EntityRef>,
    /// Never provisioned (`ordered`) rows, removed together with their dependents
    pub remove: Vec<EntityRef>,
    /// Rows the daemon still has to add, change, enable or disable
    pub in_flight: Vec<EntityRef>,
}

impl DeletionPlan {
    /// Whether the plan can be applied now.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        !self.in_flight.is_empty()
    }
}

/// Classify every row reachable from `root`.
///
/// The customer row is left to the caller. Rows already `todelete` are skipped
/// but their dependents are still visited.
#[must_use]
pub fn deletion_plan(tree: &DomainTree, root: EntityRef) -> DeletionPlan {
    let mut plan = DeletionPlan::default();
    let mut visited = HashSet::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if !visited.insert(node) {
            continue;
        }
        match status_of(tree, node) {
            Some(ProvisioningStatus::Ordered) => {
                let subtree = walk(tree, node);
                visited.extend(subtree.iter().copied());
                plan.remove.extend(subtree);
                continue;
            }
            Some(status) if status.can_schedule(ProvisioningStatus::ToDelete) => {
                plan.schedule.push(node);
            }
            None | Some(ProvisioningStatus::ToDelete) => {}
            Some(_) => plan.in_flight.push(node),
        }
        let mut next = children(tree, node);
        next.reverse();
        stack.extend(next);
    }
    plan
}

/// Rows whose status column follows an activation switch.
///
/// Only rows that may move to the action's target status are returned; pending
/// and ordered rows keep their status. Mail accounts are handled separately by
/// [`mail_state_changes`]; certificates, FTP and SQL resources are not touched.
#[must_use]
pub fn activation_plan(tree: &DomainTree, action: StatusAction) -> Vec<EntityRef> {
    let target = action.target_status();
    walk(tree, EntityRef::new(EntityKind::Domain, tree.domain.id))
        .into_iter()
        .filter(|e| {
            matches!(
                e.kind,
                EntityKind::Domain
                    | EntityKind::Subdomain
                    | EntityKind::Alias
                    | EntityKind::AliasSubdomain
                    | EntityKind::DnsRecord
            )
        })
        .filter(|e| status_of(tree, *e).is_some_and(|s| s.can_schedule(target)))
        .collect()
}

/// Mail reachability changes for an activation switch.
///
/// Deactivation revokes POP/IMAP access; with hard suspension the accounts
/// are also scheduled `todisable`. Activation restores access and schedules
/// disabled accounts `toenable`. Accounts that are `ordered` or `todelete` are
/// left alone, and a status is only written where the row may take it.
#[must_use]
pub fn mail_state_changes(
    tree: &DomainTree,
    action: StatusAction,
    hard_suspension: bool,
) -> Vec<MailStateChange> {
    tree.mail_accounts
        .iter()
        .filter(|mail| {
            !matches!(
                mail.status,
                ProvisioningStatus::Ordered | ProvisioningStatus::ToDelete
            )
        })
        .map(|mail| {
            let (status, po_active) = match action {
                StatusAction::Deactivate if hard_suspension => {
                    (Some(ProvisioningStatus::ToDisable), false)
                }
                StatusAction::Deactivate => (None, false),
                StatusAction::Activate if mail.status == ProvisioningStatus::Disabled => {
                    (Some(ProvisioningStatus::ToEnable), true)
                }
                StatusAction::Activate => (None, true),
            };
            MailStateChange {
                mail_id: mail.id,
                status: status.filter(|next| mail.status.can_schedule(*next)),
                po_active,
            }
        })
        .collect()
}
