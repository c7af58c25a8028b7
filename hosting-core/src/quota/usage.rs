//! Live consumption of a customer

use crate::types::{CustomerAccount, DomainTree, ProvisioningStatus, ResourceUsage};

/// Count what a customer currently consumes, independent of its limits.
///
/// Alias subdomains count as subdomains. Ordered aliases are not live yet.
/// Catch-all addresses never count; the default addresses only when configured.
#[must_use]
pub fn compute_usage(
    customer: &CustomerAccount,
    tree: &DomainTree,
    count_default_addresses: bool,
) -> ResourceUsage {
    ResourceUsage {
        subdomains: (tree.subdomains.len() + tree.alias_subdomains.len()) as u64,
        aliases: tree
            .aliases
            .iter()
            .filter(|a| a.status != ProvisioningStatus::Ordered)
            .count() as u64,
        mailboxes: tree
            .mail_accounts
            .iter()
            .filter(|m| m.is_countable(count_default_addresses))
            .count() as u64,
        ftp_accounts: tree.ftp_users.len() as u64,
        sql_databases: tree.sql_databases.len() as u64,
        sql_users: tree.sql_users.len() as u64,
        traffic_bytes: customer.traffic_bytes,
        disk_bytes: customer.disk_bytes,
    }
}
