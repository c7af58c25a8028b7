//! Reseller, customer and hosting plan types

use std::fmt;

use serde::{Deserialize, Serialize};

use super::limit::{Limit, ResourceKind};
use super::resources::{ResourceLimits, ResourceUsage};
use super::status::ProvisioningStatus;

/// Role of the principal performing an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Reseller,
    Customer,
}

/// The acting principal, passed explicitly to every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub name: String,
    pub role: Role,
}

impl Actor {
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            role,
        }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Admins manage every customer, resellers only the ones they created.
    #[must_use]
    pub fn manages(&self, customer: &CustomerAccount) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Reseller => customer.created_by == self.id,
            Role::Customer => false,
        }
    }

    /// [`Self::manages`], or the customer acting on its own account.
    #[must_use]
    pub fn owns_or_manages(&self, customer: &CustomerAccount) -> bool {
        match self.role {
            Role::Customer => customer.id == self.id,
            _ => self.manages(customer),
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Consumed side of a reseller pool: the sum of its customers' capped limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResellerPool {
    /// Number of customer accounts (one main domain each)
    pub domains: u64,
    pub subdomains: u64,
    pub aliases: u64,
    pub mailboxes: u64,
    pub ftp_accounts: u64,
    pub sql_databases: u64,
    pub sql_users: u64,
    pub traffic: u64,
    pub disk: u64,
}

impl ResellerPool {
    #[must_use]
    pub const fn get(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Subdomain => self.subdomains,
            ResourceKind::Alias => self.aliases,
            ResourceKind::Mailbox => self.mailboxes,
            ResourceKind::Ftp => self.ftp_accounts,
            ResourceKind::SqlDatabase => self.sql_databases,
            ResourceKind::SqlUser => self.sql_users,
            ResourceKind::Traffic => self.traffic,
            ResourceKind::Disk => self.disk,
        }
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut u64 {
        match kind {
            ResourceKind::Subdomain => &mut self.subdomains,
            ResourceKind::Alias => &mut self.aliases,
            ResourceKind::Mailbox => &mut self.mailboxes,
            ResourceKind::Ftp => &mut self.ftp_accounts,
            ResourceKind::SqlDatabase => &mut self.sql_databases,
            ResourceKind::SqlUser => &mut self.sql_users,
            ResourceKind::Traffic => &mut self.traffic,
            ResourceKind::Disk => &mut self.disk,
        }
    }
}

/// Reseller account with its own ceilings and the pool drawn from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reseller {
    pub id: i64,
    pub name: String,
    pub max_domains: Limit,
    pub ceilings: ResourceLimits,
    pub pool: ResellerPool,
}

impl Reseller {
    /// Pool entries that exceed a capped ceiling, as `(label, consumed, ceiling)`.
    #[must_use]
    pub fn overdrawn(&self) -> Vec<(&'static str, u64, u64)> {
        let mut overdrawn = Vec::new();
        if let Limit::Capped(max) = self.max_domains {
            if self.pool.domains > max {
                overdrawn.push(("Domain", self.pool.domains, max));
            }
        }
        for kind in ResourceKind::ALL {
            if let Limit::Capped(max) = self.ceilings.get(kind) {
                let consumed = self.pool.get(kind);
                if consumed > max {
                    overdrawn.push((kind.label(), consumed, max));
                }
            }
        }
        overdrawn
    }
}

/// Customer account. Owns exactly one main domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerAccount {
    pub id: i64,
    pub name: String,
    /// Owning reseller
    pub created_by: i64,
    pub status: ProvisioningStatus,
    pub limits: ResourceLimits,
    /// Recorded monthly traffic
    pub traffic_bytes: u64,
    /// Recorded disk usage
    pub disk_bytes: u64,
}

/// Named bundle of default limits a reseller provisions customers from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostingPlan {
    pub id: i64,
    pub reseller_id: i64,
    pub name: String,
    pub limits: ResourceLimits,
}

/// Request to create a customer with its main domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    pub domain_name: String,
    pub limits: CustomerLimitsSource,
}

/// Where a new customer's limits come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum CustomerLimitsSource {
    Plan(i64),
    Explicit(ResourceLimits),
}

/// Snapshot of a customer's limits next to its consumption, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageOverview {
    pub limits: ResourceLimits,
    pub usage: ResourceUsage,
}
