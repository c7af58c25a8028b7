//! Per-kind limit and usage sets, and quota violations

use std::fmt;

use serde::{Deserialize, Serialize};

use super::limit::{Limit, ResourceKind};

const MIB: u64 = 1024 * 1024;

/// One [`Limit`] per resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLimits {
    pub subdomains: Limit,
    pub aliases: Limit,
    pub mailboxes: Limit,
    pub ftp_accounts: Limit,
    pub sql_databases: Limit,
    pub sql_users: Limit,
    /// MiB per month
    pub traffic: Limit,
    /// MiB
    pub disk: Limit,
}

impl ResourceLimits {
    /// Everything disabled, volumes unlimited. Starting point for a new customer.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            subdomains: Limit::Disabled,
            aliases: Limit::Disabled,
            mailboxes: Limit::Disabled,
            ftp_accounts: Limit::Disabled,
            sql_databases: Limit::Disabled,
            sql_users: Limit::Disabled,
            traffic: Limit::Unlimited,
            disk: Limit::Unlimited,
        }
    }

    #[must_use]
    pub const fn get(&self, kind: ResourceKind) -> Limit {
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

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut Limit {
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

    /// Parse raw values in [`ResourceKind::ALL`] order.
    pub fn from_raw(raw: [i64; 8]) -> crate::error::CoreResult<Self> {
        let mut limits = Self::none();
        for (kind, value) in ResourceKind::ALL.into_iter().zip(raw) {
            *limits.get_mut(kind) = Limit::parse(value, kind)?;
        }
        Ok(limits)
    }

    /// Reject values a kind cannot take (a disabled traffic or disk limit).
    pub fn validate(&self) -> crate::error::CoreResult<()> {
        for kind in ResourceKind::ALL {
            Limit::parse(self.get(kind).raw(), kind)?;
        }
        Ok(())
    }

    /// The SQL database and SQL user limits must be disabled together.
    #[must_use]
    pub fn sql_pair_violations(&self) -> Vec<QuotaViolation> {
        let mut violations = Vec::new();
        if self.sql_databases.is_disabled() && !self.sql_users.is_disabled() {
            violations.push(QuotaViolation::new(
                ResourceKind::SqlDatabase,
                ViolationReason::PairDisabled(ResourceKind::SqlUser),
            ));
        }
        if self.sql_users.is_disabled() && !self.sql_databases.is_disabled() {
            violations.push(QuotaViolation::new(
                ResourceKind::SqlUser,
                ViolationReason::PairDisabled(ResourceKind::SqlDatabase),
            ));
        }
        violations
    }
}

/// Live consumption per resource kind, independent of limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUsage {
    pub subdomains: u64,
    pub aliases: u64,
    pub mailboxes: u64,
    pub ftp_accounts: u64,
    pub sql_databases: u64,
    pub sql_users: u64,
    pub traffic_bytes: u64,
    pub disk_bytes: u64,
}

impl ResourceUsage {
    /// Usage expressed in the unit of the kind's limit (volumes round up to whole MiB).
    #[must_use]
    pub const fn in_limit_unit(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Subdomain => self.subdomains,
            ResourceKind::Alias => self.aliases,
            ResourceKind::Mailbox => self.mailboxes,
            ResourceKind::Ftp => self.ftp_accounts,
            ResourceKind::SqlDatabase => self.sql_databases,
            ResourceKind::SqlUser => self.sql_users,
            ResourceKind::Traffic => self.traffic_bytes.div_ceil(MIB),
            ResourceKind::Disk => self.disk_bytes.div_ceil(MIB),
        }
    }
}

/// Why a limit change or provisioning request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "related", rename_all = "snake_case")]
pub enum ViolationReason {
    /// Cannot disable while live objects exist
    RecordsExist,
    /// New cap is smaller than current usage
    BelowCurrentUsage,
    /// Cannot go unlimited under a capped reseller
    ResellerEnforcesCeiling,
    /// The reseller pool would exceed its ceiling
    ExceedsResellerCeiling,
    /// The reseller itself has the service disabled
    DisabledByReseller,
    /// Disabled while the paired kind is not
    PairDisabled(ResourceKind),
    /// The customer has the service disabled
    ServiceDisabled,
    /// The customer's cap is already used up
    LimitReached,
}

/// One violated rule for one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaViolation {
    pub kind: ResourceKind,
    pub reason: ViolationReason,
}

impl QuotaViolation {
    #[must_use]
    pub const fn new(kind: ResourceKind, reason: ViolationReason) -> Self {
        Self { kind, reason }
    }
}

impl fmt::Display for QuotaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind;
        match self.reason {
            ViolationReason::RecordsExist => write!(
                f,
                "The {kind} service cannot be disabled: there are {kind} records on the system"
            ),
            ViolationReason::BelowCurrentUsage => write!(
                f,
                "The {kind} service cannot be limited: the specified number is smaller than the {kind} records present on the system"
            ),
            ViolationReason::ResellerEnforcesCeiling => write!(
                f,
                "The {kind} service cannot be unlimited: there are reseller limits for the {kind} service"
            ),
            ViolationReason::ExceedsResellerCeiling => write!(
                f,
                "The {kind} service cannot be limited: you are exceeding reseller limits for the {kind} service"
            ),
            ViolationReason::DisabledByReseller => {
                write!(f, "The {kind} service is disabled for the reseller")
            }
            ViolationReason::PairDisabled(other) => write!(
                f,
                "The {kind} limit is disabled while the {other} limit is not"
            ),
            ViolationReason::ServiceDisabled => {
                write!(f, "The {kind} service is disabled for this customer")
            }
            ViolationReason::LimitReached => write!(f, "The {kind} limit has been reached"),
        }
    }
}
