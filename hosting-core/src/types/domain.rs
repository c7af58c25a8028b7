//! Domain tree: the main domain of a customer and everything hanging off it

use serde::{Deserialize, Serialize};

use super::limit::ResourceKind;
use super::status::{EntityKind, EntityRef, ProvisioningStatus};

/// Local parts of the default addresses created with every domain.
pub const DEFAULT_MAIL_LOCAL_PARTS: [&str; 3] = ["abuse", "postmaster", "webmaster"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub id: i64,
    pub customer_id: i64,
    pub name: String,
    pub status: ProvisioningStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subdomain {
    pub id: i64,
    pub domain_id: i64,
    /// Label prepended to the domain name
    pub name: String,
    pub status: ProvisioningStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainAlias {
    pub id: i64,
    pub domain_id: i64,
    pub name: String,
    pub status: ProvisioningStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasSubdomain {
    pub id: i64,
    pub alias_id: i64,
    pub name: String,
    pub status: ProvisioningStatus,
}

/// Host a mail account or certificate is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum HostRef {
    Domain(i64),
    Subdomain(i64),
    Alias(i64),
    AliasSubdomain(i64),
}

impl From<HostRef> for EntityRef {
    fn from(host: HostRef) -> Self {
        match host {
            HostRef::Domain(id) => Self::new(EntityKind::Domain, id),
            HostRef::Subdomain(id) => Self::new(EntityKind::Subdomain, id),
            HostRef::Alias(id) => Self::new(EntityKind::Alias, id),
            HostRef::AliasSubdomain(id) => Self::new(EntityKind::AliasSubdomain, id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailAccount {
    pub id: i64,
    pub domain_id: i64,
    pub owner: HostRef,
    pub local_part: String,
    pub status: ProvisioningStatus,
    /// POP/IMAP access
    pub po_active: bool,
    /// Mailbox quota in bytes, `Some(0)` inherits the domain quota, `None` for
    /// forwarders which have no mailbox
    pub quota: Option<u64>,
    pub catchall: bool,
}

impl MailAccount {
    /// Counts toward the mailbox limit.
    #[must_use]
    pub fn is_countable(&self, count_default_addresses: bool) -> bool {
        if self.catchall {
            return false;
        }
        count_default_addresses || !DEFAULT_MAIL_LOCAL_PARTS.contains(&self.local_part.as_str())
    }
}

/// New reachability of a mail account on (de)activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailStateChange {
    pub mail_id: i64,
    /// `None` leaves the status column untouched
    pub status: Option<ProvisioningStatus>,
    pub po_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsRecord {
    pub id: i64,
    pub domain_id: i64,
    /// Set when the record belongs to an alias zone
    pub alias_id: Option<i64>,
    pub name: String,
    pub status: ProvisioningStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: i64,
    pub owner: HostRef,
    pub status: ProvisioningStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpUser {
    pub id: i64,
    pub customer_id: i64,
    /// `login@host`
    pub userid: String,
    pub status: ProvisioningStatus,
}

impl FtpUser {
    /// Host part of the login.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.userid.rsplit_once('@').map(|(_, host)| host)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlDatabase {
    pub id: i64,
    pub domain_id: i64,
    pub name: String,
    pub status: ProvisioningStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlUser {
    pub id: i64,
    pub database_id: i64,
    pub name: String,
    pub status: ProvisioningStatus,
}

/// Every row owned by one customer's main domain, loaded in one read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainTree {
    pub domain: Domain,
    pub subdomains: Vec<Subdomain>,
    pub aliases: Vec<DomainAlias>,
    pub alias_subdomains: Vec<AliasSubdomain>,
    pub mail_accounts: Vec<MailAccount>,
    pub dns_records: Vec<DnsRecord>,
    pub certificates: Vec<Certificate>,
    pub ftp_users: Vec<FtpUser>,
    pub sql_databases: Vec<SqlDatabase>,
    pub sql_users: Vec<SqlUser>,
}

impl DomainTree {
    #[must_use]
    pub fn empty(domain: Domain) -> Self {
        Self {
            domain,
            subdomains: Vec::new(),
            aliases: Vec::new(),
            alias_subdomains: Vec::new(),
            mail_accounts: Vec::new(),
            dns_records: Vec::new(),
            certificates: Vec::new(),
            ftp_users: Vec::new(),
            sql_databases: Vec::new(),
            sql_users: Vec::new(),
        }
    }

    #[must_use]
    pub fn alias(&self, alias_id: i64) -> Option<&DomainAlias> {
        self.aliases.iter().find(|a| a.id == alias_id)
    }

    #[must_use]
    pub fn sql_database(&self, database_id: i64) -> Option<&SqlDatabase> {
        self.sql_databases.iter().find(|d| d.id == database_id)
    }

    /// Fully qualified name of a host in this tree.
    #[must_use]
    pub fn host_name(&self, host: HostRef) -> Option<String> {
        match host {
            HostRef::Domain(id) => (id == self.domain.id).then(|| self.domain.name.clone()),
            HostRef::Subdomain(id) => self
                .subdomains
                .iter()
                .find(|s| s.id == id)
                .map(|s| format!("{}.{}", s.name, self.domain.name)),
            HostRef::Alias(id) => self.alias(id).map(|a| a.name.clone()),
            HostRef::AliasSubdomain(id) => self
                .alias_subdomains
                .iter()
                .find(|s| s.id == id)
                .and_then(|s| self.alias(s.alias_id).map(|a| format!("{}.{}", s.name, a.name))),
        }
    }
}

/// A provisioned object a customer asks to add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NewResource {
    Subdomain {
        name: String,
    },
    /// `ordered` aliases wait for a reseller's approval
    Alias {
        name: String,
        ordered: bool,
    },
    AliasSubdomain {
        alias_id: i64,
        name: String,
    },
    MailAccount {
        owner: HostRef,
        local_part: String,
        quota: Option<u64>,
        catchall: bool,
    },
    FtpUser {
        userid: String,
    },
    SqlDatabase {
        name: String,
    },
    SqlUser {
        database_id: i64,
        name: String,
    },
}

impl NewResource {
    /// Limit the new object is counted against, if any.
    ///
    /// Catch-all addresses are not counted.
    #[must_use]
    pub fn kind(&self) -> Option<ResourceKind> {
        Some(match self {
            Self::Subdomain { .. } | Self::AliasSubdomain { .. } => ResourceKind::Subdomain,
            Self::Alias { .. } => ResourceKind::Alias,
            Self::MailAccount { catchall: true, .. } => return None,
            Self::MailAccount { .. } => ResourceKind::Mailbox,
            Self::FtpUser { .. } => ResourceKind::Ftp,
            Self::SqlDatabase { .. } => ResourceKind::SqlDatabase,
            Self::SqlUser { .. } => ResourceKind::SqlUser,
        })
    }

    /// Initial status of the inserted row.
    #[must_use]
    pub const fn initial_status(&self) -> ProvisioningStatus {
        match self {
            Self::Alias { ordered: true, .. } => ProvisioningStatus::Ordered,
            _ => ProvisioningStatus::ToAdd,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Subdomain { name }
            | Self::Alias { name, .. }
            | Self::AliasSubdomain { name, .. }
            | Self::SqlDatabase { name }
            | Self::SqlUser { name, .. } => name,
            Self::MailAccount { local_part, .. } => local_part,
            Self::FtpUser { userid } => userid,
        }
    }
}
