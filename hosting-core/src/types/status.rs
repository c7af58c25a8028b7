//! Provisioning status model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle tag of a provisioned entity.
///
/// `to*` values are pending work for the provisioning daemon, which writes back
/// `ok` or `disabled` (or removes the row) once the work is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisioningStatus {
    Ok,
    ToAdd,
    ToChange,
    ToDelete,
    Disabled,
    ToEnable,
    ToDisable,
    /// Awaiting administrative approval
    Ordered,
}

impl ProvisioningStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::ToAdd => "toadd",
            Self::ToChange => "tochange",
            Self::ToDelete => "todelete",
            Self::Disabled => "disabled",
            Self::ToEnable => "toenable",
            Self::ToDisable => "todisable",
            Self::Ordered => "ordered",
        }
    }

    /// Whether an administrative action may move an entity from `self` to `next`.
    ///
    /// Pending states can only be left through the daemon's acknowledgement.
    #[must_use]
    pub const fn can_schedule(self, next: Self) -> bool {
        match (self, next) {
            (
                Self::Ok,
                Self::ToAdd | Self::ToChange | Self::ToDelete | Self::ToEnable | Self::ToDisable,
            )
            | (Self::Disabled, Self::ToEnable | Self::ToDelete)
            | (Self::Ordered, Self::ToAdd) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ProvisioningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProvisioningStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ok" => Self::Ok,
            "toadd" => Self::ToAdd,
            "tochange" => Self::ToChange,
            "todelete" => Self::ToDelete,
            "disabled" => Self::Disabled,
            "toenable" => Self::ToEnable,
            "todisable" => Self::ToDisable,
            "ordered" => Self::Ordered,
            other => {
                return Err(CoreError::StorageError(format!(
                    "Unknown provisioning status: {other}"
                )))
            }
        })
    }
}

/// Table-level kind of an entity carrying a provisioning status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Customer,
    Domain,
    Subdomain,
    Alias,
    AliasSubdomain,
    MailAccount,
    DnsRecord,
    Certificate,
    FtpUser,
    SqlDatabase,
    SqlUser,
}

impl EntityKind {
    pub const ALL: [Self; 11] = [
        Self::Customer,
        Self::Domain,
        Self::Subdomain,
        Self::Alias,
        Self::AliasSubdomain,
        Self::MailAccount,
        Self::DnsRecord,
        Self::Certificate,
        Self::FtpUser,
        Self::SqlDatabase,
        Self::SqlUser,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Domain => "domain",
            Self::Subdomain => "subdomain",
            Self::Alias => "alias",
            Self::AliasSubdomain => "alias_subdomain",
            Self::MailAccount => "mail_account",
            Self::DnsRecord => "dns_record",
            Self::Certificate => "certificate",
            Self::FtpUser => "ftp_user",
            Self::SqlDatabase => "sql_database",
            Self::SqlUser => "sql_user",
        }
    }
}

impl FromStr for EntityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "customer" => Self::Customer,
            "domain" => Self::Domain,
            "subdomain" => Self::Subdomain,
            "alias" => Self::Alias,
            "alias_subdomain" => Self::AliasSubdomain,
            "mail_account" => Self::MailAccount,
            "dns_record" => Self::DnsRecord,
            "certificate" => Self::Certificate,
            "ftp_user" => Self::FtpUser,
            "sql_database" => Self::SqlDatabase,
            "sql_user" => Self::SqlUser,
            other => {
                return Err(CoreError::StorageError(format!("Unknown entity kind: {other}")))
            }
        })
    }
}

/// Typed row reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: i64,
}

impl EntityRef {
    #[must_use]
    pub const fn new(kind: EntityKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind.as_str(), self.id)
    }
}
