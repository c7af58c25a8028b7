//! Row model <-> core type conversions.
//!
//! Limits are stored as raw `-1 / 0 / n` integers, statuses as their lowercase
//! names, byte counters as signed 64-bit integers.

use sea_orm::DbErr;

use hosting_core::error::{CoreError, CoreResult};
use hosting_core::types::{
    AliasSubdomain, Certificate, CustomerAccount, DnsRecord, Domain, DomainAlias, FtpUser,
    HostRef, HostingPlan, Limit, MailAccount, ProvisioningStatus, Reseller, ResellerPool,
    ResourceLimits, SqlDatabase, SqlUser, Subdomain,
};

use super::entity::{
    alias_subdomain, certificate, customer, dns_record, domain, domain_alias, ftp_user,
    hosting_plan, mail_account, reseller, sql_database, sql_user, subdomain,
};

/// `map_err` adapter turning a driver error into a `StorageError`.
pub(super) fn db_err(action: &'static str) -> impl FnOnce(DbErr) -> CoreError {
    move |e| CoreError::StorageError(format!("Failed to {action}: {e}"))
}

pub(super) fn to_u64(value: i64, column: &str) -> CoreResult<u64> {
    u64::try_from(value)
        .map_err(|_| CoreError::StorageError(format!("Negative value {value} in {column}")))
}

pub(super) fn to_i64(value: u64) -> CoreResult<i64> {
    i64::try_from(value)
        .map_err(|_| CoreError::ValidationError(format!("Value {value} is out of range")))
}

fn status(raw: &str) -> CoreResult<ProvisioningStatus> {
    raw.parse()
}

/// `(owner_type, owner_id)` columns of a host reference.
pub(super) fn host_columns(host: HostRef) -> (&'static str, i64) {
    match host {
        HostRef::Domain(id) => ("domain", id),
        HostRef::Subdomain(id) => ("subdomain", id),
        HostRef::Alias(id) => ("alias", id),
        HostRef::AliasSubdomain(id) => ("alias_subdomain", id),
    }
}

fn host_ref(owner_type: &str, owner_id: i64) -> CoreResult<HostRef> {
    Ok(match owner_type {
        "domain" => HostRef::Domain(owner_id),
        "subdomain" => HostRef::Subdomain(owner_id),
        "alias" => HostRef::Alias(owner_id),
        "alias_subdomain" => HostRef::AliasSubdomain(owner_id),
        other => {
            return Err(CoreError::StorageError(format!(
                "Unknown host type: {other}"
            )))
        }
    })
}

/// Raw limit columns in `ResourceKind::ALL` order.
pub(super) fn raw_limits(limits: &ResourceLimits) -> [i64; 8] {
    [
        limits.subdomains.raw(),
        limits.aliases.raw(),
        limits.mailboxes.raw(),
        limits.ftp_accounts.raw(),
        limits.sql_databases.raw(),
        limits.sql_users.raw(),
        limits.traffic.raw(),
        limits.disk.raw(),
    ]
}

impl reseller::Model {
    pub(super) fn into_reseller(self) -> CoreResult<Reseller> {
        let max_domains = Limit::try_from(self.max_dmn_cnt).map_err(|e| {
            CoreError::StorageError(format!("Invalid domain limit of reseller {}: {e}", self.id))
        })?;
        let ceilings = ResourceLimits::from_raw([
            self.max_sub_cnt,
            self.max_als_cnt,
            self.max_mail_cnt,
            self.max_ftp_cnt,
            self.max_sql_db_cnt,
            self.max_sql_user_cnt,
            self.max_traffic,
            self.max_disk,
        ])?;
        let pool = ResellerPool {
            domains: to_u64(self.current_dmn_cnt, "current_dmn_cnt")?,
            subdomains: to_u64(self.current_sub_cnt, "current_sub_cnt")?,
            aliases: to_u64(self.current_als_cnt, "current_als_cnt")?,
            mailboxes: to_u64(self.current_mail_cnt, "current_mail_cnt")?,
            ftp_accounts: to_u64(self.current_ftp_cnt, "current_ftp_cnt")?,
            sql_databases: to_u64(self.current_sql_db_cnt, "current_sql_db_cnt")?,
            sql_users: to_u64(self.current_sql_user_cnt, "current_sql_user_cnt")?,
            traffic: to_u64(self.current_traffic, "current_traffic")?,
            disk: to_u64(self.current_disk, "current_disk")?,
        };
        Ok(Reseller {
            id: self.id,
            name: self.name,
            max_domains,
            ceilings,
            pool,
        })
    }
}

impl customer::Model {
    pub(super) fn into_customer(self) -> CoreResult<CustomerAccount> {
        let limits = ResourceLimits::from_raw([
            self.max_sub_cnt,
            self.max_als_cnt,
            self.max_mail_cnt,
            self.max_ftp_cnt,
            self.max_sql_db_cnt,
            self.max_sql_user_cnt,
            self.max_traffic,
            self.max_disk,
        ])?;
        Ok(CustomerAccount {
            id: self.id,
            name: self.name,
            created_by: self.created_by,
            status: status(&self.status)?,
            limits,
            traffic_bytes: to_u64(self.traffic_bytes, "traffic_bytes")?,
            disk_bytes: to_u64(self.disk_bytes, "disk_bytes")?,
        })
    }
}

impl hosting_plan::Model {
    pub(super) fn into_plan(self) -> CoreResult<HostingPlan> {
        let limits = ResourceLimits::from_raw([
            self.max_sub_cnt,
            self.max_als_cnt,
            self.max_mail_cnt,
            self.max_ftp_cnt,
            self.max_sql_db_cnt,
            self.max_sql_user_cnt,
            self.max_traffic,
            self.max_disk,
        ])?;
        Ok(HostingPlan {
            id: self.id,
            reseller_id: self.reseller_id,
            name: self.name,
            limits,
        })
    }
}

impl domain::Model {
    pub(super) fn into_domain(self) -> CoreResult<Domain> {
        Ok(Domain {
            id: self.id,
            customer_id: self.customer_id,
            name: self.name,
            status: status(&self.status)?,
        })
    }
}

impl subdomain::Model {
    pub(super) fn into_subdomain(self) -> CoreResult<Subdomain> {
        Ok(Subdomain {
            id: self.id,
            domain_id: self.domain_id,
            name: self.name,
            status: status(&self.status)?,
        })
    }
}

impl domain_alias::Model {
    pub(super) fn into_alias(self) -> CoreResult<DomainAlias> {
        Ok(DomainAlias {
            id: self.id,
            domain_id: self.domain_id,
            name: self.name,
            status: status(&self.status)?,
        })
    }
}

impl alias_subdomain::Model {
    pub(super) fn into_alias_subdomain(self) -> CoreResult<AliasSubdomain> {
        Ok(AliasSubdomain {
            id: self.id,
            alias_id: self.alias_id,
            name: self.name,
            status: status(&self.status)?,
        })
    }
}

impl mail_account::Model {
    pub(super) fn into_mail_account(self) -> CoreResult<MailAccount> {
        Ok(MailAccount {
            id: self.id,
            domain_id: self.domain_id,
            owner: host_ref(&self.owner_type, self.owner_id)?,
            local_part: self.local_part,
            status: status(&self.status)?,
            po_active: self.po_active,
            quota: self.quota.map(|q| to_u64(q, "quota")).transpose()?,
            catchall: self.catchall,
        })
    }
}

impl dns_record::Model {
    pub(super) fn into_dns_record(self) -> CoreResult<DnsRecord> {
        Ok(DnsRecord {
            id: self.id,
            domain_id: self.domain_id,
            alias_id: self.alias_id,
            name: self.name,
            status: status(&self.status)?,
        })
    }
}

impl certificate::Model {
    pub(super) fn into_certificate(self) -> CoreResult<Certificate> {
        Ok(Certificate {
            id: self.id,
            owner: host_ref(&self.owner_type, self.owner_id)?,
            status: status(&self.status)?,
        })
    }
}

impl ftp_user::Model {
    pub(super) fn into_ftp_user(self) -> CoreResult<FtpUser> {
        Ok(FtpUser {
            id: self.id,
            customer_id: self.customer_id,
            userid: self.userid,
            status: status(&self.status)?,
        })
    }
}

impl sql_database::Model {
    pub(super) fn into_sql_database(self) -> CoreResult<SqlDatabase> {
        Ok(SqlDatabase {
            id: self.id,
            domain_id: self.domain_id,
            name: self.name,
            status: status(&self.status)?,
        })
    }
}

impl sql_user::Model {
    pub(super) fn into_sql_user(self) -> CoreResult<SqlUser> {
        Ok(SqlUser {
            id: self.id,
            database_id: self.database_id,
            name: self.name,
            status: status(&self.status)?,
        })
    }
}
