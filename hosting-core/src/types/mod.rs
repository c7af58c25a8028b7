//! Type definitions

mod account;
mod config;
mod domain;
mod limit;
mod report;
mod resources;
mod status;

pub use account::{
    Actor, CustomerAccount, CustomerLimitsSource, HostingPlan, NewCustomer, Reseller,
    ResellerPool, Role, UsageOverview,
};
pub use config::{CoreConfig, DaemonConfig};
pub use domain::{
    AliasSubdomain, Certificate, DnsRecord, Domain, DomainAlias, DomainTree, FtpUser, HostRef,
    MailAccount, MailStateChange, NewResource, SqlDatabase, SqlUser, Subdomain,
    DEFAULT_MAIL_LOCAL_PARTS,
};
pub use limit::{InvalidLimit, Limit, ResourceKind};
pub use report::{CascadeSummary, DispatchOutcome, OperationReport};
pub use resources::{QuotaViolation, ResourceLimits, ResourceUsage, ViolationReason};
pub use status::{EntityKind, EntityRef, ProvisioningStatus};
