//! Command-line arguments

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use hosting_core::types::{Actor, Limit, ResourceKind, ResourceLimits, Role};
use hosting_core::{CoreResult, StatusAction};

#[derive(Parser, Debug)]
#[command(name = "hostctl")]
#[command(version)]
#[command(about = "Quota reconciliation and provisioning for a hosting panel", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, default_value = "hosting.toml")]
    pub config: PathBuf,

    #[command(flatten)]
    pub actor: ActorArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Who the command acts as.
#[derive(Args, Debug)]
pub struct ActorArgs {
    #[arg(long = "as", value_enum, default_value_t = RoleArg::Admin, global = true)]
    pub role: RoleArg,

    /// Id of the acting reseller or customer
    #[arg(long = "actor-id", default_value_t = 0, global = true)]
    pub id: i64,

    #[arg(long = "actor-name", default_value = "hostctl", global = true)]
    pub name: String,
}

impl ActorArgs {
    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.name.clone(), self.role.into())
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleArg {
    Admin,
    Reseller,
    Customer,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Admin => Self::Admin,
            RoleArg::Reseller => Self::Reseller,
            RoleArg::Customer => Self::Customer,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusArg {
    Activate,
    Deactivate,
}

impl From<StatusArg> for StatusAction {
    fn from(action: StatusArg) -> Self {
        match action {
            StatusArg::Activate => Self::Activate,
            StatusArg::Deactivate => Self::Deactivate,
        }
    }
}

/// Raw limit values: `-1` disabled, `0` unlimited, `n` capped.
///
/// Omitted counts default to disabled and omitted volumes to unlimited.
#[derive(Args, Debug, Clone, Copy)]
pub struct LimitArgs {
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub subdomains: i64,
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub aliases: i64,
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub mailboxes: i64,
    #[arg(long = "ftp", default_value_t = -1, allow_hyphen_values = true)]
    pub ftp_accounts: i64,
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub sql_databases: i64,
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub sql_users: i64,
    /// MiB per month
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub traffic: i64,
    /// MiB
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub disk: i64,
}

impl LimitArgs {
    pub fn to_limits(self) -> CoreResult<ResourceLimits> {
        ResourceLimits::from_raw([
            self.subdomains,
            self.aliases,
            self.mailboxes,
            self.ftp_accounts,
            self.sql_databases,
            self.sql_users,
            self.traffic,
            self.disk,
        ])
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show a customer's limits next to its usage
    Overview { customer_id: i64 },

    /// Change a customer's limits
    ChangeLimits {
        customer_id: i64,
        #[command(flatten)]
        limits: LimitArgs,
    },

    /// Activate or deactivate a customer's domain tree
    ChangeStatus {
        customer_id: i64,
        #[arg(value_enum)]
        action: StatusArg,
    },

    /// Schedule a customer and everything it owns for deletion
    DeleteCustomer { customer_id: i64 },

    /// Schedule a domain alias for deletion
    DeleteAlias { alias_id: i64 },

    /// Schedule a SQL database and its users for deletion
    DeleteSqlDb { domain_id: i64, database_id: i64 },

    /// Split a disk quota across a domain's mailboxes
    Prorate {
        domain_id: i64,
        /// Quota to split, in MiB
        #[arg(long)]
        mib: u64,
    },

    /// Recompute a reseller's pool from its customers
    ResyncPool { reseller_id: i64 },

    /// Change a hosting plan's limits
    UpdatePlan {
        plan_id: i64,
        #[command(flatten)]
        limits: LimitArgs,
    },

    /// Create a customer from a hosting plan
    CreateCustomer {
        name: String,
        domain: String,
        #[arg(long)]
        plan: i64,
    },

    /// Add a resource described as JSON, e.g. '{"type":"subdomain","name":"www"}'
    AddResource { customer_id: i64, resource: String },

    /// Approve or reject an ordered alias
    ReviewAlias {
        alias_id: i64,
        #[arg(long)]
        reject: bool,
    },

    /// Create a reseller
    CreateReseller {
        name: String,
        /// Domain ceiling (-1 disabled, 0 unlimited)
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        max_domains: i64,
        #[command(flatten)]
        limits: LimitArgs,
    },

    /// Create a hosting plan owned by a reseller
    CreatePlan {
        reseller_id: i64,
        name: String,
        #[command(flatten)]
        limits: LimitArgs,
    },

    /// Mark pending work as carried out, for setups without a daemon
    Acknowledge,

    /// Wake the provisioning daemon
    Dispatch,
}

/// Domain ceiling of a reseller; it may be disabled like any count.
pub fn max_domains(raw: i64) -> CoreResult<Limit> {
    Limit::parse(raw, ResourceKind::Subdomain)
}
