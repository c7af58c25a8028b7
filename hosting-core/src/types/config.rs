//! Runtime configuration passed explicitly to services

use serde::{Deserialize, Serialize};

/// Behaviour switches of the orchestration core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct CoreConfig {
    /// Deactivation also schedules mail accounts to `todisable` (SMTP off), not only POP/IMAP
    pub hard_mail_suspension: bool,
    /// `abuse@`, `postmaster@` and `webmaster@` count toward the mailbox limit
    pub count_default_email_addresses: bool,
    /// Always re-prorate mailbox quotas on disk limit changes
    pub email_quota_sync_mode: bool,
    pub daemon: DaemonConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            hard_mail_suspension: true,
            count_default_email_addresses: false,
            email_quota_sync_mode: false,
            daemon: DaemonConfig::default(),
        }
    }
}

/// Where and how to reach the provisioning daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct DaemonConfig {
    pub host: String,
    pub port: u16,
    /// Sent in the `helo` handshake
    pub version: String,
    pub connect_timeout_secs: u64,
    pub io_timeout_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9876,
            version: env!("CARGO_PKG_VERSION").to_string(),
            connect_timeout_secs: 5,
            io_timeout_secs: 10,
        }
    }
}
