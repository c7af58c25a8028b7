//! Tri-state resource limits

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Kind of provisioned resource a [`Limit`] bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Subdomain,
    Alias,
    Mailbox,
    Ftp,
    SqlDatabase,
    SqlUser,
    /// Monthly traffic, limit expressed in MiB
    Traffic,
    /// Disk space, limit expressed in MiB
    Disk,
}

impl ResourceKind {
    /// Every kind, in the order limit updates reconcile them.
    pub const ALL: [Self; 8] = [
        Self::Subdomain,
        Self::Alias,
        Self::Mailbox,
        Self::Ftp,
        Self::SqlDatabase,
        Self::SqlUser,
        Self::Traffic,
        Self::Disk,
    ];

    /// Count-type kinds may be disabled; volume kinds (traffic, disk) may not.
    #[must_use]
    pub const fn allows_disabled(self) -> bool {
        !self.is_volume()
    }

    /// Traffic and disk are measured in bytes rather than counted objects.
    #[must_use]
    pub const fn is_volume(self) -> bool {
        matches!(self, Self::Traffic | Self::Disk)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Subdomain => "Subdomain",
            Self::Alias => "Alias",
            Self::Mailbox => "Mail",
            Self::Ftp => "FTP",
            Self::SqlDatabase => "SQL Database",
            Self::SqlUser => "SQL User",
            Self::Traffic => "Traffic",
            Self::Disk => "Disk",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A resource bound: disabled (`-1`), unlimited (`0`) or capped (`n > 0`).
///
/// Disabled and Unlimited are sentinels and never contribute to a reseller pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum Limit {
    Disabled,
    #[default]
    Unlimited,
    /// Always strictly positive
    Capped(u64),
}

impl Limit {
    /// Parse a raw stored or submitted value for the given kind.
    ///
    /// Rejects anything below `-1`, and `-1` itself for kinds that cannot be disabled.
    pub fn parse(raw: i64, kind: ResourceKind) -> CoreResult<Self> {
        let limit = Self::try_from(raw).map_err(|e| {
            CoreError::ValidationError(format!("Incorrect {} limit: {e}", kind.label()))
        })?;
        if limit == Self::Disabled && !kind.allows_disabled() {
            return Err(CoreError::ValidationError(format!(
                "Incorrect {} limit: this resource cannot be disabled",
                kind.label()
            )));
        }
        Ok(limit)
    }

    /// Parse the textual form a limit is submitted in.
    pub fn parse_str(input: &str, kind: ResourceKind) -> CoreResult<Self> {
        let raw: i64 = input.trim().parse().map_err(|_| {
            CoreError::ValidationError(format!(
                "Incorrect {} limit: '{}' is not an integer",
                kind.label(),
                input.trim()
            ))
        })?;
        Self::parse(raw, kind)
    }

    /// Stored representation.
    #[must_use]
    pub fn raw(self) -> i64 {
        match self {
            Self::Disabled => -1,
            Self::Unlimited => 0,
            Self::Capped(n) => i64::try_from(n).unwrap_or(i64::MAX),
        }
    }

    #[must_use]
    pub const fn cap(self) -> Option<u64> {
        match self {
            Self::Capped(n) => Some(n),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_disabled(self) -> bool {
        matches!(self, Self::Disabled)
    }

    #[must_use]
    pub const fn is_unlimited(self) -> bool {
        matches!(self, Self::Unlimited)
    }

    /// Amount this limit adds to its owner's reseller pool.
    #[must_use]
    pub const fn pool_contribution(self) -> u64 {
        match self {
            Self::Capped(n) => n,
            Self::Disabled | Self::Unlimited => 0,
        }
    }

    /// Whether one more object fits next to `usage` existing ones.
    #[must_use]
    pub const fn admits_one_more(self, usage: u64) -> bool {
        match self {
            Self::Disabled => false,
            Self::Unlimited => true,
            Self::Capped(n) => usage < n,
        }
    }
}

impl From<Limit> for i64 {
    fn from(limit: Limit) -> Self {
        limit.raw()
    }
}

/// Raw value outside `-1..`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidLimit(pub i64);

impl fmt::Display for InvalidLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is not a valid limit (-1 disabled, 0 unlimited, positive cap)",
            self.0
        )
    }
}

impl TryFrom<i64> for Limit {
    type Error = InvalidLimit;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        match raw {
            -1 => Ok(Self::Disabled),
            0 => Ok(Self::Unlimited),
            n if n > 0 => Ok(Self::Capped(n.unsigned_abs())),
            n => Err(InvalidLimit(n)),
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled"),
            Self::Unlimited => f.write_str("unlimited"),
            Self::Capped(n) => write!(f, "{n}"),
        }
    }
}
