//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

use crate::types::QuotaViolation;

/// Core layer error type
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// Malformed input (limit value, resource name, missing field)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// One or more reconciliation rules rejected a limit change
    #[error("Quota violation: {}", join_violations(.0))]
    QuotaViolation(Vec<QuotaViolation>),

    /// An invariant failed before mutation, or a state the model forbids was found
    #[error("Inconsistent state: {0}")]
    InconsistentState(String),

    /// The store refused to commit; every row touched by the action was rolled back
    #[error("Transaction failed: {0}")]
    TransactionFailure(String),

    /// The provisioning daemon could not be notified
    #[error("Dispatch failed: {0}")]
    DispatchFailure(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    StorageError(String),

    /// A lifecycle hook vetoed the action
    #[error("Action rejected by hook: {0}")]
    HookRejected(String),

    /// The acting principal may not touch the target entity
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(i64),

    #[error("Reseller not found: {0}")]
    ResellerNotFound(i64),

    #[error("Domain not found: {0}")]
    DomainNotFound(i64),

    #[error("Domain alias not found: {0}")]
    AliasNotFound(i64),

    #[error("SQL database not found: {0}")]
    SqlDatabaseNotFound(i64),

    #[error("Hosting plan not found: {0}")]
    HostingPlanNotFound(i64),
}

fn join_violations(violations: &[QuotaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl CoreError {
    /// Whether it is expected behavior (user input, resource does not exist, etc.),
    /// used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when returning `false`.
    /// **Please update this method simultaneously when new variants are added.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::ValidationError(_)
            | Self::QuotaViolation(_)
            | Self::HookRejected(_)
            | Self::PermissionDenied(_)
            | Self::CustomerNotFound(_)
            | Self::ResellerNotFound(_)
            | Self::DomainNotFound(_)
            | Self::AliasNotFound(_)
            | Self::SqlDatabaseNotFound(_)
            | Self::HostingPlanNotFound(_) => true,
            Self::InconsistentState(_)
            | Self::TransactionFailure(_)
            | Self::DispatchFailure(_)
            | Self::StorageError(_) => false,
        }
    }

    /// Human-readable messages for the caller to display.
    ///
    /// A quota violation yields one message per violated resource kind.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::QuotaViolation(violations) => {
                violations.iter().map(ToString::to_string).collect()
            }
            other => vec![other.to_string()],
        }
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ResourceKind, ViolationReason};

    #[test]
    fn quota_violation_messages_are_per_kind() {
        let err = CoreError::QuotaViolation(vec![
            QuotaViolation::new(ResourceKind::Subdomain, ViolationReason::RecordsExist),
            QuotaViolation::new(ResourceKind::Mailbox, ViolationReason::ExceedsResellerCeiling),
        ]);
        let messages = err.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("Subdomain"));
        assert!(messages[1].contains("Mail"));
        assert!(err.is_expected());
    }

    #[test]
    fn system_errors_are_not_expected() {
        assert!(!CoreError::TransactionFailure("deadlock".into()).is_expected());
        assert!(!CoreError::InconsistentState("drift".into()).is_expected());
        assert_eq!(
            CoreError::DomainNotFound(7).messages(),
            vec!["Domain not found: 7".to_string()]
        );
    }
}
