//! Child limit / reseller pool reconciliation

use crate::error::{CoreError, CoreResult};
use crate::types::{
    Limit, QuotaViolation, ResellerPool, ResourceKind, ResourceLimits, ResourceUsage,
    ViolationReason,
};

/// Why a single-kind reconciliation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// The request breaks a rule; collectable, reported to the caller
    Violation(QuotaViolation),
    /// Stored state the model forbids; aborts the whole action
    Inconsistent(String),
}

impl From<ReconcileError> for CoreError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::Violation(v) => Self::QuotaViolation(vec![v]),
            ReconcileError::Inconsistent(msg) => Self::InconsistentState(msg),
        }
    }
}

/// Reconcile a requested limit for one kind against the child's usage and its reseller pool.
///
/// On success `umax` holds the new child limit and `consumed` the new pool value.
/// On failure neither is touched.
pub fn reconcile(
    kind: ResourceKind,
    data: Limit,
    usage: u64,
    umax: &mut Limit,
    consumed: &mut u64,
    ceiling: Limit,
) -> Result<(), ReconcileError> {
    let reject = |reason| Err(ReconcileError::Violation(QuotaViolation::new(kind, reason)));

    let (limit, pool) = match (ceiling, *umax, data) {
        // Reseller has the service disabled: only disabling is allowed
        (Limit::Disabled, current, Limit::Disabled) => match current {
            Limit::Disabled => return Ok(()),
            _ if usage > 0 => return reject(ViolationReason::RecordsExist),
            Limit::Unlimited => (Limit::Disabled, *consumed),
            Limit::Capped(m) => (Limit::Disabled, release(kind, *consumed, m)?),
        },
        (Limit::Disabled, _, _) => return reject(ViolationReason::DisabledByReseller),

        (Limit::Unlimited, Limit::Disabled, Limit::Disabled)
        | (Limit::Unlimited, Limit::Unlimited, Limit::Unlimited) => return Ok(()),
        (Limit::Unlimited, Limit::Disabled, Limit::Unlimited) => (Limit::Unlimited, *consumed),
        (Limit::Unlimited, Limit::Disabled, Limit::Capped(n)) => {
            (Limit::Capped(n), acquire(kind, *consumed, n)?)
        }
        (Limit::Unlimited, Limit::Unlimited, Limit::Disabled) => {
            if usage > 0 {
                return reject(ViolationReason::RecordsExist);
            }
            (Limit::Disabled, *consumed)
        }
        (Limit::Unlimited, Limit::Unlimited, Limit::Capped(n)) => {
            if usage > n {
                return reject(ViolationReason::BelowCurrentUsage);
            }
            (Limit::Capped(n), acquire(kind, *consumed, n)?)
        }
        (Limit::Unlimited, Limit::Capped(m), Limit::Disabled) => {
            if usage > 0 {
                return reject(ViolationReason::RecordsExist);
            }
            (Limit::Disabled, release(kind, *consumed, m)?)
        }
        (Limit::Unlimited, Limit::Capped(m), Limit::Unlimited) => {
            (Limit::Unlimited, release(kind, *consumed, m)?)
        }
        (Limit::Unlimited, Limit::Capped(m), Limit::Capped(n)) => {
            if usage > n {
                return reject(ViolationReason::BelowCurrentUsage);
            }
            (Limit::Capped(n), acquire(kind, release(kind, *consumed, m)?, n)?)
        }

        (Limit::Capped(_), Limit::Disabled, Limit::Disabled) => return Ok(()),
        (Limit::Capped(_), Limit::Disabled, Limit::Unlimited)
        | (Limit::Capped(_), Limit::Capped(_), Limit::Unlimited) => {
            return reject(ViolationReason::ResellerEnforcesCeiling)
        }
        (Limit::Capped(max), Limit::Disabled, Limit::Capped(n)) => {
            let pool = acquire(kind, *consumed, n)?;
            if pool > max {
                return reject(ViolationReason::ExceedsResellerCeiling);
            }
            (Limit::Capped(n), pool)
        }
        (Limit::Capped(max), Limit::Unlimited, _) => {
            return Err(ReconcileError::Inconsistent(format!(
                "{kind} limit is unlimited although the reseller ceiling is capped at {max}"
            )))
        }
        (Limit::Capped(_), Limit::Capped(m), Limit::Disabled) => {
            if usage > 0 {
                return reject(ViolationReason::RecordsExist);
            }
            (Limit::Disabled, release(kind, *consumed, m)?)
        }
        (Limit::Capped(max), Limit::Capped(m), Limit::Capped(n)) => {
            if usage > n {
                return reject(ViolationReason::BelowCurrentUsage);
            }
            let pool = acquire(kind, release(kind, *consumed, m)?, n)?;
            if pool > max {
                return reject(ViolationReason::ExceedsResellerCeiling);
            }
            (Limit::Capped(n), pool)
        }
    };

    *umax = limit;
    *consumed = pool;
    Ok(())
}

fn acquire(kind: ResourceKind, consumed: u64, n: u64) -> Result<u64, ReconcileError> {
    consumed
        .checked_add(n)
        .ok_or_else(|| ReconcileError::Inconsistent(format!("{kind} pool overflow")))
}

/// The pool always contains the child's previous cap; underflow means drift.
fn release(kind: ResourceKind, consumed: u64, m: u64) -> Result<u64, ReconcileError> {
    consumed.checked_sub(m).ok_or_else(|| {
        ReconcileError::Inconsistent(format!(
            "{kind} pool ({consumed}) is smaller than a customer limit ({m}), resync required"
        ))
    })
}

/// Reconcile every kind of a limit update; all or nothing.
///
/// Violations of every kind are collected before giving up. An inconsistency aborts
/// immediately. `limits` and `pool` are only written when everything succeeds.
pub fn reconcile_all(
    requested: &ResourceLimits,
    usage: &ResourceUsage,
    limits: &mut ResourceLimits,
    pool: &mut ResellerPool,
    ceilings: &ResourceLimits,
) -> CoreResult<()> {
    let mut violations = requested.sql_pair_violations();
    let mut next_limits = *limits;
    let mut next_pool = *pool;

    for kind in ResourceKind::ALL {
        match reconcile(
            kind,
            requested.get(kind),
            usage.in_limit_unit(kind),
            next_limits.get_mut(kind),
            next_pool.get_mut(kind),
            ceilings.get(kind),
        ) {
            Ok(()) => {}
            Err(ReconcileError::Violation(v)) => violations.push(v),
            Err(ReconcileError::Inconsistent(msg)) => return Err(CoreError::InconsistentState(msg)),
        }
    }

    if !violations.is_empty() {
        return Err(CoreError::QuotaViolation(violations));
    }
    *limits = next_limits;
    *pool = next_pool;
    Ok(())
}

/// Bring hosting plan values in line with the owning reseller.
///
/// A disabled ceiling forces the plan value to disabled. A capped ceiling rejects
/// unlimited values and values that no longer fit next to the pool.
#[must_use]
pub fn fit_plan_to_reseller(
    plan: &mut ResourceLimits,
    ceilings: &ResourceLimits,
    pool: &ResellerPool,
) -> Vec<QuotaViolation> {
    let mut violations = Vec::new();
    for kind in ResourceKind::ALL {
        let value = plan.get_mut(kind);
        match (ceilings.get(kind), *value) {
            (Limit::Disabled, _) if kind.allows_disabled() => *value = Limit::Disabled,
            (Limit::Capped(_), Limit::Unlimited) => violations.push(QuotaViolation::new(
                kind,
                ViolationReason::ResellerEnforcesCeiling,
            )),
            (Limit::Capped(max), Limit::Capped(n)) if pool.get(kind).saturating_add(n) > max => {
                violations.push(QuotaViolation::new(
                    kind,
                    ViolationReason::ExceedsResellerCeiling,
                ));
            }
            _ => {}
        }
    }
    violations.extend(plan.sql_pair_violations());
    violations
}
