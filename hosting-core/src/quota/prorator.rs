//! Mailbox quota proration

use serde::{Deserialize, Serialize};

/// Proration unit and minimum mailbox quota.
pub const MIB: u64 = 1024 * 1024;

/// Current quota of one mailbox, in bytes. `0` inherits the domain quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxQuota {
    pub mail_id: i64,
    pub quota: u64,
}

/// Redistribute a domain quota across its mailboxes.
///
/// Returns the new quota of every mailbox, or an empty list when nothing changes:
/// `domain_quota` is 0 (unlimited), or it still covers the current total and
/// `strict` is off. Shares are assigned with a running total so the results add
/// up to the rounded domain quota exactly, provided it holds at least one MiB per
/// mailbox. Each mailbox keeps at least one MiB.
#[must_use]
pub fn prorate(mailboxes: &[MailboxQuota], domain_quota: u64, strict: bool) -> Vec<MailboxQuota> {
    if domain_quota == 0 || mailboxes.is_empty() {
        return Vec::new();
    }

    let effective = |m: &MailboxQuota| if m.quota == 0 { domain_quota } else { m.quota };
    let total: u128 = mailboxes.iter().map(|m| u128::from(effective(m))).sum();
    if u128::from(domain_quota) >= total && !strict {
        return Vec::new();
    }

    let units = round_div(u128::from(domain_quota), u128::from(MIB)).max(1);

    let mut running: u128 = 0;
    let mut shares: Vec<u64> = mailboxes
        .iter()
        .map(|m| {
            let before = round_div(units * running, total);
            running += u128::from(effective(m));
            let after = round_div(units * running, total);
            u64::try_from(after - before).unwrap_or(u64::MAX)
        })
        .collect();

    apply_floor(&mut shares);

    mailboxes
        .iter()
        .zip(shares)
        .map(|(m, share)| MailboxQuota {
            mail_id: m.mail_id,
            quota: share.saturating_mul(MIB),
        })
        .collect()
}

/// `round(a / b)` with halves rounding up.
fn round_div(a: u128, b: u128) -> u128 {
    (2 * a + b) / (2 * b)
}

/// Raise zero shares to one unit, taking the difference back from the largest shares.
fn apply_floor(shares: &mut [u64]) {
    let mut deficit: u64 = 0;
    for share in shares.iter_mut().filter(|s| **s == 0) {
        *share = 1;
        deficit += 1;
    }
    while deficit > 0 {
        let Some(largest) = shares.iter_mut().filter(|s| **s > 1).max_by_key(|s| **s) else {
            break;
        };
        *largest -= 1;
        deficit -= 1;
    }
}
