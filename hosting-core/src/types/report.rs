//! Results returned by orchestrated operations

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::status::{EntityKind, EntityRef};

/// Outcome of the post-commit wake-up of the provisioning daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Delivered,
    /// Nothing was scheduled, the daemon was not contacted
    NotRequired,
    /// Committed changes stay pending until the next successful dispatch
    Failed { reason: String },
}

impl DispatchOutcome {
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Number of rows touched per entity kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeSummary {
    counts: BTreeMap<EntityKind, u64>,
}

impl CascadeSummary {
    pub fn record(&mut self, kind: EntityKind, rows: u64) {
        if rows > 0 {
            *self.counts.entry(kind).or_default() += rows;
        }
    }

    #[must_use]
    pub fn from_refs(refs: &[EntityRef]) -> Self {
        let mut summary = Self::default();
        for entity in refs {
            summary.record(entity.kind, 1);
        }
        summary
    }

    #[must_use]
    pub fn count(&self, kind: EntityKind) -> u64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityKind, u64)> + '_ {
        self.counts.iter().map(|(kind, rows)| (*kind, *rows))
    }
}

/// Success report of a committed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationReport {
    pub affected: CascadeSummary,
    pub dispatch: DispatchOutcome,
}

impl OperationReport {
    /// Non-fatal problems to show next to the success message.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        match &self.dispatch {
            DispatchOutcome::Failed { reason } => vec![format!(
                "Changes were saved but the provisioning daemon could not be notified: {reason}"
            )],
            _ => Vec::new(),
        }
    }
}
