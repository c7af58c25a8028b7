//! Before/after hooks around orchestrated actions

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CoreResult;
use crate::types::Actor;

/// Orchestrated action a hook is notified about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    ChangeLimits,
    ActivateCustomer,
    DeactivateCustomer,
    CreateCustomer,
    DeleteCustomer,
    DeleteDomainAlias,
    DeleteSqlDatabase,
    AddResource,
    ReviewAliasOrder,
    UpdateHostingPlan,
}

/// Event passed to hooks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent<'a> {
    pub action: LifecycleAction,
    pub actor: &'a Actor,
    /// Primary entity id (customer, alias, database, plan)
    pub target_id: i64,
}

/// Extension point invoked inside the action's transaction.
///
/// Returning an error from either hook aborts the action and rolls it back.
/// All methods default to no-ops.
#[async_trait]
pub trait LifecycleHooks: Send + Sync {
    async fn before(&self, _event: &LifecycleEvent<'_>) -> CoreResult<()> {
        Ok(())
    }

    async fn after(&self, _event: &LifecycleEvent<'_>) -> CoreResult<()> {
        Ok(())
    }
}

/// Hooks that do nothing.
pub struct NoopHooks;

#[async_trait]
impl LifecycleHooks for NoopHooks {}
