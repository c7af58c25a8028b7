//! Application bootstrap for the hosting core.
//!
//! Provides `AppState` (service container), `AppStateBuilder` (adapter
//! injection) and `AppConfig` (TOML configuration).

pub mod adapters;
pub mod config;

use std::sync::Arc;

use hosting_core::daemon::DaemonClient;
use hosting_core::error::{CoreError, CoreResult};
use hosting_core::services::{
    CustomerService, DeletionService, LimitService, MailQuotaService, PlanService, PoolService,
    ServiceContext, StatusService,
};
use hosting_core::traits::{DaemonNotifier, HostingStore, LifecycleHooks, NoopHooks};
use hosting_core::types::CoreConfig;

pub use config::AppConfig;

/// Application state.
///
/// Holds every service over one shared `ServiceContext`. Frontends construct
/// it once at startup via `AppStateBuilder`.
pub struct AppState {
    /// Service context (store, notifier, hooks, config)
    pub ctx: Arc<ServiceContext>,
    pub limit_service: LimitService,
    pub status_service: StatusService,
    pub deletion_service: DeletionService,
    pub pool_service: PoolService,
    pub mail_quota_service: MailQuotaService,
    pub plan_service: PlanService,
    pub customer_service: CustomerService,
}

impl AppState {
    /// Re-send the wake-up call for whatever work is pending.
    ///
    /// # Errors
    /// Returns `CoreError::DispatchFailure` if the daemon cannot be reached.
    pub async fn dispatch_pending(&self) -> CoreResult<()> {
        self.ctx.dispatch_pending().await?;
        log::info!("Pending provisioning work dispatched");
        Ok(())
    }

    /// Open the `SQLite` database named in `config` and build the state over it.
    ///
    /// The store is returned alongside for the administrative helpers it offers.
    #[cfg(feature = "sqlite-store")]
    pub async fn open(config: AppConfig) -> CoreResult<(Self, Arc<adapters::SqliteStore>)> {
        let store = Arc::new(adapters::SqliteStore::new(&config.database_path).await?);
        let state = AppStateBuilder::new()
            .store(Arc::clone(&store) as Arc<dyn HostingStore>)
            .config(config.core)
            .build()?;
        Ok((state, store))
    }
}

/// Builder for constructing `AppState` with platform-specific adapters.
///
/// # Required adapters
/// - `store` : the transactional hosting store
///
/// # Optional
/// - `notifier` : defaults to a `DaemonClient` for `config.daemon`
/// - `hooks` : defaults to `NoopHooks`
/// - `config` : defaults to `CoreConfig::default()`
#[derive(Default)]
pub struct AppStateBuilder {
    store: Option<Arc<dyn HostingStore>>,
    notifier: Option<Arc<dyn DaemonNotifier>>,
    hooks: Option<Arc<dyn LifecycleHooks>>,
    config: Option<CoreConfig>,
}

impl AppStateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn HostingStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn DaemonNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    #[must_use]
    pub fn hooks(mut self, hooks: Arc<dyn LifecycleHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    #[must_use]
    pub fn config(mut self, config: CoreConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the `AppState`.
    ///
    /// # Errors
    /// Returns `CoreError::ValidationError` if the store is missing.
    pub fn build(self) -> CoreResult<AppState> {
        let store = self
            .store
            .ok_or_else(|| CoreError::ValidationError("store is required".to_string()))?;
        let config = self.config.unwrap_or_default();
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(DaemonClient::new(config.daemon.clone())));
        let hooks = self.hooks.unwrap_or_else(|| Arc::new(NoopHooks));

        let ctx = Arc::new(ServiceContext::new(store, notifier, hooks, config));

        Ok(AppState {
            limit_service: LimitService::new(Arc::clone(&ctx)),
            status_service: StatusService::new(Arc::clone(&ctx)),
            deletion_service: DeletionService::new(Arc::clone(&ctx)),
            pool_service: PoolService::new(Arc::clone(&ctx)),
            mail_quota_service: MailQuotaService::new(Arc::clone(&ctx)),
            plan_service: PlanService::new(Arc::clone(&ctx)),
            customer_service: CustomerService::new(Arc::clone(&ctx)),
            ctx,
        })
    }
}
