#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! End-to-end tests of `AppState` over a real `SQLite` file and a fake
//! provisioning daemon on a loopback socket.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use hosting_app::adapters::SqliteStore;
use hosting_app::{AppConfig, AppState, AppStateBuilder};
use hosting_core::error::{CoreError, CoreResult};
use hosting_core::traits::{HostingStore, LifecycleAction, LifecycleEvent, LifecycleHooks};
use hosting_core::types::{
    Actor, CoreConfig, CustomerLimitsSource, DaemonConfig, DispatchOutcome, EntityKind, HostRef,
    Limit, NewCustomer, NewResource, ProvisioningStatus, ResellerPool, ResourceLimits, Role,
};
use hosting_core::StatusAction;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

const MIB: u64 = 1024 * 1024;

// ===== Fake daemon =====

/// Answers `250` to every line; counts completed sessions.
async fn spawn_daemon() -> (u16, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let sessions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&sessions);
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            let (read_half, mut write_half) = socket.into_split();
            let mut reader = BufReader::new(read_half);
            write_half.write_all(b"250 ready\n").await.unwrap();
            for _ in 0..3 {
                let mut line = String::new();
                reader.read_line(&mut line).await.unwrap();
                write_half.write_all(b"250 ok\n").await.unwrap();
            }
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });
    (port, sessions)
}

/// A port nobody listens on.
async fn dead_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

fn core_config(port: u16) -> CoreConfig {
    CoreConfig {
        daemon: DaemonConfig {
            port,
            connect_timeout_secs: 2,
            io_timeout_secs: 2,
            ..DaemonConfig::default()
        },
        ..CoreConfig::default()
    }
}

// ===== Fixtures =====

struct Fixture {
    state: AppState,
    store: Arc<SqliteStore>,
    reseller: Actor,
    plan_id: i64,
    _tmp: tempfile::TempDir,
}

fn reseller_ceilings() -> ResourceLimits {
    ResourceLimits {
        subdomains: Limit::Capped(10),
        aliases: Limit::Capped(5),
        mailboxes: Limit::Capped(20),
        ftp_accounts: Limit::Capped(5),
        sql_databases: Limit::Capped(4),
        sql_users: Limit::Capped(8),
        traffic: Limit::Capped(1_000),
        disk: Limit::Capped(2_000),
    }
}

fn plan_limits() -> ResourceLimits {
    ResourceLimits {
        subdomains: Limit::Capped(2),
        aliases: Limit::Capped(1),
        mailboxes: Limit::Capped(5),
        ftp_accounts: Limit::Capped(1),
        sql_databases: Limit::Capped(1),
        sql_users: Limit::Capped(2),
        traffic: Limit::Capped(100),
        disk: Limit::Capped(200),
    }
}

async fn fixture_with(config: CoreConfig, hooks: Option<Arc<dyn LifecycleHooks>>) -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::new(&tmp.path().join("hosting.db")).await.unwrap());
    let reseller = store
        .create_reseller("reseller", Limit::Capped(2), &reseller_ceilings())
        .await
        .unwrap();
    let plan = store
        .create_hosting_plan(reseller.id, "basic", &plan_limits())
        .await
        .unwrap();

    let mut builder = AppStateBuilder::new()
        .store(Arc::clone(&store) as Arc<dyn HostingStore>)
        .config(config);
    if let Some(hooks) = hooks {
        builder = builder.hooks(hooks);
    }
    Fixture {
        state: builder.build().unwrap(),
        store,
        reseller: Actor::new(reseller.id, "reseller", Role::Reseller),
        plan_id: plan.id,
        _tmp: tmp,
    }
}

async fn create_customer(fx: &Fixture, name: &str) -> (i64, i64) {
    let (customer, report) = fx
        .state
        .customer_service
        .create_customer(
            &fx.reseller,
            NewCustomer {
                name: name.into(),
                domain_name: format!("{name}.test"),
                limits: CustomerLimitsSource::Plan(fx.plan_id),
            },
        )
        .await
        .unwrap();
    assert_eq!(report.affected.count(EntityKind::Customer), 1);
    let tree = fx.store.domain_tree(customer.id).await.unwrap().unwrap();
    (customer.id, tree.domain.id)
}

async fn add(fx: &Fixture, customer_id: i64, resource: NewResource) -> i64 {
    let (entity, _report) = fx
        .state
        .customer_service
        .add_resource(&fx.reseller, customer_id, resource)
        .await
        .unwrap();
    entity.id
}

async fn pool(fx: &Fixture) -> ResellerPool {
    fx.store
        .find_reseller(fx.reseller.id)
        .await
        .unwrap()
        .unwrap()
        .pool
}

fn mailbox(domain_id: i64, local_part: &str) -> NewResource {
    NewResource::MailAccount {
        owner: HostRef::Domain(domain_id),
        local_part: local_part.into(),
        quota: Some(0),
        catchall: false,
    }
}

// ===== Builder =====

#[test]
fn builder_requires_a_store() {
    assert!(matches!(
        AppStateBuilder::new().build(),
        Err(CoreError::ValidationError(_))
    ));
}

#[tokio::test]
async fn open_uses_the_configured_database() {
    let tmp = tempfile::tempdir().unwrap();
    let config = AppConfig {
        database_path: tmp.path().join("nested").join("panel.db"),
        core: core_config(dead_port().await),
    };
    let (state, store) = AppState::open(config).await.unwrap();
    assert!(tmp.path().join("nested").join("panel.db").exists());
    assert!(store.find_reseller(1).await.unwrap().is_none());
    assert!(matches!(
        state.dispatch_pending().await,
        Err(CoreError::DispatchFailure(_))
    ));
}

// ===== Lifecycle =====

#[tokio::test]
async fn customer_lifecycle_keeps_the_pool_consistent() {
    let (port, sessions) = spawn_daemon().await;
    let fx = fixture_with(core_config(port), None).await;

    // creation draws the plan from the pool
    let (customer_id, domain_id) = create_customer(&fx, "acme").await;
    let after_create = pool(&fx).await;
    assert_eq!(after_create.domains, 1);
    assert_eq!(after_create.subdomains, 2);
    assert_eq!(after_create.mailboxes, 5);
    assert_eq!(after_create.disk, 200);
    assert_eq!(sessions.load(Ordering::SeqCst), 1);

    add(&fx, customer_id, NewResource::Subdomain { name: "www".into() }).await;
    let john = add(&fx, customer_id, mailbox(domain_id, "john")).await;
    let jane = add(&fx, customer_id, mailbox(domain_id, "jane")).await;
    let database = add(&fx, customer_id, NewResource::SqlDatabase { name: "shop".into() }).await;
    add(
        &fx,
        customer_id,
        NewResource::SqlUser {
            database_id: database,
            name: "shop_rw".into(),
        },
    )
    .await;
    fx.store.acknowledge_pending().await.unwrap();

    // limit change: more mailboxes, more disk, more traffic
    let mut limits = plan_limits();
    limits.mailboxes = Limit::Capped(10);
    limits.disk = Limit::Capped(300);
    limits.traffic = Limit::Capped(150);
    let report = fx
        .state
        .limit_service
        .change_limits(&fx.reseller, customer_id, limits)
        .await
        .unwrap();
    assert_eq!(report.affected.count(EntityKind::Domain), 1);
    assert_eq!(report.affected.count(EntityKind::Subdomain), 1);
    assert_eq!(report.dispatch, DispatchOutcome::Delivered);

    let after_change = pool(&fx).await;
    assert_eq!(after_change.mailboxes, 10);
    assert_eq!(after_change.disk, 300);
    assert_eq!(after_change.traffic, 150);

    let tree = fx.store.domain_tree(customer_id).await.unwrap().unwrap();
    assert_eq!(tree.domain.status, ProvisioningStatus::ToChange);
    for id in [john, jane] {
        let mail = tree.mail_accounts.iter().find(|m| m.id == id).unwrap();
        assert_eq!(mail.quota, Some(150 * MIB));
    }
    fx.store.acknowledge_pending().await.unwrap();

    // deactivation cascades, activation needs the daemon's acknowledgement
    let report = fx
        .state
        .status_service
        .change_status(&fx.reseller, customer_id, StatusAction::Deactivate)
        .await
        .unwrap();
    assert_eq!(report.affected.count(EntityKind::Domain), 1);
    assert_eq!(report.affected.count(EntityKind::MailAccount), 2);
    assert!(matches!(
        fx.state
            .status_service
            .change_status(&fx.reseller, customer_id, StatusAction::Activate)
            .await,
        Err(CoreError::ValidationError(_))
    ));
    fx.store.acknowledge_pending().await.unwrap();
    fx.state
        .status_service
        .change_status(&fx.reseller, customer_id, StatusAction::Activate)
        .await
        .unwrap();
    let tree = fx.store.domain_tree(customer_id).await.unwrap().unwrap();
    assert_eq!(tree.domain.status, ProvisioningStatus::ToEnable);
    assert!(tree.mail_accounts.iter().all(|m| m.po_active));

    // deletion waits for the daemon, then hands every contribution back
    assert!(matches!(
        fx.state
            .deletion_service
            .delete_customer(&fx.reseller, customer_id)
            .await,
        Err(CoreError::ValidationError(_))
    ));
    fx.store.acknowledge_pending().await.unwrap();
    fx.store.record_login(customer_id).await.unwrap();
    let report = fx
        .state
        .deletion_service
        .delete_customer(&fx.reseller, customer_id)
        .await
        .unwrap();
    assert_eq!(report.affected.count(EntityKind::Customer), 1);
    assert_eq!(report.affected.count(EntityKind::SqlUser), 1);
    assert_eq!(pool(&fx).await, ResellerPool::default());
    assert_eq!(fx.store.count_ephemera(customer_id).await.unwrap(), 0);

    let resynced = fx
        .state
        .pool_service
        .resync_reseller_pool(&fx.reseller, fx.reseller.id)
        .await
        .unwrap();
    assert_eq!(resynced, ResellerPool::default());
    assert!(sessions.load(Ordering::SeqCst) >= 8);
}

#[tokio::test]
async fn rejected_limit_change_leaves_no_trace() {
    let (port, sessions) = spawn_daemon().await;
    let fx = fixture_with(core_config(port), None).await;
    let (customer_id, domain_id) = create_customer(&fx, "acme").await;
    add(&fx, customer_id, mailbox(domain_id, "john")).await;
    add(&fx, customer_id, mailbox(domain_id, "jane")).await;
    let before_pool = pool(&fx).await;
    let before_calls = sessions.load(Ordering::SeqCst);

    let mut limits = plan_limits();
    // below the two mailboxes in use
    limits.mailboxes = Limit::Capped(1);
    // over the reseller's ceiling of 1000
    limits.traffic = Limit::Capped(5_000);
    let err = fx
        .state
        .limit_service
        .change_limits(&fx.reseller, customer_id, limits)
        .await
        .unwrap_err();
    assert_eq!(err.messages().len(), 2);

    assert_eq!(pool(&fx).await, before_pool);
    let customer = fx.store.find_customer(customer_id).await.unwrap().unwrap();
    assert_eq!(customer.limits, plan_limits());
    assert_eq!(sessions.load(Ordering::SeqCst), before_calls);
}

#[tokio::test]
async fn unreachable_daemon_keeps_committed_work() {
    let fx = fixture_with(core_config(dead_port().await), None).await;
    let (customer, report) = fx
        .state
        .customer_service
        .create_customer(
            &fx.reseller,
            NewCustomer {
                name: "acme".into(),
                domain_name: "acme.test".into(),
                limits: CustomerLimitsSource::Plan(fx.plan_id),
            },
        )
        .await
        .unwrap();
    assert!(report.dispatch.is_failed());
    assert_eq!(report.warnings().len(), 1);
    let stored = fx.store.find_customer(customer.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ProvisioningStatus::ToAdd);
}

#[tokio::test]
async fn reseller_domain_limit_is_enforced() {
    let (port, _sessions) = spawn_daemon().await;
    let fx = fixture_with(core_config(port), None).await;
    let mut small = plan_limits();
    small.subdomains = Limit::Capped(1);
    small.mailboxes = Limit::Capped(1);
    small.traffic = Limit::Capped(10);
    small.disk = Limit::Capped(10);
    let plan = fx
        .store
        .create_hosting_plan(fx.reseller.id, "small", &small)
        .await
        .unwrap();

    for name in ["one", "two"] {
        fx.state
            .customer_service
            .create_customer(
                &fx.reseller,
                NewCustomer {
                    name: name.into(),
                    domain_name: format!("{name}.test"),
                    limits: CustomerLimitsSource::Plan(plan.id),
                },
            )
            .await
            .unwrap();
    }
    let third = fx
        .state
        .customer_service
        .create_customer(
            &fx.reseller,
            NewCustomer {
                name: "three".into(),
                domain_name: "three.test".into(),
                limits: CustomerLimitsSource::Plan(plan.id),
            },
        )
        .await;
    assert!(matches!(third, Err(CoreError::ValidationError(_))));
    assert_eq!(pool(&fx).await.domains, 2);
}

#[tokio::test]
async fn alias_order_and_deletion() {
    let (port, _sessions) = spawn_daemon().await;
    let fx = fixture_with(core_config(port), None).await;
    let (customer_id, domain_id) = create_customer(&fx, "acme").await;
    let customer = Actor::new(customer_id, "acme", Role::Customer);

    let (alias, report) = fx
        .state
        .customer_service
        .add_resource(
            &customer,
            customer_id,
            NewResource::Alias {
                name: "acme.example".into(),
                ordered: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(report.dispatch, DispatchOutcome::NotRequired);

    // an ordered alias is simply dropped
    fx.state
        .deletion_service
        .delete_domain_alias(&customer, alias.id)
        .await
        .unwrap();
    assert!(fx
        .store
        .domain_tree(customer_id)
        .await
        .unwrap()
        .unwrap()
        .aliases
        .is_empty());

    let (alias, _report) = fx
        .state
        .customer_service
        .add_resource(
            &customer,
            customer_id,
            NewResource::Alias {
                name: "acme.example".into(),
                ordered: true,
            },
        )
        .await
        .unwrap();
    fx.state
        .customer_service
        .review_alias_order(&fx.reseller, alias.id, true)
        .await
        .unwrap();
    let shop = add(
        &fx,
        customer_id,
        NewResource::AliasSubdomain {
            alias_id: alias.id,
            name: "shop".into(),
        },
    )
    .await;

    // nothing is deleted before the daemon has added it
    assert!(matches!(
        fx.state
            .deletion_service
            .delete_domain_alias(&customer, alias.id)
            .await,
        Err(CoreError::ValidationError(_))
    ));
    fx.store.acknowledge_pending().await.unwrap();
    let john = add(&fx, customer_id, mailbox(domain_id, "john")).await;

    let report = fx
        .state
        .deletion_service
        .delete_domain_alias(&customer, alias.id)
        .await
        .unwrap();
    assert_eq!(report.affected.count(EntityKind::Alias), 1);
    assert_eq!(report.affected.count(EntityKind::AliasSubdomain), 1);

    let tree = fx.store.domain_tree(customer_id).await.unwrap().unwrap();
    assert_eq!(tree.domain.status, ProvisioningStatus::Ok);
    let alias_sub = tree.alias_subdomains.iter().find(|s| s.id == shop).unwrap();
    assert_eq!(alias_sub.status, ProvisioningStatus::ToDelete);
    let john = tree.mail_accounts.iter().find(|m| m.id == john).unwrap();
    assert_eq!(john.status, ProvisioningStatus::ToAdd);
}

#[tokio::test]
async fn cascades_leave_ordered_and_pending_rows_alone() {
    let (port, _sessions) = spawn_daemon().await;
    let fx = fixture_with(core_config(port), None).await;
    let (customer_id, _domain_id) = create_customer(&fx, "acme").await;
    fx.store.acknowledge_pending().await.unwrap();
    let mut limits = plan_limits();
    limits.aliases = Limit::Capped(2);
    fx.state
        .limit_service
        .change_limits(&fx.reseller, customer_id, limits)
        .await
        .unwrap();
    let alias = |name: &str, ordered: bool| NewResource::Alias {
        name: name.into(),
        ordered,
    };
    let old = add(&fx, customer_id, alias("old.example", false)).await;
    fx.store.acknowledge_pending().await.unwrap();

    fx.state
        .deletion_service
        .delete_domain_alias(&fx.reseller, old)
        .await
        .unwrap();
    let new = add(&fx, customer_id, alias("new.example", true)).await;

    // neither the order nor the doomed alias takes new children
    for resource in [
        NewResource::AliasSubdomain {
            alias_id: new,
            name: "shop".into(),
        },
        NewResource::MailAccount {
            owner: HostRef::Alias(old),
            local_part: "info".into(),
            quota: Some(0),
            catchall: false,
        },
    ] {
        let result = fx
            .state
            .customer_service
            .add_resource(&fx.reseller, customer_id, resource)
            .await;
        assert!(matches!(result, Err(CoreError::ValidationError(_))));
    }

    let report = fx
        .state
        .status_service
        .change_status(&fx.reseller, customer_id, StatusAction::Deactivate)
        .await
        .unwrap();
    assert_eq!(report.affected.count(EntityKind::Domain), 1);
    assert_eq!(report.affected.count(EntityKind::Alias), 0);

    let tree = fx.store.domain_tree(customer_id).await.unwrap().unwrap();
    assert_eq!(tree.domain.status, ProvisioningStatus::ToDisable);
    let status = |id: i64| tree.aliases.iter().find(|a| a.id == id).unwrap().status;
    assert_eq!(status(old), ProvisioningStatus::ToDelete);
    assert_eq!(status(new), ProvisioningStatus::Ordered);

    fx.state
        .customer_service
        .review_alias_order(&fx.reseller, new, false)
        .await
        .unwrap();
    let tree = fx.store.domain_tree(customer_id).await.unwrap().unwrap();
    assert_eq!(tree.aliases.len(), 1);
    assert!(tree.alias_subdomains.is_empty());
}

#[tokio::test]
async fn sql_database_deletion_and_proration() {
    let (port, _sessions) = spawn_daemon().await;
    let fx = fixture_with(core_config(port), None).await;
    let (customer_id, domain_id) = create_customer(&fx, "acme").await;
    let database = add(&fx, customer_id, NewResource::SqlDatabase { name: "shop".into() }).await;
    for name in ["shop_ro", "shop_rw"] {
        add(
            &fx,
            customer_id,
            NewResource::SqlUser {
                database_id: database,
                name: name.into(),
            },
        )
        .await;
    }
    fx.store.acknowledge_pending().await.unwrap();

    let report = fx
        .state
        .deletion_service
        .delete_sql_database(&fx.reseller, domain_id, database)
        .await
        .unwrap();
    assert_eq!(report.affected.count(EntityKind::SqlDatabase), 1);
    assert_eq!(report.affected.count(EntityKind::SqlUser), 2);

    for local_part in ["a", "b", "c"] {
        add(&fx, customer_id, mailbox(domain_id, local_part)).await;
    }
    let report = fx
        .state
        .mail_quota_service
        .prorate_mailbox_quota(&fx.reseller, domain_id, 100 * MIB)
        .await
        .unwrap();
    assert_eq!(report.affected.count(EntityKind::MailAccount), 3);
    let tree = fx.store.domain_tree(customer_id).await.unwrap().unwrap();
    let total: u64 = tree.mail_accounts.iter().filter_map(|m| m.quota).sum();
    assert_eq!(total, 100 * MIB);
}

// ===== Hooks =====

struct VetoDeletion;

#[async_trait]
impl LifecycleHooks for VetoDeletion {
    async fn before(&self, event: &LifecycleEvent<'_>) -> CoreResult<()> {
        if event.action == LifecycleAction::DeleteCustomer {
            return Err(CoreError::HookRejected("customer has open invoices".into()));
        }
        Ok(())
    }
}

#[tokio::test]
async fn hook_veto_rolls_back() {
    let (port, _sessions) = spawn_daemon().await;
    let fx = fixture_with(core_config(port), Some(Arc::new(VetoDeletion))).await;
    let (customer_id, _domain_id) = create_customer(&fx, "acme").await;
    let before = pool(&fx).await;

    let result = fx
        .state
        .deletion_service
        .delete_customer(&fx.reseller, customer_id)
        .await;
    assert!(matches!(result, Err(CoreError::HookRejected(_))));
    assert_eq!(pool(&fx).await, before);
    let customer = fx.store.find_customer(customer_id).await.unwrap().unwrap();
    assert_eq!(customer.status, ProvisioningStatus::ToAdd);
}

// ===== Plans =====

#[tokio::test]
async fn plan_update_is_bounded_by_the_reseller() {
    let (port, _sessions) = spawn_daemon().await;
    let fx = fixture_with(core_config(port), None).await;
    let mut limits = plan_limits();
    limits.aliases = Limit::Unlimited;
    let err = fx
        .state
        .plan_service
        .update_hosting_plan(&fx.reseller, fx.plan_id, limits)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::QuotaViolation(_)));

    limits.aliases = Limit::Capped(3);
    let plan = fx
        .state
        .plan_service
        .update_hosting_plan(&fx.reseller, fx.plan_id, limits)
        .await
        .unwrap();
    assert_eq!(plan.limits.aliases, Limit::Capped(3));

    let (customer, _report) = fx
        .state
        .customer_service
        .create_customer(
            &fx.reseller,
            NewCustomer {
                name: "acme".into(),
                domain_name: "acme.test".into(),
                limits: CustomerLimitsSource::Plan(fx.plan_id),
            },
        )
        .await
        .unwrap();
    let overview = fx
        .state
        .limit_service
        .usage_overview(&fx.reseller, customer.id)
        .await
        .unwrap();
    assert_eq!(overview.limits.aliases, Limit::Capped(3));
    assert_eq!(overview.usage.aliases, 0);
}
