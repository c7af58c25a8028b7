//! Test helpers
//!
//! In-memory transactional store, recording notifier, vetoing hooks and fixtures.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::daemon::{DispatchError, Stage};
use crate::error::{CoreError, CoreResult};
use crate::quota::{MailboxQuota, MIB};
use crate::services::ServiceContext;
use crate::traits::{
    DaemonNotifier, HostingStore, LifecycleAction, LifecycleEvent, LifecycleHooks, NoopHooks,
    StoreTransaction,
};
use crate::types::{
    Actor, AliasSubdomain, Certificate, CoreConfig, CustomerAccount, DnsRecord, Domain,
    DomainAlias, DomainTree, EntityKind, EntityRef, FtpUser, HostRef, HostingPlan, Limit,
    MailAccount, MailStateChange, NewResource, ProvisioningStatus, Reseller, ResellerPool,
    ResourceLimits, Role, SqlDatabase, SqlUser, Subdomain,
};

pub const RESELLER_ID: i64 = 2;
pub const OTHER_RESELLER_ID: i64 = 3;
pub const CUSTOMER_ID: i64 = 10;
pub const SMALL_CUSTOMER_ID: i64 = 11;
pub const DOMAIN_ID: i64 = 100;
pub const PLAN_ID: i64 = 50;

// ===== Fixtures =====

fn ok_domain(customer_id: i64, domain_id: i64) -> Domain {
    Domain {
        id: domain_id,
        customer_id,
        name: format!("customer{customer_id}.test"),
        status: ProvisioningStatus::Ok,
    }
}

/// Domain with two subdomains, one alias (with one subdomain, a mailbox, a DNS
/// record, a certificate and an FTP user), five mail accounts (one default
/// address, one catch-all), one SQL database with one user.
pub fn sample_tree(customer_id: i64, domain_id: i64) -> DomainTree {
    let base = domain_id * 100;
    let ok = ProvisioningStatus::Ok;
    let alias_id = base + 3;
    let alias_name = format!("alias{customer_id}.test");
    let mut tree = DomainTree::empty(ok_domain(customer_id, domain_id));

    let subdomain = |id: i64, name: &str| Subdomain {
        id,
        domain_id,
        name: name.into(),
        status: ok,
    };
    tree.subdomains = vec![subdomain(base + 1, "www"), subdomain(base + 2, "shop")];
    tree.aliases = vec![DomainAlias {
        id: alias_id,
        domain_id,
        name: alias_name.clone(),
        status: ok,
    }];
    tree.alias_subdomains = vec![AliasSubdomain {
        id: base + 4,
        alias_id,
        name: "blog".into(),
        status: ok,
    }];

    let mail = |id: i64, owner: HostRef, local_part: &str, quota: Option<u64>, catchall: bool| {
        MailAccount {
            id,
            domain_id,
            owner,
            local_part: local_part.into(),
            status: ok,
            po_active: true,
            quota,
            catchall,
        }
    };
    tree.mail_accounts = vec![
        mail(base + 5, HostRef::Domain(domain_id), "john", Some(0), false),
        mail(base + 6, HostRef::Domain(domain_id), "jane", Some(100 * MIB), false),
        mail(base + 7, HostRef::Alias(alias_id), "info", Some(50 * MIB), false),
        mail(base + 8, HostRef::Domain(domain_id), "postmaster", Some(0), false),
        mail(base + 9, HostRef::Domain(domain_id), "", None, true),
    ];
    tree.dns_records = vec![
        DnsRecord {
            id: base + 10,
            domain_id,
            alias_id: None,
            name: "mx".into(),
            status: ok,
        },
        DnsRecord {
            id: base + 11,
            domain_id,
            alias_id: Some(alias_id),
            name: "txt".into(),
            status: ok,
        },
    ];
    tree.certificates = vec![
        Certificate { id: base + 12, owner: HostRef::Domain(domain_id), status: ok },
        Certificate { id: base + 13, owner: HostRef::Alias(alias_id), status: ok },
    ];
    tree.ftp_users = vec![
        FtpUser {
            id: base + 14,
            customer_id,
            userid: format!("john@customer{customer_id}.test"),
            status: ok,
        },
        FtpUser {
            id: base + 15,
            customer_id,
            userid: format!("web@blog.{alias_name}"),
            status: ok,
        },
    ];
    tree.sql_databases = vec![SqlDatabase {
        id: base + 16,
        domain_id,
        name: "db1".into(),
        status: ok,
    }];
    tree.sql_users = vec![SqlUser {
        id: base + 17,
        database_id: base + 16,
        name: "user1".into(),
        status: ok,
    }];
    tree
}

/// Domain with two subdomains, one alias with one subdomain, and three mailboxes.
pub fn minimal_tree(customer_id: i64, domain_id: i64) -> DomainTree {
    let mut tree = sample_tree(customer_id, domain_id);
    tree.mail_accounts.truncate(3);
    tree.dns_records.clear();
    tree.certificates.clear();
    tree.ftp_users.clear();
    tree.sql_databases.clear();
    tree.sql_users.clear();
    tree
}

fn capped(values: [u64; 8]) -> ResourceLimits {
    let mut limits = ResourceLimits::none();
    for (kind, value) in crate::types::ResourceKind::ALL.into_iter().zip(values) {
        *limits.get_mut(kind) = if value == 0 { Limit::Disabled } else { Limit::Capped(value) };
    }
    limits
}

/// Reseller 2 with customers 10 (sample tree) and 11 (empty tree), reseller 3
/// with no customers, and one hosting plan of reseller 2.
pub fn seeded_data() -> StoreData {
    let mut data = StoreData {
        next_id: 1_000_000,
        ..StoreData::default()
    };

    let customer = CustomerAccount {
        id: CUSTOMER_ID,
        name: "john".into(),
        created_by: RESELLER_ID,
        status: ProvisioningStatus::Ok,
        limits: capped([5, 2, 10, 3, 2, 3, 1000, 500]),
        traffic_bytes: 10 * MIB,
        disk_bytes: 200 * MIB,
    };
    let small = CustomerAccount {
        id: SMALL_CUSTOMER_ID,
        name: "jane".into(),
        created_by: RESELLER_ID,
        status: ProvisioningStatus::Ok,
        limits: capped([0, 0, 5, 0, 0, 0, 100, 100]),
        traffic_bytes: 0,
        disk_bytes: 0,
    };

    data.resellers.insert(
        RESELLER_ID,
        Reseller {
            id: RESELLER_ID,
            name: "reseller".into(),
            max_domains: Limit::Capped(10),
            ceilings: capped([20, 10, 50, 10, 5, 10, 10_000, 5000]),
            pool: ResellerPool {
                domains: 2,
                subdomains: 5,
                aliases: 2,
                mailboxes: 15,
                ftp_accounts: 3,
                sql_databases: 2,
                sql_users: 3,
                traffic: 1100,
                disk: 600,
            },
        },
    );
    let mut unlimited = ResourceLimits::none();
    for kind in crate::types::ResourceKind::ALL {
        *unlimited.get_mut(kind) = Limit::Unlimited;
    }
    data.resellers.insert(
        OTHER_RESELLER_ID,
        Reseller {
            id: OTHER_RESELLER_ID,
            name: "other".into(),
            max_domains: Limit::Unlimited,
            ceilings: unlimited,
            pool: ResellerPool::default(),
        },
    );

    data.trees.insert(CUSTOMER_ID, sample_tree(CUSTOMER_ID, DOMAIN_ID));
    data.trees.insert(
        SMALL_CUSTOMER_ID,
        DomainTree::empty(ok_domain(SMALL_CUSTOMER_ID, DOMAIN_ID + 1)),
    );
    data.customers.insert(CUSTOMER_ID, customer);
    data.customers.insert(SMALL_CUSTOMER_ID, small);
    data.ephemera.insert(CUSTOMER_ID, 4);

    data.plans.insert(
        PLAN_ID,
        HostingPlan {
            id: PLAN_ID,
            reseller_id: RESELLER_ID,
            name: "basic".into(),
            limits: capped([2, 1, 5, 1, 1, 1, 500, 200]),
        },
    );
    data
}

pub fn admin() -> Actor {
    Actor::new(1, "admin", Role::Admin)
}

pub fn reseller() -> Actor {
    Actor::new(RESELLER_ID, "reseller", Role::Reseller)
}

pub fn other_reseller() -> Actor {
    Actor::new(OTHER_RESELLER_ID, "other", Role::Reseller)
}

pub fn customer() -> Actor {
    Actor::new(CUSTOMER_ID, "john", Role::Customer)
}

// ===== InMemoryStore =====

/// Whole store content.
#[derive(Debug, Clone, Default)]
pub struct StoreData {
    pub resellers: BTreeMap<i64, Reseller>,
    pub customers: BTreeMap<i64, CustomerAccount>,
    pub plans: BTreeMap<i64, HostingPlan>,
    /// Keyed by customer id
    pub trees: BTreeMap<i64, DomainTree>,
    /// Sessions, quota entries and tickets per customer
    pub ephemera: BTreeMap<i64, u64>,
    pub next_id: i64,
}

impl StoreData {
    pub fn tree(&self, customer_id: i64) -> &DomainTree {
        &self.trees[&customer_id]
    }

    /// Status of any row of any tree.
    pub fn status(&self, entity: EntityRef) -> Option<ProvisioningStatus> {
        if entity.kind == EntityKind::Customer {
            return self.customers.get(&entity.id).map(|c| c.status);
        }
        self.trees
            .values()
            .find_map(|tree| crate::cascade::status_of(tree, entity))
    }
}

/// Store whose transactions hold an exclusive lock, work on a copy and write
/// it back on commit.
pub struct InMemoryStore {
    data: Arc<Mutex<StoreData>>,
    fail_commit: Arc<AtomicBool>,
    fail_mail_updates: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new(data: StoreData) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
            fail_commit: Arc::new(AtomicBool::new(false)),
            fail_mail_updates: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_fail_commit(&self, fail: bool) {
        self.fail_commit.store(fail, Ordering::SeqCst);
    }

    /// Make every mail update fail, after earlier steps already wrote
    pub fn set_fail_mail_updates(&self, fail: bool) {
        self.fail_mail_updates.store(fail, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> StoreData {
        self.data.lock().await.clone()
    }
}

#[async_trait]
impl HostingStore for InMemoryStore {
    async fn begin(&self) -> CoreResult<Box<dyn StoreTransaction>> {
        let guard = Arc::clone(&self.data).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction {
            guard,
            working,
            fail_commit: self.fail_commit.load(Ordering::SeqCst),
            fail_mail_updates: self.fail_mail_updates.load(Ordering::SeqCst),
        }))
    }
}

pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<StoreData>,
    working: StoreData,
    fail_commit: bool,
    fail_mail_updates: bool,
}

impl InMemoryTransaction {
    fn next_id(&mut self) -> i64 {
        self.working.next_id += 1;
        self.working.next_id
    }

    fn tree_mut(&mut self, customer_id: i64) -> CoreResult<&mut DomainTree> {
        self.working
            .trees
            .get_mut(&customer_id)
            .ok_or(CoreError::CustomerNotFound(customer_id))
    }
}

fn set_row_status(tree: &mut DomainTree, entity: EntityRef, status: ProvisioningStatus) -> bool {
    macro_rules! set_in {
        ($rows:expr) => {
            $rows
                .iter_mut()
                .find(|r| r.id == entity.id)
                .map(|r| r.status = status)
                .is_some()
        };
    }
    match entity.kind {
        EntityKind::Customer => false,
        EntityKind::Domain => {
            if tree.domain.id == entity.id {
                tree.domain.status = status;
                true
            } else {
                false
            }
        }
        EntityKind::Subdomain => set_in!(tree.subdomains),
        EntityKind::Alias => set_in!(tree.aliases),
        EntityKind::AliasSubdomain => set_in!(tree.alias_subdomains),
        EntityKind::MailAccount => set_in!(tree.mail_accounts),
        EntityKind::DnsRecord => set_in!(tree.dns_records),
        EntityKind::Certificate => set_in!(tree.certificates),
        EntityKind::FtpUser => set_in!(tree.ftp_users),
        EntityKind::SqlDatabase => set_in!(tree.sql_databases),
        EntityKind::SqlUser => set_in!(tree.sql_users),
    }
}

fn remove_tree_rows(tree: &mut DomainTree, entities: &[EntityRef]) -> u64 {
    macro_rules! remove_in {
        ($rows:expr, $kind:expr) => {{
            let before = $rows.len();
            $rows.retain(|r| !entities.contains(&EntityRef::new($kind, r.id)));
            (before - $rows.len()) as u64
        }};
    }
    remove_in!(tree.subdomains, EntityKind::Subdomain)
        + remove_in!(tree.aliases, EntityKind::Alias)
        + remove_in!(tree.alias_subdomains, EntityKind::AliasSubdomain)
        + remove_in!(tree.mail_accounts, EntityKind::MailAccount)
        + remove_in!(tree.dns_records, EntityKind::DnsRecord)
        + remove_in!(tree.certificates, EntityKind::Certificate)
        + remove_in!(tree.ftp_users, EntityKind::FtpUser)
        + remove_in!(tree.sql_databases, EntityKind::SqlDatabase)
        + remove_in!(tree.sql_users, EntityKind::SqlUser)
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn find_customer_for_update(&mut self, id: i64) -> CoreResult<Option<CustomerAccount>> {
        Ok(self.working.customers.get(&id).cloned())
    }

    async fn find_reseller_for_update(&mut self, id: i64) -> CoreResult<Option<Reseller>> {
        Ok(self.working.resellers.get(&id).cloned())
    }

    async fn find_hosting_plan_for_update(&mut self, id: i64) -> CoreResult<Option<HostingPlan>> {
        Ok(self.working.plans.get(&id).cloned())
    }

    async fn find_domain(&mut self, id: i64) -> CoreResult<Option<Domain>> {
        Ok(self
            .working
            .trees
            .values()
            .find(|t| t.domain.id == id)
            .map(|t| t.domain.clone()))
    }

    async fn find_alias(&mut self, id: i64) -> CoreResult<Option<DomainAlias>> {
        Ok(self.working.trees.values().find_map(|t| t.alias(id).cloned()))
    }

    async fn load_domain_tree(&mut self, customer_id: i64) -> CoreResult<Option<DomainTree>> {
        Ok(self.working.trees.get(&customer_id).cloned())
    }

    async fn list_customers_of_reseller(
        &mut self,
        reseller_id: i64,
    ) -> CoreResult<Vec<CustomerAccount>> {
        Ok(self
            .working
            .customers
            .values()
            .filter(|c| c.created_by == reseller_id)
            .cloned()
            .collect())
    }

    async fn update_customer_limits(
        &mut self,
        customer_id: i64,
        limits: &ResourceLimits,
    ) -> CoreResult<u64> {
        Ok(match self.working.customers.get_mut(&customer_id) {
            Some(customer) => {
                customer.limits = *limits;
                1
            }
            None => 0,
        })
    }

    async fn update_reseller_pool(
        &mut self,
        reseller_id: i64,
        pool: &ResellerPool,
    ) -> CoreResult<u64> {
        Ok(match self.working.resellers.get_mut(&reseller_id) {
            Some(reseller) => {
                reseller.pool = *pool;
                1
            }
            None => 0,
        })
    }

    async fn update_hosting_plan(&mut self, plan: &HostingPlan) -> CoreResult<u64> {
        Ok(match self.working.plans.get_mut(&plan.id) {
            Some(stored) => {
                *stored = plan.clone();
                1
            }
            None => 0,
        })
    }

    async fn set_status(
        &mut self,
        entities: &[EntityRef],
        status: ProvisioningStatus,
    ) -> CoreResult<u64> {
        let mut rows = 0;
        for entity in entities {
            if entity.kind == EntityKind::Customer {
                if let Some(customer) = self.working.customers.get_mut(&entity.id) {
                    customer.status = status;
                    rows += 1;
                }
                continue;
            }
            if self
                .working
                .trees
                .values_mut()
                .any(|tree| set_row_status(tree, *entity, status))
            {
                rows += 1;
            }
        }
        Ok(rows)
    }

    async fn set_mail_states(&mut self, changes: &[MailStateChange]) -> CoreResult<u64> {
        if self.fail_mail_updates {
            return Err(CoreError::StorageError("mail_accounts is locked".into()));
        }
        let mut rows = 0;
        for change in changes {
            for tree in self.working.trees.values_mut() {
                if let Some(mail) = tree.mail_accounts.iter_mut().find(|m| m.id == change.mail_id) {
                    if let Some(status) = change.status {
                        mail.status = status;
                    }
                    mail.po_active = change.po_active;
                    rows += 1;
                }
            }
        }
        Ok(rows)
    }

    async fn update_mail_quotas(&mut self, quotas: &[MailboxQuota]) -> CoreResult<u64> {
        if self.fail_mail_updates {
            return Err(CoreError::StorageError("mail_accounts is locked".into()));
        }
        let mut rows = 0;
        for quota in quotas {
            for tree in self.working.trees.values_mut() {
                if let Some(mail) = tree.mail_accounts.iter_mut().find(|m| m.id == quota.mail_id) {
                    mail.quota = Some(quota.quota);
                    rows += 1;
                }
            }
        }
        Ok(rows)
    }

    async fn insert_customer(
        &mut self,
        name: &str,
        created_by: i64,
        limits: &ResourceLimits,
    ) -> CoreResult<CustomerAccount> {
        let customer = CustomerAccount {
            id: self.next_id(),
            name: name.to_string(),
            created_by,
            status: ProvisioningStatus::ToAdd,
            limits: *limits,
            traffic_bytes: 0,
            disk_bytes: 0,
        };
        self.working.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn insert_domain(&mut self, customer_id: i64, name: &str) -> CoreResult<Domain> {
        let domain = Domain {
            id: self.next_id(),
            customer_id,
            name: name.to_string(),
            status: ProvisioningStatus::ToAdd,
        };
        self.working
            .trees
            .insert(customer_id, DomainTree::empty(domain.clone()));
        Ok(domain)
    }

    async fn insert_resource(
        &mut self,
        domain: &Domain,
        resource: &NewResource,
    ) -> CoreResult<EntityRef> {
        let id = self.next_id();
        let status = resource.initial_status();
        let domain_id = domain.id;
        let customer_id = domain.customer_id;
        let tree = self.tree_mut(customer_id)?;
        let kind = match resource {
            NewResource::Subdomain { name } => {
                tree.subdomains.push(Subdomain { id, domain_id, name: name.clone(), status });
                EntityKind::Subdomain
            }
            NewResource::Alias { name, .. } => {
                tree.aliases.push(DomainAlias { id, domain_id, name: name.clone(), status });
                EntityKind::Alias
            }
            NewResource::AliasSubdomain { alias_id, name } => {
                tree.alias_subdomains.push(AliasSubdomain {
                    id,
                    alias_id: *alias_id,
                    name: name.clone(),
                    status,
                });
                EntityKind::AliasSubdomain
            }
            NewResource::MailAccount { owner, local_part, quota, catchall } => {
                tree.mail_accounts.push(MailAccount {
                    id,
                    domain_id,
                    owner: *owner,
                    local_part: local_part.clone(),
                    status,
                    po_active: true,
                    quota: *quota,
                    catchall: *catchall,
                });
                EntityKind::MailAccount
            }
            NewResource::FtpUser { userid } => {
                tree.ftp_users.push(FtpUser { id, customer_id, userid: userid.clone(), status });
                EntityKind::FtpUser
            }
            NewResource::SqlDatabase { name } => {
                tree.sql_databases.push(SqlDatabase { id, domain_id, name: name.clone(), status });
                EntityKind::SqlDatabase
            }
            NewResource::SqlUser { database_id, name } => {
                tree.sql_users.push(SqlUser {
                    id,
                    database_id: *database_id,
                    name: name.clone(),
                    status,
                });
                EntityKind::SqlUser
            }
        };
        Ok(EntityRef::new(kind, id))
    }

    async fn remove_rows(&mut self, entities: &[EntityRef]) -> CoreResult<u64> {
        let mut rows = 0;
        for tree in self.working.trees.values_mut() {
            rows += remove_tree_rows(tree, entities);
        }
        Ok(rows)
    }

    async fn purge_customer_ephemera(&mut self, customer_id: i64) -> CoreResult<u64> {
        Ok(self.working.ephemera.remove(&customer_id).unwrap_or(0))
    }

    async fn commit(self: Box<Self>) -> CoreResult<()> {
        if self.fail_commit {
            return Err(CoreError::TransactionFailure("database is locked".into()));
        }
        let Self {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> CoreResult<()> {
        Ok(())
    }
}

// ===== RecordingNotifier =====

#[derive(Default)]
pub struct RecordingNotifier {
    calls: AtomicUsize,
    unreachable: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl DaemonNotifier for RecordingNotifier {
    async fn notify(&self) -> Result<(), DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(DispatchError::Io {
                stage: Stage::Connect,
                message: "connection refused".into(),
            });
        }
        Ok(())
    }
}

// ===== RejectingHooks =====

/// Vetoes one action, either before or after its mutations.
pub struct RejectingHooks {
    pub action: LifecycleAction,
    pub after: bool,
}

#[async_trait]
impl LifecycleHooks for RejectingHooks {
    async fn before(&self, event: &LifecycleEvent<'_>) -> CoreResult<()> {
        if !self.after && event.action == self.action {
            return Err(CoreError::HookRejected("vetoed before".into()));
        }
        Ok(())
    }

    async fn after(&self, event: &LifecycleEvent<'_>) -> CoreResult<()> {
        if self.after && event.action == self.action {
            return Err(CoreError::HookRejected("vetoed after".into()));
        }
        Ok(())
    }
}

// ===== Factories =====

/// Context over the seeded store with no-op hooks.
pub fn create_test_context() -> (ServiceContext, Arc<InMemoryStore>, Arc<RecordingNotifier>) {
    create_test_context_with(CoreConfig::default(), Arc::new(NoopHooks))
}

pub fn create_test_context_with(
    config: CoreConfig,
    hooks: Arc<dyn LifecycleHooks>,
) -> (ServiceContext, Arc<InMemoryStore>, Arc<RecordingNotifier>) {
    build_context(seeded_data(), config, hooks)
}

/// Context over custom store content, default config and no-op hooks.
pub fn create_test_context_over(
    data: StoreData,
) -> (ServiceContext, Arc<InMemoryStore>, Arc<RecordingNotifier>) {
    build_context(data, CoreConfig::default(), Arc::new(NoopHooks))
}

fn build_context(
    data: StoreData,
    config: CoreConfig,
    hooks: Arc<dyn LifecycleHooks>,
) -> (ServiceContext, Arc<InMemoryStore>, Arc<RecordingNotifier>) {
    let store = Arc::new(InMemoryStore::new(data));
    let notifier = Arc::new(RecordingNotifier::new());
    let ctx = ServiceContext::new(
        Arc::clone(&store) as Arc<dyn HostingStore>,
        Arc::clone(&notifier) as Arc<dyn DaemonNotifier>,
        hooks,
        config,
    );
    (ctx, store, notifier)
}
