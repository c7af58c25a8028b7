//! `StoreTransaction` implementation for `SqliteStore`.

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder,
};
use tokio::sync::OwnedMutexGuard;

use hosting_core::error::{CoreError, CoreResult};
use hosting_core::quota::MailboxQuota;
use hosting_core::traits::StoreTransaction;
use hosting_core::types::{
    CustomerAccount, Domain, DomainAlias, DomainTree, EntityKind, EntityRef, HostingPlan,
    MailStateChange, NewResource, ProvisioningStatus, Reseller, ResellerPool, ResourceLimits,
};

use super::convert::{db_err, host_columns, raw_limits, to_i64};
use super::entity::{
    alias_subdomain, certificate, customer, dns_record, domain, domain_alias, ftp_user,
    hosting_plan, login_session, mail_account, quota_entry, reseller, sql_database, sql_user,
    subdomain, support_ticket,
};

/// One open `SQLite` transaction.
///
/// Holds the store's writer lock until commit or rollback, so the
/// `*_for_update` reads see no concurrent writer.
pub struct SqliteTransaction {
    txn: DatabaseTransaction,
    _writer: OwnedMutexGuard<()>,
}

impl SqliteTransaction {
    pub(super) fn new(txn: DatabaseTransaction, writer: OwnedMutexGuard<()>) -> Self {
        Self {
            txn,
            _writer: writer,
        }
    }
}

/// Set the status column of every listed row of one table.
macro_rules! set_table_status {
    ($txn:expr, $entity:ident, $ids:expr, $status:expr) => {
        $entity::Entity::update_many()
            .col_expr($entity::Column::Status, Expr::value($status.as_str()))
            .filter($entity::Column::Id.is_in($ids))
            .exec($txn)
            .await
            .map_err(db_err("update status"))?
            .rows_affected
    };
}

/// Delete every listed row of one table.
macro_rules! delete_table_rows {
    ($txn:expr, $entity:ident, $ids:expr) => {
        $entity::Entity::delete_many()
            .filter($entity::Column::Id.is_in($ids))
            .exec($txn)
            .await
            .map_err(db_err("delete rows"))?
            .rows_affected
    };
}

fn ids_of(entities: &[EntityRef], kind: EntityKind) -> Vec<i64> {
    entities
        .iter()
        .filter(|e| e.kind == kind)
        .map(|e| e.id)
        .collect()
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn find_customer_for_update(&mut self, id: i64) -> CoreResult<Option<CustomerAccount>> {
        customer::Entity::find_by_id(id)
            .one(&self.txn)
            .await
            .map_err(db_err("query customer"))?
            .map(customer::Model::into_customer)
            .transpose()
    }

    async fn find_reseller_for_update(&mut self, id: i64) -> CoreResult<Option<Reseller>> {
        reseller::Entity::find_by_id(id)
            .one(&self.txn)
            .await
            .map_err(db_err("query reseller"))?
            .map(reseller::Model::into_reseller)
            .transpose()
    }

    async fn find_hosting_plan_for_update(&mut self, id: i64) -> CoreResult<Option<HostingPlan>> {
        hosting_plan::Entity::find_by_id(id)
            .one(&self.txn)
            .await
            .map_err(db_err("query hosting plan"))?
            .map(hosting_plan::Model::into_plan)
            .transpose()
    }

    async fn find_domain(&mut self, id: i64) -> CoreResult<Option<Domain>> {
        domain::Entity::find_by_id(id)
            .one(&self.txn)
            .await
            .map_err(db_err("query domain"))?
            .map(domain::Model::into_domain)
            .transpose()
    }

    async fn find_alias(&mut self, id: i64) -> CoreResult<Option<DomainAlias>> {
        domain_alias::Entity::find_by_id(id)
            .one(&self.txn)
            .await
            .map_err(db_err("query domain alias"))?
            .map(domain_alias::Model::into_alias)
            .transpose()
    }

    async fn load_domain_tree(&mut self, customer_id: i64) -> CoreResult<Option<DomainTree>> {
        let txn = &self.txn;
        let Some(main) = domain::Entity::find()
            .filter(domain::Column::CustomerId.eq(customer_id))
            .order_by_asc(domain::Column::Id)
            .one(txn)
            .await
            .map_err(db_err("query domain"))?
        else {
            return Ok(None);
        };
        let domain_id = main.id;
        let mut tree = DomainTree::empty(main.into_domain()?);

        tree.subdomains = subdomain::Entity::find()
            .filter(subdomain::Column::DomainId.eq(domain_id))
            .order_by_asc(subdomain::Column::Id)
            .all(txn)
            .await
            .map_err(db_err("query subdomains"))?
            .into_iter()
            .map(subdomain::Model::into_subdomain)
            .collect::<CoreResult<_>>()?;

        tree.aliases = domain_alias::Entity::find()
            .filter(domain_alias::Column::DomainId.eq(domain_id))
            .order_by_asc(domain_alias::Column::Id)
            .all(txn)
            .await
            .map_err(db_err("query domain aliases"))?
            .into_iter()
            .map(domain_alias::Model::into_alias)
            .collect::<CoreResult<_>>()?;

        let alias_ids: Vec<i64> = tree.aliases.iter().map(|a| a.id).collect();
        tree.alias_subdomains = alias_subdomain::Entity::find()
            .filter(alias_subdomain::Column::AliasId.is_in(alias_ids))
            .order_by_asc(alias_subdomain::Column::Id)
            .all(txn)
            .await
            .map_err(db_err("query alias subdomains"))?
            .into_iter()
            .map(alias_subdomain::Model::into_alias_subdomain)
            .collect::<CoreResult<_>>()?;

        tree.mail_accounts = mail_account::Entity::find()
            .filter(mail_account::Column::DomainId.eq(domain_id))
            .order_by_asc(mail_account::Column::Id)
            .all(txn)
            .await
            .map_err(db_err("query mail accounts"))?
            .into_iter()
            .map(mail_account::Model::into_mail_account)
            .collect::<CoreResult<_>>()?;

        tree.dns_records = dns_record::Entity::find()
            .filter(dns_record::Column::DomainId.eq(domain_id))
            .order_by_asc(dns_record::Column::Id)
            .all(txn)
            .await
            .map_err(db_err("query DNS records"))?
            .into_iter()
            .map(dns_record::Model::into_dns_record)
            .collect::<CoreResult<_>>()?;

        tree.certificates = certificate::Entity::find()
            .filter(certificate::Column::DomainId.eq(domain_id))
            .order_by_asc(certificate::Column::Id)
            .all(txn)
            .await
            .map_err(db_err("query certificates"))?
            .into_iter()
            .map(certificate::Model::into_certificate)
            .collect::<CoreResult<_>>()?;

        tree.ftp_users = ftp_user::Entity::find()
            .filter(ftp_user::Column::CustomerId.eq(customer_id))
            .order_by_asc(ftp_user::Column::Id)
            .all(txn)
            .await
            .map_err(db_err("query FTP users"))?
            .into_iter()
            .map(ftp_user::Model::into_ftp_user)
            .collect::<CoreResult<_>>()?;

        tree.sql_databases = sql_database::Entity::find()
            .filter(sql_database::Column::DomainId.eq(domain_id))
            .order_by_asc(sql_database::Column::Id)
            .all(txn)
            .await
            .map_err(db_err("query SQL databases"))?
            .into_iter()
            .map(sql_database::Model::into_sql_database)
            .collect::<CoreResult<_>>()?;

        let database_ids: Vec<i64> = tree.sql_databases.iter().map(|d| d.id).collect();
        tree.sql_users = sql_user::Entity::find()
            .filter(sql_user::Column::DatabaseId.is_in(database_ids))
            .order_by_asc(sql_user::Column::Id)
            .all(txn)
            .await
            .map_err(db_err("query SQL users"))?
            .into_iter()
            .map(sql_user::Model::into_sql_user)
            .collect::<CoreResult<_>>()?;

        Ok(Some(tree))
    }

    async fn list_customers_of_reseller(
        &mut self,
        reseller_id: i64,
    ) -> CoreResult<Vec<CustomerAccount>> {
        customer::Entity::find()
            .filter(customer::Column::CreatedBy.eq(reseller_id))
            .order_by_asc(customer::Column::Id)
            .all(&self.txn)
            .await
            .map_err(db_err("query customers"))?
            .into_iter()
            .map(customer::Model::into_customer)
            .collect()
    }

    async fn update_customer_limits(
        &mut self,
        customer_id: i64,
        limits: &ResourceLimits,
    ) -> CoreResult<u64> {
        let [sub, als, mail, ftp, sql_db, sql_user, traffic, disk] = raw_limits(limits);
        let row = customer::ActiveModel {
            max_sub_cnt: Set(sub),
            max_als_cnt: Set(als),
            max_mail_cnt: Set(mail),
            max_ftp_cnt: Set(ftp),
            max_sql_db_cnt: Set(sql_db),
            max_sql_user_cnt: Set(sql_user),
            max_traffic: Set(traffic),
            max_disk: Set(disk),
            ..Default::default()
        };
        Ok(customer::Entity::update_many()
            .set(row)
            .filter(customer::Column::Id.eq(customer_id))
            .exec(&self.txn)
            .await
            .map_err(db_err("update customer limits"))?
            .rows_affected)
    }

    async fn update_reseller_pool(
        &mut self,
        reseller_id: i64,
        pool: &ResellerPool,
    ) -> CoreResult<u64> {
        let row = reseller::ActiveModel {
            current_dmn_cnt: Set(to_i64(pool.domains)?),
            current_sub_cnt: Set(to_i64(pool.subdomains)?),
            current_als_cnt: Set(to_i64(pool.aliases)?),
            current_mail_cnt: Set(to_i64(pool.mailboxes)?),
            current_ftp_cnt: Set(to_i64(pool.ftp_accounts)?),
            current_sql_db_cnt: Set(to_i64(pool.sql_databases)?),
            current_sql_user_cnt: Set(to_i64(pool.sql_users)?),
            current_traffic: Set(to_i64(pool.traffic)?),
            current_disk: Set(to_i64(pool.disk)?),
            ..Default::default()
        };
        Ok(reseller::Entity::update_many()
            .set(row)
            .filter(reseller::Column::Id.eq(reseller_id))
            .exec(&self.txn)
            .await
            .map_err(db_err("update reseller pool"))?
            .rows_affected)
    }

    async fn update_hosting_plan(&mut self, plan: &HostingPlan) -> CoreResult<u64> {
        let [sub, als, mail, ftp, sql_db, sql_user, traffic, disk] = raw_limits(&plan.limits);
        let row = hosting_plan::ActiveModel {
            name: Set(plan.name.clone()),
            max_sub_cnt: Set(sub),
            max_als_cnt: Set(als),
            max_mail_cnt: Set(mail),
            max_ftp_cnt: Set(ftp),
            max_sql_db_cnt: Set(sql_db),
            max_sql_user_cnt: Set(sql_user),
            max_traffic: Set(traffic),
            max_disk: Set(disk),
            ..Default::default()
        };
        Ok(hosting_plan::Entity::update_many()
            .set(row)
            .filter(hosting_plan::Column::Id.eq(plan.id))
            .exec(&self.txn)
            .await
            .map_err(db_err("update hosting plan"))?
            .rows_affected)
    }

    async fn set_status(
        &mut self,
        entities: &[EntityRef],
        status: ProvisioningStatus,
    ) -> CoreResult<u64> {
        let txn = &self.txn;
        let mut rows = 0;
        for kind in EntityKind::ALL {
            let ids = ids_of(entities, kind);
            if ids.is_empty() {
                continue;
            }
            rows += match kind {
                EntityKind::Customer => set_table_status!(txn, customer, ids, status),
                EntityKind::Domain => set_table_status!(txn, domain, ids, status),
                EntityKind::Subdomain => set_table_status!(txn, subdomain, ids, status),
                EntityKind::Alias => set_table_status!(txn, domain_alias, ids, status),
                EntityKind::AliasSubdomain => set_table_status!(txn, alias_subdomain, ids, status),
                EntityKind::MailAccount => set_table_status!(txn, mail_account, ids, status),
                EntityKind::DnsRecord => set_table_status!(txn, dns_record, ids, status),
                EntityKind::Certificate => set_table_status!(txn, certificate, ids, status),
                EntityKind::FtpUser => set_table_status!(txn, ftp_user, ids, status),
                EntityKind::SqlDatabase => set_table_status!(txn, sql_database, ids, status),
                EntityKind::SqlUser => set_table_status!(txn, sql_user, ids, status),
            };
        }
        Ok(rows)
    }

    async fn set_mail_states(&mut self, changes: &[MailStateChange]) -> CoreResult<u64> {
        let mut rows = 0;
        for change in changes {
            let mut update = mail_account::Entity::update_many()
                .col_expr(mail_account::Column::PoActive, Expr::value(change.po_active));
            if let Some(status) = change.status {
                update =
                    update.col_expr(mail_account::Column::Status, Expr::value(status.as_str()));
            }
            rows += update
                .filter(mail_account::Column::Id.eq(change.mail_id))
                .exec(&self.txn)
                .await
                .map_err(db_err("update mail account"))?
                .rows_affected;
        }
        Ok(rows)
    }

    async fn update_mail_quotas(&mut self, quotas: &[MailboxQuota]) -> CoreResult<u64> {
        let mut rows = 0;
        for quota in quotas {
            rows += mail_account::Entity::update_many()
                .col_expr(mail_account::Column::Quota, Expr::value(to_i64(quota.quota)?))
                .filter(mail_account::Column::Id.eq(quota.mail_id))
                .exec(&self.txn)
                .await
                .map_err(db_err("update mailbox quota"))?
                .rows_affected;
        }
        Ok(rows)
    }

    async fn insert_customer(
        &mut self,
        name: &str,
        created_by: i64,
        limits: &ResourceLimits,
    ) -> CoreResult<CustomerAccount> {
        let [sub, als, mail, ftp, sql_db, sql_user, traffic, disk] = raw_limits(limits);
        customer::ActiveModel {
            name: Set(name.to_string()),
            created_by: Set(created_by),
            status: Set(ProvisioningStatus::ToAdd.as_str().to_string()),
            max_sub_cnt: Set(sub),
            max_als_cnt: Set(als),
            max_mail_cnt: Set(mail),
            max_ftp_cnt: Set(ftp),
            max_sql_db_cnt: Set(sql_db),
            max_sql_user_cnt: Set(sql_user),
            max_traffic: Set(traffic),
            max_disk: Set(disk),
            traffic_bytes: Set(0),
            disk_bytes: Set(0),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&self.txn)
        .await
        .map_err(db_err("insert customer"))?
        .into_customer()
    }

    async fn insert_domain(&mut self, customer_id: i64, name: &str) -> CoreResult<Domain> {
        domain::ActiveModel {
            customer_id: Set(customer_id),
            name: Set(name.to_string()),
            status: Set(ProvisioningStatus::ToAdd.as_str().to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&self.txn)
        .await
        .map_err(db_err("insert domain"))?
        .into_domain()
    }

    async fn insert_resource(
        &mut self,
        domain: &Domain,
        resource: &NewResource,
    ) -> CoreResult<EntityRef> {
        let txn = &self.txn;
        let status = resource.initial_status().as_str().to_string();
        let entity = match resource {
            NewResource::Subdomain { name } => {
                let row = subdomain::ActiveModel {
                    domain_id: Set(domain.id),
                    name: Set(name.clone()),
                    status: Set(status),
                    ..Default::default()
                }
                .insert(txn)
                .await
                .map_err(db_err("insert subdomain"))?;
                EntityRef::new(EntityKind::Subdomain, row.id)
            }
            NewResource::Alias { name, .. } => {
                let row = domain_alias::ActiveModel {
                    domain_id: Set(domain.id),
                    name: Set(name.clone()),
                    status: Set(status),
                    ..Default::default()
                }
                .insert(txn)
                .await
                .map_err(db_err("insert domain alias"))?;
                EntityRef::new(EntityKind::Alias, row.id)
            }
            NewResource::AliasSubdomain { alias_id, name } => {
                let row = alias_subdomain::ActiveModel {
                    alias_id: Set(*alias_id),
                    name: Set(name.clone()),
                    status: Set(status),
                    ..Default::default()
                }
                .insert(txn)
                .await
                .map_err(db_err("insert alias subdomain"))?;
                EntityRef::new(EntityKind::AliasSubdomain, row.id)
            }
            NewResource::MailAccount {
                owner,
                local_part,
                quota,
                catchall,
            } => {
                let (owner_type, owner_id) = host_columns(*owner);
                let row = mail_account::ActiveModel {
                    domain_id: Set(domain.id),
                    owner_type: Set(owner_type.to_string()),
                    owner_id: Set(owner_id),
                    local_part: Set(local_part.clone()),
                    status: Set(status),
                    po_active: Set(true),
                    quota: Set(quota.map(to_i64).transpose()?),
                    catchall: Set(*catchall),
                    ..Default::default()
                }
                .insert(txn)
                .await
                .map_err(db_err("insert mail account"))?;
                EntityRef::new(EntityKind::MailAccount, row.id)
            }
            NewResource::FtpUser { userid } => {
                let row = ftp_user::ActiveModel {
                    customer_id: Set(domain.customer_id),
                    userid: Set(userid.clone()),
                    status: Set(status),
                    ..Default::default()
                }
                .insert(txn)
                .await
                .map_err(db_err("insert FTP user"))?;
                EntityRef::new(EntityKind::FtpUser, row.id)
            }
            NewResource::SqlDatabase { name } => {
                let row = sql_database::ActiveModel {
                    domain_id: Set(domain.id),
                    name: Set(name.clone()),
                    status: Set(status),
                    ..Default::default()
                }
                .insert(txn)
                .await
                .map_err(db_err("insert SQL database"))?;
                EntityRef::new(EntityKind::SqlDatabase, row.id)
            }
            NewResource::SqlUser { database_id, name } => {
                let row = sql_user::ActiveModel {
                    database_id: Set(*database_id),
                    name: Set(name.clone()),
                    status: Set(status),
                    ..Default::default()
                }
                .insert(txn)
                .await
                .map_err(db_err("insert SQL user"))?;
                EntityRef::new(EntityKind::SqlUser, row.id)
            }
        };
        Ok(entity)
    }

    async fn remove_rows(&mut self, entities: &[EntityRef]) -> CoreResult<u64> {
        let txn = &self.txn;
        let mut rows = 0;
        for kind in EntityKind::ALL {
            let ids = ids_of(entities, kind);
            if ids.is_empty() {
                continue;
            }
            rows += match kind {
                EntityKind::Customer => 0,
                EntityKind::Domain => delete_table_rows!(txn, domain, ids),
                EntityKind::Subdomain => delete_table_rows!(txn, subdomain, ids),
                EntityKind::Alias => delete_table_rows!(txn, domain_alias, ids),
                EntityKind::AliasSubdomain => delete_table_rows!(txn, alias_subdomain, ids),
                EntityKind::MailAccount => delete_table_rows!(txn, mail_account, ids),
                EntityKind::DnsRecord => delete_table_rows!(txn, dns_record, ids),
                EntityKind::Certificate => delete_table_rows!(txn, certificate, ids),
                EntityKind::FtpUser => delete_table_rows!(txn, ftp_user, ids),
                EntityKind::SqlDatabase => delete_table_rows!(txn, sql_database, ids),
                EntityKind::SqlUser => delete_table_rows!(txn, sql_user, ids),
            };
        }
        Ok(rows)
    }

    async fn purge_customer_ephemera(&mut self, customer_id: i64) -> CoreResult<u64> {
        let sessions = login_session::Entity::delete_many()
            .filter(login_session::Column::CustomerId.eq(customer_id))
            .exec(&self.txn)
            .await
            .map_err(db_err("delete login sessions"))?
            .rows_affected;
        let entries = quota_entry::Entity::delete_many()
            .filter(quota_entry::Column::CustomerId.eq(customer_id))
            .exec(&self.txn)
            .await
            .map_err(db_err("delete quota entries"))?
            .rows_affected;
        let tickets = support_ticket::Entity::delete_many()
            .filter(support_ticket::Column::CustomerId.eq(customer_id))
            .exec(&self.txn)
            .await
            .map_err(db_err("delete support tickets"))?
            .rows_affected;
        Ok(sessions + entries + tickets)
    }

    async fn commit(self: Box<Self>) -> CoreResult<()> {
        let Self { txn, _writer } = *self;
        txn.commit()
            .await
            .map_err(|e| CoreError::TransactionFailure(format!("Failed to commit: {e}")))
    }

    async fn rollback(self: Box<Self>) -> CoreResult<()> {
        let Self { txn, _writer } = *self;
        txn.rollback()
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to roll back: {e}")))
    }
}
