//! Administrative writes and read helpers outside the orchestrated actions.
//!
//! Reseller and plan creation, usage recording and session bookkeeping are
//! owned by other parts of the panel; these helpers let the CLI and the
//! integration tests set a store up.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, TransactionTrait,
};

use hosting_core::error::{CoreError, CoreResult};
use hosting_core::traits::HostingStore;
use hosting_core::types::{
    CustomerAccount, DomainTree, HostingPlan, Limit, ProvisioningStatus, Reseller,
    ResourceLimits,
};

use super::convert::{db_err, raw_limits, to_i64};
use super::entity::{
    alias_subdomain, certificate, customer, dns_record, domain, domain_alias, ftp_user,
    hosting_plan, login_session, mail_account, quota_entry, reseller, sql_database, sql_user,
    subdomain, support_ticket,
};
use super::SqliteStore;

/// Apply the daemon's write-back to one table.
macro_rules! settle_table {
    ($txn:expr, $entity:ident) => {{
        let removed = $entity::Entity::delete_many()
            .filter($entity::Column::Status.eq(ProvisioningStatus::ToDelete.as_str()))
            .exec($txn)
            .await
            .map_err(db_err("remove deleted rows"))?
            .rows_affected;
        let enabled = $entity::Entity::update_many()
            .col_expr($entity::Column::Status, Expr::value(ProvisioningStatus::Ok.as_str()))
            .filter($entity::Column::Status.is_in(SETTLES_TO_OK))
            .exec($txn)
            .await
            .map_err(db_err("settle pending rows"))?
            .rows_affected;
        let disabled = $entity::Entity::update_many()
            .col_expr($entity::Column::Status, Expr::value(ProvisioningStatus::Disabled.as_str()))
            .filter($entity::Column::Status.eq(ProvisioningStatus::ToDisable.as_str()))
            .exec($txn)
            .await
            .map_err(db_err("settle pending rows"))?
            .rows_affected;
        removed + enabled + disabled
    }};
}

const SETTLES_TO_OK: [&str; 3] = ["toadd", "tochange", "toenable"];

async fn settle_all(txn: &DatabaseTransaction) -> CoreResult<u64> {
    Ok(settle_table!(txn, customer)
        + settle_table!(txn, domain)
        + settle_table!(txn, subdomain)
        + settle_table!(txn, domain_alias)
        + settle_table!(txn, alias_subdomain)
        + settle_table!(txn, mail_account)
        + settle_table!(txn, dns_record)
        + settle_table!(txn, certificate)
        + settle_table!(txn, ftp_user)
        + settle_table!(txn, sql_database)
        + settle_table!(txn, sql_user))
}

impl SqliteStore {
    /// Write back what the provisioning daemon writes back once its work is
    /// done: `todelete` rows are removed, `todisable` rows become `disabled`,
    /// every other pending row becomes `ok`. `ordered` rows are left alone.
    ///
    /// For single-host setups without a daemon and for tests.
    pub async fn acknowledge_pending(&self) -> CoreResult<u64> {
        let _writer = self.writer.lock().await;
        let txn = self.db.begin().await.map_err(db_err("begin transaction"))?;
        let rows = settle_all(&txn).await?;
        txn.commit().await.map_err(db_err("commit acknowledgement"))?;
        log::info!("Acknowledged {rows} pending rows");
        Ok(rows)
    }

    /// Create a reseller with an empty pool.
    pub async fn create_reseller(
        &self,
        name: &str,
        max_domains: Limit,
        ceilings: &ResourceLimits,
    ) -> CoreResult<Reseller> {
        ceilings.validate()?;
        let _writer = self.writer.lock().await;
        let [sub, als, mail, ftp, sql_db, sql_user, traffic, disk] = raw_limits(ceilings);
        reseller::ActiveModel {
            name: Set(name.to_string()),
            max_dmn_cnt: Set(max_domains.raw()),
            max_sub_cnt: Set(sub),
            max_als_cnt: Set(als),
            max_mail_cnt: Set(mail),
            max_ftp_cnt: Set(ftp),
            max_sql_db_cnt: Set(sql_db),
            max_sql_user_cnt: Set(sql_user),
            max_traffic: Set(traffic),
            max_disk: Set(disk),
            current_dmn_cnt: Set(0),
            current_sub_cnt: Set(0),
            current_als_cnt: Set(0),
            current_mail_cnt: Set(0),
            current_ftp_cnt: Set(0),
            current_sql_db_cnt: Set(0),
            current_sql_user_cnt: Set(0),
            current_traffic: Set(0),
            current_disk: Set(0),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(db_err("insert reseller"))?
        .into_reseller()
    }

    pub async fn create_hosting_plan(
        &self,
        reseller_id: i64,
        name: &str,
        limits: &ResourceLimits,
    ) -> CoreResult<HostingPlan> {
        limits.validate()?;
        let _writer = self.writer.lock().await;
        if self.find_reseller(reseller_id).await?.is_none() {
            return Err(CoreError::ResellerNotFound(reseller_id));
        }
        let [sub, als, mail, ftp, sql_db, sql_user, traffic, disk] = raw_limits(limits);
        hosting_plan::ActiveModel {
            reseller_id: Set(reseller_id),
            name: Set(name.to_string()),
            max_sub_cnt: Set(sub),
            max_als_cnt: Set(als),
            max_mail_cnt: Set(mail),
            max_ftp_cnt: Set(ftp),
            max_sql_db_cnt: Set(sql_db),
            max_sql_user_cnt: Set(sql_user),
            max_traffic: Set(traffic),
            max_disk: Set(disk),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(db_err("insert hosting plan"))?
        .into_plan()
    }

    /// Store the latest traffic and disk measurements of a customer and
    /// append the disk figure to its quota ledger.
    pub async fn record_usage(
        &self,
        customer_id: i64,
        traffic_bytes: u64,
        disk_bytes: u64,
    ) -> CoreResult<()> {
        let _writer = self.writer.lock().await;
        let row = customer::ActiveModel {
            traffic_bytes: Set(to_i64(traffic_bytes)?),
            disk_bytes: Set(to_i64(disk_bytes)?),
            ..Default::default()
        };
        let updated = customer::Entity::update_many()
            .set(row)
            .filter(customer::Column::Id.eq(customer_id))
            .exec(&self.db)
            .await
            .map_err(db_err("record usage"))?
            .rows_affected;
        if updated == 0 {
            return Err(CoreError::CustomerNotFound(customer_id));
        }
        quota_entry::ActiveModel {
            customer_id: Set(customer_id),
            bytes: Set(to_i64(disk_bytes)?),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(db_err("insert quota entry"))?;
        Ok(())
    }

    pub async fn record_login(&self, customer_id: i64) -> CoreResult<()> {
        let _writer = self.writer.lock().await;
        login_session::ActiveModel {
            customer_id: Set(customer_id),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(db_err("insert login session"))?;
        Ok(())
    }

    pub async fn open_support_ticket(&self, customer_id: i64, subject: &str) -> CoreResult<()> {
        let _writer = self.writer.lock().await;
        support_ticket::ActiveModel {
            customer_id: Set(customer_id),
            subject: Set(subject.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(db_err("insert support ticket"))?;
        Ok(())
    }

    /// Login sessions, quota entries and support tickets left for a customer.
    pub async fn count_ephemera(&self, customer_id: i64) -> CoreResult<u64> {
        let sessions = login_session::Entity::find()
            .filter(login_session::Column::CustomerId.eq(customer_id))
            .count(&self.db)
            .await
            .map_err(db_err("count login sessions"))?;
        let entries = quota_entry::Entity::find()
            .filter(quota_entry::Column::CustomerId.eq(customer_id))
            .count(&self.db)
            .await
            .map_err(db_err("count quota entries"))?;
        let tickets = support_ticket::Entity::find()
            .filter(support_ticket::Column::CustomerId.eq(customer_id))
            .count(&self.db)
            .await
            .map_err(db_err("count support tickets"))?;
        Ok(sessions + entries + tickets)
    }

    pub async fn find_reseller(&self, id: i64) -> CoreResult<Option<Reseller>> {
        reseller::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err("query reseller"))?
            .map(reseller::Model::into_reseller)
            .transpose()
    }

    pub async fn find_customer(&self, id: i64) -> CoreResult<Option<CustomerAccount>> {
        customer::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err("query customer"))?
            .map(customer::Model::into_customer)
            .transpose()
    }

    /// Read-only snapshot of a customer's domain tree.
    pub async fn domain_tree(&self, customer_id: i64) -> CoreResult<Option<DomainTree>> {
        let mut tx = self.begin().await?;
        let tree = tx.load_domain_tree(customer_id).await;
        tx.rollback().await?;
        tree
    }
}
