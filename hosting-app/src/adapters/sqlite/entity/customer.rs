//! `SeaORM` entity for the `customers` table.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "customers")]
/// Customer accounts with their limits and recorded usage.
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub created_by: i64,
    pub status: String,
    pub max_sub_cnt: i64,
    pub max_als_cnt: i64,
    pub max_mail_cnt: i64,
    pub max_ftp_cnt: i64,
    pub max_sql_db_cnt: i64,
    pub max_sql_user_cnt: i64,
    pub max_traffic: i64,
    pub max_disk: i64,
    pub traffic_bytes: i64,
    pub disk_bytes: i64,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
