//! `SeaORM` entity for the `hosting_plans` table.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "hosting_plans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub reseller_id: i64,
    pub name: String,
    pub max_sub_cnt: i64,
    pub max_als_cnt: i64,
    pub max_mail_cnt: i64,
    pub max_ftp_cnt: i64,
    pub max_sql_db_cnt: i64,
    pub max_sql_user_cnt: i64,
    pub max_traffic: i64,
    pub max_disk: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
