//! `SeaORM` entity for the `mail_accounts` table.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "mail_accounts")]
/// Mail accounts; `owner_type` / `owner_id` name the host they live on.
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub domain_id: i64,
    pub owner_type: String,
    pub owner_id: i64,
    pub local_part: String,
    pub status: String,
    pub po_active: bool,
    pub quota: Option<i64>,
    pub catchall: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
