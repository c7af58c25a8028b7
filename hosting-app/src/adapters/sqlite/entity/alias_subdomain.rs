//! `SeaORM` entity for the `alias_subdomains` table.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "alias_subdomains")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub alias_id: i64,
    pub name: String,
    pub status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
