//! `SeaORM` entities, one module per table.

pub mod alias_subdomain;
pub mod certificate;
pub mod customer;
pub mod dns_record;
pub mod domain;
pub mod domain_alias;
pub mod ftp_user;
pub mod hosting_plan;
pub mod login_session;
pub mod mail_account;
pub mod quota_entry;
pub mod reseller;
pub mod sql_database;
pub mod sql_user;
pub mod subdomain;
pub mod support_ticket;
