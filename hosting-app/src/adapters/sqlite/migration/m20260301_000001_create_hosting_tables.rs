use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // resellers: ceilings and consumed pool
        manager
            .create_table(
                Table::create()
                    .table(Reseller::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reseller::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Reseller::Name).string().not_null())
                    .col(ColumnDef::new(Reseller::MaxDmnCnt).big_integer().not_null().default(-1))
                    .col(ColumnDef::new(Reseller::MaxSubCnt).big_integer().not_null().default(-1))
                    .col(ColumnDef::new(Reseller::MaxAlsCnt).big_integer().not_null().default(-1))
                    .col(ColumnDef::new(Reseller::MaxMailCnt).big_integer().not_null().default(-1))
                    .col(ColumnDef::new(Reseller::MaxFtpCnt).big_integer().not_null().default(-1))
                    .col(ColumnDef::new(Reseller::MaxSqlDbCnt).big_integer().not_null().default(-1))
                    .col(
                        ColumnDef::new(Reseller::MaxSqlUserCnt)
                            .big_integer()
                            .not_null()
                            .default(-1),
                    )
                    .col(ColumnDef::new(Reseller::MaxTraffic).big_integer().not_null().default(-1))
                    .col(ColumnDef::new(Reseller::MaxDisk).big_integer().not_null().default(-1))
                    .col(
                        ColumnDef::new(Reseller::CurrentDmnCnt)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Reseller::CurrentSubCnt)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Reseller::CurrentAlsCnt)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Reseller::CurrentMailCnt)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Reseller::CurrentFtpCnt)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Reseller::CurrentSqlDbCnt)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Reseller::CurrentSqlUserCnt)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Reseller::CurrentTraffic)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Reseller::CurrentDisk).big_integer().not_null().default(0))
                    .to_owned(),
            )
            .await?;

        // customers: limits and recorded usage
        manager
            .create_table(
                Table::create()
                    .table(Customer::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Customer::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Customer::Name).string().not_null())
                    .col(ColumnDef::new(Customer::CreatedBy).integer().not_null())
                    .col(ColumnDef::new(Customer::Status).string().not_null().default("toadd"))
                    .col(ColumnDef::new(Customer::MaxSubCnt).big_integer().not_null().default(-1))
                    .col(ColumnDef::new(Customer::MaxAlsCnt).big_integer().not_null().default(-1))
                    .col(ColumnDef::new(Customer::MaxMailCnt).big_integer().not_null().default(-1))
                    .col(ColumnDef::new(Customer::MaxFtpCnt).big_integer().not_null().default(-1))
                    .col(ColumnDef::new(Customer::MaxSqlDbCnt).big_integer().not_null().default(-1))
                    .col(
                        ColumnDef::new(Customer::MaxSqlUserCnt)
                            .big_integer()
                            .not_null()
                            .default(-1),
                    )
                    .col(ColumnDef::new(Customer::MaxTraffic).big_integer().not_null().default(-1))
                    .col(ColumnDef::new(Customer::MaxDisk).big_integer().not_null().default(-1))
                    .col(ColumnDef::new(Customer::TrafficBytes).big_integer().not_null().default(0))
                    .col(ColumnDef::new(Customer::DiskBytes).big_integer().not_null().default(0))
                    .col(ColumnDef::new(Customer::CreatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(HostingPlan::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HostingPlan::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(HostingPlan::ResellerId).integer().not_null())
                    .col(ColumnDef::new(HostingPlan::Name).string().not_null())
                    .col(
                        ColumnDef::new(HostingPlan::MaxSubCnt)
                            .big_integer()
                            .not_null()
                            .default(-1),
                    )
                    .col(
                        ColumnDef::new(HostingPlan::MaxAlsCnt)
                            .big_integer()
                            .not_null()
                            .default(-1),
                    )
                    .col(
                        ColumnDef::new(HostingPlan::MaxMailCnt)
                            .big_integer()
                            .not_null()
                            .default(-1),
                    )
                    .col(
                        ColumnDef::new(HostingPlan::MaxFtpCnt)
                            .big_integer()
                            .not_null()
                            .default(-1),
                    )
                    .col(
                        ColumnDef::new(HostingPlan::MaxSqlDbCnt)
                            .big_integer()
                            .not_null()
                            .default(-1),
                    )
                    .col(
                        ColumnDef::new(HostingPlan::MaxSqlUserCnt)
                            .big_integer()
                            .not_null()
                            .default(-1),
                    )
                    .col(
                        ColumnDef::new(HostingPlan::MaxTraffic)
                            .big_integer()
                            .not_null()
                            .default(-1),
                    )
                    .col(ColumnDef::new(HostingPlan::MaxDisk).big_integer().not_null().default(-1))
                    .to_owned(),
            )
            .await?;

        // domain tree
        manager
            .create_table(
                Table::create()
                    .table(Domain::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Domain::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Domain::CustomerId).integer().not_null())
                    .col(ColumnDef::new(Domain::Name).string().not_null())
                    .col(ColumnDef::new(Domain::Status).string().not_null().default("toadd"))
                    .col(ColumnDef::new(Domain::CreatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Subdomain::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subdomain::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Subdomain::DomainId).integer().not_null())
                    .col(ColumnDef::new(Subdomain::Name).string().not_null())
                    .col(ColumnDef::new(Subdomain::Status).string().not_null().default("toadd"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DomainAlias::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DomainAlias::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DomainAlias::DomainId).integer().not_null())
                    .col(ColumnDef::new(DomainAlias::Name).string().not_null())
                    .col(ColumnDef::new(DomainAlias::Status).string().not_null().default("toadd"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AliasSubdomain::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AliasSubdomain::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AliasSubdomain::AliasId).integer().not_null())
                    .col(ColumnDef::new(AliasSubdomain::Name).string().not_null())
                    .col(
                        ColumnDef::new(AliasSubdomain::Status)
                            .string()
                            .not_null()
                            .default("toadd"),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MailAccount::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MailAccount::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MailAccount::DomainId).integer().not_null())
                    .col(ColumnDef::new(MailAccount::OwnerType).string().not_null())
                    .col(ColumnDef::new(MailAccount::OwnerId).integer().not_null())
                    .col(ColumnDef::new(MailAccount::LocalPart).string().not_null())
                    .col(ColumnDef::new(MailAccount::Status).string().not_null().default("toadd"))
                    .col(ColumnDef::new(MailAccount::PoActive).boolean().not_null().default(true))
                    .col(ColumnDef::new(MailAccount::Quota).big_integer().null())
                    .col(ColumnDef::new(MailAccount::Catchall).boolean().not_null().default(false))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DnsRecord::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DnsRecord::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DnsRecord::DomainId).integer().not_null())
                    .col(ColumnDef::new(DnsRecord::AliasId).big_integer().null())
                    .col(ColumnDef::new(DnsRecord::Name).string().not_null())
                    .col(ColumnDef::new(DnsRecord::Status).string().not_null().default("toadd"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Certificate::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Certificate::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Certificate::DomainId).integer().not_null())
                    .col(ColumnDef::new(Certificate::OwnerType).string().not_null())
                    .col(ColumnDef::new(Certificate::OwnerId).integer().not_null())
                    .col(ColumnDef::new(Certificate::Status).string().not_null().default("toadd"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FtpUser::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FtpUser::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FtpUser::CustomerId).integer().not_null())
                    .col(ColumnDef::new(FtpUser::Userid).string().not_null())
                    .col(ColumnDef::new(FtpUser::Status).string().not_null().default("toadd"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SqlDatabase::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SqlDatabase::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SqlDatabase::DomainId).integer().not_null())
                    .col(ColumnDef::new(SqlDatabase::Name).string().not_null())
                    .col(ColumnDef::new(SqlDatabase::Status).string().not_null().default("toadd"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SqlUser::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SqlUser::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SqlUser::DatabaseId).integer().not_null())
                    .col(ColumnDef::new(SqlUser::Name).string().not_null())
                    .col(ColumnDef::new(SqlUser::Status).string().not_null().default("toadd"))
                    .to_owned(),
            )
            .await?;

        // rows the daemon does not own
        manager
            .create_table(
                Table::create()
                    .table(LoginSession::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LoginSession::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LoginSession::CustomerId).integer().not_null())
                    .col(ColumnDef::new(LoginSession::CreatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(QuotaEntry::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QuotaEntry::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(QuotaEntry::CustomerId).integer().not_null())
                    .col(ColumnDef::new(QuotaEntry::Bytes).big_integer().not_null().default(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SupportTicket::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SupportTicket::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SupportTicket::CustomerId).integer().not_null())
                    .col(ColumnDef::new(SupportTicket::Subject).string().not_null())
                    .col(ColumnDef::new(SupportTicket::CreatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        for (name, table, column) in [
            (
                "idx_customers_created_by",
                Customer::Table.into_iden(),
                Customer::CreatedBy.into_iden(),
            ),
            (
                "idx_domains_customer_id",
                Domain::Table.into_iden(),
                Domain::CustomerId.into_iden(),
            ),
            (
                "idx_subdomains_domain_id",
                Subdomain::Table.into_iden(),
                Subdomain::DomainId.into_iden(),
            ),
            (
                "idx_domain_aliases_domain_id",
                DomainAlias::Table.into_iden(),
                DomainAlias::DomainId.into_iden(),
            ),
            (
                "idx_alias_subdomains_alias_id",
                AliasSubdomain::Table.into_iden(),
                AliasSubdomain::AliasId.into_iden(),
            ),
            (
                "idx_mail_accounts_domain_id",
                MailAccount::Table.into_iden(),
                MailAccount::DomainId.into_iden(),
            ),
            (
                "idx_dns_records_domain_id",
                DnsRecord::Table.into_iden(),
                DnsRecord::DomainId.into_iden(),
            ),
            (
                "idx_certificates_domain_id",
                Certificate::Table.into_iden(),
                Certificate::DomainId.into_iden(),
            ),
            (
                "idx_ftp_users_customer_id",
                FtpUser::Table.into_iden(),
                FtpUser::CustomerId.into_iden(),
            ),
            (
                "idx_sql_databases_domain_id",
                SqlDatabase::Table.into_iden(),
                SqlDatabase::DomainId.into_iden(),
            ),
            (
                "idx_sql_users_database_id",
                SqlUser::Table.into_iden(),
                SqlUser::DatabaseId.into_iden(),
            ),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(table)
                        .col(column)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            SupportTicket::Table.into_iden(),
            QuotaEntry::Table.into_iden(),
            LoginSession::Table.into_iden(),
            SqlUser::Table.into_iden(),
            SqlDatabase::Table.into_iden(),
            FtpUser::Table.into_iden(),
            Certificate::Table.into_iden(),
            DnsRecord::Table.into_iden(),
            MailAccount::Table.into_iden(),
            AliasSubdomain::Table.into_iden(),
            DomainAlias::Table.into_iden(),
            Subdomain::Table.into_iden(),
            Domain::Table.into_iden(),
            HostingPlan::Table.into_iden(),
            Customer::Table.into_iden(),
            Reseller::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Reseller {
    #[sea_orm(iden = "resellers")]
    Table,
    Id,
    Name,
    MaxDmnCnt,
    MaxSubCnt,
    MaxAlsCnt,
    MaxMailCnt,
    MaxFtpCnt,
    MaxSqlDbCnt,
    MaxSqlUserCnt,
    MaxTraffic,
    MaxDisk,
    CurrentDmnCnt,
    CurrentSubCnt,
    CurrentAlsCnt,
    CurrentMailCnt,
    CurrentFtpCnt,
    CurrentSqlDbCnt,
    CurrentSqlUserCnt,
    CurrentTraffic,
    CurrentDisk,
}

#[derive(DeriveIden)]
enum Customer {
    #[sea_orm(iden = "customers")]
    Table,
    Id,
    Name,
    CreatedBy,
    Status,
    MaxSubCnt,
    MaxAlsCnt,
    MaxMailCnt,
    MaxFtpCnt,
    MaxSqlDbCnt,
    MaxSqlUserCnt,
    MaxTraffic,
    MaxDisk,
    TrafficBytes,
    DiskBytes,
    CreatedAt,
}

#[derive(DeriveIden)]
enum HostingPlan {
    #[sea_orm(iden = "hosting_plans")]
    Table,
    Id,
    ResellerId,
    Name,
    MaxSubCnt,
    MaxAlsCnt,
    MaxMailCnt,
    MaxFtpCnt,
    MaxSqlDbCnt,
    MaxSqlUserCnt,
    MaxTraffic,
    MaxDisk,
}

#[derive(DeriveIden)]
enum Domain {
    #[sea_orm(iden = "domains")]
    Table,
    Id,
    CustomerId,
    Name,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Subdomain {
    #[sea_orm(iden = "subdomains")]
    Table,
    Id,
    DomainId,
    Name,
    Status,
}

#[derive(DeriveIden)]
enum DomainAlias {
    #[sea_orm(iden = "domain_aliases")]
    Table,
    Id,
    DomainId,
    Name,
    Status,
}

#[derive(DeriveIden)]
enum AliasSubdomain {
    #[sea_orm(iden = "alias_subdomains")]
    Table,
    Id,
    AliasId,
    Name,
    Status,
}

#[derive(DeriveIden)]
enum MailAccount {
    #[sea_orm(iden = "mail_accounts")]
    Table,
    Id,
    DomainId,
    OwnerType,
    OwnerId,
    LocalPart,
    Status,
    PoActive,
    Quota,
    Catchall,
}

#[derive(DeriveIden)]
enum DnsRecord {
    #[sea_orm(iden = "dns_records")]
    Table,
    Id,
    DomainId,
    AliasId,
    Name,
    Status,
}

#[derive(DeriveIden)]
enum Certificate {
    #[sea_orm(iden = "certificates")]
    Table,
    Id,
    DomainId,
    OwnerType,
    OwnerId,
    Status,
}

#[derive(DeriveIden)]
enum FtpUser {
    #[sea_orm(iden = "ftp_users")]
    Table,
    Id,
    CustomerId,
    Userid,
    Status,
}

#[derive(DeriveIden)]
enum SqlDatabase {
    #[sea_orm(iden = "sql_databases")]
    Table,
    Id,
    DomainId,
    Name,
    Status,
}

#[derive(DeriveIden)]
enum SqlUser {
    #[sea_orm(iden = "sql_users")]
    Table,
    Id,
    DatabaseId,
    Name,
    Status,
}

#[derive(DeriveIden)]
enum LoginSession {
    #[sea_orm(iden = "login_sessions")]
    Table,
    Id,
    CustomerId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum QuotaEntry {
    #[sea_orm(iden = "quota_entries")]
    Table,
    Id,
    CustomerId,
    Bytes,
}

#[derive(DeriveIden)]
enum SupportTicket {
    #[sea_orm(iden = "support_tickets")]
    Table,
    Id,
    CustomerId,
    Subject,
    CreatedAt,
}
