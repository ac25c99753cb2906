use entity::constants::{COMPANY_LEN, WORK_DESCRIPTION_LEN};
use sea_orm_migration::prelude::*;

use crate::m20240101_000001_users::Users;

#[derive(DeriveIden)]
enum Works {
    Table,
    Id,
    FromWhen,
    ToWhen,
    Company,
    JobType,
    JobTitle,
    Description,
    UserId,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Works::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Works::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Works::FromWhen).timestamp_with_time_zone().not_null())
                    .col(
                        ColumnDef::new(Works::ToWhen)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Works::Company).string_len(COMPANY_LEN).not_null().default(""))
                    .col(ColumnDef::new(Works::JobType).small_integer().not_null().default(0))
                    .col(ColumnDef::new(Works::JobTitle).small_integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Works::Description)
                            .string_len(WORK_DESCRIPTION_LEN)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Works::UserId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_works_user")
                            .from(Works::Table, Works::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_works_user")
                    .table(Works::Table)
                    .col(Works::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Works::Table).to_owned())
            .await
    }
}
