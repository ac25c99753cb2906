use entity::constants::{PASSWORD_LEN, STRING_LEN};
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
pub(crate) enum Users {
    Table,
    Id,
    Name,
    Email,
    Phone,
    SexCode,
    Url,
    Deposit,
    Location,
    Bio,
    ActivationKey,
    CreateAt,
    UpdateAt,
    Avatar,
    Password,
    RoleCode,
    StatusCode,
    Followers,
    Following,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Name).string_len(STRING_LEN).not_null())
                    .col(ColumnDef::new(Users::Email).string_len(STRING_LEN).not_null())
                    .col(ColumnDef::new(Users::Phone).string_len(STRING_LEN).not_null().default(""))
                    .col(ColumnDef::new(Users::SexCode).integer().not_null().default(1))
                    .col(ColumnDef::new(Users::Url).string_len(STRING_LEN).not_null().default(""))
                    .col(ColumnDef::new(Users::Deposit).decimal().not_null().default(0))
                    .col(ColumnDef::new(Users::Location).string_len(STRING_LEN).not_null().default(""))
                    .col(ColumnDef::new(Users::Bio).text().default(""))
                    .col(ColumnDef::new(Users::ActivationKey).string_len(STRING_LEN))
                    .col(
                        ColumnDef::new(Users::CreateAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Users::UpdateAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Users::Avatar).string_len(STRING_LEN))
                    .col(ColumnDef::new(Users::Password).string_len(PASSWORD_LEN))
                    .col(ColumnDef::new(Users::RoleCode).small_integer().not_null().default(2))
                    .col(ColumnDef::new(Users::StatusCode).small_integer().not_null().default(0))
                    .col(ColumnDef::new(Users::Followers).text())
                    .col(ColumnDef::new(Users::Following).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_name")
                    .table(Users::Table)
                    .col(Users::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_email")
                    .table(Users::Table)
                    .col(Users::Email)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}
