use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create auth table
        manager
            .create_table(
                Table::create()
                    .table(Auth::Table)
                    .if_not_exists()
                    .col(pk_auto(Auth::Id))
                    .col(string_null(Auth::Email).unique_key())
                    .col(string(Auth::Password))
                    .col(date_time(Auth::CreatedAt).default(Expr::current_timestamp()))
                    .col(date_time(Auth::UpdatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(integer_null(Users::AuthId))
                    .col(string_null(Users::FullName))
                    .col(string_null(Users::Username).unique_key())
                    .col(date_null(Users::BirthDate))
                    .col(text_null(Users::Bio))
                    .col(text_null(Users::LongBio))
                    .col(json_null(Users::ProfileJson))
                    .col(string_null(Users::Address))
                    .col(string_null(Users::PhoneNumber))
                    .col(date_time(Users::CreatedAt).default(Expr::current_timestamp()))
                    .col(date_time(Users::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_auth")
                            .from(Users::Table, Users::AuthId)
                            .to(Auth::Table, Auth::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create roles table
        manager
            .create_table(
                Table::create()
                    .table(Roles::Table)
                    .if_not_exists()
                    .col(pk_auto(Roles::Id))
                    .col(integer_null(Roles::UserId))
                    .col(string_null(Roles::Role))
                    .col(date_time(Roles::CreatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_roles_user")
                            .from(Roles::Table, Roles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create divisions table
        manager
            .create_table(
                Table::create()
                    .table(Divisions::Table)
                    .if_not_exists()
                    .col(pk_auto(Divisions::Id))
                    .col(integer_null(Divisions::UserId))
                    .col(string_null(Divisions::DivisionName))
                    .col(date_time(Divisions::CreatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_divisions_user")
                            .from(Divisions::Table, Divisions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create logs table
        manager
            .create_table(
                Table::create()
                    .table(Logs::Table)
                    .if_not_exists()
                    .col(pk_auto(Logs::Id))
                    .col(integer_null(Logs::UserId))
                    .col(string_null(Logs::Action))
                    .col(date_time(Logs::CreatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_logs_user")
                            .from(Logs::Table, Logs::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order to avoid foreign key constraints
        manager
            .drop_table(Table::drop().table(Logs::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Divisions::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Roles::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Auth::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Auth {
    Table,
    Id,
    Email,
    Password,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    AuthId,
    FullName,
    Username,
    BirthDate,
    Bio,
    LongBio,
    ProfileJson,
    Address,
    PhoneNumber,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Roles {
    Table,
    Id,
    UserId,
    Role,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Divisions {
    Table,
    Id,
    UserId,
    DivisionName,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Logs {
    Table,
    Id,
    UserId,
    Action,
    CreatedAt,
}
