use crate::lookup_index::LookupIndex;
use model::entities::prelude::{Auth, Division, Log, Role, User};
use model::entities::{auth, division, log, role, user};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Indexes backing the pipeline's foreign-key sweeps and lookups.
pub fn lookup_indexes() -> Vec<LookupIndex> {
    vec![
        LookupIndex::on::<User>("idx_users_auth_id", user::Column::AuthId),
        LookupIndex::on::<User>("idx_users_username", user::Column::Username),
        LookupIndex::on::<Role>("idx_roles_user_id", role::Column::UserId),
        LookupIndex::on::<Log>("idx_logs_user_id", log::Column::UserId),
        LookupIndex::on::<Division>("idx_divisions_user_id", division::Column::UserId),
        LookupIndex::on::<Division>("idx_divisions_division_name", division::Column::DivisionName),
        LookupIndex::on::<Auth>("idx_auth_email", auth::Column::Email),
    ]
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for index in lookup_indexes() {
            manager.create_index(index.create_statement()).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for index in lookup_indexes().into_iter().rev() {
            manager.drop_index(index.drop_statement()).await?;
        }

        Ok(())
    }
}
