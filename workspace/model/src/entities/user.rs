use sea_orm::entity::prelude::*;

/// A user profile.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Credential record; `None` or dangling means the profile is orphaned.
    pub auth_id: Option<i32>,
    pub full_name: Option<String>,
    #[sea_orm(unique)]
    pub username: Option<String>,
    pub birth_date: Option<Date>,
    pub bio: Option<String>,
    pub long_bio: Option<String>,
    /// Free-form structured profile payload.
    pub profile_json: Option<Json>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::auth::Entity",
        from = "Column::AuthId",
        to = "super::auth::Column::Id",
        on_delete = "SetNull"
    )]
    Auth,
    #[sea_orm(has_many = "super::role::Entity")]
    Role,
    #[sea_orm(has_many = "super::division::Entity")]
    Division,
    #[sea_orm(has_many = "super::log::Entity")]
    Log,
}

impl Related<super::auth::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Auth.def()
    }
}

impl Related<super::role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Role.def()
    }
}

impl Related<super::division::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Division.def()
    }
}

impl Related<super::log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Log.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
