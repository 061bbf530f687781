use sea_orm::entity::prelude::*;

/// Role of an account, stored as a short string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum Role {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "store_owner")]
    StoreOwner,
    #[sea_orm(string_value = "admin")]
    Admin,
}

/// Represents an account holder: a regular rater, a store owner, or an
/// administrator.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 hash; never leaves the server.
    pub password_hash: String,
    pub address: Option<String>,
    pub role: Role,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Stores owned by this user (only meaningful for store_owner accounts).
    #[sea_orm(has_many = "super::store::Entity")]
    Store,
    #[sea_orm(has_many = "super::rating::Entity")]
    Rating,
}

impl Related<super::store::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Store.def()
    }
}

impl Related<super::rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rating.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
