use super::profile;
use sea_orm::entity::prelude::*;

/// A login identity: credentials and contact information.
/// The role lives on the linked [`profile`] record.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    pub email: String,
    /// bcrypt hash, never serialized to clients.
    pub password_hash: String,
    /// Display name.
    pub first_name: String,
    pub last_name: String,
    /// Superusers are always administrative, whatever their profile says.
    #[sea_orm(default_value = "false")]
    pub is_superuser: bool,
    /// Inactive accounts cannot log in.
    #[sea_orm(default_value = "true")]
    pub is_active: bool,
    pub date_joined: DateTimeUtc,
}

impl Model {
    /// Name shown to humans: the first name, or the username when it is blank.
    pub fn display_name(&self) -> &str {
        if self.first_name.trim().is_empty() {
            &self.username
        } else {
            &self.first_name
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// At most one profile per account.
    #[sea_orm(has_one = "super::profile::Entity")]
    Profile,
}

impl Related<profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
