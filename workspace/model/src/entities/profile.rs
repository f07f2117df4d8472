use super::account;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role of an account within the platform.
///
/// Stored and serialized with the values the web client already uses
/// (`estudiante`, `profesor`, `administrativo`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum Role {
    #[sea_orm(string_value = "estudiante")]
    #[serde(rename = "estudiante")]
    Student,
    #[sea_orm(string_value = "profesor")]
    #[serde(rename = "profesor")]
    Teacher,
    #[sea_orm(string_value = "administrativo")]
    #[serde(rename = "administrativo")]
    Administrative,
}

impl Role {
    /// Wire value of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "estudiante",
            Role::Teacher => "profesor",
            Role::Administrative => "administrativo",
        }
    }

    /// Capitalized label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Student => "Estudiante",
            Role::Teacher => "Profesor",
            Role::Administrative => "Administrativo",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "estudiante" => Ok(Role::Student),
            "profesor" => Ok(Role::Teacher),
            "administrativo" => Ok(Role::Administrative),
            _ => Err(format!("{:?} is not a valid role", s)),
        }
    }
}

/// Role-carrying record, one-to-one with an account.
/// Shares its primary key with the account it belongs to.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub account_id: i32,
    pub role: Role,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id",
        on_delete = "Cascade"
    )]
    Account,
}

impl Related<account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
