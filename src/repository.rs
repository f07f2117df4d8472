//! Persistence of accounts and their profiles.
//!
//! Services talk to the identity store only through [`AccountRepository`],
//! so the role rules and validation never touch SeaORM directly.

use async_trait::async_trait;
use chrono::Utc;
use model::entities::{account, profile, profile::Role};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Select, SelectTwo, Set, TransactionTrait,
};
use tracing::{debug, trace};

use crate::policy::{self, Visibility};

/// An account together with its profile, if it has one.
#[derive(Clone, Debug, PartialEq)]
pub struct AccountRecord {
    pub account: account::Model,
    pub profile: Option<profile::Model>,
}

impl AccountRecord {
    /// Effective role, see [`policy::role_of`].
    pub fn role(&self) -> Role {
        policy::role_of(&self.account, self.profile.as_ref())
    }

    /// Creation time of the profile, or the account when there is none.
    pub fn created_at(&self) -> chrono::DateTime<Utc> {
        self.profile
            .as_ref()
            .map(|p| p.created_at)
            .unwrap_or(self.account.date_joined)
    }
}

impl From<(account::Model, Option<profile::Model>)> for AccountRecord {
    fn from((account, profile): (account::Model, Option<profile::Model>)) -> Self {
        Self { account, profile }
    }
}

/// Data needed to insert an account.
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_superuser: bool,
    /// Profile role. `None` creates the account without a profile.
    pub role: Option<Role>,
}

#[async_trait]
pub trait AccountRepository: Send + Sync + std::fmt::Debug {
    async fn find_by_id(&self, id: i32) -> Result<Option<AccountRecord>, DbErr>;

    async fn find_by_username(&self, username: &str) -> Result<Option<AccountRecord>, DbErr>;

    /// First account registered with this exact email.
    async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, DbErr>;

    async fn email_exists(&self, email: &str) -> Result<bool, DbErr>;

    async fn username_exists(&self, username: &str) -> Result<bool, DbErr>;

    /// Insert the account and, when a role is given, its profile, atomically.
    async fn create(&self, new_account: NewAccount) -> Result<AccountRecord, DbErr>;

    /// Accounts allowed by `visibility`, newest first.
    async fn list(&self, visibility: Visibility) -> Result<Vec<AccountRecord>, DbErr>;

    /// A single account, only if `visibility` allows it.
    async fn find_visible(
        &self,
        id: i32,
        visibility: Visibility,
    ) -> Result<Option<AccountRecord>, DbErr>;

    /// Delete profile and account in one transaction.
    /// Returns `false` when no account had this id.
    async fn delete_with_profile(&self, id: i32) -> Result<bool, DbErr>;
}

/// [`AccountRepository`] backed by a SeaORM connection.
#[derive(Clone, Debug)]
pub struct SeaOrmAccountRepository {
    db: DatabaseConnection,
}

impl SeaOrmAccountRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn with_profile(select: Select<account::Entity>) -> SelectTwo<account::Entity, profile::Entity> {
        select.find_also_related(profile::Entity)
    }

    fn visible(
        select: SelectTwo<account::Entity, profile::Entity>,
        visibility: Visibility,
    ) -> SelectTwo<account::Entity, profile::Entity> {
        match visibility {
            Visibility::OnlySelf(id) => select.filter(account::Column::Id.eq(id)),
            // Same rule as policy::role_of: no profile and not superuser means student
            Visibility::Students => select
                .filter(account::Column::IsSuperuser.eq(false))
                .filter(
                    Condition::any()
                        .add(profile::Column::Role.eq(Role::Student))
                        .add(profile::Column::AccountId.is_null()),
                ),
            Visibility::Everyone => select,
        }
    }
}

#[async_trait]
impl AccountRepository for SeaOrmAccountRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<AccountRecord>, DbErr> {
        trace!("Looking up account {}", id);
        let found = Self::with_profile(account::Entity::find_by_id(id))
            .one(&self.db)
            .await?;
        Ok(found.map(AccountRecord::from))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<AccountRecord>, DbErr> {
        let found = Self::with_profile(
            account::Entity::find().filter(account::Column::Username.eq(username)),
        )
        .one(&self.db)
        .await?;
        Ok(found.map(AccountRecord::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, DbErr> {
        let found = Self::with_profile(
            account::Entity::find()
                .filter(account::Column::Email.eq(email))
                .order_by_asc(account::Column::Id),
        )
        .one(&self.db)
        .await?;
        Ok(found.map(AccountRecord::from))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, DbErr> {
        let count = account::Entity::find()
            .filter(account::Column::Email.eq(email))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, DbErr> {
        let count = account::Entity::find()
            .filter(account::Column::Username.eq(username))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn create(&self, new_account: NewAccount) -> Result<AccountRecord, DbErr> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let account = account::ActiveModel {
            username: Set(new_account.username),
            email: Set(new_account.email),
            password_hash: Set(new_account.password_hash),
            first_name: Set(new_account.first_name),
            last_name: Set(new_account.last_name),
            is_superuser: Set(new_account.is_superuser),
            is_active: Set(true),
            date_joined: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let profile = match new_account.role {
            Some(role) => Some(
                profile::ActiveModel {
                    account_id: Set(account.id),
                    role: Set(role),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&txn)
                .await?,
            ),
            None => None,
        };

        txn.commit().await?;
        debug!("Inserted account {} ({})", account.id, account.username);

        Ok(AccountRecord { account, profile })
    }

    async fn list(&self, visibility: Visibility) -> Result<Vec<AccountRecord>, DbErr> {
        let rows = Self::visible(Self::with_profile(account::Entity::find()), visibility)
            .order_by_desc(account::Column::DateJoined)
            .order_by_desc(account::Column::Id)
            .all(&self.db)
            .await?;
        debug!("Listed {} accounts for {:?}", rows.len(), visibility);
        Ok(rows.into_iter().map(AccountRecord::from).collect())
    }

    async fn find_visible(
        &self,
        id: i32,
        visibility: Visibility,
    ) -> Result<Option<AccountRecord>, DbErr> {
        let found = self.find_by_id(id).await?;
        Ok(found.filter(|record| visibility.allows(record.account.id, record.role())))
    }

    async fn delete_with_profile(&self, id: i32) -> Result<bool, DbErr> {
        let txn = self.db.begin().await?;

        let profiles = profile::Entity::delete_by_id(id).exec(&txn).await?;
        let accounts = account::Entity::delete_by_id(id).exec(&txn).await?;

        if accounts.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        txn.commit().await?;
        debug!(
            "Deleted account {} ({} profile rows)",
            id, profiles.rows_affected
        );
        Ok(true)
    }
}
