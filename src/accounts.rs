//! Account management on top of [`AccountRepository`]: creation with its
//! validation rules, role-filtered listing and guarded deletion.

use model::entities::profile::Role;
use sea_orm::{DbErr, SqlErr};
use tracing::{debug, info, warn};
use validator::ValidateEmail;

use crate::auth::{hash_password, Requester};
use crate::error::{ApiError, ApiResult};
use crate::policy::{self, ADMINISTRATIVE};
use crate::repository::{AccountRecord, AccountRepository, NewAccount};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Input for creating an account. Fields are trimmed before validation.
#[derive(Clone)]
pub struct AccountDraft {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl std::fmt::Debug for AccountDraft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountDraft")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Username derived from an email: its local part, lower-cased.
pub fn username_from_email(email: &str) -> String {
    email
        .split('@')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Parse an optional role field, empty meaning student.
pub fn parse_role(value: Option<&str>) -> ApiResult<Role> {
    match value.map(str::trim) {
        None | Some("") => Ok(Role::Student),
        Some(raw) => raw
            .parse()
            .map_err(|_| ApiError::Validation(format!("Rol inválido: {}", raw))),
    }
}

/// Validate and insert a new account with its profile.
pub async fn create_account(
    accounts: &dyn AccountRepository,
    draft: AccountDraft,
    hash_cost: u32,
) -> ApiResult<AccountRecord> {
    let name = draft.name.trim();
    let email = draft.email.trim();
    let password = draft.password.trim();

    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(ApiError::Validation(
            "Faltan campos: nombre, email, password".to_string(),
        ));
    }

    if !email.validate_email() {
        return Err(ApiError::Validation(
            "Introduzca una dirección de correo electrónico válida".to_string(),
        ));
    }

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::Validation(format!(
            "La contraseña debe tener mínimo {} caracteres",
            MIN_PASSWORD_LENGTH
        )));
    }

    if accounts.email_exists(email).await? {
        debug!("Rejected duplicate email {}", email);
        return Err(ApiError::Validation("El email ya existe".to_string()));
    }

    let username = username_from_email(email);
    if accounts.username_exists(&username).await? {
        return Err(ApiError::Validation(format!(
            "El nombre de usuario {} ya existe",
            username
        )));
    }

    let record = accounts
        .create(NewAccount {
            username,
            email: email.to_string(),
            password_hash: hash_password(password, hash_cost).await?,
            first_name: name.to_string(),
            last_name: String::new(),
            is_superuser: false,
            role: Some(draft.role),
        })
        .await
        .map_err(creation_error)?;

    info!(
        "Created account {} ({}) with role {}",
        record.account.id,
        record.account.username,
        record.role()
    );
    Ok(record)
}

/// A concurrent create can pass the existence checks and then hit the
/// unique username index. That is still a duplicate, not a server error.
fn creation_error(err: DbErr) -> ApiError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            debug!("Unique constraint hit on insert: {}", detail);
            ApiError::Validation("El email ya existe".to_string())
        }
        _ => ApiError::Database(err),
    }
}

/// Self-service registration. The confirmation must match and the new
/// account is always a student.
pub async fn signup(
    accounts: &dyn AccountRepository,
    name: String,
    email: String,
    password: String,
    password_confirm: String,
    hash_cost: u32,
) -> ApiResult<AccountRecord> {
    if password.trim() != password_confirm.trim() {
        return Err(ApiError::Validation(
            "Las contraseñas no coinciden".to_string(),
        ));
    }

    create_account(
        accounts,
        AccountDraft {
            name,
            email,
            password,
            role: Role::Student,
        },
        hash_cost,
    )
    .await
}

/// Accounts the requester may see.
pub async fn list_accounts(
    accounts: &dyn AccountRepository,
    requester: &Requester,
) -> ApiResult<Vec<AccountRecord>> {
    Ok(accounts.list(requester.visibility()).await?)
}

/// A single account, if the requester may see it.
pub async fn get_account(
    accounts: &dyn AccountRepository,
    requester: &Requester,
    id: i32,
) -> ApiResult<AccountRecord> {
    accounts
        .find_visible(id, requester.visibility())
        .await?
        .ok_or_else(|| ApiError::NotFound("Usuario no encontrado".to_string()))
}

/// Delete an account and its profile. Administrative requesters only,
/// and never a superuser. Returns the confirmation message.
pub async fn delete_account(
    accounts: &dyn AccountRepository,
    requester: &Requester,
    target_id: i32,
) -> ApiResult<String> {
    requester.authorize(ADMINISTRATIVE, "Solo administradores pueden eliminar usuarios")?;

    let target = accounts
        .find_by_id(target_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Usuario no encontrado".to_string()))?;

    policy::ensure_deletable(&target.account).inspect_err(|_| {
        warn!(
            "Account {} tried to delete superuser {}",
            requester.id(),
            target_id
        )
    })?;

    let name = target.account.display_name().to_string();
    if !accounts.delete_with_profile(target_id).await? {
        return Err(ApiError::NotFound("Usuario no encontrado".to_string()));
    }

    info!("Account {} deleted by {}", target_id, requester.id());
    Ok(format!("{} eliminado exitosamente", name))
}
