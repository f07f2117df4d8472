use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use model::entities::profile::Role;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;

use crate::accounts::{self, AccountDraft};
use crate::auth::Requester;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::policy::ADMINISTRATIVE;
use crate::repository::AccountRecord;
use crate::schemas::{AppState, ErrorResponse};

/// Request body for the administrative account creation endpoint
#[derive(Deserialize, Serialize, ToSchema, Default)]
#[serde(default)]
pub struct CreateAccountRequest {
    /// Display name
    pub nombre: String,
    pub email: String,
    /// At least 8 characters
    pub password: String,
    /// `estudiante` (default), `profesor` or `administrativo`
    pub rol: Option<String>,
}

impl std::fmt::Debug for CreateAccountRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateAccountRequest")
            .field("nombre", &self.nombre)
            .field("email", &self.email)
            .field("rol", &self.rol)
            .finish_non_exhaustive()
    }
}

/// Request body for self-service registration
#[derive(Deserialize, Serialize, ToSchema, Default)]
#[serde(default)]
pub struct SignupRequest {
    pub nombre: String,
    pub email: String,
    pub password: String,
    /// Must repeat `password`
    pub password_confirm: String,
}

impl std::fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupRequest")
            .field("nombre", &self.nombre)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Account as listed to other users. The password hash is never included.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub rol: Role,
    pub rol_display: String,
    pub created_at: DateTime<Utc>,
}

impl From<AccountRecord> for AccountResponse {
    fn from(record: AccountRecord) -> Self {
        let role = record.role();
        let created_at = record.created_at();
        Self {
            id: record.account.id,
            username: record.account.username,
            email: record.account.email,
            first_name: record.account.first_name,
            last_name: record.account.last_name,
            rol: role,
            rol_display: role.label().to_string(),
            created_at,
        }
    }
}

/// Summary returned after an account is created
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatedAccountResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub nombre: String,
    pub rol: Role,
    pub rol_display: String,
    pub mensaje: String,
}

impl From<AccountRecord> for CreatedAccountResponse {
    fn from(record: AccountRecord) -> Self {
        let role = record.role();
        Self {
            id: record.account.id,
            username: record.account.username,
            email: record.account.email,
            nombre: record.account.first_name,
            rol: role,
            rol_display: role.label().to_string(),
            mensaje: "Usuario creado".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub success: bool,
    pub mensaje: String,
}

/// The caller's own identity
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    /// First name, or the username when it is blank
    pub first_name: String,
    pub last_name: String,
    pub rol: Role,
    pub rol_display: String,
}

impl From<&Requester> for MeResponse {
    fn from(requester: &Requester) -> Self {
        Self {
            id: requester.account.id,
            username: requester.account.username.clone(),
            email: requester.account.email.clone(),
            first_name: requester.account.display_name().to_string(),
            last_name: requester.account.last_name.clone(),
            rol: requester.role,
            rol_display: requester.role.label().to_string(),
        }
    }
}

/// List the accounts visible to the caller
///
/// Students see only themselves, teachers see every student and
/// administrative users see everyone.
#[utoipa::path(
    get,
    path = "/usuarios/",
    tag = "users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Visible accounts", body = Vec<AccountResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(state, requester), fields(requester = requester.id()))]
pub async fn list_users(
    State(state): State<AppState>,
    requester: Requester,
) -> ApiResult<Json<Vec<AccountResponse>>> {
    trace!("Entering list_users function");
    let records = accounts::list_accounts(state.accounts.as_ref(), &requester).await?;
    debug!("Returning {} accounts", records.len());
    Ok(Json(records.into_iter().map(AccountResponse::from).collect()))
}

/// Get one account visible to the caller
#[utoipa::path(
    get,
    path = "/usuarios/{id}/",
    tag = "users",
    security(("bearer" = [])),
    params(
        ("id" = i32, Path, description = "Account ID"),
    ),
    responses(
        (status = 200, description = "Account retrieved", body = AccountResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Account not found, not visible or id not numeric", body = ErrorResponse)
    )
)]
#[instrument(skip(state, requester), fields(requester = requester.id()))]
pub async fn get_user(
    State(state): State<AppState>,
    requester: Requester,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<AccountResponse>> {
    let record = accounts::get_account(state.accounts.as_ref(), &requester, id).await?;
    Ok(Json(AccountResponse::from(record)))
}

/// Delete an account and its profile (administrative only)
#[utoipa::path(
    delete,
    path = "/usuarios/{id}/",
    tag = "users",
    security(("bearer" = [])),
    params(
        ("id" = i32, Path, description = "Account ID"),
    ),
    responses(
        (status = 200, description = "Account deleted", body = DeleteResponse),
        (status = 400, description = "Superusers cannot be deleted", body = ErrorResponse),
        (status = 403, description = "Caller is not administrative", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, requester), fields(requester = requester.id()))]
pub async fn delete_user(
    State(state): State<AppState>,
    requester: Requester,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<DeleteResponse>> {
    let mensaje = accounts::delete_account(state.accounts.as_ref(), &requester, id).await?;
    Ok(Json(DeleteResponse {
        success: true,
        mensaje,
    }))
}

/// Create an account with any role (administrative only)
#[utoipa::path(
    post,
    path = "/crear-usuario/",
    tag = "users",
    security(("bearer" = [])),
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = CreatedAccountResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Caller is not administrative", body = ErrorResponse)
    )
)]
#[instrument(skip(state, requester), fields(requester = requester.id()))]
pub async fn create_user(
    State(state): State<AppState>,
    requester: Requester,
    ApiJson(request): ApiJson<CreateAccountRequest>,
) -> ApiResult<(StatusCode, Json<CreatedAccountResponse>)> {
    requester.authorize(ADMINISTRATIVE, "Solo administradores pueden crear usuarios")?;

    let role = accounts::parse_role(request.rol.as_deref())?;
    let record = accounts::create_account(
        state.accounts.as_ref(),
        AccountDraft {
            name: request.nombre,
            email: request.email,
            password: request.password,
            role,
        },
        state.config.password_hash_cost,
    )
    .await?;

    info!("Account {} created by {}", record.account.id, requester.id());
    Ok((StatusCode::CREATED, Json(CreatedAccountResponse::from(record))))
}

/// Register a student account
#[utoipa::path(
    post,
    path = "/registro/",
    tag = "users",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = CreatedAccountResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SignupRequest>,
) -> ApiResult<(StatusCode, Json<CreatedAccountResponse>)> {
    let record = accounts::signup(
        state.accounts.as_ref(),
        request.nombre,
        request.email,
        request.password,
        request.password_confirm,
        state.config.password_hash_cost,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(CreatedAccountResponse::from(record))))
}

/// The authenticated caller's own profile
#[utoipa::path(
    get,
    path = "/me/",
    tag = "users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller summary", body = MeResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(requester), fields(requester = requester.id()))]
pub async fn me(requester: Requester) -> Json<MeResponse> {
    Json(MeResponse::from(&requester))
}
