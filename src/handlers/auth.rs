use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use crate::auth::{self, TokenPair};
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::schemas::{AppState, ErrorResponse};

/// Login request. `username` is accepted as an alias of `username_or_email`.
#[derive(Deserialize, Serialize, ToSchema)]
pub struct LoginRequest {
    /// Username or email of the account
    #[serde(alias = "username")]
    pub username_or_email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username_or_email", &self.username_or_email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct RefreshResponse {
    pub access: String,
}

/// Log in with username or email
#[utoipa::path(
    post,
    path = "/token/",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair issued", body = TokenPair),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn obtain_token(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<TokenPair>> {
    debug!("Login attempt");
    let pair = auth::login(
        state.accounts.as_ref(),
        &state.tokens,
        &request.username_or_email,
        &request.password,
    )
    .await?;
    info!("Token pair issued");
    Ok(Json(pair))
}

/// Exchange a refresh token for a new access token
#[utoipa::path(
    post,
    path = "/token/refresh/",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Access token issued", body = RefreshResponse),
        (status = 401, description = "Invalid or expired refresh token", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn refresh_token(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access = auth::refresh(state.accounts.as_ref(), &state.tokens, &request.refresh).await?;
    Ok(Json(RefreshResponse { access }))
}
