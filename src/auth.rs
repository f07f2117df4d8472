//! Authentication: password hashing, signed session tokens and the
//! [`Requester`] extractor that turns a bearer token into an identity.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use model::entities::{account, profile, profile::Role};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use utoipa::ToSchema;

use crate::error::{ApiError, ApiResult};
use crate::policy::{self, Visibility};
use crate::repository::AccountRepository;
use crate::schemas::AppState;

/// Kind of a session token. Access tokens authenticate requests,
/// refresh tokens only mint new access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims carried by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: String,
    pub username: String,
    pub token_type: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiry (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn account_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}

/// Access and refresh token pair returned by a successful login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Issues and verifies HS256 session tokens.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn issue(&self, account: &account::Model, kind: TokenKind) -> ApiResult<String> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: account.id.to_string(),
            username: account.username.clone(),
            token_type: kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        self.encode(&claims)
    }

    pub fn issue_pair(&self, account: &account::Model) -> ApiResult<TokenPair> {
        Ok(TokenPair {
            access: self.issue(account, TokenKind::Access)?,
            refresh: self.issue(account, TokenKind::Refresh)?,
        })
    }

    fn encode(&self, claims: &Claims) -> ApiResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("failed to sign token: {}", e)))
    }

    /// Check signature, expiry and kind of a token.
    pub fn verify(&self, token: &str, expected: TokenKind) -> ApiResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!("Rejected token: {}", e);
            ApiError::InvalidToken
        })?;

        if data.claims.token_type != expected {
            debug!(
                "Rejected {:?} token where {:?} was expected",
                data.claims.token_type, expected
            );
            return Err(ApiError::InvalidToken);
        }
        Ok(data.claims)
    }
}

/// Hash a password with bcrypt on the blocking pool.
pub async fn hash_password(password: &str, cost: u32) -> ApiResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))
}

/// Compare a password with a stored bcrypt hash. Malformed hashes never match.
pub async fn verify_password(password: &str, hash: &str) -> bool {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

/// Log in with a username or an email.
///
/// When `identifier` is the email of an existing account, that account's
/// username is used; otherwise `identifier` is taken as the username. Every
/// failure is reported as the same `InvalidCredentials`.
pub async fn login(
    accounts: &dyn AccountRepository,
    tokens: &TokenService,
    identifier: &str,
    password: &str,
) -> ApiResult<TokenPair> {
    let identifier = identifier.trim();
    if identifier.is_empty() || password.is_empty() {
        return Err(ApiError::Validation(
            "Los campos username_or_email y password son obligatorios".to_string(),
        ));
    }

    let username = match accounts.find_by_email(identifier).await? {
        Some(record) => {
            trace!("Identifier matched an email, using username {}", record.account.username);
            record.account.username
        }
        None => identifier.to_string(),
    };

    let Some(record) = accounts.find_by_username(&username).await? else {
        warn!("Login failed: unknown identifier");
        return Err(ApiError::InvalidCredentials);
    };

    if !record.account.is_active || !verify_password(password, &record.account.password_hash).await {
        warn!("Login failed for account {}", record.account.id);
        return Err(ApiError::InvalidCredentials);
    }

    debug!("Account {} logged in", record.account.id);
    tokens.issue_pair(&record.account)
}

/// Mint a new access token from a refresh token.
///
/// The account must still exist and be active.
pub async fn refresh(
    accounts: &dyn AccountRepository,
    tokens: &TokenService,
    refresh_token: &str,
) -> ApiResult<String> {
    let claims = tokens.verify(refresh_token, TokenKind::Refresh)?;
    let account_id = claims.account_id().ok_or(ApiError::InvalidToken)?;

    match accounts.find_by_id(account_id).await? {
        Some(record) if record.account.is_active => {
            tokens.issue(&record.account, TokenKind::Access)
        }
        _ => Err(ApiError::InvalidToken),
    }
}

/// The authenticated caller of a request.
///
/// Extracting it requires `Authorization: Bearer <access token>`; the
/// account is reloaded so deleted or deactivated accounts lose access
/// immediately.
#[derive(Debug, Clone)]
pub struct Requester {
    pub account: account::Model,
    pub profile: Option<profile::Model>,
    pub role: Role,
}

impl Requester {
    pub fn id(&self) -> i32 {
        self.account.id
    }

    /// Fail with `Forbidden(message)` unless the requester holds one of `allowed`.
    pub fn authorize(&self, allowed: &[Role], message: &str) -> ApiResult<()> {
        policy::authorize(self.role, allowed, message).inspect_err(|_| {
            warn!(
                "Account {} with role {} denied: {}",
                self.account.id, self.role, message
            )
        })
    }

    pub fn visibility(&self) -> Visibility {
        Visibility::for_requester(self.account.id, self.role)
    }
}

fn bearer_token(parts: &Parts) -> ApiResult<&str> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(ApiError::Unauthenticated)?;
    let value = header.to_str().map_err(|_| ApiError::InvalidToken)?;

    let mut split = value.splitn(2, ' ');
    match (split.next(), split.next()) {
        (Some(scheme), Some(token)) if scheme.eq_ignore_ascii_case("bearer") => {
            Ok(token.trim())
        }
        _ => Err(ApiError::InvalidToken),
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Requester {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.tokens.verify(token, TokenKind::Access)?;
        let account_id = claims.account_id().ok_or(ApiError::InvalidToken)?;

        let record = match state.accounts.find_by_id(account_id).await? {
            Some(record) if record.account.is_active => record,
            _ => {
                debug!("Token for missing or inactive account {}", account_id);
                return Err(ApiError::InvalidToken);
            }
        };

        let role = record.role();
        trace!("Authenticated account {} as {}", record.account.id, role);
        Ok(Requester {
            account: record.account,
            profile: record.profile,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{NewAccount, SeaOrmAccountRepository};
    use crate::test_utils::test_utils::setup_test_db;

    fn service() -> TokenService {
        TokenService::new(b"test-secret", Duration::hours(24), Duration::days(7))
    }

    fn account(id: i32) -> account::Model {
        account::Model {
            id,
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: String::new(),
            first_name: "Ana".to_string(),
            last_name: String::new(),
            is_superuser: false,
            is_active: true,
            date_joined: Utc::now(),
        }
    }

    async fn repo_with_account(password: &str) -> SeaOrmAccountRepository {
        let repo = SeaOrmAccountRepository::new(setup_test_db().await);
        repo.create(NewAccount {
            username: "ana".to_string(),
            email: "ana.perez@escuela.edu".to_string(),
            password_hash: hash_password(password, 4).await.unwrap(),
            first_name: "Ana".to_string(),
            last_name: String::new(),
            is_superuser: false,
            role: Some(Role::Student),
        })
        .await
        .unwrap();
        repo
    }

    #[test]
    fn issued_tokens_verify() {
        let tokens = service();
        let pair = tokens.issue_pair(&account(7)).unwrap();

        let access = tokens.verify(&pair.access, TokenKind::Access).unwrap();
        assert_eq!(access.account_id(), Some(7));
        assert_eq!(access.username, "ana");
        assert_eq!(access.exp - access.iat, 24 * 3600);

        let refresh = tokens.verify(&pair.refresh, TokenKind::Refresh).unwrap();
        assert_eq!(refresh.exp - refresh.iat, 7 * 24 * 3600);
    }

    #[test]
    fn token_kinds_are_not_interchangeable() {
        let tokens = service();
        let pair = tokens.issue_pair(&account(7)).unwrap();

        assert!(matches!(
            tokens.verify(&pair.refresh, TokenKind::Access),
            Err(ApiError::InvalidToken)
        ));
        assert!(matches!(
            tokens.verify(&pair.access, TokenKind::Refresh),
            Err(ApiError::InvalidToken)
        ));
    }

    #[test]
    fn expired_and_tampered_tokens_are_rejected() {
        let tokens = service();
        let now = Utc::now().timestamp();
        let expired = tokens
            .encode(&Claims {
                sub: "7".to_string(),
                username: "ana".to_string(),
                token_type: TokenKind::Access,
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();
        assert!(matches!(
            tokens.verify(&expired, TokenKind::Access),
            Err(ApiError::InvalidToken)
        ));

        let other = TokenService::new(b"other-secret", Duration::hours(1), Duration::days(1));
        let foreign = other.issue(&account(7), TokenKind::Access).unwrap();
        assert!(tokens.verify(&foreign, TokenKind::Access).is_err());
        assert!(tokens.verify("not.a.token", TokenKind::Access).is_err());
    }

    #[tokio::test]
    async fn password_hash_roundtrip() {
        let hash = hash_password("abcd1234", 4).await.unwrap();
        assert_ne!(hash, "abcd1234");
        assert!(verify_password("abcd1234", &hash).await);
        assert!(!verify_password("abcd1235", &hash).await);
        assert!(!verify_password("abcd1234", "garbage").await);
    }

    #[tokio::test]
    async fn login_accepts_username_or_email() {
        let repo = repo_with_account("abcd1234").await;
        let tokens = service();

        let by_username = login(&repo, &tokens, "ana", "abcd1234").await.unwrap();
        let by_email = login(&repo, &tokens, "ana.perez@escuela.edu", "abcd1234")
            .await
            .unwrap();

        let a = tokens.verify(&by_username.access, TokenKind::Access).unwrap();
        let b = tokens.verify(&by_email.access, TokenKind::Access).unwrap();
        assert_eq!(a.sub, b.sub);
    }

    #[tokio::test]
    async fn login_failures_look_the_same() {
        let repo = repo_with_account("abcd1234").await;
        let tokens = service();

        for (identifier, password) in [
            ("ana", "wrong-password"),
            ("ana.perez@escuela.edu", "wrong-password"),
            ("nobody", "abcd1234"),
            ("nobody@escuela.edu", "abcd1234"),
        ] {
            let err = login(&repo, &tokens, identifier, password).await.unwrap_err();
            assert!(matches!(err, ApiError::InvalidCredentials), "{identifier}");
        }
    }

    #[tokio::test]
    async fn refresh_mints_access_token() {
        let repo = repo_with_account("abcd1234").await;
        let tokens = service();
        let pair = login(&repo, &tokens, "ana", "abcd1234").await.unwrap();

        let access = refresh(&repo, &tokens, &pair.refresh).await.unwrap();
        assert!(tokens.verify(&access, TokenKind::Access).is_ok());

        assert!(matches!(
            refresh(&repo, &tokens, &pair.access).await,
            Err(ApiError::InvalidToken)
        ));
        assert!(matches!(
            refresh(&repo, &tokens, "garbage").await,
            Err(ApiError::InvalidToken)
        ));
    }
}
