use common::{CropReading, WeatherReading};
use model::entities::profile::Role;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa::ToSchema;

use crate::auth::{TokenPair, TokenService};
use crate::config::AppConfig;
use crate::csv_log::CsvLog;
use crate::handlers::{
    auth::{LoginRequest, RefreshRequest, RefreshResponse},
    readings::SaveResponse,
    users::{
        AccountResponse, CreateAccountRequest, CreatedAccountResponse, DeleteResponse,
        MeResponse, SignupRequest,
    },
    weather::{SaveWeatherRequest, SaveWeatherResponse, WeatherRowsResponse},
};
use crate::repository::AccountRepository;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection, used directly only for health checks
    pub db: DatabaseConnection,
    /// Identity store
    pub accounts: Arc<dyn AccountRepository>,
    pub tokens: Arc<TokenService>,
    /// Crop viability log
    pub crop_log: Arc<CsvLog>,
    /// Weather log
    pub weather_log: Arc<CsvLog>,
    pub config: Arc<AppConfig>,
}

/// Error response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::obtain_token,
        crate::handlers::auth::refresh_token,
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::delete_user,
        crate::handlers::users::create_user,
        crate::handlers::users::signup,
        crate::handlers::users::me,
        crate::handlers::readings::save_crop_reading,
        crate::handlers::weather::save_weather,
        crate::handlers::weather::read_weather,
        crate::handlers::weather::download_weather,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            LoginRequest,
            TokenPair,
            RefreshRequest,
            RefreshResponse,
            AccountResponse,
            CreateAccountRequest,
            CreatedAccountResponse,
            SignupRequest,
            DeleteResponse,
            MeResponse,
            Role,
            SaveResponse,
            CropReading,
            WeatherReading,
            SaveWeatherRequest,
            SaveWeatherResponse,
            WeatherRowsResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Login and token refresh"),
        (name = "users", description = "Account management"),
        (name = "readings", description = "Crop viability log"),
        (name = "weather", description = "Weather log (disabled by default)"),
    ),
    info(
        title = "Estacion API",
        description = "Weather station platform backend: accounts, roles and CSV data logs",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;

/// Registers the bearer token scheme referenced by the protected paths.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
