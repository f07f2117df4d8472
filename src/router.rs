use crate::handlers::{
    auth::{obtain_token, refresh_token},
    health::health_check,
    readings::save_crop_reading,
    users::{create_user, delete_user, get_user, list_users, me, signup},
    weather::{download_weather, read_weather, save_weather},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins());

    let mut router = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Tokens
        .route("/token/", post(obtain_token))
        .route("/token/refresh/", post(refresh_token))
        // Accounts
        .route("/usuarios/", get(list_users))
        .route("/usuarios/:id/", get(get_user).delete(delete_user))
        .route("/crear-usuario/", post(create_user))
        .route("/registro/", post(signup))
        .route("/me/", get(me))
        // Crop viability log
        .route("/guardar-datos-csv/", post(save_crop_reading));

    if state.config.weather_endpoints {
        router = router
            .route("/clima/guardar/", post(save_weather))
            .route("/clima/leer/", get(read_weather))
            .route("/clima/descargar/", get(download_weather));
    }

    router
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(cors),
        )
        .with_state(state)
}

/// CORS restricted to the configured origins, with credentials allowed.
/// An empty list falls back to a permissive layer.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

