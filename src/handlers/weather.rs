use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use common::WeatherReading;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::auth::Requester;
use crate::config::WEATHER_CSV_FILE;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::policy::STAFF;
use crate::schemas::{AppState, ErrorResponse};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SaveWeatherRequest {
    /// Rows keyed by column name: id, temperatura, humedad, lluvia, uv, fecha
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub datos: Vec<Map<String, Value>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaveWeatherResponse {
    pub success: bool,
    pub message: String,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WeatherRowsResponse {
    pub success: bool,
    pub total: usize,
    pub datos: Vec<WeatherReading>,
}

/// Append a batch of weather rows
#[utoipa::path(
    post,
    path = "/clima/guardar/",
    tag = "weather",
    security(("bearer" = [])),
    request_body = SaveWeatherRequest,
    responses(
        (status = 201, description = "Rows appended", body = SaveWeatherResponse),
        (status = 400, description = "No rows supplied", body = ErrorResponse),
        (status = 403, description = "Caller is a student", body = ErrorResponse)
    )
)]
#[instrument(skip(state, requester, request), fields(requester = requester.id()))]
pub async fn save_weather(
    State(state): State<AppState>,
    requester: Requester,
    ApiJson(request): ApiJson<SaveWeatherRequest>,
) -> ApiResult<(StatusCode, Json<SaveWeatherResponse>)> {
    requester.authorize(STAFF, "No tienes permiso")?;

    if request.datos.is_empty() {
        warn!("Weather save called without rows");
        return Err(ApiError::Validation("No hay datos para guardar".to_string()));
    }

    let rows: Vec<WeatherReading> = request
        .datos
        .iter()
        .map(WeatherReading::from_payload)
        .collect();
    let total = state.weather_log.append(rows).await?;
    info!("{} weather rows saved", total);

    Ok((
        StatusCode::CREATED,
        Json(SaveWeatherResponse {
            success: true,
            message: format!("{} registros guardados", total),
            total,
        }),
    ))
}

/// Read back every stored weather row
#[utoipa::path(
    get,
    path = "/clima/leer/",
    tag = "weather",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Stored rows", body = WeatherRowsResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(state, requester), fields(requester = requester.id()))]
pub async fn read_weather(
    State(state): State<AppState>,
    requester: Requester,
) -> ApiResult<Json<WeatherRowsResponse>> {
    let datos: Vec<WeatherReading> = state.weather_log.read().await?;
    Ok(Json(WeatherRowsResponse {
        success: true,
        total: datos.len(),
        datos,
    }))
}

/// Download the weather log as a CSV attachment
#[utoipa::path(
    get,
    path = "/clima/descargar/",
    tag = "weather",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 404, description = "Nothing stored yet", body = ErrorResponse)
    )
)]
#[instrument(skip(state, requester), fields(requester = requester.id()))]
pub async fn download_weather(
    State(state): State<AppState>,
    requester: Requester,
) -> ApiResult<impl IntoResponse> {
    let bytes = state
        .weather_log
        .read_raw()
        .await?
        .ok_or_else(|| ApiError::NotFound("El archivo no existe aún".to_string()))?;

    let disposition = format!("attachment; filename=\"{}\"", WEATHER_CSV_FILE);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}
