use axum::{extract::State, http::StatusCode, response::Json};
use common::CropReading;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use crate::auth::Requester;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::policy::STAFF;
use crate::schemas::{AppState, ErrorResponse};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaveResponse {
    pub success: bool,
    pub mensaje: String,
}

/// Append one crop viability reading to the CSV log
///
/// Missing measurement keys are written as empty cells and missing crop
/// flags default to `No`. The date is read from the `fecha` key.
#[utoipa::path(
    post,
    path = "/guardar-datos-csv/",
    tag = "readings",
    security(("bearer" = [])),
    request_body = CropReading,
    responses(
        (status = 201, description = "Reading appended", body = SaveResponse),
        (status = 400, description = "Body is not a JSON object", body = ErrorResponse),
        (status = 403, description = "Caller is a student", body = ErrorResponse),
        (status = 500, description = "CSV file could not be written", body = ErrorResponse)
    )
)]
#[instrument(skip(state, requester, payload), fields(requester = requester.id()))]
pub async fn save_crop_reading(
    State(state): State<AppState>,
    requester: Requester,
    ApiJson(payload): ApiJson<Value>,
) -> ApiResult<(StatusCode, Json<SaveResponse>)> {
    requester.authorize(STAFF, "No tienes permiso")?;

    let Value::Object(fields) = payload else {
        return Err(ApiError::Validation(
            "El cuerpo debe ser un objeto JSON".to_string(),
        ));
    };
    let reading = CropReading::from_payload(&fields);
    debug!("Crop reading for date {:?}", reading.date);

    state.crop_log.append(vec![reading]).await?;
    info!(
        "Crop reading saved to {} by {}",
        state.crop_log.path().display(),
        requester.id()
    );

    Ok((
        StatusCode::CREATED,
        Json(SaveResponse {
            success: true,
            mensaje: "Datos guardados en CSV".to_string(),
        }),
    ))
}
