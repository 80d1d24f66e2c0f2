//! Reading API handlers
//!
//! POST /readings/upload, PATCH /readings/confirm/{id},
//! GET /readings/{customer_code}/list
//!
//! Handlers validate request shape (field presence, kind, timestamp) and
//! delegate to the workflows; everything past the boundary works with typed
//! values.

use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{customers, readings};
use crate::error::{ApiError, ApiResult};
use crate::models::MeasureKind;
use crate::workflow::{self, Submission};
use crate::AppState;

const INCOMPLETE_DATA: &str = "Incomplete or invalid data";

/// POST /readings/upload request
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub image: Option<String>,
    pub customer_code: Option<String>,
    pub measure_type: Option<String>,
    pub measure_datetime: Option<String>,
}

/// POST /readings/upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub image_url: String,
    pub measure_value: f64,
    pub measure_uuid: Uuid,
}

/// POST /readings/upload
pub async fn upload_reading(
    State(state): State<AppState>,
    Json(request): Json<UploadRequest>,
) -> ApiResult<Json<UploadResponse>> {
    let submission = validate_upload(request)?;

    let result = workflow::ingest_reading(
        &state.db,
        state.recognition.as_ref(),
        &state.staging,
        submission,
    )
    .await?;

    Ok(Json(UploadResponse {
        image_url: result.image_url,
        measure_value: result.measure_value,
        measure_uuid: result.measure_uuid,
    }))
}

/// Field presence and shape checks for an upload request
fn validate_upload(request: UploadRequest) -> Result<Submission, ApiError> {
    let invalid = || ApiError::InvalidData(INCOMPLETE_DATA.to_string());

    let image = request.image.filter(|s| !s.is_empty()).ok_or_else(invalid)?;
    let customer_code = request
        .customer_code
        .filter(|s| !s.is_empty())
        .ok_or_else(invalid)?;

    let measure_type = request
        .measure_type
        .as_deref()
        .and_then(MeasureKind::parse_exact)
        .ok_or_else(invalid)?;

    let measure_datetime = request
        .measure_datetime
        .as_deref()
        .and_then(|raw| chrono::DateTime::parse_from_rfc3339(raw).ok())
        .map(|ts| ts.with_timezone(&chrono::Utc))
        .ok_or_else(invalid)?;

    Ok(Submission {
        image,
        customer_code,
        measure_type,
        measure_datetime,
    })
}

/// PATCH /readings/confirm/{id} request
#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub confirmed_value: Option<f64>,
}

/// PATCH /readings/confirm/{id} response
#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub success: bool,
}

/// PATCH /readings/confirm/{id}
pub async fn confirm_reading(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ConfirmRequest>,
) -> ApiResult<Json<ConfirmResponse>> {
    let confirmed_value = request
        .confirmed_value
        .ok_or_else(|| ApiError::InvalidData(INCOMPLETE_DATA.to_string()))?;

    workflow::confirm_reading(&state.db, &id, confirmed_value).await?;

    Ok(Json(ConfirmResponse { success: true }))
}

/// GET /readings/{customer_code}/list query parameters
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub measure_type: Option<String>,
}

/// One listed reading
#[derive(Debug, Serialize)]
pub struct MeasureSummary {
    pub measure_uuid: Uuid,
    pub measure_datetime: String,
    pub measure_type: String,
    pub has_confirmed: bool,
    pub image_url: String,
}

/// GET /readings/{customer_code}/list response
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub customer_code: String,
    pub measures: Vec<MeasureSummary>,
}

/// GET /readings/{customer_code}/list
pub async fn list_readings(
    State(state): State<AppState>,
    Path(customer_code): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListResponse>> {
    // Absent and empty filters both mean "all kinds"; a non-empty value must
    // name a kind, case-insensitively.
    let filter = match query.measure_type.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            MeasureKind::parse_filter(raw)
                .ok_or_else(|| ApiError::InvalidType(raw.to_string()))?,
        ),
    };

    // Unknown customer and known customer with no matching readings are the
    // same condition for callers.
    let customer = customers::find_by_code(&state.db, &customer_code)
        .await?
        .ok_or(ApiError::MeasuresNotFound)?;

    let listed = readings::list_for_customer(&state.db, customer.guid, filter).await?;
    if listed.is_empty() {
        return Err(ApiError::MeasuresNotFound);
    }

    let measures = listed
        .into_iter()
        .map(|reading| MeasureSummary {
            measure_uuid: reading.guid,
            measure_datetime: umr_common::time::to_db(&reading.measure_datetime),
            measure_type: reading.measure_type.as_str().to_string(),
            has_confirmed: reading.confirmed,
            image_url: reading.image_url,
        })
        .collect();

    Ok(Json(ListResponse {
        customer_code,
        measures,
    }))
}

/// Build reading routes
pub fn readings_routes() -> Router<AppState> {
    Router::new()
        .route("/readings/upload", post(upload_reading))
        .route("/readings/confirm/:id", patch(confirm_reading))
        .route("/readings/:customer_code/list", get(list_readings))
}
