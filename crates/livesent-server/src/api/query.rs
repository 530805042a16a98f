use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use livesent_core::LocationQuery;
use livesent_pipeline::AggregatedResponse;

use crate::middleware::RequestId;

use super::{map_pipeline_error, ApiError, ApiResponse, AppState, ResponseMeta};

pub(super) async fn run_query(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<LocationQuery>, JsonRejection>,
) -> Result<Json<ApiResponse<AggregatedResponse>>, ApiError> {
    let Json(query) =
        body.map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.body_text()))?;

    tracing::info!(
        request_id = %req_id.0,
        location = %query.location,
        days_ago = ?query.days_ago,
        "running location query"
    );

    let data = state
        .service
        .run(&query)
        .await
        .map_err(|e| map_pipeline_error(req_id.0.clone(), &e))?;

    tracing::info!(
        request_id = %req_id.0,
        location = %data.location,
        mood = %data.dominant_mood,
        articles = data.total_articles,
        "location query complete"
    );

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
