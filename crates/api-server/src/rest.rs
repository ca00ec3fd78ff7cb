//! REST API handlers for segmentation strategies and operational endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use audience_core::types::{MatchInput, SegmentationRequest, StrategyResult};
use audience_core::AudienceError;
use audience_segmentation::{SegmentationEngine, ToolRegistry};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};
use utoipa::ToSchema;

/// Maximum number of filters per strategy request.
const MAX_FILTERS: usize = 50;

/// Maximum string field length (filter field names and match values).
const MAX_FIELD_LEN: usize = 256;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SegmentationEngine>,
    pub tools: Arc<ToolRegistry>,
    pub node_id: String,
    pub start_time: Instant,
}

/// Validate a strategy request at the API boundary.
fn validate_strategy_request(request: &SegmentationRequest) -> Result<(), &'static str> {
    let Some(filters) = &request.filters else {
        return Ok(());
    };
    if filters.len() > MAX_FILTERS {
        return Err("request exceeds maximum number of filters");
    }
    for filter in filters {
        if filter.field.len() > MAX_FIELD_LEN {
            return Err("filter 'field' exceeds maximum length");
        }
        let too_long = match &filter.match_values {
            Some(MatchInput::One(v)) => v.len() > MAX_FIELD_LEN,
            Some(MatchInput::Many(vs)) => {
                vs.iter().any(|v| v.len() > MAX_FIELD_LEN)
            }
            None => false,
        };
        if too_long {
            return Err("filter 'match' value exceeds maximum length");
        }
    }
    Ok(())
}

/// POST /v1/segments/strategy: Build a coverage-maximizing segment strategy.
#[utoipa::path(
    post,
    path = "/v1/segments/strategy",
    tag = "Segmentation",
    request_body = SegmentationRequest,
    responses(
        (status = 200, description = "Selected segments and coverage", body = StrategyResult),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Population could not be loaded", body = ErrorResponse),
    )
)]
pub async fn handle_strategy(
    State(state): State<AppState>,
    Json(request): Json<SegmentationRequest>,
) -> Result<Json<StrategyResult>, (StatusCode, Json<ErrorResponse>)> {
    if let Err(msg) = validate_strategy_request(&request) {
        warn!(error = msg, "Strategy request validation failed");
        metrics::counter!("api.validation_errors").increment(1);
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "invalid_strategy_request".to_string(),
                message: msg.to_string(),
            }),
        ));
    }

    match state.engine.plan(request).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => Err(error_response(e, "strategy_failed")),
    }
}

/// Map an engine error onto an HTTP status and body.
pub fn error_response(err: AudienceError, code: &str) -> (StatusCode, Json<ErrorResponse>) {
    if err.is_client_error() {
        warn!(error = %err, "Rejected request");
        metrics::counter!("api.validation_errors").increment(1);
        let status = match &err {
            AudienceError::ToolNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        };
        return (
            status,
            Json(ErrorResponse {
                error: code.to_string(),
                message: err.to_string(),
            }),
        );
    }

    error!(error = %err, "Segmentation failed");
    metrics::counter!("api.errors").increment(1);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: code.to_string(),
            message: "Internal processing error".to_string(),
        }),
    )
}

/// GET /health: Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Operations",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        tools: state.tools.len(),
    })
}

/// GET /ready: Readiness probe. Ready once at least one tool is registered.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Operations",
    responses(
        (status = 200, description = "Ready to serve"),
        (status = 503, description = "Not ready"),
    )
)]
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.tools.is_empty() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

/// GET /live: Liveness probe.
#[utoipa::path(
    get,
    path = "/live",
    tag = "Operations",
    responses((status = 200, description = "Process is alive"))
)]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
    pub tools: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use audience_core::types::FilterInput;

    #[test]
    fn test_validation_limits() {
        assert!(validate_strategy_request(&SegmentationRequest::default()).is_ok());

        let too_many = SegmentationRequest {
            filters: Some(vec![FilterInput::default(); MAX_FILTERS + 1]),
            ..Default::default()
        };
        assert!(validate_strategy_request(&too_many).is_err());

        let long_value = SegmentationRequest {
            filters: Some(vec![FilterInput {
                field: "country".to_string(),
                match_values: Some(MatchInput::Many(vec!["x".repeat(MAX_FIELD_LEN + 1)])),
                ..Default::default()
            }]),
            ..Default::default()
        };
        assert!(validate_strategy_request(&long_value).is_err());
    }

    #[test]
    fn test_error_status_mapping() {
        let (status, _) = error_response(AudienceError::Validation("bad".into()), "x");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = error_response(AudienceError::ToolNotFound("t".into()), "x");
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, body) = error_response(AudienceError::Population("down".into()), "x");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.0.message, "Internal processing error");
    }
}
