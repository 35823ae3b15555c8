//! HTTP handlers for billing-service.

pub mod invoices;
pub mod payments;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;

use crate::services::get_metrics;
use crate::services::metrics::{ERRORS_TOTAL, HTTP_REQUESTS_TOTAL};

/// Count the outcome of one handler call: a request counter labelled by
/// route and ok/error, plus an error counter by class on failure.
pub(crate) fn record_request<T>(route: &'static str, result: &Result<T, AppError>) {
    let status = if result.is_ok() { "ok" } else { "error" };
    HTTP_REQUESTS_TOTAL.with_label_values(&[route, status]).inc();
    if let Err(err) = result {
        ERRORS_TOTAL.with_label_values(&[error_type(err)]).inc();
    }
}

fn error_type(err: &AppError) -> &'static str {
    match err {
        AppError::ValidationError(_) | AppError::BadRequest(_) => "validation_error",
        AppError::NotFound(_) => "not_found",
        AppError::Conflict(_) => "conflict",
        AppError::DatabaseError(_) => "db_error",
        _ => "internal_error",
    }
}

/// Health check endpoint for liveness probes.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "billing-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Prometheus metrics endpoint.
pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_counter_tracks_ok_and_error_outcomes() {
        let ok_before = HTTP_REQUESTS_TOTAL
            .with_label_values(&["test_route", "ok"])
            .get();
        let err_before = HTTP_REQUESTS_TOTAL
            .with_label_values(&["test_route", "error"])
            .get();
        let not_found_before = ERRORS_TOTAL.with_label_values(&["not_found"]).get();

        record_request("test_route", &Ok::<_, AppError>(()));
        record_request::<()>(
            "test_route",
            &Err(AppError::NotFound(anyhow::anyhow!("missing"))),
        );

        let ok_after = HTTP_REQUESTS_TOTAL
            .with_label_values(&["test_route", "ok"])
            .get();
        let err_after = HTTP_REQUESTS_TOTAL
            .with_label_values(&["test_route", "error"])
            .get();
        let not_found_after = ERRORS_TOTAL.with_label_values(&["not_found"]).get();

        assert_eq!(ok_after, ok_before + 1.0);
        assert_eq!(err_after, err_before + 1.0);
        assert_eq!(not_found_after, not_found_before + 1.0);
    }

    #[test]
    fn errors_are_classified_by_variant() {
        assert_eq!(
            error_type(&AppError::BadRequest(anyhow::anyhow!("bad"))),
            "validation_error"
        );
        assert_eq!(
            error_type(&AppError::NotFound(anyhow::anyhow!("missing"))),
            "not_found"
        );
        assert_eq!(
            error_type(&AppError::Conflict(anyhow::anyhow!("dup"))),
            "conflict"
        );
        assert_eq!(
            error_type(&AppError::DatabaseError(anyhow::anyhow!("db"))),
            "db_error"
        );
        assert_eq!(error_type(&AppError::ServiceUnavailable), "internal_error");
    }
}
