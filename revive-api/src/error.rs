use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use revive_core::CoreError;
use revive_shared::models::UnavailableItem;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    AuthenticationError(String),
    #[error("{0}")]
    AuthorizationError(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    NotFoundError(String),
    #[error("{0}")]
    ConflictError(String),
    #[error("{} cart item(s) unavailable", .0.len())]
    CheckoutRejected(Vec<UnavailableItem>),
    #[error("{0}")]
    PaymentError(String),
    #[error("{0}")]
    InternalServerError(String),
    /// Money moved before `inner` happened; the caller needs the charge ids.
    #[error("{inner} (after charge(s) {})", charge_ids.join(", "))]
    PartiallyApplied {
        inner: Box<AppError>,
        charge_ids: Vec<String>,
    },
}

impl AppError {
    fn parts(self) -> (StatusCode, serde_json::Value) {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::CheckoutRejected(items) => {
                let body = json!({
                    "error": "some cart items are no longer available",
                    "unavailable_items": items,
                });
                return (StatusCode::CONFLICT, body);
            }
            AppError::PaymentError(msg) => (StatusCode::PAYMENT_REQUIRED, msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
            AppError::PartiallyApplied { inner, charge_ids } => {
                tracing::warn!("Request failed after charge(s) {}", charge_ids.join(", "));
                let (status, mut body) = inner.parts();
                body["partially_applied"] = json!(true);
                body["charge_ids"] = json!(charge_ids);
                return (status, body);
            }
        };

        (status, json!({ "error": error_message }))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.parts();
        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(msg) => AppError::NotFoundError(msg),
            CoreError::Unauthorized(msg) => AppError::AuthenticationError(msg),
            CoreError::Forbidden(msg) => AppError::AuthorizationError(msg),
            CoreError::Conflict(msg) => AppError::ConflictError(msg),
            CoreError::Validation(msg) => AppError::ValidationError(msg),
            CoreError::CheckoutRejected { unavailable } => AppError::CheckoutRejected(unavailable),
            CoreError::PaymentFailed(msg) => AppError::PaymentError(msg),
            CoreError::Persistence(msg) | CoreError::Internal(msg) => AppError::InternalServerError(msg),
            CoreError::PartiallyApplied { charge_ids, source } => AppError::PartiallyApplied {
                inner: Box::new(AppError::from(*source)),
                charge_ids,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_status_codes() {
        let cases = [
            (CoreError::NotFound("bundle".into()), StatusCode::NOT_FOUND),
            (CoreError::Unauthorized("owner".into()), StatusCode::UNAUTHORIZED),
            (CoreError::Forbidden("role".into()), StatusCode::FORBIDDEN),
            (CoreError::Conflict("taken".into()), StatusCode::CONFLICT),
            (CoreError::Validation("price".into()), StatusCode::BAD_REQUEST),
            (CoreError::PaymentFailed("declined".into()), StatusCode::PAYMENT_REQUIRED),
            (CoreError::Persistence("pool".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (CoreError::CheckoutRejected { unavailable: vec![] }, StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_partially_applied_keeps_status_and_lists_charges() {
        let err = CoreError::after_charges(
            vec!["ch_1".to_string(), "ch_2".to_string()],
            CoreError::Conflict("bundle not available".into()),
        );

        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "bundle not available");
        assert_eq!(body["partially_applied"], true);
        assert_eq!(body["charge_ids"], json!(["ch_1", "ch_2"]));
    }
}
