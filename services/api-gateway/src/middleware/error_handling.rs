use axum::{
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

use bomforge_utils::{BomForgeError, ErrorResponse};

/// Handler-facing error; renders a `BomForgeError` as its JSON body.
#[derive(Debug)]
pub struct ApiError(pub BomForgeError);

impl<E: Into<BomForgeError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, code = self.0.error_code(), "Request failed");
        } else {
            tracing::debug!(error = %self.0, code = self.0.error_code(), "Request rejected");
        }
        (status, Json(ErrorResponse::from(self.0))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Logs server errors that escape handlers without an `ApiError` body.
pub async fn error_handling_middleware(request: Request<axum::body::Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let response = next.run(request).await;

    if response.status().is_server_error() {
        tracing::warn!(%method, %uri, status = %response.status(), "Server error response");
    }
    response
}
