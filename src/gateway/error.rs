use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

use crate::resources::ResolveError;

/// Request-scoped gateway failures. None of them touch session history.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The structured query body did not parse.
    #[error("{0}")]
    BadRequest(String),
    /// The data source was unreachable, failed, or sent an undecodable payload.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Resolve(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            GatewayError::BadRequest(_) => "BadRequest",
            GatewayError::Resolve(ResolveError::Upstream { .. }) => "UpstreamError",
            GatewayError::Resolve(ResolveError::Decode { .. }) => "DecodeError",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.to_string(),
            "error_type": self.error_type(),
        });
        (self.status(), Json(body)).into_response()
    }
}
