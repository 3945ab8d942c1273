use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::payment::ProxyResult;

pub const MALFORMED_UPSTREAM_MESSAGE: &str = "Invalid response from payment processor";
pub const REJECTED_FALLBACK_MESSAGE: &str = "Payment creation failed";

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Timed out reading request body")]
    RequestTimeout,

    #[error("{0}")]
    UpstreamUnreachable(String),

    #[error("Payment processor did not respond in time")]
    UpstreamTimeout,

    #[error("{}", MALFORMED_UPSTREAM_MESSAGE)]
    UpstreamMalformedResponse,

    #[error("{0}")]
    UpstreamRejected(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            ProxyError::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::UpstreamMalformedResponse => StatusCode::INTERNAL_SERVER_ERROR,
            // The page still gets a well-formed ProxyResult and reads `success`.
            ProxyError::UpstreamRejected(_) => StatusCode::OK,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to the browser.
    pub fn public_message(&self) -> String {
        match self {
            ProxyError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), Json(ProxyResult::failed(self.public_message()))).into_response()
    }
}
