use axum::{
    body::{to_bytes, Body, Bytes},
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use http_body_util::LengthLimitError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::ProxyError;
use crate::models::payment::{PaymentRequest, ProxyResult};
use crate::services::PaymentService;

pub const MAX_BODY_BYTES: usize = 64 * 1024;

pub async fn create_payment(
    State(service): State<Arc<PaymentService>>,
    body: Body,
) -> Response {
    match handle_create_payment(&service, body).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            match &e {
                ProxyError::UpstreamRejected(_) => warn!(error = ?e, "Payment rejected"),
                ProxyError::InvalidRequest(_) => warn!(error = ?e, "Invalid payment request"),
                _ => error!(error = ?e, "Payment creation failed"),
            }
            e.into_response()
        }
    }
}

async fn handle_create_payment(
    service: &PaymentService,
    body: Body,
) -> Result<ProxyResult, ProxyError> {
    let bytes = read_body(body, service.request_read_timeout()).await?;

    let request: PaymentRequest = serde_json::from_slice(&bytes)
        .map_err(|e| ProxyError::InvalidRequest(format!("Invalid payment request: {}", e)))?;

    info!(order_id = ?request.order_id, "Received payment request");

    let created = service.create_payment(request).await?;
    Ok(ProxyResult::created(created))
}

async fn read_body(body: Body, timeout: Duration) -> Result<Bytes, ProxyError> {
    match tokio::time::timeout(timeout, to_bytes(body, MAX_BODY_BYTES)).await {
        Err(_) => Err(ProxyError::RequestTimeout),
        Ok(Err(e)) => {
            if e.into_inner().downcast_ref::<LengthLimitError>().is_some() {
                Err(ProxyError::PayloadTooLarge)
            } else {
                Err(ProxyError::InvalidRequest("Failed to read request body".to_string()))
            }
        }
        Ok(Ok(bytes)) => Ok(bytes),
    }
}
