use axum::{
    http::{header, Method},
    routing::post,
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::{not_found, payments};
use crate::services::PaymentService;

/// Any OPTIONS request is answered by the CORS layer with 200 and an empty body.
pub fn create_router(payment_service: Arc<PaymentService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route(
            "/create-payment",
            post(payments::create_payment).fallback(not_found),
        )
        .fallback(not_found)
        .layer(cors)
        .with_state(payment_service)
}
