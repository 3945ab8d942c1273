pub mod payments;

use axum::{http::StatusCode, response::Json};
use serde_json::Value;

pub async fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "Not found" })))
}
