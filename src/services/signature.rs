//! Request signing for the processor API.
//!
//! `sign = hex(md5(base64(body) + api_key))` where `body` is the exact JSON sent on
//! the wire. MD5 here is the processor's integrity check, not a security boundary;
//! confidentiality rests on TLS and the secrecy of the key.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::ProxyError;
use crate::models::payment::{AdditionalData, UpstreamPaymentPayload};

/// Serialized body plus its signature. The same bytes go on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    pub body: Vec<u8>,
    pub signature: String,
}

/// Compact JSON in the struct's declared field order.
pub fn canonical_json(payload: &UpstreamPaymentPayload) -> Result<Vec<u8>, ProxyError> {
    serde_json::to_vec(payload)
        .map_err(|e| ProxyError::Internal(format!("payload serialization failed: {}", e)))
}

pub fn encode_additional_data(data: &AdditionalData<'_>) -> Result<String, ProxyError> {
    serde_json::to_string(data)
        .map_err(|e| ProxyError::Internal(format!("additional data serialization failed: {}", e)))
}

pub fn sign(body: &[u8], api_key: &str) -> String {
    let mut input = STANDARD.encode(body);
    input.push_str(api_key);
    format!("{:x}", md5::compute(input.as_bytes()))
}

pub fn sign_payload(
    payload: &UpstreamPaymentPayload,
    api_key: &str,
) -> Result<SignedPayload, ProxyError> {
    let body = canonical_json(payload)?;
    let signature = sign(&body, api_key);
    Ok(SignedPayload { body, signature })
}
