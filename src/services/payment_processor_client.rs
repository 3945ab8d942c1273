use crate::app::config::{ApiKey, Config};
use crate::error::{ProxyError, REJECTED_FALLBACK_MESSAGE};
use crate::models::payment::{CreatedPayment, UpstreamPayment, UpstreamPaymentPayload, UpstreamResponse};
use crate::services::signature::{sign_payload, SignedPayload};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection never established; the request did not leave this host.
    Connect,
    Timeout,
    Other,
}

impl FailureKind {
    pub fn classify(err: &reqwest::Error) -> Self {
        if err.is_connect() {
            FailureKind::Connect
        } else if err.is_timeout() {
            FailureKind::Timeout
        } else {
            FailureKind::Other
        }
    }
}

/// Payment creation is not idempotent upstream, so only connection failures are
/// retried, and only when configured. A received response is never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_connect_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_connect_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// `retries_done` counts retries already performed, not the first attempt.
    pub fn should_retry(&self, failure: FailureKind, retries_done: u32) -> bool {
        failure == FailureKind::Connect && retries_done < self.max_connect_retries
    }

    pub fn delay_for(&self, retries_done: u32) -> Duration {
        self.backoff.saturating_mul(retries_done.saturating_add(1))
    }
}

pub struct PaymentProcessorClient {
    client: Client,
    endpoint: String,
    merchant_id: String,
    api_key: ApiKey,
    retry: RetryPolicy,
}

impl PaymentProcessorClient {
    pub fn new(config: &Config) -> Result<Self, ProxyError> {
        let endpoint = config
            .upstream_endpoint()
            .map_err(|e| ProxyError::Internal(e.to_string()))?;

        let client = Client::builder()
            .timeout(config.upstream_timeout())
            .connect_timeout(config.connect_timeout())
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| ProxyError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            merchant_id: config.merchant_id.clone(),
            api_key: config.api_key.clone(),
            retry: match config.max_connect_retries {
                0 => RetryPolicy::none(),
                retries => RetryPolicy {
                    max_connect_retries: retries,
                    backoff: Duration::from_millis(250),
                },
            },
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn create_payment(
        &self,
        payload: &UpstreamPaymentPayload,
    ) -> Result<CreatedPayment, ProxyError> {
        let signed = sign_payload(payload, self.api_key.expose())?;

        let mut retries_done = 0;
        let response = loop {
            match self.send_request(&signed).await {
                Ok(response) => break response,
                Err(e) => {
                    let failure = FailureKind::classify(&e);
                    if self.retry.should_retry(failure, retries_done) {
                        warn!(
                            order_id = ?payload.order_id,
                            retry = retries_done + 1,
                            "Could not connect to payment processor, retrying: {}", e
                        );
                        tokio::time::sleep(self.retry.delay_for(retries_done)).await;
                        retries_done += 1;
                        continue;
                    }
                    error!(order_id = ?payload.order_id, "Payment processor request failed: {}", e);
                    return Err(upstream_error(failure));
                }
            }
        };

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            error!(order_id = ?payload.order_id, "Failed to read payment processor response: {}", e);
            upstream_error(FailureKind::classify(&e))
        })?;

        info!(order_id = ?payload.order_id, status, "Payment processor responded");
        debug!(body = ?String::from_utf8_lossy(&body), "Payment processor response body");

        interpret_response(status, &body)
    }

    async fn send_request(&self, signed: &SignedPayload) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("merchant", &self.merchant_id)
            .header("sign", &signed.signature)
            .body(signed.body.clone())
            .send()
            .await
    }
}

fn upstream_error(failure: FailureKind) -> ProxyError {
    match failure {
        FailureKind::Timeout => ProxyError::UpstreamTimeout,
        FailureKind::Connect | FailureKind::Other => {
            ProxyError::UpstreamUnreachable("Could not connect to payment processor".to_string())
        }
    }
}

/// Turns the processor's reply into a created payment or a normalized error.
/// The HTTP status is only logged; `state` decides the outcome.
pub fn interpret_response(status: u16, body: &[u8]) -> Result<CreatedPayment, ProxyError> {
    let response: UpstreamResponse = serde_json::from_slice(body).map_err(|e| {
        error!(status, "Payment processor returned unparseable body: {}", e);
        ProxyError::UpstreamMalformedResponse
    })?;

    match response.state {
        Some(0) => {
            let payment = response
                .result
                .and_then(|result| serde_json::from_value::<UpstreamPayment>(result).ok())
                .ok_or_else(|| {
                    error!(status, "Payment processor reported success without a payment");
                    ProxyError::UpstreamMalformedResponse
                })?;
            Ok(CreatedPayment {
                payment_id: payment.uuid,
                payment_url: payment.url,
            })
        }
        Some(state) => {
            let message = rejection_message(&response);
            warn!(status, state, error = ?message, "Payment processor rejected payment");
            Err(ProxyError::UpstreamRejected(message))
        }
        None if response.message.is_some() || response.error.is_some() => {
            let message = rejection_message(&response);
            warn!(status, error = ?message, "Payment processor rejected payment");
            Err(ProxyError::UpstreamRejected(message))
        }
        None => {
            error!(status, "Payment processor response has no state");
            Err(ProxyError::UpstreamMalformedResponse)
        }
    }
}

fn rejection_message(response: &UpstreamResponse) -> String {
    response
        .message
        .clone()
        .or_else(|| response.error.clone())
        .or_else(|| response.errors.as_ref().and_then(first_field_error))
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| REJECTED_FALLBACK_MESSAGE.to_string())
}

fn first_field_error(errors: &Value) -> Option<String> {
    errors.as_object()?.iter().find_map(|(field, messages)| {
        let message = match messages {
            Value::String(message) => Some(message.clone()),
            Value::Array(items) => items.iter().find_map(|m| m.as_str().map(str::to_string)),
            _ => None,
        }?;
        Some(format!("{}: {}", field, message))
    })
}
