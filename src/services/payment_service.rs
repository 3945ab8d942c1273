use crate::app::config::Config;
use crate::error::ProxyError;
use crate::models::payment::{AdditionalData, CreatedPayment, PaymentRequest, UpstreamPaymentPayload};
use crate::services::payment_processor_client::PaymentProcessorClient;
use crate::services::signature::encode_additional_data;
use crate::utils::money::validate_amount;
use std::time::Duration;
use tracing::info;
use url::Url;

/// Stateless: configuration and the HTTP client are the only things shared across requests.
pub struct PaymentService {
    processor_client: PaymentProcessorClient,
    lifetime_secs: u64,
    to_currency: String,
    default_return_url: Option<String>,
    request_read_timeout: Duration,
}

impl PaymentService {
    pub fn new(config: &Config, processor_client: PaymentProcessorClient) -> Self {
        Self {
            processor_client,
            lifetime_secs: config.lifetime_secs,
            to_currency: config.to_currency.clone(),
            default_return_url: config.return_url.clone(),
            request_read_timeout: config.request_read_timeout(),
        }
    }

    pub fn request_read_timeout(&self) -> Duration {
        self.request_read_timeout
    }

    /// Validates the browser's request and reshapes it into the signed upstream body.
    pub fn build_payload(&self, request: &PaymentRequest) -> Result<UpstreamPaymentPayload, ProxyError> {
        let amount = validate_amount(&request.amount.as_text())
            .map_err(|e| ProxyError::InvalidRequest(e.to_string()))?;

        let currency = required("currency", &request.currency)?;
        let order_id = required("order_id", &request.order_id)?;
        let customer_name = required("customer_name", &request.customer_name)?;
        let customer_email = required("customer_email", &request.customer_email)?;
        let plan = required("plan", &request.plan)?;

        let url_return = match request.url_return.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => self.default_return_url.clone().ok_or_else(|| {
                ProxyError::InvalidRequest("url_return is required".to_string())
            })?,
        };
        match Url::parse(&url_return) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(ProxyError::InvalidRequest(
                    "url_return must be an absolute http(s) URL".to_string(),
                ))
            }
        }

        let additional_data = encode_additional_data(&AdditionalData {
            customer_name,
            customer_email,
            plan,
        })?;

        Ok(UpstreamPaymentPayload {
            amount,
            currency: currency.to_string(),
            order_id: order_id.to_string(),
            url_return,
            lifetime: self.lifetime_secs,
            to_currency: self.to_currency.clone(),
            additional_data,
        })
    }

    /// One attempt at creating the payment upstream. Retrying with the same
    /// `order_id` is left to the caller.
    pub async fn create_payment(&self, request: PaymentRequest) -> Result<CreatedPayment, ProxyError> {
        let payload = self.build_payload(&request)?;

        info!(
            order_id = ?payload.order_id,
            amount = %payload.amount,
            currency = ?payload.currency,
            "Creating payment"
        );

        let created = self.processor_client.create_payment(&payload).await?;
        info!(
            order_id = ?payload.order_id,
            payment_id = ?created.payment_id,
            "Payment created"
        );
        Ok(created)
    }
}

// Fields pass through untouched; only blank values are refused.
fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ProxyError> {
    if value.trim().is_empty() {
        return Err(ProxyError::InvalidRequest(format!("{} is required", field)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::payment::AmountInput;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn service(return_url: Option<&str>) -> PaymentService {
        let mut config = Config::for_tests("http://127.0.0.1:9");
        config.return_url = return_url.map(str::to_string);
        let client = PaymentProcessorClient::new(&config).unwrap();
        PaymentService::new(&config, client)
    }

    fn request() -> PaymentRequest {
        PaymentRequest {
            amount: AmountInput::Text("29.99".to_string()),
            currency: "USD".to_string(),
            order_id: "ORD-1700000000000".to_string(),
            url_return: Some("https://hosting.example/thankyou.html".to_string()),
            customer_name: "Jane Doe".to_string(),
            customer_email: "jane@example.com".to_string(),
            plan: "Business".to_string(),
        }
    }

    #[test]
    fn test_build_payload_fixes_constants() {
        let payload = service(None).build_payload(&request()).unwrap();
        assert_eq!(payload.amount, "29.99");
        assert_eq!(payload.lifetime, 3600);
        assert_eq!(payload.to_currency, "BTC");
        assert_eq!(
            payload.additional_data,
            r#"{"customer_name":"Jane Doe","customer_email":"jane@example.com","plan":"Business"}"#
        );
    }

    #[test]
    fn test_untrusted_strings_stay_inside_json_strings() {
        let mut req = request();
        req.order_id = r#"x","amount":"0.01"#.to_string();
        req.customer_name = "Robert\"); DROP TABLE orders;--\n".to_string();

        let payload = service(None).build_payload(&req).unwrap();
        assert_eq!(payload.order_id, req.order_id);

        let body: serde_json::Value = serde_json::to_value(&payload).unwrap();
        assert_eq!(body["amount"], "29.99");
        let extra: serde_json::Value =
            serde_json::from_str(body["additional_data"].as_str().unwrap()).unwrap();
        assert_eq!(extra["customer_name"], req.customer_name.as_str());
    }

    #[test]
    fn test_return_url_falls_back_to_config() {
        let mut req = request();
        req.url_return = None;

        let payload = service(Some("https://shop.example/thankyou.html"))
            .build_payload(&req)
            .unwrap();
        assert_eq!(payload.url_return, "https://shop.example/thankyou.html");

        assert!(matches!(
            service(None).build_payload(&req),
            Err(ProxyError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_build_payload_rejects_bad_input() {
        let svc = service(None);

        let mut req = request();
        req.amount = AmountInput::Text("0".to_string());
        assert!(matches!(svc.build_payload(&req), Err(ProxyError::InvalidRequest(_))));

        let mut req = request();
        req.currency = " ".to_string();
        assert!(matches!(svc.build_payload(&req), Err(ProxyError::InvalidRequest(m)) if m == "currency is required"));

        let mut req = request();
        req.url_return = Some("javascript:alert(1)".to_string());
        assert!(matches!(svc.build_payload(&req), Err(ProxyError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_newlines_in_order_id_cannot_forge_log_lines() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .without_time()
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let config = Config::for_tests(&format!("http://{}", addr));
        let client = PaymentProcessorClient::new(&config).unwrap();
        let svc = PaymentService::new(&config, client);

        let mut req = request();
        req.order_id = "ORD-1\n2026-01-01T00:00:00Z  INFO FORGED: admin login ok".to_string();
        req.currency = "USD\r\nFORGED-CURRENCY".to_string();

        let result = svc.create_payment(req).await;
        assert!(matches!(result, Err(ProxyError::UpstreamUnreachable(_))));

        let output = logs.contents();
        assert!(output.contains("Creating payment"));
        assert!(output.contains("Payment processor request failed"));
        for line in output.lines() {
            assert!(!line.starts_with("2026-01-01T00:00:00Z"), "forged line: {}", line);
            assert!(!line.starts_with("FORGED"), "forged line: {}", line);
            if line.contains("FORGED") {
                assert!(line.contains("order_id=") || line.contains("currency="));
            }
        }
    }
}
