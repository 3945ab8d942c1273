use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::utils::money::format_number_amount;

/// Order-creation request posted by the checkout page. Every field is untrusted.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub amount: AmountInput,
    pub currency: String,
    pub order_id: String,
    #[serde(default)]
    pub url_return: Option<String>,
    pub customer_name: String,
    pub customer_email: String,
    pub plan: String,
}

/// The page may send the amount as `"29.99"` or `29.99`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(Number),
}

impl AmountInput {
    pub fn as_text(&self) -> String {
        match self {
            AmountInput::Text(text) => text.trim().to_string(),
            AmountInput::Number(number) => format_number_amount(&number.to_string()),
        }
    }
}

/// Body sent to the processor and the exact input of the signature.
///
/// Serialization follows declaration order: `amount`, `currency`, `order_id`,
/// `url_return`, `lifetime`, `to_currency`, `additional_data`. The processor
/// recomputes the signature over these bytes, so the order must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamPaymentPayload {
    pub amount: String,
    pub currency: String,
    pub order_id: String,
    pub url_return: String,
    pub lifetime: u64,
    pub to_currency: String,
    pub additional_data: String,
}

/// Customer metadata carried as a JSON string inside `additional_data`.
#[derive(Debug, Serialize)]
pub struct AdditionalData<'a> {
    pub customer_name: &'a str,
    pub customer_email: &'a str,
    pub plan: &'a str,
}

/// What the checkout page receives back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProxyResult {
    pub fn created(payment: CreatedPayment) -> Self {
        Self {
            success: true,
            payment_url: Some(payment.payment_url),
            payment_id: Some(payment.payment_id),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            payment_url: None,
            payment_id: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPayment {
    pub payment_id: String,
    pub payment_url: String,
}

// Envelope returned by the processor
#[derive(Debug, Deserialize)]
pub struct UpstreamResponse {
    #[serde(default)]
    pub state: Option<i64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    /// Field-level validation errors, e.g. `{"amount": ["must be positive"]}`.
    #[serde(default)]
    pub errors: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpstreamPayment {
    pub uuid: String,
    pub url: String,
}
