//! Gateway wire models.

use std::collections::BTreeMap;

use common::{Money, OrderId};
use serde::{Deserialize, Serialize};

const ORDER_ID_KEY: &str = "order_id";

/// Decimal amount with a currency code, e.g. `{"value": "20.00", "currency": "RUB"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: String,
    pub currency: String,
}

impl Amount {
    pub fn new(money: Money, currency: impl Into<String>) -> Self {
        Self {
            value: money.to_decimal_string(),
            currency: currency.into(),
        }
    }
}

/// Free-form key/value pairs echoed back by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, String>);

impl Metadata {
    pub fn for_order(order_id: OrderId) -> Self {
        let mut map = BTreeMap::new();
        map.insert(ORDER_ID_KEY.to_string(), order_id.to_string());
        Self(map)
    }

    /// The raw order id, if the gateway record carries one.
    pub fn order_id(&self) -> Option<&str> {
        self.0
            .get(ORDER_ID_KEY)
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub return_url: String,
}

impl ConfirmationRequest {
    pub fn redirect(return_url: impl Into<String>) -> Self {
        Self {
            kind: "redirect".to_string(),
            return_url: return_url.into(),
        }
    }
}

/// Body of `POST /payments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub amount: Amount,
    pub capture: bool,
    pub confirmation: ConfirmationRequest,
    pub metadata: Metadata,
    pub description: String,
}

impl CreatePaymentRequest {
    /// Builds a captured, redirect-confirmed payment for an order total.
    pub fn for_order(
        order_id: OrderId,
        total: Money,
        currency: impl Into<String>,
        return_url: impl Into<String>,
    ) -> Self {
        Self {
            amount: Amount::new(total, currency),
            capture: true,
            confirmation: ConfirmationRequest::redirect(return_url),
            metadata: Metadata::for_order(order_id),
            description: format!("Order #{order_id}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationResponse {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_url: Option<String>,
}

/// A payment as recorded by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<ConfirmationResponse>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl PaymentIntent {
    /// Where the buyer is sent to complete the payment.
    pub fn confirmation_url(&self) -> Option<&str> {
        self.confirmation
            .as_ref()
            .and_then(|c| c.confirmation_url.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_wire_shape() {
        let order_id = OrderId::new();
        let request = CreatePaymentRequest::for_order(
            order_id,
            Money::from_major(20),
            "RUB",
            "http://localhost:3000/payment/success",
        );

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "amount": {"value": "20.00", "currency": "RUB"},
                "capture": true,
                "confirmation": {
                    "type": "redirect",
                    "return_url": "http://localhost:3000/payment/success"
                },
                "metadata": {"order_id": order_id.to_string()},
                "description": format!("Order #{order_id}")
            })
        );
    }

    #[test]
    fn test_decode_gateway_response() {
        let body = serde_json::json!({
            "id": "2d9f1c3a-000f-5000-9000-1b2c3d4e5f60",
            "status": "pending",
            "paid": false,
            "amount": {"value": "20.00", "currency": "RUB"},
            "confirmation": {
                "type": "redirect",
                "confirmation_url": "https://pay.example/checkout?id=1"
            },
            "created_at": "2024-01-01T00:00:00.000Z",
            "metadata": {"order_id": "abc"}
        });

        let intent: PaymentIntent = serde_json::from_value(body).unwrap();
        assert_eq!(intent.status, "pending");
        assert!(!intent.paid);
        assert_eq!(intent.confirmation_url(), Some("https://pay.example/checkout?id=1"));
        assert_eq!(intent.metadata.order_id(), Some("abc"));
    }

    #[test]
    fn test_metadata_empty_order_id_is_absent() {
        let metadata: Metadata = serde_json::from_value(serde_json::json!({"order_id": ""})).unwrap();
        assert_eq!(metadata.order_id(), None);
        assert_eq!(Metadata::default().order_id(), None);
    }
}
