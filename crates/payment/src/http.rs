use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::{
    CreatePaymentRequest, IdempotencyKey, PaymentError, PaymentGateway, PaymentIntent, Result,
};

pub const IDEMPOTENCE_HEADER: &str = "Idempotence-Key";

/// Connection settings for [`HttpPaymentGateway`].
#[derive(Debug, Clone)]
pub struct HttpPaymentGatewayConfig {
    /// Base URL; `payments` is appended.
    pub api_url: String,
    pub shop_id: String,
    pub secret_key: String,
    /// Upper bound for the whole call.
    pub timeout: Duration,
}

impl Default for HttpPaymentGatewayConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.yookassa.ru/v3/".to_string(),
            shop_id: String::new(),
            secret_key: String::new(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl HttpPaymentGatewayConfig {
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_credentials(
        mut self,
        shop_id: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.shop_id = shop_id.into();
        self.secret_key = secret_key.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn payments_url(&self) -> String {
        format!("{}/payments", self.api_url.trim_end_matches('/'))
    }
}

/// Payment gateway reached over HTTPS with basic-auth credentials.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    config: HttpPaymentGatewayConfig,
}

impl HttpPaymentGateway {
    pub fn new(config: HttpPaymentGatewayConfig) -> Result<Self> {
        if config.shop_id.is_empty() {
            return Err(PaymentError::Config("shop id is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpPaymentGatewayConfig {
        &self.config
    }

    fn map_send_error(&self, err: reqwest::Error) -> PaymentError {
        if err.is_timeout() {
            PaymentError::Timeout(self.config.timeout)
        } else {
            PaymentError::Unavailable(err.to_string())
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[tracing::instrument(skip(self, request, key), fields(description = %request.description))]
    async fn create_payment(
        &self,
        request: &CreatePaymentRequest,
        key: &IdempotencyKey,
    ) -> Result<PaymentIntent> {
        let response = self
            .client
            .post(self.config.payments_url())
            .basic_auth(&self.config.shop_id, Some(&self.config.secret_key))
            .header(IDEMPOTENCE_HEADER, key.as_str())
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if status.is_success() {
            let intent = response
                .json::<PaymentIntent>()
                .await
                .map_err(|e| PaymentError::Decode(e.to_string()))?;
            debug!(payment_id = %intent.id, status = %intent.status, "payment intent created");
            return Ok(intent);
        }

        let body = response.text().await.unwrap_or_default();
        let message = body.chars().take(200).collect::<String>();
        warn!(status = %status, body = %message, "payment gateway returned an error");

        if status.is_server_error() {
            Err(PaymentError::Unavailable(format!("HTTP {status} - {message}")))
        } else {
            Err(PaymentError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, Router, extract::State, http::HeaderMap, http::StatusCode, routing::post};
    use common::{Money, OrderId};

    use super::*;

    #[derive(Clone, Default)]
    struct Captured {
        headers: Arc<Mutex<Vec<HeaderMap>>>,
        bodies: Arc<Mutex<Vec<serde_json::Value>>>,
    }

    async fn create(
        State(captured): State<Captured>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> (StatusCode, Json<serde_json::Value>) {
        captured.headers.lock().unwrap().push(headers);
        let metadata = body["metadata"].clone();
        captured.bodies.lock().unwrap().push(body);
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "id": "pay-1",
                "status": "pending",
                "paid": false,
                "confirmation": {"type": "redirect", "confirmation_url": "https://pay.test/1"},
                "metadata": metadata
            })),
        )
    }

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v3/")
    }

    fn request(order_id: OrderId) -> CreatePaymentRequest {
        CreatePaymentRequest::for_order(
            order_id,
            Money::from_major(20),
            "RUB",
            "http://localhost/ok",
        )
    }

    #[test]
    fn test_config_defaults() {
        let config = HttpPaymentGatewayConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.payments_url(), "https://api.yookassa.ru/v3/payments");
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let result = HttpPaymentGateway::new(HttpPaymentGatewayConfig::default());
        assert!(matches!(result, Err(PaymentError::Config(_))));
    }

    #[tokio::test]
    async fn test_sends_signed_idempotent_request() {
        let captured = Captured::default();
        let router = Router::new()
            .route("/v3/payments", post(create))
            .with_state(captured.clone());
        let base = spawn(router).await;

        let gateway = HttpPaymentGateway::new(
            HttpPaymentGatewayConfig::default()
                .with_api_url(base)
                .with_credentials("shop", "secret"),
        )
        .unwrap();

        let order_id = OrderId::new();
        let key = IdempotencyKey::fresh();
        let intent = gateway.create_payment(&request(order_id), &key).await.unwrap();

        assert_eq!(intent.id, "pay-1");
        assert_eq!(intent.confirmation_url(), Some("https://pay.test/1"));
        assert_eq!(intent.metadata.order_id(), Some(order_id.to_string().as_str()));

        let headers = captured.headers.lock().unwrap();
        assert_eq!(headers[0][IDEMPOTENCE_HEADER], key.as_str());
        // base64("shop:secret")
        assert_eq!(headers[0]["authorization"], "Basic c2hvcDpzZWNyZXQ=");

        let bodies = captured.bodies.lock().unwrap();
        assert_eq!(bodies[0]["amount"]["value"], "20.00");
        assert_eq!(bodies[0]["capture"], true);
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let router = Router::new().route(
            "/v3/payments",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let base = spawn(router).await;
        let gateway = HttpPaymentGateway::new(
            HttpPaymentGatewayConfig::default()
                .with_api_url(base)
                .with_credentials("shop", "secret"),
        )
        .unwrap();

        let result = gateway
            .create_payment(&request(OrderId::new()), &IdempotencyKey::fresh())
            .await;
        assert!(matches!(result, Err(PaymentError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_client_error_is_rejected() {
        let router = Router::new().route(
            "/v3/payments",
            post(|| async { (StatusCode::BAD_REQUEST, "invalid amount") }),
        );
        let base = spawn(router).await;
        let gateway = HttpPaymentGateway::new(
            HttpPaymentGatewayConfig::default()
                .with_api_url(base)
                .with_credentials("shop", "secret"),
        )
        .unwrap();

        let result = gateway
            .create_payment(&request(OrderId::new()), &IdempotencyKey::fresh())
            .await;
        assert!(matches!(
            result,
            Err(PaymentError::Rejected { status: 400, ref message }) if message == "invalid amount"
        ));
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let gateway = HttpPaymentGateway::new(
            HttpPaymentGatewayConfig::default()
                .with_api_url(format!("http://{addr}/v3"))
                .with_credentials("shop", "secret")
                .with_timeout(Duration::from_secs(2)),
        )
        .unwrap();

        let result = gateway
            .create_payment(&request(OrderId::new()), &IdempotencyKey::fresh())
            .await;
        assert!(matches!(
            result,
            Err(PaymentError::Unavailable(_)) | Err(PaymentError::Timeout(_))
        ));
    }
}
