//! Application configuration loaded from environment variables.

use std::time::Duration;

use inventory::RetryPolicy;
use notifications::{PublisherConfig, WorkerPoolConfig};
use payment::HttpPaymentGatewayConfig;
use saga::OrchestratorConfig;

/// Log output format selected with `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Optional backends (`DATABASE_URL`, `INVENTORY_URL`, payment credentials,
/// `NOTIFIER_URL`, `KAFKA_BROKERS`) fall back to in-process adapters when
/// unset.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,

    pub database_url: Option<String>,

    pub payment_api_url: String,
    pub payment_shop_id: Option<String>,
    pub payment_secret_key: Option<String>,
    pub payment_timeout: Duration,
    pub payment_return_url: String,
    pub payment_currency: String,

    pub inventory_url: Option<String>,
    pub inventory_retries: usize,
    pub inventory_timeout: Duration,

    pub notify_topic: String,
    pub notify_group: String,
    pub notify_workers: usize,
    pub notify_queue: usize,
    pub notify_publish_retries: usize,
    pub notifier_url: Option<String>,
    pub notify_sender: String,
    pub kafka_brokers: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source.
    ///
    /// Empty values count as unset. Unparseable numbers fall back to the
    /// default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(get("PORT"), defaults.port),
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: get("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
            database_url: get("DATABASE_URL"),
            payment_api_url: get("PAYMENT_API_URL").unwrap_or(defaults.payment_api_url),
            payment_shop_id: get("PAYMENT_SHOP_ID"),
            payment_secret_key: get("PAYMENT_SECRET_KEY"),
            payment_timeout: Duration::from_secs(parse_or(get("PAYMENT_TIMEOUT_SECS"), 10)),
            payment_return_url: get("PAYMENT_RETURN_URL").unwrap_or(defaults.payment_return_url),
            payment_currency: get("PAYMENT_CURRENCY").unwrap_or(defaults.payment_currency),
            inventory_url: get("INVENTORY_URL"),
            inventory_retries: parse_or(get("INVENTORY_RETRIES"), defaults.inventory_retries),
            inventory_timeout: Duration::from_millis(parse_or(get("INVENTORY_TIMEOUT_MS"), 5000)),
            notify_topic: get("NOTIFY_TOPIC").unwrap_or(defaults.notify_topic),
            notify_group: get("NOTIFY_GROUP").unwrap_or(defaults.notify_group),
            notify_workers: parse_or(get("NOTIFY_WORKERS"), defaults.notify_workers),
            notify_queue: parse_or(get("NOTIFY_QUEUE"), defaults.notify_queue),
            notify_publish_retries: parse_or(
                get("NOTIFY_PUBLISH_RETRIES"),
                defaults.notify_publish_retries,
            ),
            notifier_url: get("NOTIFIER_URL"),
            notify_sender: get("NOTIFY_SENDER").unwrap_or(defaults.notify_sender),
            kafka_brokers: get("KAFKA_BROKERS"),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig::default()
            .with_currency(&self.payment_currency)
            .with_return_url(&self.payment_return_url)
    }

    /// Gateway settings, or `None` when no credentials are configured.
    pub fn payment_gateway_config(&self) -> Option<HttpPaymentGatewayConfig> {
        let shop_id = self.payment_shop_id.as_ref()?;
        let secret_key = self.payment_secret_key.as_ref()?;
        Some(
            HttpPaymentGatewayConfig::default()
                .with_api_url(&self.payment_api_url)
                .with_credentials(shop_id, secret_key)
                .with_timeout(self.payment_timeout),
        )
    }

    pub fn inventory_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_retries(self.inventory_retries)
            .with_attempt_timeout(self.inventory_timeout)
    }

    pub fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig::default().with_max_attempts(self.notify_publish_retries)
    }

    pub fn worker_pool_config(&self) -> WorkerPoolConfig {
        WorkerPoolConfig::default()
            .with_workers(self.notify_workers)
            .with_queue_capacity(self.notify_queue)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            payment_api_url: "https://api.yookassa.ru/v3/".to_string(),
            payment_shop_id: None,
            payment_secret_key: None,
            payment_timeout: Duration::from_secs(10),
            payment_return_url: "http://localhost:3000/payment/success".to_string(),
            payment_currency: "RUB".to_string(),
            inventory_url: None,
            inventory_retries: 3,
            inventory_timeout: Duration::from_millis(5000),
            notify_topic: "order_created".to_string(),
            notify_group: "order-notifier".to_string(),
            notify_workers: 5,
            notify_queue: 50,
            notify_publish_retries: 3,
            notifier_url: None,
            notify_sender: "orders@localhost".to_string(),
            kafka_brokers: None,
        }
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
