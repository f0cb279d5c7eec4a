//! Payment gateway port and the Razorpay-backed implementation.
//!
//! The checkout pipeline depends only on the result contract: an order
//! descriptor on create, and a signature check before a verified checkout.

use async_trait::async_trait;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Invalid response from payment gateway: {0}")]
    InvalidResponse(String),
    #[error("Gateway rejected order: {0}")]
    OrderRejected(String),
    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
}

/// Order descriptor returned by the gateway; `amount_minor` is in the
/// currency's minor unit (paise for INR).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub order_id: String,
    pub amount_minor: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError>;
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
    id: String,
    amount: i64,
    currency: String,
}

/// HTTP client for the Razorpay Orders API.
#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl RazorpayClient {
    pub fn new(base_url: String, key_id: String, key_secret: String, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(Duration::from_secs(60), Duration::from_secs(120));
        let policy = failure_policy::consecutive_failures(3, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        RazorpayClient {
            client,
            base_url,
            key_id,
            key_secret,
            circuit_breaker,
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        let url = format!("{}/v1/orders", self.base_url.trim_end_matches('/'));
        let client = self.client.clone();
        let key_id = self.key_id.clone();
        let key_secret = self.key_secret.clone();
        let body = CreateOrderRequest {
            amount: amount_minor,
            currency,
            receipt,
        };

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .post(&url)
                    .basic_auth(&key_id, Some(&key_secret))
                    .json(&body)
                    .send()
                    .await?;

                if !response.status().is_success() {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    return Err(GatewayError::OrderRejected(format!("{}: {}", status, text)));
                }

                let order = response
                    .json::<CreateOrderResponse>()
                    .await
                    .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
                Ok(GatewayOrder {
                    order_id: order.id,
                    amount_minor: order.amount,
                    currency: order.currency,
                })
            })
            .await;

        match result {
            Ok(order) => Ok(order),
            Err(FailsafeError::Rejected) => Err(GatewayError::CircuitBreakerOpen(
                "payment gateway circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}

/// Verifies the gateway callback signature: hex-encoded HMAC-SHA256 over
/// `"{order_id}|{payment_id}"` with the key secret. Comparison is
/// constant-time via the mac verifier.
pub fn verify_payment_signature(
    key_secret: &str,
    order_id: &str,
    payment_id: &str,
    signature_hex: &str,
) -> bool {
    let expected = match hex::decode(signature_hex) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(key_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(format!("{}|{}", order_id, payment_id).as_bytes());

    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, order_id: &str, payment_id: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature_verifies() {
        let sig = sign("secret", "order_abc", "pay_xyz");
        assert!(verify_payment_signature("secret", "order_abc", "pay_xyz", &sig));
    }

    #[test]
    fn test_tampered_payment_id_fails() {
        let sig = sign("secret", "order_abc", "pay_xyz");
        assert!(!verify_payment_signature("secret", "order_abc", "pay_other", &sig));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let sig = sign("secret", "order_abc", "pay_xyz");
        assert!(!verify_payment_signature("other-secret", "order_abc", "pay_xyz", &sig));
    }

    #[test]
    fn test_non_hex_signature_fails() {
        assert!(!verify_payment_signature("secret", "order_abc", "pay_xyz", "zz-not-hex"));
    }

    #[tokio::test]
    async fn test_create_order_with_mock() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/v1/orders")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"order_MkWq2A","amount":25000,"currency":"INR","status":"created"}"#)
            .create_async()
            .await;

        let client = RazorpayClient::new(server.url(), "key".to_string(), "secret".to_string(), 5);
        let order = client.create_order(25000, "INR", "receipt_1").await.unwrap();

        assert_eq!(order.order_id, "order_MkWq2A");
        assert_eq!(order.amount_minor, 25000);
        assert_eq!(order.currency, "INR");
    }

    #[tokio::test]
    async fn test_create_order_malformed_body_is_invalid_response() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/v1/orders")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"unexpected":"shape"}"#)
            .create_async()
            .await;

        let client = RazorpayClient::new(server.url(), "key".to_string(), "secret".to_string(), 5);
        let result = client.create_order(25000, "INR", "receipt_1").await;

        assert!(matches!(result, Err(GatewayError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_create_order_rejected() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/v1/orders")
            .with_status(400)
            .with_body(r#"{"error":{"description":"amount too small"}}"#)
            .create_async()
            .await;

        let client = RazorpayClient::new(server.url(), "key".to_string(), "secret".to_string(), 5);
        let result = client.create_order(50, "INR", "receipt_1").await;

        assert!(matches!(result, Err(GatewayError::OrderRejected(_))));
    }
}
