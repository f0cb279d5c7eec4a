//! Notification port for checkout side effects (SMS and email receipt).
//!
//! Dispatch is best-effort and off the checkout critical path: failures are
//! logged by the caller and never surface as checkout errors.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification transport failed: {0}")]
    Transport(String),
}

/// Everything a receipt notification needs; amounts are post-discount.
#[derive(Debug, Clone)]
pub struct PaymentNotification {
    pub buyer_name: String,
    pub buyer_phone: String,
    pub buyer_email: Option<String>,
    pub final_amount: BigDecimal,
    pub payment_mode: String,
    pub payment_id: Option<String>,
    pub currency: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn payment_success(&self, notification: &PaymentNotification) -> Result<(), NotifyError>;
}

/// Default notifier: records the receipt in the service log. Real SMS/email
/// transport lives outside this service.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn payment_success(&self, notification: &PaymentNotification) -> Result<(), NotifyError> {
        tracing::info!(
            buyer = %notification.buyer_name,
            phone = %notification.buyer_phone,
            email = notification.buyer_email.as_deref().unwrap_or("-"),
            amount = %notification.final_amount,
            currency = %notification.currency,
            payment_mode = %notification.payment_mode,
            payment_id = notification.payment_id.as_deref().unwrap_or("-"),
            "payment confirmation dispatched"
        );
        Ok(())
    }
}
