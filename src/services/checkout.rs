//! Checkout orchestration: coupon resolution, per-line discount
//! apportionment, the atomic ledger write + cart clear, and best-effort
//! notification dispatch.
//!
//! Stock is not touched here; it was reserved when the lines were added.

use crate::db::models::{CartLine, PurchaseRecord, PAYMENT_MODES};
use crate::db::queries;
use crate::domain::coupon;
use crate::error::AppError;
use crate::notify::{Notifier, PaymentNotification};
use crate::services::cart::DEFAULT_CART_KEY;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Progress marker for one checkout attempt. The ledger write and the cart
/// clear commit in a single transaction, so an attempt cannot strand between
/// `LedgerWritten` and `CartCleared`; the stage is still carried for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStage {
    Initiated,
    CouponResolved,
    LinesApportioned,
    LedgerWritten,
    CartCleared,
    Complete,
    Rejected,
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub buyer_name: String,
    pub buyer_phone: String,
    pub buyer_email: Option<String>,
    pub payment_mode: String,
    pub coupon_code: Option<String>,
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    pub lines: usize,
    pub total_amount: BigDecimal,
    pub discount_amount: BigDecimal,
    pub final_amount: BigDecimal,
    pub coupon_code: Option<String>,
    pub payment_id: Option<String>,
}

pub struct CheckoutService {
    pool: PgPool,
    notifier: Arc<dyn Notifier>,
    currency: String,
}

impl CheckoutService {
    pub fn new(pool: PgPool, notifier: Arc<dyn Notifier>, currency: String) -> Self {
        Self {
            pool,
            notifier,
            currency,
        }
    }

    pub async fn checkout(&self, request: CheckoutRequest) -> Result<CheckoutReceipt, AppError> {
        validate_request(&request)?;

        let mut stage = CheckoutStage::Initiated;
        tracing::debug!(stage = ?stage, "checkout attempt started");
        let now = Utc::now();

        // The coupon row is fetched before the transaction opens; a checkout
        // blocked on the cart lock must hold exactly one pool connection.
        let coupon_row = match &request.coupon_code {
            Some(code) => {
                let normalized = coupon::normalize_code(code);
                let found = queries::get_coupon_by_code(&self.pool, &normalized)
                    .await?
                    .ok_or(AppError::InvalidCoupon)?;
                Some(found)
            }
            None => None,
        };

        let mut tx = self.pool.begin().await?;
        let cart = queries::get_or_create_cart_for_update(&mut tx, DEFAULT_CART_KEY).await?;
        let lines = queries::get_cart_lines(&mut tx, cart.id).await?;

        if lines.is_empty() {
            stage = CheckoutStage::Rejected;
            tracing::info!(stage = ?stage, "checkout rejected: empty cart");
            return Err(AppError::EmptyCart);
        }

        let total_amount = cart.total_amount.clone();

        // Coupon failures abort before any mutation.
        let (discount_amount, applied_code) = match &coupon_row {
            Some(found) => {
                let discount = coupon::evaluate(found, &total_amount, now)?;
                (discount.discount_amount, Some(found.code.clone()))
            }
            None => (BigDecimal::from(0), None),
        };
        stage = CheckoutStage::CouponResolved;
        tracing::debug!(stage = ?stage, discount = %discount_amount, "coupon resolved");

        let records = build_purchase_records(
            &lines,
            &total_amount,
            &discount_amount,
            applied_code.as_deref(),
            &request,
            now,
        );
        stage = CheckoutStage::LinesApportioned;
        tracing::debug!(stage = ?stage, lines = records.len(), "lines apportioned");

        queries::insert_purchases(&mut tx, &records).await?;
        stage = CheckoutStage::LedgerWritten;
        tracing::debug!(stage = ?stage, "ledger rows staged");

        queries::clear_cart(&mut tx, cart.id).await?;
        stage = CheckoutStage::CartCleared;

        // A failed commit rolls both steps back together; losing a ledger
        // write any other way would lose revenue tracking.
        if let Err(e) = tx.commit().await {
            tracing::error!(stage = ?stage, error = %e, "checkout commit failed");
            return Err(AppError::Database(e));
        }
        stage = CheckoutStage::Complete;

        let final_amount = &total_amount - &discount_amount;
        tracing::info!(
            stage = ?stage,
            lines = records.len(),
            total = %total_amount,
            discount = %discount_amount,
            "checkout complete"
        );

        self.dispatch_notifications(&request, final_amount.clone());

        Ok(CheckoutReceipt {
            lines: records.len(),
            total_amount,
            discount_amount,
            final_amount,
            coupon_code: applied_code,
            payment_id: request.razorpay_payment_id,
        })
    }

    /// Best-effort, off the critical path: a transport failure is logged and
    /// never propagates back to the checkout caller, nor is it retried.
    fn dispatch_notifications(&self, request: &CheckoutRequest, final_amount: BigDecimal) {
        let notifier = Arc::clone(&self.notifier);
        let notification = PaymentNotification {
            buyer_name: request.buyer_name.clone(),
            buyer_phone: request.buyer_phone.clone(),
            buyer_email: request.buyer_email.clone(),
            final_amount,
            payment_mode: request.payment_mode.clone(),
            payment_id: request.razorpay_payment_id.clone(),
            currency: self.currency.clone(),
        };
        tokio::spawn(async move {
            if let Err(e) = notifier.payment_success(&notification).await {
                tracing::warn!(error = %e, "notification dispatch failed");
            }
        });
    }
}

fn validate_request(request: &CheckoutRequest) -> Result<(), AppError> {
    if request.buyer_name.trim().is_empty() {
        return Err(AppError::Validation("buyerName is required".to_string()));
    }
    if request.buyer_phone.trim().is_empty() {
        return Err(AppError::Validation("buyerPhone is required".to_string()));
    }
    if !PAYMENT_MODES.contains(&request.payment_mode.as_str()) {
        return Err(AppError::Validation(format!(
            "paymentMode must be one of {:?}",
            PAYMENT_MODES
        )));
    }
    Ok(())
}

/// One ledger row per cart line, each carrying its proportional share of the
/// cart-level discount.
fn build_purchase_records(
    lines: &[CartLine],
    cart_total: &BigDecimal,
    total_discount: &BigDecimal,
    coupon_code: Option<&str>,
    request: &CheckoutRequest,
    purchase_date: DateTime<Utc>,
) -> Vec<PurchaseRecord> {
    lines
        .iter()
        .map(|line| {
            let line_total = line.line_total();
            let line_discount = coupon::line_discount(&line_total, cart_total, total_discount);
            let line_final = &line_total - &line_discount;

            PurchaseRecord {
                id: Uuid::new_v4(),
                item_id: line.item_id,
                item_name: line.name.clone(),
                quantity: line.quantity,
                price: line.price.clone(),
                total_amount: line_total,
                discount_amount: line_discount,
                final_amount: line_final,
                coupon_code: coupon_code.map(|c| c.to_string()),
                buyer_name: request.buyer_name.clone(),
                buyer_phone: request.buyer_phone.clone(),
                payment_mode: request.payment_mode.clone(),
                purchase_date,
                razorpay_order_id: request.razorpay_order_id.clone(),
                razorpay_payment_id: request.razorpay_payment_id.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn line(name: &str, price: &str, quantity: i32) -> CartLine {
        CartLine {
            id: Uuid::new_v4(),
            cart_id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            name: name.to_string(),
            quantity,
            price: dec(price),
            image: None,
        }
    }

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            buyer_name: "Ravi".to_string(),
            buyer_phone: "9876543210".to_string(),
            buyer_email: None,
            payment_mode: "cash".to_string(),
            coupon_code: None,
            razorpay_order_id: None,
            razorpay_payment_id: None,
        }
    }

    #[test]
    fn test_apportionment_two_lines() {
        let lines = vec![line("Cetirizine", "100", 2), line("Insulin", "400", 2)];
        let records = build_purchase_records(
            &lines,
            &dec("1000"),
            &dec("100"),
            Some("FLAT100"),
            &request(),
            Utc::now(),
        );

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].total_amount, dec("200"));
        assert_eq!(records[0].discount_amount, dec("20"));
        assert_eq!(records[0].final_amount, dec("180"));
        assert_eq!(records[1].total_amount, dec("800"));
        assert_eq!(records[1].discount_amount, dec("80"));
        assert_eq!(records[1].final_amount, dec("720"));

        let final_sum: BigDecimal = records.iter().map(|r| r.final_amount.clone()).sum();
        assert_eq!(final_sum, dec("900"));
    }

    #[test]
    fn test_records_snapshot_line_fields() {
        let l = line("Azithromycin 250mg", "75.50", 3);
        let records = build_purchase_records(
            std::slice::from_ref(&l),
            &dec("226.50"),
            &dec("0"),
            None,
            &request(),
            Utc::now(),
        );

        let record = &records[0];
        assert_eq!(record.item_id, l.item_id);
        assert_eq!(record.item_name, "Azithromycin 250mg");
        assert_eq!(record.price, dec("75.50"));
        assert_eq!(record.quantity, 3);
        assert_eq!(record.total_amount, dec("226.50"));
        assert_eq!(record.discount_amount, dec("0"));
        assert_eq!(record.final_amount, dec("226.50"));
        assert!(record.coupon_code.is_none());
    }

    #[test]
    fn test_coupon_code_stamped_on_every_record() {
        let lines = vec![line("A", "10", 1), line("B", "20", 1), line("C", "30", 1)];
        let records = build_purchase_records(
            &lines,
            &dec("60"),
            &dec("6"),
            Some("SAVE10"),
            &request(),
            Utc::now(),
        );
        assert!(records
            .iter()
            .all(|r| r.coupon_code.as_deref() == Some("SAVE10")));
    }

    #[test]
    fn test_validate_request_rejects_bad_payment_mode() {
        let mut r = request();
        r.payment_mode = "cheque".to_string();
        assert!(matches!(
            validate_request(&r),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_request_requires_phone() {
        let mut r = request();
        r.buyer_phone = "  ".to_string();
        assert!(validate_request(&r).is_err());
    }

    #[test]
    fn test_validate_request_accepts_all_payment_modes() {
        for mode in PAYMENT_MODES {
            let mut r = request();
            r.payment_mode = mode.to_string();
            assert!(validate_request(&r).is_ok());
        }
    }
}
