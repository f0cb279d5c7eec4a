use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A stocked medicine record. Stock is reserved by the cart at add time and
/// returned at remove time; discard is a one-way transition that zeroes stock.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub price: BigDecimal,
    pub cost_price: BigDecimal,
    pub min_stock_level: i32,
    pub image: Option<String>,
    pub details: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub is_expired: bool,
    pub is_discarded: bool,
    pub discarded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expiry_date, Some(expiry) if expiry < now)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: Uuid,
    pub cart_key: String,
    pub total_amount: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One entry in a cart. `name`, `price` and `image` are snapshots taken from
/// the catalog when the line was first added; a later catalog change does not
/// touch them.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub item_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub price: BigDecimal,
    pub image: Option<String>,
}

impl CartLine {
    pub fn line_total(&self) -> BigDecimal {
        &self.price * BigDecimal::from(self.quantity)
    }
}

pub const DISCOUNT_TYPE_PERCENTAGE: &str = "percentage";
pub const DISCOUNT_TYPE_FIXED: &str = "fixed";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub discount_type: String,
    pub discount_value: BigDecimal,
    pub min_purchase_amount: BigDecimal,
    pub max_discount_amount: Option<BigDecimal>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

pub const PAYMENT_MODES: [&str; 3] = ["cash", "card", "upi"];

/// One ledger row per cart line at checkout time. Append-only; nothing in the
/// service updates or deletes these.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    pub id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub quantity: i32,
    pub price: BigDecimal,
    pub total_amount: BigDecimal,
    pub discount_amount: BigDecimal,
    pub final_amount: BigDecimal,
    pub coupon_code: Option<String>,
    pub buyer_name: String,
    pub buyer_phone: String,
    pub payment_mode: String,
    pub purchase_date: DateTime<Utc>,
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
}

/// Cart plus its lines, the shape every cart endpoint responds with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    #[serde(flatten)]
    pub cart: Cart,
    pub items: Vec<CartLine>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn line(price: &str, quantity: i32) -> CartLine {
        CartLine {
            id: Uuid::new_v4(),
            cart_id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            name: "Paracetamol 500mg".to_string(),
            quantity,
            price: BigDecimal::from_str(price).unwrap(),
            image: None,
        }
    }

    #[test]
    fn test_line_total() {
        assert_eq!(
            line("12.50", 4).line_total(),
            BigDecimal::from_str("50.00").unwrap()
        );
    }

    #[test]
    fn test_past_expiry() {
        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4(),
            name: "Amoxicillin".to_string(),
            quantity: 10,
            price: BigDecimal::from(30),
            cost_price: BigDecimal::from(18),
            min_stock_level: 10,
            image: None,
            details: None,
            expiry_date: Some(now - chrono::Duration::days(1)),
            is_expired: false,
            is_discarded: false,
            discarded_at: None,
            created_at: now,
            updated_at: now,
        };
        assert!(item.is_past_expiry(now));

        let fresh = Item {
            expiry_date: Some(now + chrono::Duration::days(90)),
            ..item.clone()
        };
        assert!(!fresh.is_past_expiry(now));

        let undated = Item {
            expiry_date: None,
            ..item
        };
        assert!(!undated.is_past_expiry(now));
    }
}
