//! Coupon discount evaluation and per-line apportionment.
//! Pure functions over already-loaded data; code lookup and normalization
//! happen at the API boundary.

use crate::db::models::{Coupon, DISCOUNT_TYPE_FIXED, DISCOUNT_TYPE_PERCENTAGE};
use crate::error::AppError;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Discount {
    pub discount_amount: BigDecimal,
    pub final_amount: BigDecimal,
}

/// Normalizes a user-supplied coupon code for lookup.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Evaluates a coupon against a cart amount.
///
/// The computed discount is always within `[0, cart_amount]`:
/// a percentage discount is capped by `max_discount_amount` when set, a fixed
/// discount larger than the cart clamps to the full amount.
pub fn evaluate(
    coupon: &Coupon,
    cart_amount: &BigDecimal,
    now: DateTime<Utc>,
) -> Result<Discount, AppError> {
    if !coupon.is_active {
        return Err(AppError::InactiveCoupon);
    }
    if matches!(coupon.expiry_date, Some(expiry) if expiry < now) {
        return Err(AppError::ExpiredCoupon);
    }
    if cart_amount < &coupon.min_purchase_amount {
        return Err(AppError::BelowMinimumPurchase(
            coupon.min_purchase_amount.to_string(),
        ));
    }

    let zero = BigDecimal::from(0);
    let mut discount = match coupon.discount_type.as_str() {
        DISCOUNT_TYPE_PERCENTAGE => {
            let raw = cart_amount * &coupon.discount_value / BigDecimal::from(100);
            match &coupon.max_discount_amount {
                Some(cap) if &raw > cap => cap.clone(),
                _ => raw,
            }
        }
        DISCOUNT_TYPE_FIXED => coupon.discount_value.clone(),
        other => {
            return Err(AppError::Validation(format!(
                "unknown discount type: {}",
                other
            )));
        }
    };

    if discount < zero {
        discount = zero;
    }
    if &discount > cart_amount {
        discount = cart_amount.clone();
    }

    let final_amount = cart_amount - &discount;
    Ok(Discount {
        discount_amount: discount,
        final_amount,
    })
}

/// A cart line's proportional share of the cart-level discount.
///
/// Each line is computed independently; rounding drift across lines is not
/// reconciled against the coupon-level total (known approximation).
pub fn line_discount(
    line_total: &BigDecimal,
    cart_total: &BigDecimal,
    total_discount: &BigDecimal,
) -> BigDecimal {
    let zero = BigDecimal::from(0);
    if cart_total <= &zero {
        return zero;
    }
    total_discount * line_total / cart_total
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn coupon(discount_type: &str, value: &str) -> Coupon {
        Coupon {
            id: Uuid::new_v4(),
            code: "SAVE10".to_string(),
            discount_type: discount_type.to_string(),
            discount_value: dec(value),
            min_purchase_amount: BigDecimal::from(0),
            max_discount_amount: None,
            expiry_date: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  save10 "), "SAVE10");
    }

    #[test]
    fn test_percentage_discount() {
        let c = coupon(DISCOUNT_TYPE_PERCENTAGE, "10");
        let d = evaluate(&c, &dec("250"), Utc::now()).unwrap();
        assert_eq!(d.discount_amount, dec("25"));
        assert_eq!(d.final_amount, dec("225"));
    }

    #[test]
    fn test_percentage_discount_capped_by_max() {
        let mut c = coupon(DISCOUNT_TYPE_PERCENTAGE, "50");
        c.max_discount_amount = Some(dec("100"));
        let d = evaluate(&c, &dec("1000"), Utc::now()).unwrap();
        assert_eq!(d.discount_amount, dec("100"));
        assert_eq!(d.final_amount, dec("900"));
    }

    #[test]
    fn test_max_cap_ignored_when_percentage_below_it() {
        let mut c = coupon(DISCOUNT_TYPE_PERCENTAGE, "5");
        c.max_discount_amount = Some(dec("100"));
        let d = evaluate(&c, &dec("200"), Utc::now()).unwrap();
        assert_eq!(d.discount_amount, dec("10"));
    }

    #[test]
    fn test_fixed_discount_clamps_to_cart_amount() {
        let c = coupon(DISCOUNT_TYPE_FIXED, "500");
        let d = evaluate(&c, &dec("300"), Utc::now()).unwrap();
        assert_eq!(d.discount_amount, dec("300"));
        assert_eq!(d.final_amount, dec("0"));
    }

    #[test]
    fn test_fixed_discount_below_cart_amount() {
        let c = coupon(DISCOUNT_TYPE_FIXED, "50");
        let d = evaluate(&c, &dec("300"), Utc::now()).unwrap();
        assert_eq!(d.discount_amount, dec("50"));
        assert_eq!(d.final_amount, dec("250"));
    }

    #[test]
    fn test_inactive_coupon_rejected() {
        let mut c = coupon(DISCOUNT_TYPE_FIXED, "50");
        c.is_active = false;
        assert!(matches!(
            evaluate(&c, &dec("300"), Utc::now()),
            Err(AppError::InactiveCoupon)
        ));
    }

    #[test]
    fn test_expired_coupon_rejected() {
        let mut c = coupon(DISCOUNT_TYPE_FIXED, "50");
        let now = Utc::now();
        c.expiry_date = Some(now - Duration::hours(1));
        assert!(matches!(
            evaluate(&c, &dec("300"), now),
            Err(AppError::ExpiredCoupon)
        ));
    }

    #[test]
    fn test_future_expiry_accepted() {
        let mut c = coupon(DISCOUNT_TYPE_FIXED, "50");
        let now = Utc::now();
        c.expiry_date = Some(now + Duration::days(30));
        assert!(evaluate(&c, &dec("300"), now).is_ok());
    }

    #[test]
    fn test_below_minimum_purchase_carries_minimum() {
        let mut c = coupon(DISCOUNT_TYPE_PERCENTAGE, "10");
        c.min_purchase_amount = dec("500");
        let err = evaluate(&c, &dec("300"), Utc::now()).unwrap_err();
        match err {
            AppError::BelowMinimumPurchase(min) => assert_eq!(min, "500"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_discount_bounded_for_zero_cart() {
        let c = coupon(DISCOUNT_TYPE_FIXED, "50");
        let d = evaluate(&c, &dec("0"), Utc::now()).unwrap();
        assert_eq!(d.discount_amount, dec("0"));
        assert_eq!(d.final_amount, dec("0"));
    }

    #[test]
    fn test_discount_never_exceeds_cart_amount() {
        let amounts = ["0", "1", "99.99", "250", "1000000"];
        let coupons = [
            coupon(DISCOUNT_TYPE_PERCENTAGE, "100"),
            coupon(DISCOUNT_TYPE_FIXED, "12345"),
            {
                let mut c = coupon(DISCOUNT_TYPE_PERCENTAGE, "75");
                c.max_discount_amount = Some(dec("10"));
                c
            },
        ];
        let zero = BigDecimal::from(0);
        for amount in amounts {
            let amount = dec(amount);
            for c in &coupons {
                let d = evaluate(c, &amount, Utc::now()).unwrap();
                assert!(d.discount_amount >= zero);
                assert!(d.discount_amount <= amount);
                assert_eq!(d.final_amount, &amount - &d.discount_amount);
            }
        }
    }

    #[test]
    fn test_line_discount_apportionment() {
        // 200 + 800 cart with a flat 100 discount splits 20 / 80.
        let total = dec("1000");
        let discount = dec("100");
        assert_eq!(line_discount(&dec("200"), &total, &discount), dec("20"));
        assert_eq!(line_discount(&dec("800"), &total, &discount), dec("80"));
    }

    #[test]
    fn test_line_discount_zero_cart_total() {
        assert_eq!(
            line_discount(&dec("0"), &dec("0"), &dec("100")),
            BigDecimal::from(0)
        );
    }

    #[test]
    fn test_line_discount_sum_close_to_total() {
        // Thirds do not divide exactly; the per-line drift stays tiny and is
        // accepted rather than reconciled.
        let total = dec("300");
        let discount = dec("100");
        let lines = [dec("100"), dec("100"), dec("100")];
        let sum: BigDecimal = lines
            .iter()
            .map(|l| line_discount(l, &total, &discount))
            .sum();
        let drift = (&sum - &discount).abs();
        assert!(drift < dec("0.000001"), "drift too large: {}", drift);
    }
}
