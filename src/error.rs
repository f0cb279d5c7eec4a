use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Not enough stock available")]
    InsufficientStock,

    #[error("Cannot add expired medicine")]
    ExpiredItem,

    #[error("Invalid coupon code")]
    InvalidCoupon,

    #[error("Coupon is not active")]
    InactiveCoupon,

    #[error("Coupon has expired")]
    ExpiredCoupon,

    #[error("Minimum purchase amount for this coupon is {0}")]
    BelowMinimumPurchase(String),

    #[error("Coupon code already exists")]
    DuplicateCoupon,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Payment verification failed")]
    PaymentVerificationFailed,

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_)
            | AppError::InsufficientStock
            | AppError::ExpiredItem
            | AppError::InvalidCoupon
            | AppError::InactiveCoupon
            | AppError::ExpiredCoupon
            | AppError::BelowMinimumPurchase(_)
            | AppError::DuplicateCoupon
            | AppError::EmptyCart
            | AppError::PaymentVerificationFailed => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_status_code() {
        let error = AppError::Validation("quantity must be a positive integer".to_string());
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_error_status_code() {
        let error = AppError::NotFound("Item".to_string());
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_business_rule_errors_are_bad_requests() {
        for error in [
            AppError::InsufficientStock,
            AppError::ExpiredItem,
            AppError::InvalidCoupon,
            AppError::InactiveCoupon,
            AppError::ExpiredCoupon,
            AppError::EmptyCart,
            AppError::PaymentVerificationFailed,
        ] {
            assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_database_error_status_code() {
        let error = AppError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_gateway_error_status_code() {
        let error = AppError::Gateway("order creation failed".to_string());
        assert_eq!(error.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_minimum_purchase_message_includes_minimum() {
        let error = AppError::BelowMinimumPurchase("500".to_string());
        assert!(error.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_empty_cart_error_response() {
        let error = AppError::EmptyCart;
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_not_found_error_response() {
        let error = AppError::NotFound("Medicine".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
