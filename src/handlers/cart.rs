use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;
use crate::gateway::verify_payment_signature;
use crate::services::checkout::CheckoutRequest;
use crate::services::{CartService, CheckoutService};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartPayload {
    pub item_id: Uuid,
    pub quantity: i32,
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    Json(payload): Json<AddToCartPayload>,
) -> Result<impl IntoResponse, AppError> {
    let cart = CartService::new(state.db.clone())
        .add_to_cart(payload.item_id, payload.quantity)
        .await?;
    Ok(Json(cart))
}

pub async fn get_cart(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let cart = CartService::new(state.db.clone()).get_cart().await?;
    Ok(Json(cart))
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let cart = CartService::new(state.db.clone())
        .remove_from_cart(item_id)
        .await?;
    Ok(Json(cart))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    pub buyer_name: String,
    pub buyer_phone: String,
    pub buyer_email: Option<String>,
    pub payment_mode: String,
    pub coupon_code: Option<String>,
}

/// Direct (cash-counter) checkout.
pub async fn checkout(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutPayload>,
) -> Result<impl IntoResponse, AppError> {
    let service = CheckoutService::new(
        state.db.clone(),
        state.notifier.clone(),
        state.config.currency.clone(),
    );
    service
        .checkout(CheckoutRequest {
            buyer_name: payload.buyer_name,
            buyer_phone: payload.buyer_phone,
            buyer_email: payload.buyer_email,
            payment_mode: payload.payment_mode,
            coupon_code: payload.coupon_code,
            razorpay_order_id: None,
            razorpay_payment_id: None,
        })
        .await?;

    Ok(Json(json!({ "message": "Checkout successful" })))
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderPayload {
    pub amount: BigDecimal,
}

/// Creates a payment-gateway order for the cart total. Amounts go to the
/// gateway in the currency's minor unit (paise).
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, AppError> {
    let cart = CartService::new(state.db.clone()).get_cart().await?;
    if cart.items.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let amount_minor = (payload.amount * BigDecimal::from(100))
        .round(0)
        .to_i64()
        .unwrap_or(0);
    if amount_minor < 100 {
        return Err(AppError::Validation("Invalid amount".to_string()));
    }

    let receipt = format!("receipt_{}", Utc::now().timestamp_millis());
    let order = state
        .gateway
        .create_order(amount_minor, &state.config.currency, &receipt)
        .await
        .map_err(|e| AppError::Gateway(e.to_string()))?;

    Ok(Json(json!({
        "orderId": order.order_id,
        "key": state.config.razorpay_key_id,
        "amount": order.amount_minor,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentPayload {
    #[serde(rename = "razorpay_order_id")]
    pub razorpay_order_id: String,
    #[serde(rename = "razorpay_payment_id")]
    pub razorpay_payment_id: String,
    #[serde(rename = "razorpay_signature")]
    pub razorpay_signature: String,
    pub buyer_name: String,
    pub buyer_phone: String,
    pub buyer_email: Option<String>,
    pub payment_mode: Option<String>,
    pub coupon_code: Option<String>,
}

/// Gateway-verified checkout: the callback signature must check out before
/// any ledger or cart mutation happens.
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(payload): Json<VerifyPaymentPayload>,
) -> Result<impl IntoResponse, AppError> {
    if !verify_payment_signature(
        &state.config.razorpay_key_secret,
        &payload.razorpay_order_id,
        &payload.razorpay_payment_id,
        &payload.razorpay_signature,
    ) {
        return Err(AppError::PaymentVerificationFailed);
    }

    let service = CheckoutService::new(
        state.db.clone(),
        state.notifier.clone(),
        state.config.currency.clone(),
    );
    let receipt = service
        .checkout(CheckoutRequest {
            buyer_name: payload.buyer_name,
            buyer_phone: payload.buyer_phone,
            buyer_email: payload.buyer_email,
            payment_mode: payload.payment_mode.unwrap_or_else(|| "card".to_string()),
            coupon_code: payload.coupon_code,
            razorpay_order_id: Some(payload.razorpay_order_id),
            razorpay_payment_id: Some(payload.razorpay_payment_id),
        })
        .await?;

    Ok(Json(json!({
        "message": "Payment verified and checkout successful",
        "razorpayPaymentId": receipt.payment_id,
    })))
}
