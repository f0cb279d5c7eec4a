use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::db::models::{Coupon, DISCOUNT_TYPE_FIXED, DISCOUNT_TYPE_PERCENTAGE};
use crate::db::queries;
use crate::domain::coupon;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponPayload {
    pub code: String,
    pub discount_type: String,
    pub discount_value: BigDecimal,
    pub min_purchase_amount: Option<BigDecimal>,
    pub max_discount_amount: Option<BigDecimal>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

pub async fn create_coupon(
    State(state): State<AppState>,
    Json(payload): Json<CreateCouponPayload>,
) -> Result<impl IntoResponse, AppError> {
    let code = coupon::normalize_code(&payload.code);
    if code.is_empty() {
        return Err(AppError::Validation("code is required".to_string()));
    }
    if payload.discount_type != DISCOUNT_TYPE_PERCENTAGE
        && payload.discount_type != DISCOUNT_TYPE_FIXED
    {
        return Err(AppError::Validation(
            "discountType must be 'percentage' or 'fixed'".to_string(),
        ));
    }
    if payload.discount_value <= BigDecimal::from(0) {
        return Err(AppError::Validation(
            "discountValue must be greater than 0".to_string(),
        ));
    }

    let coupon = Coupon {
        id: Uuid::new_v4(),
        code,
        discount_type: payload.discount_type,
        discount_value: payload.discount_value,
        min_purchase_amount: payload.min_purchase_amount.unwrap_or_else(|| BigDecimal::from(0)),
        max_discount_amount: payload.max_discount_amount,
        expiry_date: payload.expiry_date,
        is_active: payload.is_active.unwrap_or(true),
        created_at: Utc::now(),
    };

    let created = match queries::insert_coupon(&state.db, &coupon).await {
        Ok(created) => created,
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            return Err(AppError::DuplicateCoupon);
        }
        Err(e) => return Err(e.into()),
    };

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_coupons(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let coupons = queries::list_coupons(&state.db).await?;
    Ok(Json(coupons))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponPayload {
    pub code: String,
    pub cart_amount: BigDecimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<BigDecimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_amount: Option<BigDecimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Pre-checkout coupon probe. A coupon that does not apply is a `valid:
/// false` answer with the reason, not an error status.
pub async fn validate_coupon(
    State(state): State<AppState>,
    Json(payload): Json<ValidateCouponPayload>,
) -> Result<impl IntoResponse, AppError> {
    let code = coupon::normalize_code(&payload.code);
    let Some(found) = queries::get_coupon_by_code(&state.db, &code).await? else {
        return Ok(Json(ValidateCouponResponse {
            valid: false,
            discount_amount: None,
            final_amount: None,
            code: None,
            message: Some("Coupon not found".to_string()),
        }));
    };

    match coupon::evaluate(&found, &payload.cart_amount, Utc::now()) {
        Ok(discount) => Ok(Json(ValidateCouponResponse {
            valid: true,
            discount_amount: Some(discount.discount_amount),
            final_amount: Some(discount.final_amount),
            code: Some(found.code),
            message: None,
        })),
        Err(e) => Ok(Json(ValidateCouponResponse {
            valid: false,
            discount_amount: None,
            final_amount: None,
            code: None,
            message: Some(e.to_string()),
        })),
    }
}

pub async fn deactivate_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let coupon = queries::deactivate_coupon(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Coupon".to_string()))?;
    Ok(Json(coupon))
}
