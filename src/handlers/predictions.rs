use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::AppState;
use crate::error::AppError;
use crate::forecast::ForecastError;

#[derive(Debug, Deserialize)]
pub struct PredictionsQuery {
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_days() -> u32 {
    7
}

pub async fn predictions(
    State(state): State<AppState>,
    Query(query): Query<PredictionsQuery>,
) -> Result<impl IntoResponse, AppError> {
    if query.days == 0 || query.days > 365 {
        return Err(AppError::Validation(
            "days must be between 1 and 365".to_string(),
        ));
    }

    let forecasts = state
        .forecaster
        .forecast(query.days)
        .await
        .map_err(|e| match e {
            ForecastError::NotConfigured => {
                AppError::Validation("Forecasting service is not configured".to_string())
            }
            ForecastError::RequestError(e) => AppError::Gateway(e.to_string()),
        })?;

    Ok(Json(forecasts))
}
