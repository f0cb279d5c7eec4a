use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header, header::HeaderValue},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use csv::Writer;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::db::models::PurchaseRecord;
use crate::db::queries;
use crate::error::AppError;
use crate::services::ReportingService;

pub async fn dashboard(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let analytics = ReportingService::new(state.db.clone()).dashboard().await?;
    Ok(Json(analytics))
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SalesReportQuery {
    /// Start date filter (inclusive) - format: YYYY-MM-DD
    pub start_date: Option<String>,
    /// End date filter (inclusive) - format: YYYY-MM-DD
    pub end_date: Option<String>,
}

/// Parse date string to DateTime<Utc>
fn parse_date(date_str: &str) -> Result<DateTime<Utc>, AppError> {
    // Handle both YYYY-MM-DD and YYYY-MM-DDTHH:MM:SSZ formats
    let date_str = if date_str.len() == 10 {
        format!("{}T00:00:00Z", date_str)
    } else {
        date_str.to_string()
    };

    DateTime::parse_from_rfc3339(&date_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Validation(format!("Invalid date format: {}", e)))
}

fn parse_range(
    query: &SalesReportQuery,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), AppError> {
    let from = query.start_date.as_deref().map(parse_date).transpose()?;
    // End date is inclusive, so filter strictly before the next day.
    let to = query
        .end_date
        .as_deref()
        .map(parse_date)
        .transpose()?
        .map(|dt| dt + chrono::Duration::days(1) - chrono::Duration::nanoseconds(1));
    Ok((from, to))
}

pub async fn sales_report(
    State(state): State<AppState>,
    Query(query): Query<SalesReportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (from, to) = parse_range(&query)?;
    let report = ReportingService::new(state.db.clone())
        .sales_report(from, to)
        .await?;
    Ok(Json(report))
}

/// CSV row representation - uses String for amounts to avoid Serialize issues with BigDecimal
#[derive(Serialize)]
struct PurchaseCsvRow {
    id: String,
    item_name: String,
    quantity: i32,
    price: String,
    total_amount: String,
    discount_amount: String,
    final_amount: String,
    coupon_code: String,
    buyer_name: String,
    buyer_phone: String,
    payment_mode: String,
    purchase_date: String,
}

impl From<&PurchaseRecord> for PurchaseCsvRow {
    fn from(record: &PurchaseRecord) -> Self {
        PurchaseCsvRow {
            id: record.id.to_string(),
            item_name: record.item_name.clone(),
            quantity: record.quantity,
            price: record.price.to_string(),
            total_amount: record.total_amount.to_string(),
            discount_amount: record.discount_amount.to_string(),
            final_amount: record.final_amount.to_string(),
            coupon_code: record.coupon_code.clone().unwrap_or_default(),
            buyer_name: record.buyer_name.clone(),
            buyer_phone: record.buyer_phone.clone(),
            payment_mode: record.payment_mode.clone(),
            purchase_date: record.purchase_date.to_rfc3339(),
        }
    }
}

fn purchases_to_csv(records: &[PurchaseRecord]) -> Result<Vec<u8>, AppError> {
    let mut writer = Writer::from_writer(vec![]);
    for record in records {
        writer
            .serialize(PurchaseCsvRow::from(record))
            .map_err(|e| AppError::Internal(format!("CSV serialization failed: {}", e)))?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV serialization failed: {}", e)))
}

/// Export the sales ledger as a CSV download.
pub async fn export_sales_csv(
    State(state): State<AppState>,
    Query(query): Query<SalesReportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (from, to) = parse_range(&query)?;
    let records = queries::list_purchases(&state.db, from, to).await?;
    let body = purchases_to_csv(&records)?;

    let filename = format!("sales_{}.csv", Utc::now().format("%Y-%m-%d"));
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
            .map_err(|e| AppError::Internal(e.to_string()))?,
    );

    Ok((StatusCode::OK, headers, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use uuid::Uuid;

    fn record() -> PurchaseRecord {
        PurchaseRecord {
            id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            item_name: "Paracetamol 500mg".to_string(),
            quantity: 2,
            price: BigDecimal::from(50),
            total_amount: BigDecimal::from(100),
            discount_amount: BigDecimal::from(10),
            final_amount: BigDecimal::from(90),
            coupon_code: Some("SAVE10".to_string()),
            buyer_name: "Asha".to_string(),
            buyer_phone: "9999999999".to_string(),
            payment_mode: "cash".to_string(),
            purchase_date: Utc::now(),
            razorpay_order_id: None,
            razorpay_payment_id: None,
        }
    }

    #[test]
    fn test_parse_date_day_only() {
        let parsed = parse_date("2026-08-01").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-08-01T00:00:00+00:00");
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("not-a-date").is_err());
    }

    #[test]
    fn test_parse_range_end_date_is_inclusive() {
        let query = SalesReportQuery {
            start_date: Some("2026-08-01".to_string()),
            end_date: Some("2026-08-01".to_string()),
        };
        let (from, to) = parse_range(&query).unwrap();
        let from = from.unwrap();
        let to = to.unwrap();
        assert!(to > from);
        // A purchase late on the end date still falls inside the range.
        let late = parse_date("2026-08-01").unwrap() + chrono::Duration::hours(23);
        assert!(late <= to);
    }

    #[test]
    fn test_csv_row_from_record() {
        let row = PurchaseCsvRow::from(&record());
        assert_eq!(row.item_name, "Paracetamol 500mg");
        assert_eq!(row.final_amount, "90");
        assert_eq!(row.coupon_code, "SAVE10");
    }

    #[test]
    fn test_purchases_to_csv_has_header_and_rows() {
        let body = purchases_to_csv(&[record(), record()]).unwrap();
        let text = String::from_utf8(body).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,item_name,quantity"));
    }
}
