//! Read-only aggregations over the purchase ledger and the catalog for the
//! dashboard and sales reports. Nothing here mutates state.

use crate::db::queries;
use crate::error::AppError;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LowStockItem {
    pub id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub price: BigDecimal,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MostSoldItem {
    pub name: String,
    pub total_quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySales {
    pub date: NaiveDate,
    pub total: BigDecimal,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySales {
    pub year: i32,
    pub month: u32,
    pub total: BigDecimal,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAnalytics {
    pub total_sales_today: BigDecimal,
    pub total_sales_month: BigDecimal,
    pub total_orders: i64,
    pub low_stock_items: Vec<LowStockItem>,
    pub most_sold_items: Vec<MostSoldItem>,
    pub sales_by_date: Vec<DailySales>,
    pub monthly_trend: Vec<MonthlySales>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub total_sales: BigDecimal,
    pub total_orders: i64,
    pub sales_by_date: Vec<DailySales>,
}

pub struct ReportingService {
    pool: PgPool,
}

impl ReportingService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn dashboard(&self) -> Result<DashboardAnalytics, AppError> {
        let now = Utc::now();
        let today = now.date_naive();
        let start_of_today = start_of_day(today);
        let start_of_month = start_of_day(today.with_day(1).unwrap_or(today));
        let seven_days_ago = start_of_day(today - Duration::days(6));
        let six_months_ago = start_of_day(months_back(today, 5));

        let total_sales_today = queries::sales_total_since(&self.pool, start_of_today).await?;
        let total_sales_month = queries::sales_total_since(&self.pool, start_of_month).await?;
        let total_orders = queries::count_purchases(&self.pool).await?;

        let low_stock_items = sqlx::query_as::<_, LowStockItem>(
            r#"
            SELECT id, name, quantity, price, image FROM items
            WHERE quantity <= min_stock_level AND NOT is_discarded
            ORDER BY quantity ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let most_sold_items = sqlx::query_as::<_, MostSoldItem>(
            r#"
            SELECT item_name AS name, SUM(quantity)::BIGINT AS total_quantity
            FROM purchase_history
            GROUP BY item_name
            ORDER BY total_quantity DESC
            LIMIT 5
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let daily_rows = self.daily_sales_rows(Some(seven_days_ago), None).await?;
        let sales_by_date = fill_daily(daily_rows, today - Duration::days(6), 7);

        let monthly_rows: Vec<(NaiveDate, BigDecimal, i64)> = sqlx::query_as(
            r#"
            SELECT DATE_TRUNC('month', purchase_date)::DATE AS month,
                   COALESCE(SUM(total_amount), 0) AS total,
                   COALESCE(SUM(quantity), 0)::BIGINT AS quantity
            FROM purchase_history
            WHERE purchase_date >= $1
            GROUP BY month
            ORDER BY month
            "#,
        )
        .bind(six_months_ago)
        .fetch_all(&self.pool)
        .await?;
        let monthly_trend = fill_monthly(monthly_rows, today, 6);

        Ok(DashboardAnalytics {
            total_sales_today,
            total_sales_month,
            total_orders,
            low_stock_items,
            most_sold_items,
            sales_by_date,
            monthly_trend,
        })
    }

    pub async fn sales_report(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<SalesReport, AppError> {
        let (total_sales, total_orders): (BigDecimal, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(total_amount), 0), COUNT(*)
            FROM purchase_history
            WHERE ($1::timestamptz IS NULL OR purchase_date >= $1)
              AND ($2::timestamptz IS NULL OR purchase_date <= $2)
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        let rows = self.daily_sales_rows(from, to).await?;
        let sales_by_date = rows
            .into_iter()
            .map(|(date, total, quantity)| DailySales {
                date,
                total,
                quantity,
            })
            .collect();

        Ok(SalesReport {
            total_sales,
            total_orders,
            sales_by_date,
        })
    }

    async fn daily_sales_rows(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<(NaiveDate, BigDecimal, i64)>, AppError> {
        Ok(sqlx::query_as(
            r#"
            SELECT purchase_date::DATE AS day,
                   COALESCE(SUM(total_amount), 0) AS total,
                   COALESCE(SUM(quantity), 0)::BIGINT AS quantity
            FROM purchase_history
            WHERE ($1::timestamptz IS NULL OR purchase_date >= $1)
              AND ($2::timestamptz IS NULL OR purchase_date <= $2)
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?)
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// First day of the month `months` before the one containing `date`.
fn months_back(date: NaiveDate, months: u32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 - months as i32;
    let (year, month0) = (total.div_euclid(12), total.rem_euclid(12) as u32);
    NaiveDate::from_ymd_opt(year, month0 + 1, 1).unwrap_or(date)
}

/// Charts expect a dense series; absent days become zero rows.
fn fill_daily(
    rows: Vec<(NaiveDate, BigDecimal, i64)>,
    start: NaiveDate,
    days: i64,
) -> Vec<DailySales> {
    let by_date: HashMap<NaiveDate, (BigDecimal, i64)> = rows
        .into_iter()
        .map(|(date, total, quantity)| (date, (total, quantity)))
        .collect();

    (0..days)
        .map(|offset| {
            let date = start + Duration::days(offset);
            let (total, quantity) = by_date
                .get(&date)
                .cloned()
                .unwrap_or((BigDecimal::from(0), 0));
            DailySales {
                date,
                total,
                quantity,
            }
        })
        .collect()
}

fn fill_monthly(
    rows: Vec<(NaiveDate, BigDecimal, i64)>,
    today: NaiveDate,
    months: u32,
) -> Vec<MonthlySales> {
    let by_month: HashMap<NaiveDate, (BigDecimal, i64)> = rows
        .into_iter()
        .map(|(month, total, quantity)| (month, (total, quantity)))
        .collect();

    (0..months)
        .rev()
        .map(|back| {
            let month_start = months_back(today, back);
            let (total, quantity) = by_month
                .get(&month_start)
                .cloned()
                .unwrap_or((BigDecimal::from(0), 0));
            MonthlySales {
                year: month_start.year(),
                month: month_start.month(),
                total,
                quantity,
            }
        })
        .collect()
}
