pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod gateway;
pub mod handlers;
pub mod notify;
pub mod services;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::config::Config;
use crate::forecast::DemandForecaster;
use crate::gateway::PaymentGateway;
use crate::notify::Notifier;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Config,
    pub gateway: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub forecaster: Arc<dyn DemandForecaster>,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/cart/add", post(handlers::cart::add_to_cart))
        .route("/cart", get(handlers::cart::get_cart))
        .route(
            "/cart/remove/:item_id",
            delete(handlers::cart::remove_from_cart),
        )
        .route("/cart/checkout", post(handlers::cart::checkout))
        .route("/cart/create-order", post(handlers::cart::create_order))
        .route("/cart/verify-payment", post(handlers::cart::verify_payment))
        .route(
            "/coupons",
            post(handlers::coupons::create_coupon).get(handlers::coupons::list_coupons),
        )
        .route("/coupons/validate", post(handlers::coupons::validate_coupon))
        .route(
            "/coupons/:id/deactivate",
            put(handlers::coupons::deactivate_coupon),
        )
        .route("/expired", get(handlers::expired::list_expired))
        .route("/expired/history", get(handlers::expired::expired_history))
        .route("/expired/discard/:id", put(handlers::expired::discard_item))
        .route("/dashboard", get(handlers::reports::dashboard))
        .route("/reports/sales", get(handlers::reports::sales_report))
        .route(
            "/reports/sales/export",
            get(handlers::reports::export_sales_csv),
        )
        .route("/predictions", get(handlers::predictions::predictions))
        .with_state(state)
}
