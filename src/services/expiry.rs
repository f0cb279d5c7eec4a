//! Expiry and discard management. Status-only mutations of the catalog:
//! nothing here ever touches price or name, and discard is one-way.

use crate::db::models::Item;
use crate::db::queries;
use crate::error::AppError;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

pub struct ExpiryService {
    pool: PgPool,
}

impl ExpiryService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Flags every non-discarded item whose expiry date has passed.
    /// Idempotent; runs from the daily schedule, the CLI, and on demand
    /// before the active-expired listing.
    pub async fn mark_expired(&self) -> Result<u64, AppError> {
        let marked = queries::mark_expired_items(&self.pool, Utc::now()).await?;
        if marked > 0 {
            tracing::info!(marked, "items marked expired");
        }
        Ok(marked)
    }

    /// Expired items still awaiting discard, oldest expiry first.
    pub async fn list_active_expired(&self) -> Result<Vec<Item>, AppError> {
        self.mark_expired().await?;
        Ok(queries::list_active_expired(&self.pool, Utc::now()).await?)
    }

    /// Every item past its expiry date, discarded or not.
    pub async fn list_expired_history(&self) -> Result<Vec<Item>, AppError> {
        Ok(queries::list_expired_history(&self.pool, Utc::now()).await?)
    }

    /// One-way: sets the discard flag, stamps `discarded_at` once, zeroes
    /// stock. Calling it again is a no-op.
    pub async fn discard(&self, item_id: Uuid) -> Result<Item, AppError> {
        let item = queries::discard_item(&self.pool, item_id, Utc::now())
            .await?
            .ok_or_else(|| AppError::NotFound("Medicine".to_string()))?;

        tracing::info!(item_id = %item_id, name = %item.name, "medicine discarded");
        Ok(item)
    }
}
