//! Cart engine: reserves catalog stock at add time, returns it at remove
//! time, and keeps the cart total equal to the sum of its lines.
//!
//! Every mutation runs in one transaction holding row locks on the cart and
//! the item, so the stock decrement and the cart change land together or not
//! at all.

use crate::db::models::{CartLine, CartView, Item};
use crate::db::queries;
use crate::error::AppError;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

/// Single point-of-sale terminal; the keyed-cart storage collapses to this
/// one key.
pub const DEFAULT_CART_KEY: &str = "default";

pub struct CartService {
    pool: PgPool,
}

/// Cart plus the touched item's remaining stock, which the front counter
/// shows after an add.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartWithStock {
    #[serde(flatten)]
    pub cart: CartView,
    pub updated_stock: i32,
}

impl CartService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn add_to_cart(&self, item_id: Uuid, quantity: i32) -> Result<CartWithStock, AppError> {
        if quantity <= 0 {
            return Err(AppError::Validation(
                "quantity must be a positive integer".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let cart = queries::get_or_create_cart_for_update(&mut tx, DEFAULT_CART_KEY).await?;
        let item = queries::get_item_for_update(&mut tx, item_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Item".to_string()))?;

        if item.is_past_expiry(Utc::now()) {
            return Err(AppError::ExpiredItem);
        }

        let existing = queries::find_cart_line(&mut tx, cart.id, item_id).await?;

        // Merging raises the required total to the whole merged line, not
        // just the delta.
        match &existing {
            Some(line) => {
                let merged = line.quantity + quantity;
                if item.quantity < merged {
                    return Err(AppError::InsufficientStock);
                }
            }
            None => {
                if item.quantity < quantity {
                    return Err(AppError::InsufficientStock);
                }
            }
        }

        let updated_stock = queries::adjust_item_stock(&mut tx, item_id, -quantity).await?;

        match existing {
            Some(line) => {
                // The existing line keeps its original snapshot price.
                queries::set_cart_line_quantity(&mut tx, line.id, line.quantity + quantity).await?;
            }
            None => {
                let line = new_line_from_item(cart.id, &item, quantity);
                queries::insert_cart_line(&mut tx, &line).await?;
            }
        }

        let cart = queries::recompute_cart_total(&mut tx, cart.id).await?;
        let lines = queries::get_cart_lines(&mut tx, cart.id).await?;
        tx.commit().await?;

        tracing::info!(item_id = %item_id, quantity, updated_stock, "item added to cart");

        Ok(CartWithStock {
            cart: CartView { cart, items: lines },
            updated_stock,
        })
    }

    /// Lazily creates an empty persisted cart on first read. No stock effect.
    pub async fn get_cart(&self) -> Result<CartView, AppError> {
        let cart = queries::get_or_create_cart(&self.pool, DEFAULT_CART_KEY).await?;
        let lines = queries::get_cart_lines_pool(&self.pool, cart.id).await?;
        Ok(CartView { cart, items: lines })
    }

    /// Removes a line and returns its full reserved quantity to stock.
    /// A missing line is an error, not a no-op.
    pub async fn remove_from_cart(&self, item_id: Uuid) -> Result<CartView, AppError> {
        let mut tx = self.pool.begin().await?;

        let cart = queries::get_or_create_cart_for_update(&mut tx, DEFAULT_CART_KEY).await?;
        let line = queries::find_cart_line(&mut tx, cart.id, item_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Cart item".to_string()))?;

        // Lock the item row before restocking; a discarded or deleted item
        // keeps its stock at zero.
        if let Some(item) = queries::get_item_for_update(&mut tx, item_id).await? {
            if !item.is_discarded {
                queries::restock_item(&mut tx, item_id, line.quantity).await?;
            }
        }

        queries::delete_cart_line(&mut tx, line.id).await?;
        let cart = queries::recompute_cart_total(&mut tx, cart.id).await?;
        let lines = queries::get_cart_lines(&mut tx, cart.id).await?;
        tx.commit().await?;

        tracing::info!(item_id = %item_id, returned = line.quantity, "item removed from cart");

        Ok(CartView { cart, items: lines })
    }
}

fn new_line_from_item(cart_id: Uuid, item: &Item, quantity: i32) -> CartLine {
    CartLine {
        id: Uuid::new_v4(),
        cart_id,
        item_id: item.id,
        name: item.name.clone(),
        quantity,
        price: item.price.clone(),
        image: item.image.clone(),
    }
}
