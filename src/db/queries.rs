use crate::db::models::{Cart, CartLine, Coupon, Item, PurchaseRecord};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Result, Transaction as SqlxTransaction};
use uuid::Uuid;

// --- Item Queries ---

pub async fn insert_item(pool: &PgPool, item: &Item) -> Result<Item> {
    sqlx::query_as::<_, Item>(
        r#"
        INSERT INTO items (
            id, name, quantity, price, cost_price, min_stock_level, image, details,
            expiry_date, is_expired, is_discarded, discarded_at, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING *
        "#,
    )
    .bind(item.id)
    .bind(&item.name)
    .bind(item.quantity)
    .bind(&item.price)
    .bind(&item.cost_price)
    .bind(item.min_stock_level)
    .bind(&item.image)
    .bind(&item.details)
    .bind(item.expiry_date)
    .bind(item.is_expired)
    .bind(item.is_discarded)
    .bind(item.discarded_at)
    .bind(item.created_at)
    .bind(item.updated_at)
    .fetch_one(pool)
    .await
}

pub async fn get_item(pool: &PgPool, id: Uuid) -> Result<Option<Item>> {
    sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Locks the item row for the duration of the enclosing transaction so that
/// concurrent reservations against the same item serialize.
pub async fn get_item_for_update(
    executor: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<Item>> {
    sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **executor)
        .await
}

pub async fn adjust_item_stock(
    executor: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
    delta: i32,
) -> Result<i32> {
    let (quantity,): (i32,) = sqlx::query_as(
        "UPDATE items SET quantity = quantity + $1, updated_at = NOW() WHERE id = $2 RETURNING quantity",
    )
    .bind(delta)
    .bind(id)
    .fetch_one(&mut **executor)
    .await?;
    Ok(quantity)
}

/// Returns reserved stock to the shelf. Discarded items stay at zero; their
/// stock is never restored by any path.
pub async fn restock_item(
    executor: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
    quantity: i32,
) -> Result<()> {
    sqlx::query(
        "UPDATE items SET quantity = quantity + $1, updated_at = NOW() WHERE id = $2 AND NOT is_discarded",
    )
    .bind(quantity)
    .bind(id)
    .execute(&mut **executor)
    .await?;
    Ok(())
}

pub async fn mark_expired_items(pool: &PgPool, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE items SET is_expired = TRUE, updated_at = NOW()
        WHERE expiry_date < $1 AND NOT is_discarded AND NOT is_expired
        "#,
    )
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn list_active_expired(pool: &PgPool, now: DateTime<Utc>) -> Result<Vec<Item>> {
    sqlx::query_as::<_, Item>(
        "SELECT * FROM items WHERE expiry_date < $1 AND NOT is_discarded ORDER BY expiry_date ASC",
    )
    .bind(now)
    .fetch_all(pool)
    .await
}

pub async fn list_expired_history(pool: &PgPool, now: DateTime<Utc>) -> Result<Vec<Item>> {
    sqlx::query_as::<_, Item>(
        "SELECT * FROM items WHERE expiry_date < $1 ORDER BY expiry_date ASC",
    )
    .bind(now)
    .fetch_all(pool)
    .await
}

/// One-way discard. A repeat call is a no-op that keeps the original
/// `discarded_at` timestamp.
pub async fn discard_item(pool: &PgPool, id: Uuid, now: DateTime<Utc>) -> Result<Option<Item>> {
    sqlx::query_as::<_, Item>(
        r#"
        UPDATE items
        SET is_discarded = TRUE,
            discarded_at = COALESCE(discarded_at, $2),
            quantity = 0,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(now)
    .fetch_optional(pool)
    .await
}

// --- Cart Queries ---

/// Fetches the cart row for a key with a row lock, creating it lazily on
/// first use. The lock serializes every mutation of the same cart.
pub async fn get_or_create_cart_for_update(
    executor: &mut SqlxTransaction<'_, Postgres>,
    cart_key: &str,
) -> Result<Cart> {
    sqlx::query("INSERT INTO carts (id, cart_key) VALUES ($1, $2) ON CONFLICT (cart_key) DO NOTHING")
        .bind(Uuid::new_v4())
        .bind(cart_key)
        .execute(&mut **executor)
        .await?;

    sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE cart_key = $1 FOR UPDATE")
        .bind(cart_key)
        .fetch_one(&mut **executor)
        .await
}

pub async fn get_or_create_cart(pool: &PgPool, cart_key: &str) -> Result<Cart> {
    sqlx::query("INSERT INTO carts (id, cart_key) VALUES ($1, $2) ON CONFLICT (cart_key) DO NOTHING")
        .bind(Uuid::new_v4())
        .bind(cart_key)
        .execute(pool)
        .await?;

    sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE cart_key = $1")
        .bind(cart_key)
        .fetch_one(pool)
        .await
}

pub async fn get_cart_lines(
    executor: &mut SqlxTransaction<'_, Postgres>,
    cart_id: Uuid,
) -> Result<Vec<CartLine>> {
    sqlx::query_as::<_, CartLine>("SELECT * FROM cart_lines WHERE cart_id = $1 ORDER BY line_no")
        .bind(cart_id)
        .fetch_all(&mut **executor)
        .await
}

pub async fn get_cart_lines_pool(pool: &PgPool, cart_id: Uuid) -> Result<Vec<CartLine>> {
    sqlx::query_as::<_, CartLine>("SELECT * FROM cart_lines WHERE cart_id = $1 ORDER BY line_no")
        .bind(cart_id)
        .fetch_all(pool)
        .await
}

pub async fn find_cart_line(
    executor: &mut SqlxTransaction<'_, Postgres>,
    cart_id: Uuid,
    item_id: Uuid,
) -> Result<Option<CartLine>> {
    sqlx::query_as::<_, CartLine>("SELECT * FROM cart_lines WHERE cart_id = $1 AND item_id = $2")
        .bind(cart_id)
        .bind(item_id)
        .fetch_optional(&mut **executor)
        .await
}

pub async fn insert_cart_line(
    executor: &mut SqlxTransaction<'_, Postgres>,
    line: &CartLine,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO cart_lines (id, cart_id, item_id, name, quantity, price, image)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(line.id)
    .bind(line.cart_id)
    .bind(line.item_id)
    .bind(&line.name)
    .bind(line.quantity)
    .bind(&line.price)
    .bind(&line.image)
    .execute(&mut **executor)
    .await?;
    Ok(())
}

pub async fn set_cart_line_quantity(
    executor: &mut SqlxTransaction<'_, Postgres>,
    line_id: Uuid,
    quantity: i32,
) -> Result<()> {
    sqlx::query("UPDATE cart_lines SET quantity = $1 WHERE id = $2")
        .bind(quantity)
        .bind(line_id)
        .execute(&mut **executor)
        .await?;
    Ok(())
}

pub async fn delete_cart_line(
    executor: &mut SqlxTransaction<'_, Postgres>,
    line_id: Uuid,
) -> Result<()> {
    sqlx::query("DELETE FROM cart_lines WHERE id = $1")
        .bind(line_id)
        .execute(&mut **executor)
        .await?;
    Ok(())
}

/// The cart total is derived state: it is always recomputed from the lines in
/// the same transaction as the mutation, never set from the outside.
pub async fn recompute_cart_total(
    executor: &mut SqlxTransaction<'_, Postgres>,
    cart_id: Uuid,
) -> Result<Cart> {
    sqlx::query_as::<_, Cart>(
        r#"
        UPDATE carts
        SET total_amount = COALESCE(
                (SELECT SUM(price * quantity) FROM cart_lines WHERE cart_id = $1), 0),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(cart_id)
    .fetch_one(&mut **executor)
    .await
}

pub async fn clear_cart(
    executor: &mut SqlxTransaction<'_, Postgres>,
    cart_id: Uuid,
) -> Result<()> {
    sqlx::query("DELETE FROM cart_lines WHERE cart_id = $1")
        .bind(cart_id)
        .execute(&mut **executor)
        .await?;
    sqlx::query("UPDATE carts SET total_amount = 0, updated_at = NOW() WHERE id = $1")
        .bind(cart_id)
        .execute(&mut **executor)
        .await?;
    Ok(())
}

// --- Coupon Queries ---

pub async fn insert_coupon(pool: &PgPool, coupon: &Coupon) -> Result<Coupon> {
    sqlx::query_as::<_, Coupon>(
        r#"
        INSERT INTO coupons (
            id, code, discount_type, discount_value, min_purchase_amount,
            max_discount_amount, expiry_date, is_active, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(coupon.id)
    .bind(&coupon.code)
    .bind(&coupon.discount_type)
    .bind(&coupon.discount_value)
    .bind(&coupon.min_purchase_amount)
    .bind(&coupon.max_discount_amount)
    .bind(coupon.expiry_date)
    .bind(coupon.is_active)
    .bind(coupon.created_at)
    .fetch_one(pool)
    .await
}

pub async fn list_coupons(pool: &PgPool) -> Result<Vec<Coupon>> {
    sqlx::query_as::<_, Coupon>("SELECT * FROM coupons ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

/// Lookup is by the normalized (trimmed, uppercased) code; normalization is
/// the caller's responsibility at the API boundary.
pub async fn get_coupon_by_code(pool: &PgPool, code: &str) -> Result<Option<Coupon>> {
    sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await
}

/// One-way transition; there is no reactivation path.
pub async fn deactivate_coupon(pool: &PgPool, id: Uuid) -> Result<Option<Coupon>> {
    sqlx::query_as::<_, Coupon>(
        "UPDATE coupons SET is_active = FALSE WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

// --- Purchase Ledger Queries ---

pub async fn insert_purchases(
    executor: &mut SqlxTransaction<'_, Postgres>,
    records: &[PurchaseRecord],
) -> Result<()> {
    for record in records {
        sqlx::query(
            r#"
            INSERT INTO purchase_history (
                id, item_id, item_name, quantity, price, total_amount, discount_amount,
                final_amount, coupon_code, buyer_name, buyer_phone, payment_mode,
                purchase_date, razorpay_order_id, razorpay_payment_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(record.id)
        .bind(record.item_id)
        .bind(&record.item_name)
        .bind(record.quantity)
        .bind(&record.price)
        .bind(&record.total_amount)
        .bind(&record.discount_amount)
        .bind(&record.final_amount)
        .bind(&record.coupon_code)
        .bind(&record.buyer_name)
        .bind(&record.buyer_phone)
        .bind(&record.payment_mode)
        .bind(record.purchase_date)
        .bind(&record.razorpay_order_id)
        .bind(&record.razorpay_payment_id)
        .execute(&mut **executor)
        .await?;
    }
    Ok(())
}

pub async fn list_purchases(
    pool: &PgPool,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<Vec<PurchaseRecord>> {
    sqlx::query_as::<_, PurchaseRecord>(
        r#"
        SELECT * FROM purchase_history
        WHERE ($1::timestamptz IS NULL OR purchase_date >= $1)
          AND ($2::timestamptz IS NULL OR purchase_date <= $2)
        ORDER BY purchase_date DESC
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

pub async fn count_purchases(pool: &PgPool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM purchase_history")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn sales_total_since(pool: &PgPool, since: DateTime<Utc>) -> Result<BigDecimal> {
    let (total,): (BigDecimal,) = sqlx::query_as(
        "SELECT COALESCE(SUM(total_amount), 0) FROM purchase_history WHERE purchase_date >= $1",
    )
    .bind(since)
    .fetch_one(pool)
    .await?;
    Ok(total)
}
