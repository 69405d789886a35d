//! # Order Repository
//!
//! Database operations for orders and order lines.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CHECKOUT                                                           │
//! │     └── insert() → Order { status: Pending } + snapshot lines          │
//! │         (totals computed once by meridian-core and persisted)          │
//! │                                                                         │
//! │  2. PAYMENT                                                            │
//! │     └── set_payment_reference() → provider order id recorded           │
//! │     └── mark_paid() → only after the provider confirmed the charge     │
//! │                                                                         │
//! │  3. SHIPMENT                                                           │
//! │     └── mark_shipped() → only after the provider confirmed a shipment  │
//! │                                                                         │
//! │  4. (OPTIONAL) CANCEL                                                  │
//! │     └── cancel() → only while still Pending                            │
//! │                                                                         │
//! │  Every transition is a guarded UPDATE on the current status, so a      │
//! │  retried confirm cannot double-advance an order.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use meridian_core::{Order, OrderLine};

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts an order with its lines in one transaction.
    ///
    /// ## Snapshot Pattern
    /// Lines carry frozen product names and unit prices; the order keeps
    /// the totals the customer saw even if the catalog changes later.
    pub async fn insert(&self, order: &Order, lines: &[OrderLine]) -> DbResult<()> {
        debug!(id = %order.id, order_number = %order.order_number, lines = lines.len(), "Inserting order");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, status,
                subtotal_cents, discount_cents, total_cents, currency,
                coupon_code, payment_reference, shipment_reference,
                created_at, updated_at, paid_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(order.status)
        .bind(order.subtotal_cents)
        .bind(order.discount_cents)
        .bind(order.total_cents)
        .bind(&order.currency)
        .bind(&order.coupon_code)
        .bind(&order.payment_reference)
        .bind(&order.shipment_reference)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.paid_at)
        .execute(&mut *tx)
        .await?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO order_lines (
                    id, order_id, product_id,
                    name_snapshot, unit_price_cents, quantity, line_total_cents,
                    created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&line.id)
            .bind(&line.order_id)
            .bind(&line.product_id)
            .bind(&line.name_snapshot)
            .bind(line.unit_price_cents)
            .bind(line.quantity)
            .bind(line.line_total_cents)
            .bind(line.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order: Option<Order> = sqlx::query_as(
            r#"
            SELECT id, order_number, status,
                   subtotal_cents, discount_cents, total_cents, currency,
                   coupon_code, payment_reference, shipment_reference,
                   created_at, updated_at, paid_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Gets all lines for an order.
    pub async fn get_lines(&self, order_id: &str) -> DbResult<Vec<OrderLine>> {
        let lines: Vec<OrderLine> = sqlx::query_as(
            r#"
            SELECT id, order_id, product_id,
                   name_snapshot, unit_price_cents, quantity, line_total_cents,
                   created_at
            FROM order_lines
            WHERE order_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Records an applied coupon on a pending order and re-points its
    /// persisted totals at the discounted amounts.
    ///
    /// Called after `CouponRepository::redeem_for_order` succeeded, so the
    /// usage accounting and the order's totals move together in the apply
    /// flow.
    pub async fn apply_discount(
        &self,
        order_id: &str,
        coupon_code: &str,
        discount_cents: i64,
        total_cents: i64,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                coupon_code = ?2,
                discount_cents = ?3,
                total_cents = ?4,
                updated_at = ?5
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(order_id)
        .bind(coupon_code)
        .bind(discount_cents)
        .bind(total_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order (pending)", order_id));
        }

        debug!(order_id = %order_id, coupon_code = %coupon_code, discount_cents, "Discount applied to order");
        Ok(())
    }

    /// Records the payment provider's order identifier.
    ///
    /// Only valid while the order is still pending.
    pub async fn set_payment_reference(&self, order_id: &str, reference: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                payment_reference = ?2,
                updated_at = ?3
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(order_id)
        .bind(reference)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order (pending)", order_id));
        }

        Ok(())
    }

    /// Marks an order paid.
    ///
    /// ## Precondition
    /// The payment provider explicitly confirmed the charge. The guard on
    /// `status = 'pending'` makes a retried confirmation a no-op error
    /// instead of a double transition.
    pub async fn mark_paid(&self, order_id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = 'paid',
                paid_at = ?2,
                updated_at = ?2
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(order_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order (pending)", order_id));
        }

        debug!(order_id = %order_id, "Order marked paid");
        Ok(())
    }

    /// Marks an order shipped and records the shipment reference.
    ///
    /// ## Precondition
    /// The shipment provider explicitly confirmed a shipment, and the
    /// order was paid first.
    pub async fn mark_shipped(&self, order_id: &str, shipment_reference: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = 'shipped',
                shipment_reference = ?2,
                updated_at = ?3
            WHERE id = ?1 AND status = 'paid'
            "#,
        )
        .bind(order_id)
        .bind(shipment_reference)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order (paid)", order_id));
        }

        debug!(order_id = %order_id, shipment_reference = %shipment_reference, "Order marked shipped");
        Ok(())
    }

    /// Cancels a pending order.
    pub async fn cancel(&self, order_id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = 'cancelled',
                updated_at = ?2
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(order_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order (pending)", order_id));
        }

        debug!(order_id = %order_id, "Order cancelled");
        Ok(())
    }
}

/// Generates an order number in format: YYYYMMDD-NNNN
///
/// ## Format
/// - YYYYMMDD: Date
/// - NNNN: Pseudo-sequence from the clock (collision-resistant enough for
///   a single store; the UNIQUE index is the real guard)
///
/// ## Example
/// `20260806-4821`
pub fn generate_order_number() -> String {
    let now = Utc::now();
    let seq = (now.timestamp_millis() % 10000) as u32;
    format!("{}-{:04}", now.format("%Y%m%d"), seq)
}

/// Generates a new order line ID.
pub fn generate_order_line_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use meridian_core::OrderStatus;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn test_order(id: &str, total_cents: i64) -> Order {
        let now = Utc::now();
        Order {
            id: id.to_string(),
            order_number: format!("ORD-{}", id),
            status: OrderStatus::Pending,
            subtotal_cents: total_cents,
            discount_cents: 0,
            total_cents,
            currency: "USD".to_string(),
            coupon_code: None,
            payment_reference: None,
            shipment_reference: None,
            created_at: now,
            updated_at: now,
            paid_at: None,
        }
    }

    fn test_line(order_id: &str, unit_price_cents: i64, quantity: i64) -> OrderLine {
        OrderLine {
            id: generate_order_line_id(),
            order_id: order_id.to_string(),
            product_id: Uuid::new_v4().to_string(),
            name_snapshot: "Widget".to_string(),
            unit_price_cents,
            quantity,
            line_total_cents: unit_price_cents * quantity,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_with_lines() {
        let db = test_db().await;
        let order = test_order("o1", 2000);
        let lines = vec![test_line("o1", 1000, 2)];

        db.orders().insert(&order, &lines).await.unwrap();

        let loaded = db.orders().get_by_id("o1").await.unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Pending);
        assert_eq!(loaded.total_cents, 2000);

        let loaded_lines = db.orders().get_lines("o1").await.unwrap();
        assert_eq!(loaded_lines.len(), 1);
        assert_eq!(loaded_lines[0].line_total_cents, 2000);
    }

    #[tokio::test]
    async fn test_payment_transitions() {
        let db = test_db().await;
        db.orders().insert(&test_order("o1", 2000), &[]).await.unwrap();

        db.orders()
            .set_payment_reference("o1", "prov_order_123")
            .await
            .unwrap();
        db.orders().mark_paid("o1").await.unwrap();

        let loaded = db.orders().get_by_id("o1").await.unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Paid);
        assert_eq!(loaded.payment_reference.as_deref(), Some("prov_order_123"));
        assert!(loaded.paid_at.is_some());

        // Retried confirmation: guard refuses
        assert!(db.orders().mark_paid("o1").await.is_err());
    }

    #[tokio::test]
    async fn test_ship_requires_paid() {
        let db = test_db().await;
        db.orders().insert(&test_order("o1", 2000), &[]).await.unwrap();

        // Not paid yet
        assert!(db.orders().mark_shipped("o1", "ship_1").await.is_err());

        db.orders().mark_paid("o1").await.unwrap();
        db.orders().mark_shipped("o1", "ship_1").await.unwrap();

        let loaded = db.orders().get_by_id("o1").await.unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Shipped);
        assert_eq!(loaded.shipment_reference.as_deref(), Some("ship_1"));
    }

    #[tokio::test]
    async fn test_cancel_only_pending() {
        let db = test_db().await;
        db.orders().insert(&test_order("o1", 2000), &[]).await.unwrap();

        db.orders().cancel("o1").await.unwrap();
        let loaded = db.orders().get_by_id("o1").await.unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Cancelled);

        // Cancelled orders cannot be paid
        assert!(db.orders().mark_paid("o1").await.is_err());
    }

    #[test]
    fn test_order_number_format() {
        let number = generate_order_number();
        // YYYYMMDD-NNNN
        assert_eq!(number.len(), 13);
        assert_eq!(&number[8..9], "-");
    }
}
