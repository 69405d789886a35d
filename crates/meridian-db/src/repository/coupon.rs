//! # Coupon Repository
//!
//! Database operations for coupons and their redemptions.
//!
//! ## Redemption Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Coupon Redemption                                   │
//! │                                                                         │
//! │  1. PREVIEW (no repository mutation)                                   │
//! │     └── get_by_code() → Coupon → evaluate() in meridian-core           │
//! │                                                                         │
//! │  2. APPLY (checkout)                                                   │
//! │     └── redeem_for_order() — ONE transaction:                          │
//! │         ├── INSERT coupon_redemptions (order_id UNIQUE)                │
//! │         │      duplicate → AlreadyApplied, nothing counted             │
//! │         └── UPDATE coupons SET usage_count = usage_count + 1           │
//! │             WHERE usage_count < usage_limit AND is_active = 1          │
//! │                guard fails → rollback → NotEligible                    │
//! │                                                                         │
//! │  The increment is one conditional statement, never a read followed     │
//! │  by a write — two concurrent checkouts cannot both take the last use.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use meridian_core::{Coupon, DiscountRule};

// =============================================================================
// Row Mapping
// =============================================================================

/// Raw coupon row. The discount rule is decomposed into columns in SQLite
/// and reassembled into the tagged enum here.
#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: String,
    code: String,
    description: Option<String>,
    discount_type: String,
    rate_bps: Option<i64>,
    max_discount_cents: Option<i64>,
    amount_cents: Option<i64>,
    min_cart_value_cents: i64,
    expires_at: DateTime<Utc>,
    usage_limit: i64,
    usage_count: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = DbError;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        let discount = match row.discount_type.as_str() {
            "percentage" => DiscountRule::Percentage {
                rate_bps: row.rate_bps.unwrap_or(0) as u32,
                max_discount_cents: row.max_discount_cents.unwrap_or(i64::MAX),
            },
            "fixed_amount" => DiscountRule::FixedAmount {
                amount_cents: row.amount_cents.unwrap_or(0),
            },
            other => {
                return Err(DbError::Internal(format!(
                    "coupon {} has unknown discount_type '{}'",
                    row.id, other
                )))
            }
        };

        Ok(Coupon {
            id: row.id,
            code: row.code,
            description: row.description,
            discount,
            min_cart_value_cents: row.min_cart_value_cents,
            expires_at: row.expires_at,
            usage_limit: row.usage_limit,
            usage_count: row.usage_count,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Splits a discount rule into its column representation.
fn rule_columns(rule: &DiscountRule) -> (&'static str, Option<i64>, Option<i64>, Option<i64>) {
    match *rule {
        DiscountRule::Percentage {
            rate_bps,
            max_discount_cents,
        } => (
            "percentage",
            Some(rate_bps as i64),
            Some(max_discount_cents),
            None,
        ),
        DiscountRule::FixedAmount { amount_cents } => {
            ("fixed_amount", None, None, Some(amount_cents))
        }
    }
}

// =============================================================================
// Redemption Outcome
// =============================================================================

/// Result of an attempted redemption.
///
/// Distinguishing these cases matters at checkout: `AlreadyApplied` on a
/// retried request is success-shaped (the order DID get its discount),
/// while `NotEligible` means a concurrent checkout took the last use and
/// this one must fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedemptionOutcome {
    /// Usage counted and redemption recorded.
    Applied,
    /// This order already recorded a redemption; nothing was counted.
    AlreadyApplied,
    /// The conditional update guard refused (limit exhausted or
    /// deactivated between re-validation and consume).
    NotEligible,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for coupon database operations.
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    /// Creates a new CouponRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Inserts a new coupon.
    ///
    /// The caller is responsible for normalizing `coupon.code` first
    /// (see `meridian_core::normalize_code`).
    pub async fn insert(&self, coupon: &Coupon) -> DbResult<()> {
        debug!(id = %coupon.id, code = %coupon.code, "Inserting coupon");

        let (discount_type, rate_bps, max_discount_cents, amount_cents) =
            rule_columns(&coupon.discount);

        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, code, description,
                discount_type, rate_bps, max_discount_cents, amount_cents,
                min_cart_value_cents, expires_at,
                usage_limit, usage_count, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&coupon.id)
        .bind(&coupon.code)
        .bind(&coupon.description)
        .bind(discount_type)
        .bind(rate_bps)
        .bind(max_discount_cents)
        .bind(amount_cents)
        .bind(coupon.min_cart_value_cents)
        .bind(coupon.expires_at)
        .bind(coupon.usage_limit)
        .bind(coupon.usage_count)
        .bind(coupon.is_active)
        .bind(coupon.created_at)
        .bind(coupon.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("code", &coupon.code),
            other => other,
        })?;

        Ok(())
    }

    /// Gets a coupon by its normalized code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Coupon>> {
        let row: Option<CouponRow> = sqlx::query_as(
            r#"
            SELECT id, code, description,
                   discount_type, rate_bps, max_discount_cents, amount_cents,
                   min_cart_value_cents, expires_at,
                   usage_limit, usage_count, is_active,
                   created_at, updated_at
            FROM coupons
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// Gets a coupon by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Coupon>> {
        let row: Option<CouponRow> = sqlx::query_as(
            r#"
            SELECT id, code, description,
                   discount_type, rate_bps, max_discount_cents, amount_cents,
                   min_cart_value_cents, expires_at,
                   usage_limit, usage_count, is_active,
                   created_at, updated_at
            FROM coupons
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// Lists all coupons, newest first (admin panel).
    pub async fn list(&self) -> DbResult<Vec<Coupon>> {
        let rows: Vec<CouponRow> = sqlx::query_as(
            r#"
            SELECT id, code, description,
                   discount_type, rate_bps, max_discount_cents, amount_cents,
                   min_cart_value_cents, expires_at,
                   usage_limit, usage_count, is_active,
                   created_at, updated_at
            FROM coupons
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Coupon::try_from).collect()
    }

    /// Updates an existing coupon's definition (admin edit).
    ///
    /// `usage_count` is deliberately NOT writable here — only
    /// `redeem_for_order` touches it.
    pub async fn update(&self, coupon: &Coupon) -> DbResult<()> {
        let now = Utc::now();
        let (discount_type, rate_bps, max_discount_cents, amount_cents) =
            rule_columns(&coupon.discount);

        let result = sqlx::query(
            r#"
            UPDATE coupons SET
                description = ?2,
                discount_type = ?3,
                rate_bps = ?4,
                max_discount_cents = ?5,
                amount_cents = ?6,
                min_cart_value_cents = ?7,
                expires_at = ?8,
                usage_limit = ?9,
                is_active = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&coupon.id)
        .bind(&coupon.description)
        .bind(discount_type)
        .bind(rate_bps)
        .bind(max_discount_cents)
        .bind(amount_cents)
        .bind(coupon.min_cart_value_cents)
        .bind(coupon.expires_at)
        .bind(coupon.usage_limit)
        .bind(coupon.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", &coupon.id));
        }

        Ok(())
    }

    /// Removes a coupon (admin delete).
    ///
    /// ## Soft-Deactivate Invariant
    /// A coupon referenced by an order's redemption history is deactivated
    /// instead of deleted, so order audit trails keep resolving.
    ///
    /// ## Returns
    /// * `true` - coupon was physically deleted (never redeemed)
    /// * `false` - coupon was deactivated (redemptions exist)
    pub async fn remove(&self, id: &str) -> DbResult<bool> {
        let redemptions = self.redemption_count(id).await?;

        if redemptions > 0 {
            let now = Utc::now();
            let result = sqlx::query(
                "UPDATE coupons SET is_active = 0, updated_at = ?2 WHERE id = ?1",
            )
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::not_found("Coupon", id));
            }

            debug!(id = %id, redemptions, "Coupon deactivated (has redemptions)");
            return Ok(false);
        }

        let result = sqlx::query("DELETE FROM coupons WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", id));
        }

        debug!(id = %id, "Coupon deleted");
        Ok(true)
    }

    /// Counts recorded redemptions for a coupon.
    pub async fn redemption_count(&self, coupon_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM coupon_redemptions WHERE coupon_id = ?1",
        )
        .bind(coupon_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Consumes one use of a coupon for an order, atomically.
    ///
    /// ## What Runs In One Transaction
    /// 1. Insert the redemption row. `order_id` is UNIQUE, so a retried
    ///    request for the same order fails here and nothing is counted —
    ///    apply is at-most-once per order.
    /// 2. Conditionally increment `usage_count`. The WHERE clause carries
    ///    the precondition (`usage_count < usage_limit AND is_active = 1`)
    ///    in the same statement that increments, so two concurrent
    ///    checkouts cannot both take the last use.
    ///
    /// ## Preconditions
    /// The caller has already re-validated the coupon via
    /// `Coupon::evaluate`. A guard failure here means state changed
    /// between re-validation and consume.
    pub async fn redeem_for_order(
        &self,
        coupon_id: &str,
        order_id: &str,
        discount_cents: i64,
    ) -> DbResult<RedemptionOutcome> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let redemption_id = Uuid::new_v4().to_string();

        let inserted = sqlx::query(
            r#"
            INSERT INTO coupon_redemptions (id, coupon_id, order_id, discount_cents, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&redemption_id)
        .bind(coupon_id)
        .bind(order_id)
        .bind(discount_cents)
        .bind(now)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            let db_err = DbError::from(e);
            if db_err.is_unique_violation() {
                tx.rollback().await.ok();
                debug!(order_id = %order_id, "Redemption already recorded for order");
                return Ok(RedemptionOutcome::AlreadyApplied);
            }
            return Err(db_err);
        }

        let result = sqlx::query(
            r#"
            UPDATE coupons SET
                usage_count = usage_count + 1,
                updated_at = ?2
            WHERE id = ?1
              AND is_active = 1
              AND usage_count < usage_limit
            "#,
        )
        .bind(coupon_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await.ok();
            debug!(coupon_id = %coupon_id, "Redemption guard refused increment");
            return Ok(RedemptionOutcome::NotEligible);
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(coupon_id = %coupon_id, order_id = %order_id, discount_cents, "Coupon redeemed");
        Ok(RedemptionOutcome::Applied)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;
    use meridian_core::OrderStatus;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn test_coupon(code: &str, usage_limit: i64) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            description: None,
            discount: DiscountRule::Percentage {
                rate_bps: 1000,
                max_discount_cents: 500,
            },
            min_cart_value_cents: 1000,
            expires_at: now + Duration::days(30),
            usage_limit,
            usage_count: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    async fn insert_order(db: &Database, id: &str) {
        let now = Utc::now();
        let order = meridian_core::Order {
            id: id.to_string(),
            order_number: format!("ORD-{}", id),
            status: OrderStatus::Pending,
            subtotal_cents: 2000,
            discount_cents: 0,
            total_cents: 2000,
            currency: "USD".to_string(),
            coupon_code: None,
            payment_reference: None,
            shipment_reference: None,
            created_at: now,
            updated_at: now,
            paid_at: None,
        };
        db.orders().insert(&order, &[]).await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_get_by_code() {
        let db = test_db().await;
        let coupon = test_coupon("SAVE10", 100);

        db.coupons().insert(&coupon).await.unwrap();

        let loaded = db.coupons().get_by_code("SAVE10").await.unwrap().unwrap();
        assert_eq!(loaded.code, "SAVE10");
        assert_eq!(
            loaded.discount,
            DiscountRule::Percentage {
                rate_bps: 1000,
                max_discount_cents: 500,
            }
        );
        assert_eq!(loaded.usage_count, 0);
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = test_db().await;
        db.coupons().insert(&test_coupon("SAVE10", 100)).await.unwrap();

        let err = db
            .coupons()
            .insert(&test_coupon("SAVE10", 50))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_redeem_increments_once_per_order() {
        let db = test_db().await;
        let coupon = test_coupon("SAVE10", 100);
        db.coupons().insert(&coupon).await.unwrap();
        insert_order(&db, "order-1").await;

        let first = db
            .coupons()
            .redeem_for_order(&coupon.id, "order-1", 200)
            .await
            .unwrap();
        assert_eq!(first, RedemptionOutcome::Applied);

        // Retried request for the same order: counted exactly once
        let second = db
            .coupons()
            .redeem_for_order(&coupon.id, "order-1", 200)
            .await
            .unwrap();
        assert_eq!(second, RedemptionOutcome::AlreadyApplied);

        let loaded = db.coupons().get_by_id(&coupon.id).await.unwrap().unwrap();
        assert_eq!(loaded.usage_count, 1);
    }

    #[tokio::test]
    async fn test_redeem_guard_refuses_past_limit() {
        let db = test_db().await;
        let coupon = test_coupon("ONCE", 1);
        db.coupons().insert(&coupon).await.unwrap();
        insert_order(&db, "order-1").await;
        insert_order(&db, "order-2").await;

        let first = db
            .coupons()
            .redeem_for_order(&coupon.id, "order-1", 200)
            .await
            .unwrap();
        assert_eq!(first, RedemptionOutcome::Applied);

        let second = db
            .coupons()
            .redeem_for_order(&coupon.id, "order-2", 200)
            .await
            .unwrap();
        assert_eq!(second, RedemptionOutcome::NotEligible);

        // Guard failure counted nothing and recorded nothing
        let loaded = db.coupons().get_by_id(&coupon.id).await.unwrap().unwrap();
        assert_eq!(loaded.usage_count, 1);
        assert_eq!(db.coupons().redemption_count(&coupon.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remove_soft_deactivates_when_redeemed() {
        let db = test_db().await;
        let coupon = test_coupon("SAVE10", 100);
        db.coupons().insert(&coupon).await.unwrap();
        insert_order(&db, "order-1").await;

        db.coupons()
            .redeem_for_order(&coupon.id, "order-1", 200)
            .await
            .unwrap();

        let deleted = db.coupons().remove(&coupon.id).await.unwrap();
        assert!(!deleted, "redeemed coupon must be deactivated, not deleted");

        let loaded = db.coupons().get_by_id(&coupon.id).await.unwrap().unwrap();
        assert!(!loaded.is_active);
    }

    #[tokio::test]
    async fn test_remove_deletes_when_never_redeemed() {
        let db = test_db().await;
        let coupon = test_coupon("UNUSED", 100);
        db.coupons().insert(&coupon).await.unwrap();

        let deleted = db.coupons().remove(&coupon.id).await.unwrap();
        assert!(deleted);
        assert!(db.coupons().get_by_id(&coupon.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_does_not_touch_usage_count() {
        let db = test_db().await;
        let mut coupon = test_coupon("SAVE10", 100);
        db.coupons().insert(&coupon).await.unwrap();
        insert_order(&db, "order-1").await;
        db.coupons()
            .redeem_for_order(&coupon.id, "order-1", 200)
            .await
            .unwrap();

        coupon.description = Some("spring sale".to_string());
        coupon.usage_count = 0; // stale in-memory value
        db.coupons().update(&coupon).await.unwrap();

        let loaded = db.coupons().get_by_id(&coupon.id).await.unwrap().unwrap();
        assert_eq!(loaded.usage_count, 1, "update must not reset the counter");
        assert_eq!(loaded.description.as_deref(), Some("spring sale"));
    }
}
