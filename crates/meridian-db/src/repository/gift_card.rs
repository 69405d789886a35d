//! # Gift Card Repository
//!
//! Database operations for gift cards and their redemptions.
//!
//! ## Balance Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  0 <= balance <= initial_amount, and balance only ever decreases.      │
//! │                                                                         │
//! │  The decrement is a single conditional statement:                      │
//! │                                                                         │
//! │    UPDATE gift_cards SET balance_cents = balance_cents - :amount       │
//! │    WHERE id = :id AND is_active = 1 AND balance_cents >= :amount       │
//! │                                                                         │
//! │  Two concurrent redemptions of the same card each run this guard;      │
//! │  SQLite serializes the writes, so the second one sees the already      │
//! │  reduced balance and refuses if it would go negative. No partial       │
//! │  redemption is ever visible: the balance update and the order linkage  │
//! │  commit together or not at all.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use meridian_core::GiftCard;

// =============================================================================
// Redemption Outcome
// =============================================================================

/// Result of an attempted gift card redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiftCardRedeemOutcome {
    /// Balance decremented and linkage recorded. Carries the new balance.
    Redeemed { balance_cents: i64 },
    /// The guard refused: balance too low, or card deactivated since
    /// validation.
    InsufficientFunds,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for gift card database operations.
#[derive(Debug, Clone)]
pub struct GiftCardRepository {
    pool: SqlitePool,
}

impl GiftCardRepository {
    /// Creates a new GiftCardRepository.
    pub fn new(pool: SqlitePool) -> Self {
        GiftCardRepository { pool }
    }

    /// Inserts a new gift card.
    ///
    /// The caller normalizes `card.code` first.
    pub async fn insert(&self, card: &GiftCard) -> DbResult<()> {
        debug!(id = %card.id, code = %card.code, "Inserting gift card");

        sqlx::query(
            r#"
            INSERT INTO gift_cards (
                id, code, initial_amount_cents, balance_cents,
                expires_at, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&card.id)
        .bind(&card.code)
        .bind(card.initial_amount_cents)
        .bind(card.balance_cents)
        .bind(card.expires_at)
        .bind(card.is_active)
        .bind(card.created_at)
        .bind(card.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("code", &card.code),
            other => other,
        })?;

        Ok(())
    }

    /// Gets a gift card by its normalized code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<GiftCard>> {
        let card: Option<GiftCard> = sqlx::query_as(
            r#"
            SELECT id, code, initial_amount_cents, balance_cents,
                   expires_at, is_active, created_at, updated_at
            FROM gift_cards
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    /// Gets a gift card by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<GiftCard>> {
        let card: Option<GiftCard> = sqlx::query_as(
            r#"
            SELECT id, code, initial_amount_cents, balance_cents,
                   expires_at, is_active, created_at, updated_at
            FROM gift_cards
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    /// Lists all gift cards, newest first (admin panel).
    pub async fn list(&self) -> DbResult<Vec<GiftCard>> {
        let cards: Vec<GiftCard> = sqlx::query_as(
            r#"
            SELECT id, code, initial_amount_cents, balance_cents,
                   expires_at, is_active, created_at, updated_at
            FROM gift_cards
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(cards)
    }

    /// Activates or deactivates a gift card (admin).
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE gift_cards SET is_active = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Gift card", id));
        }

        Ok(())
    }

    /// Redeems an amount from a gift card for an order, atomically.
    ///
    /// ## What Runs In One Transaction
    /// 1. Conditional decrement guarded by `balance_cents >= amount` and
    ///    `is_active = 1` — the precondition is checked in the same
    ///    statement that mutates.
    /// 2. Insert the redemption row linking the order.
    ///
    /// ## Preconditions
    /// The caller has already validated expiry and produced a precise
    /// error for the user. A guard failure here means the balance was
    /// depleted (or the card deactivated) concurrently.
    pub async fn redeem(
        &self,
        card_id: &str,
        order_id: &str,
        amount_cents: i64,
    ) -> DbResult<GiftCardRedeemOutcome> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE gift_cards SET
                balance_cents = balance_cents - ?2,
                updated_at = ?3
            WHERE id = ?1
              AND is_active = 1
              AND balance_cents >= ?2
            "#,
        )
        .bind(card_id)
        .bind(amount_cents)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await.ok();
            debug!(card_id = %card_id, amount_cents, "Gift card guard refused decrement");
            return Ok(GiftCardRedeemOutcome::InsufficientFunds);
        }

        let redemption_id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO gift_card_redemptions (id, gift_card_id, order_id, amount_cents, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&redemption_id)
        .bind(card_id)
        .bind(order_id)
        .bind(amount_cents)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let balance_cents: i64 =
            sqlx::query_scalar("SELECT balance_cents FROM gift_cards WHERE id = ?1")
                .bind(card_id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(card_id = %card_id, order_id = %order_id, amount_cents, balance_cents, "Gift card redeemed");
        Ok(GiftCardRedeemOutcome::Redeemed { balance_cents })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use meridian_core::{Order, OrderStatus};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn test_card(code: &str, balance_cents: i64) -> GiftCard {
        let now = Utc::now();
        GiftCard {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            initial_amount_cents: balance_cents,
            balance_cents,
            expires_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    async fn insert_order(db: &Database, id: &str) {
        let now = Utc::now();
        let order = Order {
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
    async fn test_insert_and_get() {
        let db = test_db().await;
        let card = test_card("GIFT-500", 500);
        db.gift_cards().insert(&card).await.unwrap();

        let loaded = db.gift_cards().get_by_code("GIFT-500").await.unwrap().unwrap();
        assert_eq!(loaded.balance_cents, 500);
        assert_eq!(loaded.initial_amount_cents, 500);
    }

    #[tokio::test]
    async fn test_redeem_decrements_balance() {
        let db = test_db().await;
        let card = test_card("GIFT-500", 500);
        db.gift_cards().insert(&card).await.unwrap();
        insert_order(&db, "order-1").await;

        let outcome = db
            .gift_cards()
            .redeem(&card.id, "order-1", 300)
            .await
            .unwrap();
        assert_eq!(outcome, GiftCardRedeemOutcome::Redeemed { balance_cents: 200 });

        let loaded = db.gift_cards().get_by_id(&card.id).await.unwrap().unwrap();
        assert_eq!(loaded.balance_cents, 200);
    }

    #[tokio::test]
    async fn test_over_redemption_leaves_balance_unchanged() {
        // Balance 500, redeem 700 → InsufficientFunds, balance stays 500
        let db = test_db().await;
        let card = test_card("GIFT-500", 500);
        db.gift_cards().insert(&card).await.unwrap();
        insert_order(&db, "order-1").await;

        let outcome = db
            .gift_cards()
            .redeem(&card.id, "order-1", 700)
            .await
            .unwrap();
        assert_eq!(outcome, GiftCardRedeemOutcome::InsufficientFunds);

        let loaded = db.gift_cards().get_by_id(&card.id).await.unwrap().unwrap();
        assert_eq!(loaded.balance_cents, 500);
    }

    #[tokio::test]
    async fn test_inactive_card_refuses_redemption() {
        let db = test_db().await;
        let card = test_card("GIFT-500", 500);
        db.gift_cards().insert(&card).await.unwrap();
        db.gift_cards().set_active(&card.id, false).await.unwrap();
        insert_order(&db, "order-1").await;

        let outcome = db
            .gift_cards()
            .redeem(&card.id, "order-1", 100)
            .await
            .unwrap();
        assert_eq!(outcome, GiftCardRedeemOutcome::InsufficientFunds);
    }

    #[tokio::test]
    async fn test_redeem_to_exact_zero() {
        let db = test_db().await;
        let card = test_card("GIFT-500", 500);
        db.gift_cards().insert(&card).await.unwrap();
        insert_order(&db, "order-1").await;

        let outcome = db
            .gift_cards()
            .redeem(&card.id, "order-1", 500)
            .await
            .unwrap();
        assert_eq!(outcome, GiftCardRedeemOutcome::Redeemed { balance_cents: 0 });
    }
}
