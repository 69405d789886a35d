//! # meridian-db: Database Layer for Meridian Commerce
//!
//! This crate provides database access for the storefront backend.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Meridian Commerce Data Flow                         │
//! │                                                                         │
//! │  REST handler (validate_coupon, checkout, ...)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    meridian-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (coupon.rs)   │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ CouponRepo    │    │ 001_init.sql │  │   │
//! │  │   │ Connection    │    │ GiftCardRepo  │    │ ...          │  │   │
//! │  │   │ Management    │    │ OrderRepo     │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (WAL mode, foreign keys on)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The One Rule That Matters
//!
//! Usage counters and balances are mutated ONLY through conditional
//! updates whose WHERE clause carries the precondition:
//!
//! ```sql
//! UPDATE coupons SET usage_count = usage_count + 1
//! WHERE id = ? AND is_active = 1 AND usage_count < usage_limit
//! ```
//!
//! A separate read followed by a separate write is a race between two
//! concurrent checkouts. The guarded single statement is not.
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (coupon, gift card, order, admin)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meridian_db::{Database, DbConfig};
//!
//! // Create database with default config
//! let config = DbConfig::new("path/to/meridian.db");
//! let db = Database::new(config).await?;
//!
//! // Use repositories
//! let coupon = db.coupons().get_by_code("SAVE10").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::DbError;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::admin::AdminUserRepository;
pub use repository::coupon::{CouponRepository, RedemptionOutcome};
pub use repository::gift_card::{GiftCardRedeemOutcome, GiftCardRepository};
pub use repository::order::{generate_order_line_id, generate_order_number, OrderRepository};
