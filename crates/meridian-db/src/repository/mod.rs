//! # Repository Module
//!
//! Database repository implementations for Meridian Commerce.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  REST handler                                                          │
//! │       │                                                                 │
//! │       │  db.coupons().get_by_code("SAVE10")                            │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  CouponRepository                                                      │
//! │  ├── get_by_code(&self, code)                                          │
//! │  ├── insert(&self, coupon)                                             │
//! │  ├── update(&self, coupon)                                             │
//! │  └── redeem_for_order(&self, ...)   ← atomic conditional update        │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • SQL is isolated in one place                                        │
//! │  • The guarded counter updates live next to the schema they guard      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`coupon::CouponRepository`] - Coupon CRUD and atomic redemption
//! - [`gift_card::GiftCardRepository`] - Gift card CRUD and balance decrement
//! - [`order::OrderRepository`] - Orders, lines, status transitions
//! - [`admin::AdminUserRepository`] - Admin accounts

pub mod admin;
pub mod coupon;
pub mod gift_card;
pub mod order;
