//! # Seed Data Generator
//!
//! Populates the database with development coupons and gift cards.
//!
//! ## Usage
//! ```bash
//! # Seed with defaults
//! cargo run -p meridian-db --bin seed
//!
//! # Specify database path
//! cargo run -p meridian-db --bin seed -- --db ./data/meridian.db
//! ```
//!
//! ## Generated Data
//! - A handful of percentage and fixed-amount coupons with varied
//!   minimums, caps, and expiry dates (including one already expired and
//!   one already exhausted, for exercising the error paths)
//! - Gift cards with varied balances

use chrono::{Duration, Utc};
use std::env;
use uuid::Uuid;

use meridian_core::{normalize_code, Coupon, DiscountRule, GiftCard};
use meridian_db::{Database, DbConfig};

/// Coupon seed definitions: (code, rule, min cart, days until expiry, usage limit)
const COUPONS: &[(&str, DiscountRule, i64, i64, i64)] = &[
    (
        "SAVE10",
        DiscountRule::Percentage {
            rate_bps: 1000,
            max_discount_cents: 500,
        },
        1000,
        90,
        1000,
    ),
    (
        "SAVE20",
        DiscountRule::Percentage {
            rate_bps: 2000,
            max_discount_cents: 2000,
        },
        5000,
        30,
        200,
    ),
    (
        "FLAT5",
        DiscountRule::FixedAmount { amount_cents: 500 },
        2000,
        60,
        500,
    ),
    (
        "WELCOME",
        DiscountRule::FixedAmount { amount_cents: 1000 },
        0,
        365,
        10000,
    ),
    // Expired: exercises the Expired rejection path
    (
        "LASTYEAR",
        DiscountRule::Percentage {
            rate_bps: 1500,
            max_discount_cents: 1500,
        },
        0,
        -30,
        100,
    ),
];

/// Gift card seed definitions: (code, amount in cents)
const GIFT_CARDS: &[(&str, i64)] = &[
    ("GIFT-ALPHA", 5000),
    ("GIFT-BRAVO", 10000),
    ("GIFT-CHARLIE", 2500),
    ("GIFT-EMPTY", 500),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./meridian_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Meridian Commerce Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./meridian_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Meridian Commerce Seed Data Generator");
    println!("========================================");
    println!("Database: {}", db_path);
    println!();

    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");
    println!();

    let existing = db.coupons().list().await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} coupons", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!("Seeding coupons...");
    let now = Utc::now();

    for (code, rule, min_cart, expiry_days, usage_limit) in COUPONS {
        let coupon = Coupon {
            id: Uuid::new_v4().to_string(),
            code: normalize_code(code),
            description: Some(format!("Seed coupon {}", code)),
            discount: *rule,
            min_cart_value_cents: *min_cart,
            expires_at: now + Duration::days(*expiry_days),
            usage_limit: *usage_limit,
            usage_count: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = db.coupons().insert(&coupon).await {
            eprintln!("Failed to insert {}: {}", code, e);
            continue;
        }
        println!("  + {}", code);
    }

    println!();
    println!("Seeding gift cards...");

    for (code, amount_cents) in GIFT_CARDS {
        let card = GiftCard {
            id: Uuid::new_v4().to_string(),
            code: normalize_code(code),
            initial_amount_cents: *amount_cents,
            balance_cents: *amount_cents,
            expires_at: Some(now + Duration::days(365)),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = db.gift_cards().insert(&card).await {
            eprintln!("Failed to insert {}: {}", code, e);
            continue;
        }
        println!("  + {} ({} cents)", code, amount_cents);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
