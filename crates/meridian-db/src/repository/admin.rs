//! # Admin User Repository
//!
//! Database operations for administrator accounts.
//!
//! Hashing and verification of passwords happen in the API layer; this
//! repository only stores and retrieves the argon2 hash.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use meridian_core::AdminUser;

/// Repository for admin user operations.
#[derive(Debug, Clone)]
pub struct AdminUserRepository {
    pool: SqlitePool,
}

impl AdminUserRepository {
    /// Creates a new AdminUserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AdminUserRepository { pool }
    }

    /// Inserts a new admin user.
    pub async fn insert(&self, user: &AdminUser) -> DbResult<()> {
        debug!(id = %user.id, email = %user.email, "Inserting admin user");

        sqlx::query(
            r#"
            INSERT INTO admin_users (id, email, password_hash, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.role)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("email", &user.email),
            other => other,
        })?;

        Ok(())
    }

    /// Looks up an admin user by email.
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<AdminUser>> {
        let user: Option<AdminUser> = sqlx::query_as(
            r#"
            SELECT id, email, password_hash, role, created_at
            FROM admin_users
            WHERE email = ?1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Counts admin users (used for first-run bootstrap).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admin_users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let user = AdminUser {
            id: Uuid::new_v4().to_string(),
            email: "admin@example.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            role: "admin".to_string(),
            created_at: Utc::now(),
        };

        assert_eq!(db.admin_users().count().await.unwrap(), 0);
        db.admin_users().insert(&user).await.unwrap();
        assert_eq!(db.admin_users().count().await.unwrap(), 1);

        let loaded = db
            .admin_users()
            .get_by_email("admin@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.role, "admin");

        // Duplicate email rejected
        let mut dup = user.clone();
        dup.id = Uuid::new_v4().to_string();
        assert!(db.admin_users().insert(&dup).await.is_err());
    }
}
