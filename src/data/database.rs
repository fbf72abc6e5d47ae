//! SQLite database operations
//!
//! All database access goes through this module. Uniqueness of emails,
//! usernames and follow edges is enforced by unique indexes, not by
//! application-level locks.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, QueryBuilder, Sqlite};
use std::path::Path;
use std::str::FromStr;

use super::models::*;
use crate::error::AppError;

/// Message of a unique-constraint violation, if `error` is one.
fn unique_violation_message(error: &sqlx::Error) -> Option<String> {
    match error {
        sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
            Some(db_error.message().to_string())
        }
        _ => None,
    }
}

/// Translate an account write failure into a conflict on the offending key.
fn map_account_write_error(error: sqlx::Error) -> AppError {
    match unique_violation_message(&error) {
        Some(message) if message.contains("email") => {
            AppError::Conflict("email has already been taken".to_string())
        }
        Some(message) if message.contains("username") => {
            AppError::Conflict("username has already been taken".to_string())
        }
        Some(_) => AppError::Conflict("account already exists".to_string()),
        None => AppError::Database(error),
    }
}

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Insert a newly registered account
    ///
    /// # Errors
    /// `AppError::Conflict` if the email or username is already taken
    pub async fn insert_account(&self, account: &Account) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, email, username, password_hash, bio, image, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.id)
        .bind(&account.email)
        .bind(&account.username)
        .bind(&account.password_hash)
        .bind(&account.bio)
        .bind(&account.image)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_account_write_error)?;

        Ok(())
    }

    pub async fn get_account_by_id(&self, id: &str) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    pub async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    pub async fn get_account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    /// Patch account fields by account ID.
    ///
    /// Only the fields set in `patch` are written. An empty patch is a no-op.
    ///
    /// # Returns
    /// `true` if updated, `false` if no matching account row exists.
    ///
    /// # Errors
    /// `AppError::Conflict` if the new email or username is already taken
    pub async fn patch_account(
        &self,
        account_id: &str,
        patch: &AccountPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        if patch.is_empty() {
            return Ok(true);
        }

        let mut query_builder = QueryBuilder::<Sqlite>::new("UPDATE accounts SET ");
        {
            let mut assignments = query_builder.separated(", ");
            let columns = [
                ("email", &patch.email),
                ("username", &patch.username),
                ("password_hash", &patch.password_hash),
                ("bio", &patch.bio),
                ("image", &patch.image),
            ];
            for (column, value) in columns {
                if let Some(value) = value {
                    assignments.push(format!("{column} = "));
                    assignments.push_bind_unseparated(value.clone());
                }
            }
            assignments.push("updated_at = ");
            assignments.push_bind_unseparated(updated_at);
        }
        query_builder.push(" WHERE id = ");
        query_builder.push_bind(account_id);

        let result = query_builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_account_write_error)?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn count_accounts(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Follows
    // =========================================================================

    /// Insert a follow edge
    ///
    /// # Errors
    /// `AppError::Conflict` if `follower_id` already follows `followed_id`.
    /// Of two concurrent inserts for the same pair exactly one succeeds.
    pub async fn insert_follow(
        &self,
        follower_id: &str,
        followed_id: &str,
    ) -> Result<Follow, AppError> {
        let follow = Follow::new(follower_id, followed_id);

        sqlx::query(
            "INSERT INTO follows (id, follower_id, followed_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&follow.id)
        .bind(&follow.follower_id)
        .bind(&follow.followed_id)
        .bind(follow.created_at)
        .bind(follow.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if unique_violation_message(&error).is_some() {
                AppError::Conflict("already following".to_string())
            } else {
                AppError::Database(error)
            }
        })?;

        Ok(follow)
    }

    /// Delete a follow edge
    ///
    /// Deleting an edge that does not exist is not an error.
    ///
    /// # Returns
    /// `true` if an edge was removed
    pub async fn delete_follow(
        &self,
        follower_id: &str,
        followed_id: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followed_id = ?")
            .bind(follower_id)
            .bind(followed_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Check whether `follower_id` follows `followed_id`
    pub async fn follow_exists(
        &self,
        follower_id: &str,
        followed_id: &str,
    ) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ? AND followed_id = ?)",
        )
        .bind(follower_id)
        .bind(followed_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists != 0)
    }

    /// Get a follow edge by its ordered pair
    #[cfg(test)]
    pub(crate) async fn get_follow(
        &self,
        follower_id: &str,
        followed_id: &str,
    ) -> Result<Option<Follow>, AppError> {
        let follow = sqlx::query_as::<_, Follow>(
            "SELECT * FROM follows WHERE follower_id = ? AND followed_id = ?",
        )
        .bind(follower_id)
        .bind(followed_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(follow)
    }

    pub async fn count_follows(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
