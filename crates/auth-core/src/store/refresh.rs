//! Refresh token store
//!
//! Opaque UUID tokens, one row per active session. The lifecycle policy is
//! single-active-token: login revokes whatever was outstanding, every
//! successful refresh consumes the presented token and issues a replacement,
//! logout revokes everything. Rotation consumes its row with a single
//! `DELETE ... RETURNING` so two concurrent refreshes cannot both succeed
//! against the same row.

use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::types::RefreshToken;
use crate::{Error, Result};

#[derive(Clone)]
pub struct RefreshTokenStore {
    pool: SqlitePool,
    ttl: Duration,
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    /// Create and persist a fresh token for `user_id`.
    pub async fn issue(&self, user_id: &str) -> Result<RefreshToken> {
        let token = RefreshToken {
            token: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            expiry_date: Utc::now() + self.ttl,
        };

        sqlx::query("INSERT INTO refresh_tokens (token, user_id, expiry_date) VALUES (?, ?, ?)")
            .bind(&token.token)
            .bind(&token.user_id)
            .bind(token.expiry_date)
            .execute(&self.pool)
            .await?;

        Ok(token)
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let found = sqlx::query_as::<_, RefreshToken>(
            "SELECT token, user_id, expiry_date FROM refresh_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found)
    }

    /// Check expiry on a looked-up token. An expired token is deleted as a
    /// side effect so stale rows do not accumulate.
    pub async fn verify_not_expired(&self, token: RefreshToken) -> Result<RefreshToken> {
        if token.is_expired(Utc::now()) {
            sqlx::query("DELETE FROM refresh_tokens WHERE token = ?")
                .bind(&token.token)
                .execute(&self.pool)
                .await?;
            return Err(Error::RefreshTokenExpired);
        }
        Ok(token)
    }

    /// Atomically consume `token` and issue its replacement.
    ///
    /// Absent row fails with [`Error::RefreshTokenNotFound`]. An expired row
    /// is deleted as a side effect and fails with
    /// [`Error::RefreshTokenExpired`]. When two callers race on the same
    /// token, exactly one sees the replacement; the other gets not-found.
    pub async fn rotate(&self, token: &str) -> Result<RefreshToken> {
        let mut tx = self.pool.begin().await?;

        // Write-first consume: of two concurrent rotations, exactly one gets
        // the row back and the loser deterministically sees not-found.
        let existing = sqlx::query_as::<_, RefreshToken>(
            "DELETE FROM refresh_tokens WHERE token = ? RETURNING token, user_id, expiry_date",
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::RefreshTokenNotFound)?;

        if existing.is_expired(Utc::now()) {
            tx.commit().await?;
            tracing::debug!(user_id = %existing.user_id, "stale refresh token purged");
            return Err(Error::RefreshTokenExpired);
        }

        let replacement = RefreshToken {
            token: Uuid::new_v4().to_string(),
            user_id: existing.user_id,
            expiry_date: Utc::now() + self.ttl,
        };

        sqlx::query("INSERT INTO refresh_tokens (token, user_id, expiry_date) VALUES (?, ?, ?)")
            .bind(&replacement.token)
            .bind(&replacement.user_id)
            .bind(replacement.expiry_date)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(replacement)
    }

    /// Invalidate every outstanding token for `user_id`.
    pub async fn revoke_all_for_user(&self, user_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
