//! Subscription store — the persisted (user, chat) opt-in pairs.
//!
//! The store is the source of truth for who gets notified beyond the live
//! admin list. It is constructed once at startup around a [`SqlitePool`] and
//! injected into whatever needs it; the pool serializes concurrent mutations.

use std::collections::HashSet;

use chrono::Utc;
use sqlx::SqlitePool;

use herald_common::error::AppError;

/// Persistent set of (user, chat) subscription pairs.
#[derive(Clone)]
pub struct SubscriptionStore {
    pool: SqlitePool,
}

impl SubscriptionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Subscribe a user to a chat's spam reports. Idempotent: subscribing
    /// twice leaves a single row.
    pub async fn subscribe(&self, user_id: i64, chat_id: i64) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (user_id, chat_id, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (user_id, chat_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(chat_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        tracing::info!(user_id, chat_id, "Subscribed");
        Ok(())
    }

    /// Remove a user's subscription to one chat. No error if absent.
    pub async fn unsubscribe(&self, user_id: i64, chat_id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = ?1 AND chat_id = ?2")
            .bind(user_id)
            .bind(chat_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            tracing::info!(user_id, chat_id, "Unsubscribed");
        }
        Ok(())
    }

    /// Drop every subscription a user holds, across all chats. Used when a
    /// delivery to that user fails permanently.
    pub async fn forget(&self, user_id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        tracing::info!(
            user_id,
            removed = result.rows_affected(),
            "Forgot unreachable subscriber"
        );
        Ok(())
    }

    /// All subscribers of a chat; empty set if none.
    pub async fn subscribers_of(&self, chat_id: i64) -> Result<HashSet<i64>, AppError> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT user_id FROM subscriptions WHERE chat_id = ?1")
            .bind(chat_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().collect())
    }
}
