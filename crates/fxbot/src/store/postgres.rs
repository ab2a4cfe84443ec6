//! PostgreSQL store

use super::{Favorite, PopularPair, Store, UserRecord};
use crate::currency::{Currency, CurrencyPair};
use crate::error::{BotError, Result};
use crate::user::{Role, UserId, UserProfile};
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::{error, info};

const SCHEMA: [&str; 3] = [
    r"
    CREATE TABLE IF NOT EXISTS users (
        tg_id BIGINT PRIMARY KEY,
        first_name TEXT,
        username TEXT,
        role TEXT NOT NULL DEFAULT 'user',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    ",
    "ALTER TABLE users ADD COLUMN IF NOT EXISTS role TEXT NOT NULL DEFAULT 'user'",
    r"
    CREATE TABLE IF NOT EXISTS favorites (
        id BIGSERIAL PRIMARY KEY,
        tg_id BIGINT NOT NULL REFERENCES users(tg_id) ON DELETE CASCADE,
        base VARCHAR(3) NOT NULL,
        target VARCHAR(3) NOT NULL,
        UNIQUE (tg_id, base, target)
    )
    ",
];

type UserRow = (i64, Option<String>, Option<String>, String);

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and make sure the tables exist
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await?;

        let store = Self::from_pool(pool);
        store.init_schema().await?;
        info!("Connected to PostgreSQL store");
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn user_from_row((id, first_name, username, role): UserRow) -> UserRecord {
    UserRecord {
        id: UserId(id),
        first_name,
        username,
        role: role.parse().unwrap_or_default(),
    }
}

fn pair_from_row(base: &str, target: &str) -> Result<CurrencyPair> {
    Ok(CurrencyPair::new(Currency::parse(base)?, Currency::parse(target)?))
}

fn count_from_row(count: i64) -> u64 {
    u64::try_from(count).unwrap_or_default()
}

#[async_trait]
impl Store for PgStore {
    async fn upsert_user(&self, profile: &UserProfile) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO users (tg_id, first_name, username) VALUES ($1, $2, $3)
            ON CONFLICT (tg_id) DO UPDATE SET first_name = $2, username = $3
            ",
        )
        .bind(profile.id.0)
        .bind(profile.first_name.as_deref())
        .bind(profile.username.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_user_role(&self, user: UserId) -> Result<Option<Role>> {
        let role: Option<(String,)> = sqlx::query_as("SELECT role FROM users WHERE tg_id = $1")
            .bind(user.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role.map(|(role,)| role.parse().unwrap_or_default()))
    }

    async fn set_user_role(&self, user: UserId, role: Role) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET role = $1 WHERE tg_id = $2")
            .bind(role.as_str())
            .bind(user.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_users(&self, limit: u32, offset: u32) -> Result<Vec<UserRecord>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT tg_id, first_name, username, role FROM users ORDER BY tg_id LIMIT $1 OFFSET $2",
        )
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(user_from_row).collect())
    }

    async fn count_users(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count_from_row(count))
    }

    async fn list_favorites(&self, user: UserId) -> Result<Vec<Favorite>> {
        let rows: Vec<(i64, String, String)> =
            sqlx::query_as("SELECT id, base, target FROM favorites WHERE tg_id = $1 ORDER BY id")
                .bind(user.0)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(id, base, target)| {
                Ok(Favorite {
                    id,
                    owner: user,
                    pair: pair_from_row(&base, &target)?,
                })
            })
            .collect()
    }

    async fn add_favorite(&self, user: UserId, pair: CurrencyPair) -> Result<()> {
        let result = sqlx::query(
            r"
            INSERT INTO favorites (tg_id, base, target) VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(user.0)
        .bind(pair.base.as_str())
        .bind(pair.target.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Err(BotError::UserNotFound(user.0))
            }
            Err(e) => {
                error!("Failed to add favorite {} for user {}: {}", pair, user, e);
                Err(e.into())
            }
        }
    }

    async fn remove_favorite(&self, user: UserId, favorite_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE id = $1 AND tg_id = $2")
            .bind(favorite_id)
            .bind(user.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn popular_pairs(&self, limit: u32) -> Result<Vec<PopularPair>> {
        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            r"
            SELECT base, target, COUNT(*) AS count
            FROM favorites
            GROUP BY base, target
            ORDER BY count DESC, base, target
            LIMIT $1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(base, target, count)| {
                Ok(PopularPair {
                    pair: pair_from_row(&base, &target)?,
                    count: count_from_row(count),
                })
            })
            .collect()
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("PostgreSQL pool closed");
    }
}
