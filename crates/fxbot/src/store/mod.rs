//! Persistence for users, roles and favorite pairs

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

use crate::currency::CurrencyPair;
use crate::error::Result;
use crate::user::{Role, UserId, UserProfile};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A saved currency pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: i64,
    pub owner: UserId,
    pub pair: CurrencyPair,
}

/// A user row as shown in the admin list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub first_name: Option<String>,
    pub username: Option<String>,
    pub role: Role,
}

impl UserRecord {
    /// `@username` when known, otherwise the first name or numeric id
    pub fn display_name(&self) -> String {
        match (&self.username, &self.first_name) {
            (Some(username), _) => format!("@{username}"),
            (None, Some(first_name)) => first_name.clone(),
            (None, None) => self.id.to_string(),
        }
    }
}

/// How many users saved a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularPair {
    pub pair: CurrencyPair,
    pub count: u64,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Create the user or refresh their names; the role is left alone
    async fn upsert_user(&self, profile: &UserProfile) -> Result<()>;

    /// `None` when the user has no record
    async fn get_user_role(&self, user: UserId) -> Result<Option<Role>>;

    /// Returns whether the user existed
    async fn set_user_role(&self, user: UserId, role: Role) -> Result<bool>;

    /// Users ordered by id
    async fn list_users(&self, limit: u32, offset: u32) -> Result<Vec<UserRecord>>;

    async fn count_users(&self) -> Result<u64>;

    /// The user's favorites, oldest first
    async fn list_favorites(&self, user: UserId) -> Result<Vec<Favorite>>;

    /// Save a pair. Saving the same pair twice is a no-op. Fails with
    /// [`BotError::UserNotFound`](crate::error::BotError::UserNotFound) when
    /// the user has no record.
    async fn add_favorite(&self, user: UserId, pair: CurrencyPair) -> Result<()>;

    /// Returns whether a favorite was removed
    async fn remove_favorite(&self, user: UserId, favorite_id: i64) -> Result<bool>;

    /// Most saved pairs, most popular first
    async fn popular_pairs(&self, limit: u32) -> Result<Vec<PopularPair>>;

    /// Release connections on shutdown
    async fn close(&self) {}
}
