//! In-process store used when no database is configured

use super::{Favorite, PopularPair, Store, UserRecord};
use crate::currency::CurrencyPair;
use crate::error::{BotError, Result};
use crate::user::{Role, UserId, UserProfile};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

#[derive(Default)]
struct Inner {
    users: BTreeMap<UserId, UserRecord>,
    favorites: Vec<Favorite>,
    next_favorite_id: i64,
}

/// Store backed by process memory; contents are lost on restart
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_user(&self, profile: &UserProfile) -> Result<()> {
        let mut inner = self.inner.write();
        let record = inner.users.entry(profile.id).or_insert_with(|| UserRecord {
            id: profile.id,
            first_name: None,
            username: None,
            role: Role::User,
        });
        record.first_name.clone_from(&profile.first_name);
        record.username.clone_from(&profile.username);
        Ok(())
    }

    async fn get_user_role(&self, user: UserId) -> Result<Option<Role>> {
        Ok(self.inner.read().users.get(&user).map(|r| r.role))
    }

    async fn set_user_role(&self, user: UserId, role: Role) -> Result<bool> {
        let mut inner = self.inner.write();
        Ok(match inner.users.get_mut(&user) {
            Some(record) => {
                record.role = role;
                true
            }
            None => false,
        })
    }

    async fn list_users(&self, limit: u32, offset: u32) -> Result<Vec<UserRecord>> {
        Ok(self
            .inner
            .read()
            .users
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count_users(&self) -> Result<u64> {
        Ok(self.inner.read().users.len() as u64)
    }

    async fn list_favorites(&self, user: UserId) -> Result<Vec<Favorite>> {
        Ok(self
            .inner
            .read()
            .favorites
            .iter()
            .filter(|f| f.owner == user)
            .copied()
            .collect())
    }

    async fn add_favorite(&self, user: UserId, pair: CurrencyPair) -> Result<()> {
        let mut inner = self.inner.write();
        if !inner.users.contains_key(&user) {
            return Err(BotError::UserNotFound(user.0));
        }
        if inner
            .favorites
            .iter()
            .any(|f| f.owner == user && f.pair == pair)
        {
            return Ok(());
        }

        inner.next_favorite_id += 1;
        let id = inner.next_favorite_id;
        inner.favorites.push(Favorite {
            id,
            owner: user,
            pair,
        });
        Ok(())
    }

    async fn remove_favorite(&self, user: UserId, favorite_id: i64) -> Result<bool> {
        let mut inner = self.inner.write();
        let before = inner.favorites.len();
        inner
            .favorites
            .retain(|f| !(f.id == favorite_id && f.owner == user));
        Ok(inner.favorites.len() < before)
    }

    async fn popular_pairs(&self, limit: u32) -> Result<Vec<PopularPair>> {
        let inner = self.inner.read();
        let mut counts: HashMap<CurrencyPair, u64> = HashMap::new();
        for favorite in &inner.favorites {
            *counts.entry(favorite.pair).or_default() += 1;
        }

        let mut pairs: Vec<PopularPair> = counts
            .into_iter()
            .map(|(pair, count)| PopularPair { pair, count })
            .collect();
        pairs.sort_by(|a, b| b.count.cmp(&a.count).then(a.pair.cmp(&b.pair)));
        pairs.truncate(limit as usize);
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::Currency;

    fn pair(base: &str, target: &str) -> CurrencyPair {
        CurrencyPair::new(Currency::parse(base).unwrap(), Currency::parse(target).unwrap())
    }

    #[tokio::test]
    async fn test_upsert_keeps_role() {
        let store = MemoryStore::new();
        store.upsert_user(&UserProfile::new(1).with_username("a")).await.unwrap();
        assert!(store.set_user_role(UserId(1), Role::Admin).await.unwrap());

        store.upsert_user(&UserProfile::new(1).with_username("b")).await.unwrap();
        assert_eq!(store.get_user_role(UserId(1)).await.unwrap(), Some(Role::Admin));

        let users = store.list_users(10, 0).await.unwrap();
        assert_eq!(users[0].username.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let store = MemoryStore::new();
        assert_eq!(store.get_user_role(UserId(9)).await.unwrap(), None);
        assert!(!store.set_user_role(UserId(9), Role::Admin).await.unwrap());

        let err = store.add_favorite(UserId(9), pair("USD", "UAH")).await.unwrap_err();
        assert!(matches!(err, BotError::UserNotFound(9)));
    }

    #[tokio::test]
    async fn test_favorites_are_per_user_and_idempotent() {
        let store = MemoryStore::new();
        store.upsert_user(&UserProfile::new(42)).await.unwrap();
        store.upsert_user(&UserProfile::new(43)).await.unwrap();

        store.add_favorite(UserId(42), pair("USD", "UAH")).await.unwrap();
        store.add_favorite(UserId(42), pair("USD", "UAH")).await.unwrap();
        store.add_favorite(UserId(42), pair("EUR", "PLN")).await.unwrap();
        store.add_favorite(UserId(43), pair("GBP", "USD")).await.unwrap();

        let favorites = store.list_favorites(UserId(42)).await.unwrap();
        let pairs: Vec<_> = favorites.iter().map(|f| f.pair).collect();
        assert_eq!(pairs, vec![pair("USD", "UAH"), pair("EUR", "PLN")]);
        assert!(favorites[0].id < favorites[1].id);

        // Someone else's favorite cannot be removed
        let foreign = store.list_favorites(UserId(43)).await.unwrap()[0].id;
        assert!(!store.remove_favorite(UserId(42), foreign).await.unwrap());

        assert!(store.remove_favorite(UserId(42), favorites[0].id).await.unwrap());
        assert_eq!(store.list_favorites(UserId(42)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_users_pagination() {
        let store = MemoryStore::new();
        for id in [30, 10, 20] {
            store.upsert_user(&UserProfile::new(id)).await.unwrap();
        }
        assert_eq!(store.count_users().await.unwrap(), 3);

        let page: Vec<_> = store
            .list_users(2, 1)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(page, vec![UserId(20), UserId(30)]);
    }

    #[tokio::test]
    async fn test_popular_pairs() {
        let store = MemoryStore::new();
        for id in 1..=3 {
            store.upsert_user(&UserProfile::new(id)).await.unwrap();
            store.add_favorite(UserId(id), pair("USD", "UAH")).await.unwrap();
        }
        store.add_favorite(UserId(1), pair("EUR", "UAH")).await.unwrap();
        store.add_favorite(UserId(2), pair("EUR", "UAH")).await.unwrap();
        store.add_favorite(UserId(3), pair("PLN", "UAH")).await.unwrap();

        let top = store.popular_pairs(2).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0], PopularPair { pair: pair("USD", "UAH"), count: 3 });
        assert_eq!(top[1], PopularPair { pair: pair("EUR", "UAH"), count: 2 });
    }
}
