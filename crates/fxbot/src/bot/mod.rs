//! Currency conversion bot
//!
//! The [`Orchestrator`] receives an [`Action`] for a user, drives that user's
//! [`ConversionSession`](crate::session::ConversionSession) and the
//! collaborators behind it (rate provider, store, explainer), and answers
//! with a [`View`]. It knows nothing about the chat transport; [`render`]
//! turns a view into plain text with menu choices.
//!
//! # Example
//!
//! ```rust,ignore
//! use fxbot::bot::{Action, Orchestrator, render};
//! use fxbot::user::UserProfile;
//!
//! let bot = Orchestrator::new(&config, rates, store, explainer);
//! let view = bot.handle(&UserProfile::new(42), Action::parse("base:USD")?).await?;
//! println!("{}", render(&view).text);
//! ```

pub mod action;
pub mod render;
pub mod view;

pub use action::Action;
pub use render::{Choice, Render, render, render_error};
pub use view::View;

use crate::api::RateProvider;
use crate::cache::TtlCache;
use crate::config::BotConfig;
use crate::currency::{Currency, CurrencyPair};
use crate::error::{BotError, ErrorKind, Result};
use crate::explain::Explainer;
use crate::retry::RetryPolicy;
use crate::session::{PendingConversion, SessionStore};
use crate::store::{Favorite, Store};
use crate::user::{Role, UserId, UserProfile};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Pairs shown in the admin statistics
const POPULAR_PAIRS_LIMIT: u32 = 5;

/// Handles user actions against sessions, caches and collaborators
pub struct Orchestrator {
    rates: Arc<dyn RateProvider>,
    store: Arc<dyn Store>,
    explainer: Arc<dyn Explainer>,
    rate_cache: TtlCache<CurrencyPair, Decimal>,
    favorites_cache: TtlCache<UserId, Vec<Favorite>>,
    retry: RetryPolicy,
    sessions: SessionStore,
    currencies: Vec<Currency>,
    page_size: u32,
    admin_ids: Vec<UserId>,
}

impl Orchestrator {
    pub fn new(
        config: &BotConfig,
        rates: Arc<dyn RateProvider>,
        store: Arc<dyn Store>,
        explainer: Arc<dyn Explainer>,
    ) -> Self {
        Self {
            rates,
            store,
            explainer,
            rate_cache: TtlCache::new(config.rate_cache_ttl, config.rate_cache_max_items),
            favorites_cache: TtlCache::new(
                config.favorites_cache_ttl,
                config.favorites_cache_max_items,
            ),
            retry: config.retry_policy(),
            sessions: SessionStore::new(),
            currencies: config.currencies.clone(),
            page_size: config.page_size.max(1),
            admin_ids: config.admin_ids.clone(),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Close the store; call once when the transport stops
    pub async fn shutdown(&self) {
        self.store.close().await;
        info!("Bot stopped with {} live sessions", self.sessions.len());
    }

    /// Drop sessions with no activity for `max_age`
    pub fn cleanup_sessions(&self, max_age: chrono::Duration) -> usize {
        let removed = self.sessions.cleanup_idle(max_age);
        if removed > 0 {
            debug!("Dropped {} idle sessions", removed);
        }
        removed
    }

    /// Handle one action. Actions from the same user are processed one at a
    /// time; input errors leave the session as it was.
    #[instrument(skip(self, user), fields(user = %user.id))]
    pub async fn handle(&self, user: &UserProfile, action: Action) -> Result<View> {
        let handle = self.sessions.get_or_create(user.id);
        let mut session = handle.lock().await;

        match action {
            Action::Start => {
                self.register(user).await;
                session.reset();
                Ok(View::MainMenu {
                    is_admin: self.is_admin(user.id).await,
                })
            }
            Action::MainMenu => {
                session.reset();
                Ok(View::MainMenu {
                    is_admin: self.is_admin(user.id).await,
                })
            }
            Action::Help => Ok(View::Help),
            Action::ChooseBase => {
                session.reset();
                Ok(View::BasePicker {
                    currencies: self.currencies.clone(),
                })
            }
            Action::SelectBase(base) => {
                session.select_base(base)?;
                Ok(View::TargetPicker {
                    base,
                    currencies: self.currencies.clone(),
                })
            }
            Action::SelectTarget(target) => {
                let pair = session.select_target(target)?;
                Ok(View::AmountPrompt { pair })
            }
            Action::ConvertFavorite(pair) => {
                session.select_pair(pair);
                Ok(View::AmountPrompt { pair })
            }
            Action::SubmitAmount(text) => {
                let pending = session.submit_amount(&text)?;
                let _finishing = session.finish_on_drop();
                Ok(self.convert(pending).await)
            }
            Action::AddFavorite(pair) => self.add_favorite(user, pair).await,
            Action::ListFavorites => {
                session.reset();
                Ok(View::Favorites {
                    favorites: self.favorites(user.id).await?,
                })
            }
            Action::ShowFavorite(id) => {
                session.reset();
                self.show_favorite(user.id, id).await
            }
            Action::RemoveFavorite(id) => {
                session.reset();
                self.remove_favorite(user.id, id).await
            }
            Action::Explain(pair) => Ok(self.explain(pair).await),
            Action::AdminPanel => {
                self.require_admin(user.id).await?;
                Ok(View::AdminPanel)
            }
            Action::AdminUsers { page } => {
                self.require_admin(user.id).await?;
                self.users_page(page).await
            }
            Action::AdminSetRole {
                user: target,
                role,
                page,
            } => {
                self.require_admin(user.id).await?;
                if self.store.set_user_role(target, role).await? {
                    info!("User {} set role of {} to {}", user.id, target, role);
                } else {
                    warn!("Cannot set role of unknown user {}", target);
                }
                self.users_page(page).await
            }
            Action::AdminStats => {
                self.require_admin(user.id).await?;
                Ok(View::AdminStats {
                    total_users: self.store.count_users().await?,
                    popular: self.store.popular_pairs(POPULAR_PAIRS_LIMIT).await?,
                })
            }
        }
    }

    /// Current rate for a pair, from cache or the provider
    pub async fn rate(&self, pair: CurrencyPair) -> Result<Decimal> {
        self.rate_cache
            .get_or_set(pair, || {
                self.retry
                    .execute("rates", || self.rates.fetch_rate(pair.base, pair.target))
            })
            .await
    }

    async fn convert(&self, pending: PendingConversion) -> View {
        let PendingConversion { pair, amount } = pending;
        match self.quote(pair, amount).await {
            Ok((result, rate)) => View::Conversion {
                pair,
                amount,
                result,
                rate,
            },
            Err(e) => {
                warn!("Conversion {} of {} failed: {}", pair, amount, e);
                View::ConversionFailed { pair, amount }
            }
        }
    }

    async fn quote(&self, pair: CurrencyPair, amount: Decimal) -> Result<(Decimal, Option<Decimal>)> {
        let quote = self
            .retry
            .execute("rates", || self.rates.convert(pair.base, pair.target, amount))
            .await?;

        let rate = match quote.rate {
            Some(rate) => {
                self.rate_cache.set(pair, rate);
                Some(rate)
            }
            None if quote.result.is_some() => self.rate(pair).await.ok(),
            None => Some(self.rate(pair).await?),
        };

        let result = quote.resolve(amount, rate).ok_or_else(|| {
            BotError::Provider(format!("no rate or result returned for {pair}"))
        })??;
        Ok((result, rate))
    }

    async fn register(&self, user: &UserProfile) {
        if let Err(e) = self.store.upsert_user(user).await {
            warn!("Failed to upsert user {}: {}", user.id, e);
            return;
        }
        if self.admin_ids.contains(&user.id) {
            match self.store.get_user_role(user.id).await {
                Ok(Some(Role::Admin)) => {}
                Ok(_) => match self.store.set_user_role(user.id, Role::Admin).await {
                    Ok(_) => info!("Promoted configured admin {}", user.id),
                    Err(e) => warn!("Failed to promote admin {}: {}", user.id, e),
                },
                Err(e) => warn!("Failed to read role of {}: {}", user.id, e),
            }
        }
    }

    async fn is_admin(&self, user: UserId) -> bool {
        match self.store.get_user_role(user).await {
            Ok(role) => role == Some(Role::Admin),
            Err(e) => {
                warn!("Role lookup failed for {}: {}", user, e);
                false
            }
        }
    }

    async fn require_admin(&self, user: UserId) -> Result<()> {
        if self.is_admin(user).await {
            Ok(())
        } else {
            Err(BotError::Forbidden)
        }
    }

    async fn favorites(&self, user: UserId) -> Result<Vec<Favorite>> {
        self.favorites_cache
            .get_or_set(user, || self.store.list_favorites(user))
            .await
    }

    /// Reload the user's favorites into the cache. A failed reload drops the
    /// cached copy instead of failing the caller.
    async fn refresh_favorites(&self, user: UserId) -> Option<Vec<Favorite>> {
        match self.store.list_favorites(user).await {
            Ok(favorites) => {
                self.favorites_cache.set(user, favorites.clone());
                Some(favorites)
            }
            Err(e) => {
                warn!("Failed to refresh favorites for {}: {}", user, e);
                self.favorites_cache.delete(&user);
                None
            }
        }
    }

    async fn add_favorite(&self, user: &UserProfile, pair: CurrencyPair) -> Result<View> {
        match self.store.add_favorite(user.id, pair).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::Persistence => {
                warn!("Adding favorite for {} failed ({}); repairing user record", user.id, e);
                self.store.upsert_user(user).await?;
                self.store
                    .add_favorite(user.id, pair)
                    .await
                    .inspect_err(|e| error!("Retry of add favorite for {} failed: {}", user.id, e))?;
            }
            Err(e) => return Err(e),
        }

        let favorites = self.refresh_favorites(user.id).await.unwrap_or_default();
        Ok(View::FavoriteAdded { pair, favorites })
    }

    async fn show_favorite(&self, user: UserId, id: i64) -> Result<View> {
        let mut favorite = self.favorites(user).await?.into_iter().find(|f| f.id == id);
        if favorite.is_none() {
            favorite = self
                .refresh_favorites(user)
                .await
                .and_then(|all| all.into_iter().find(|f| f.id == id));
        }
        let favorite = favorite.ok_or(BotError::FavoriteNotFound(id))?;

        let rate = self
            .rate(favorite.pair)
            .await
            .inspect_err(|e| warn!("Rate for favorite {} unavailable: {}", favorite.pair, e))
            .ok();
        Ok(View::FavoriteDetail { favorite, rate })
    }

    async fn remove_favorite(&self, user: UserId, id: i64) -> Result<View> {
        if !self.store.remove_favorite(user, id).await? {
            return Err(BotError::FavoriteNotFound(id));
        }
        let favorites = self.refresh_favorites(user).await.unwrap_or_default();
        Ok(View::FavoriteRemoved { favorites })
    }

    async fn explain(&self, pair: CurrencyPair) -> View {
        let rate = match self.rate(pair).await {
            Ok(rate) => rate,
            Err(e) => {
                warn!("No rate to explain for {}: {}", pair, e);
                return View::Explanation {
                    pair,
                    rate: None,
                    text: None,
                };
            }
        };

        let text = self
            .retry
            .execute("explain", || self.explainer.explain(pair.base, pair.target, rate))
            .await
            .inspect_err(|e| warn!("Explanation for {} failed: {}", pair, e))
            .ok();

        View::Explanation {
            pair,
            rate: Some(rate),
            text,
        }
    }

    async fn users_page(&self, page: u32) -> Result<View> {
        let total = self.store.count_users().await?;
        let total_pages = u32::try_from(total.div_ceil(u64::from(self.page_size)))
            .unwrap_or(u32::MAX)
            .max(1);
        let page = page.clamp(1, total_pages);
        let offset = (page - 1).saturating_mul(self.page_size);

        let users = self.store.list_users(self.page_size, offset).await?;
        Ok(View::AdminUsers {
            users,
            page,
            total_pages,
        })
    }
}
