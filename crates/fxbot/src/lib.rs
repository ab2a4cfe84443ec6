//! Currency conversion chat bot core
//!
//! The pieces a chat transport needs to run a currency converter:
//!
//! - [`session`]: per-user `Idle → BaseSelected → AwaitingAmount → Done`
//!   state machine, one async lock per user
//! - [`amount`]: tolerant amount parsing and fixed six-decimal arithmetic
//! - [`cache`]: TTL cache with insertion-order eviction, used for rates and
//!   favorites
//! - [`retry`]: exponential backoff around upstream calls
//! - [`api`]: rate providers ([`api::ExchangeRateClient`])
//! - [`explain`]: LLM-backed rate explanations
//! - [`store`]: users, roles and favorites (in memory or PostgreSQL)
//! - [`bot`]: the [`Orchestrator`] tying it together, plus action decoding
//!   and plain-text rendering
//!
//! # Example
//!
//! ```rust,ignore
//! use fxbot::bot::{Action, Orchestrator, render};
//! use fxbot::user::UserProfile;
//!
//! let bot = Orchestrator::new(&config, rates, store, explainer);
//! let user = UserProfile::new(42);
//! for input in ["base:USD", "target:UAH", "100"] {
//!     let view = bot.handle(&user, Action::parse(input)?).await?;
//!     println!("{}", render(&view).text);
//! }
//! ```

pub mod amount;
pub mod api;
pub mod bot;
pub mod cache;
pub mod config;
pub mod currency;
pub mod error;
pub mod explain;
pub mod retry;
pub mod session;
pub mod store;
pub mod user;

// Re-export main types for convenience
pub use bot::{Action, Orchestrator, View};
pub use config::BotConfig;
pub use currency::{Currency, CurrencyPair};
pub use error::{BotError, ErrorKind, Result};
