//! Per-user conversion sessions
//!
//! A session walks `Idle → BaseSelected → AwaitingAmount → Done` and is put
//! back to `Idle` right after every conversion attempt. Each user owns one
//! session behind its own async mutex, so actions from the same user are
//! handled one at a time while different users never wait on each other.

use crate::amount::parse_amount;
use crate::currency::{Currency, CurrencyPair};
use crate::error::{BotError, Result};
use crate::user::UserId;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Where the user is in the pair/amount dialogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    BaseSelected {
        base: Currency,
    },
    AwaitingAmount {
        base: Currency,
        target: Currency,
    },
    /// Conversion submitted; always followed by [`ConversionSession::finish`]
    Done,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::BaseSelected { .. } => "choosing a target currency",
            SessionState::AwaitingAmount { .. } => "waiting for an amount",
            SessionState::Done => "finishing a conversion",
        }
    }
}

/// A validated amount for a selected pair, ready to convert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingConversion {
    pub pair: CurrencyPair,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionSession {
    user_id: UserId,
    state: SessionState,
    created_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
}

impl ConversionSession {
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            state: SessionState::Idle,
            created_at: now,
            last_active: now,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    pub fn base(&self) -> Option<Currency> {
        match self.state {
            SessionState::BaseSelected { base } | SessionState::AwaitingAmount { base, .. } => {
                Some(base)
            }
            SessionState::Idle | SessionState::Done => None,
        }
    }

    pub fn target(&self) -> Option<Currency> {
        match self.state {
            SessionState::AwaitingAmount { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Pick the base currency; any previously chosen target is dropped
    pub fn select_base(&mut self, base: Currency) -> Result<()> {
        self.ensure_not_done("choose a base currency")?;
        self.state = SessionState::BaseSelected { base };
        self.touch();
        Ok(())
    }

    /// Pick the target currency; requires a base
    pub fn select_target(&mut self, target: Currency) -> Result<CurrencyPair> {
        let base = self.base().ok_or_else(|| self.illegal("choose a target currency"))?;
        self.state = SessionState::AwaitingAmount { base, target };
        self.touch();
        Ok(CurrencyPair::new(base, target))
    }

    /// Jump straight to waiting for an amount from any state, e.g. from a
    /// saved favorite
    pub fn select_pair(&mut self, pair: CurrencyPair) {
        self.state = SessionState::AwaitingAmount {
            base: pair.base,
            target: pair.target,
        };
        self.touch();
    }

    /// Accept amount text. A parse failure leaves the session waiting.
    pub fn submit_amount(&mut self, text: &str) -> Result<PendingConversion> {
        let SessionState::AwaitingAmount { base, target } = self.state else {
            return Err(self.illegal("submit an amount"));
        };
        let amount = parse_amount(text)?;
        self.state = SessionState::Done;
        self.touch();
        Ok(PendingConversion {
            pair: CurrencyPair::new(base, target),
            amount,
        })
    }

    /// Close a conversion attempt, whatever its outcome
    pub fn finish(&mut self) {
        self.reset();
    }

    /// Guard that finishes the session when dropped, including when the
    /// conversion future holding it is cancelled
    pub fn finish_on_drop(&mut self) -> Finishing<'_> {
        Finishing { session: self }
    }

    /// Back to `Idle` from any state
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.touch();
    }

    /// Whether the user has not acted for longer than `max_age`, whatever
    /// step they stopped at
    pub fn is_stale(&self, max_age: chrono::Duration) -> bool {
        Utc::now() - self.last_active > max_age
    }

    fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    fn ensure_not_done(&self, action: &'static str) -> Result<()> {
        if self.state == SessionState::Done {
            return Err(self.illegal(action));
        }
        Ok(())
    }

    fn illegal(&self, action: &'static str) -> BotError {
        BotError::IllegalTransition {
            action,
            state: self.state.name(),
        }
    }
}

/// Returned by [`ConversionSession::finish_on_drop`]
pub struct Finishing<'a> {
    session: &'a mut ConversionSession,
}

impl Drop for Finishing<'_> {
    fn drop(&mut self) {
        self.session.finish();
    }
}

/// Shared handle to one user's session
pub type SessionHandle = Arc<tokio::sync::Mutex<ConversionSession>>;

/// All live sessions, keyed by user
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<UserId, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The user's session, created on first use
    pub fn get_or_create(&self, user_id: UserId) -> SessionHandle {
        let mut sessions = self.sessions.lock();
        Arc::clone(sessions.entry(user_id).or_insert_with(|| {
            tracing::debug!("Creating session for user {}", user_id);
            Arc::new(tokio::sync::Mutex::new(ConversionSession::new(user_id)))
        }))
    }

    /// Copy of the user's current session, if one exists
    pub async fn snapshot(&self, user_id: UserId) -> Option<ConversionSession> {
        let handle = self.sessions.lock().get(&user_id).cloned()?;
        let session = handle.lock().await;
        Some(session.clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop sessions with no activity for `max_age`, in any state; sessions
    /// busy with an action are kept. Returns how many were dropped.
    pub fn cleanup_idle(&self, max_age: chrono::Duration) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => !session.is_stale(max_age),
            Err(_) => true,
        });
        before - sessions.len()
    }
}
