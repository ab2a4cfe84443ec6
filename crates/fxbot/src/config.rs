//! Configuration for the conversion bot

use crate::currency::{Currency, DEFAULT_CURRENCIES, parse_list};
use crate::error::{BotError, Result};
use crate::retry::RetryPolicy;
use crate::user::UserId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default chat model used for rate explanations
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Rates endpoint prefix; the base currency code is appended
    pub api_base: String,

    /// Timeout for each rates request
    pub request_timeout: Duration,

    /// API key for the explanation model
    #[serde(skip_serializing)]
    pub openai_api_key: String,

    /// OpenAI-compatible endpoint, when not the public one
    pub openai_api_base: Option<String>,

    pub openai_model: String,

    /// Timeout for each explanation request
    pub llm_timeout: Duration,

    /// PostgreSQL URL; favorites stay in memory without it
    #[serde(skip_serializing)]
    pub database_url: Option<String>,

    pub rate_cache_ttl: Duration,
    pub rate_cache_max_items: usize,
    pub favorites_cache_ttl: Duration,
    pub favorites_cache_max_items: usize,

    /// Attempts per upstream call, the first one included
    pub max_attempts: u32,

    /// Backoff after the first failed attempt
    pub retry_base_delay: Duration,

    /// Users per admin list page
    pub page_size: u32,

    /// Currencies offered in the pickers
    pub currencies: Vec<Currency>,

    /// Idle sessions older than this are dropped
    pub session_max_idle: Duration,

    /// Users promoted to admin when they open the main menu
    pub admin_ids: Vec<UserId>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            request_timeout: Duration::from_secs(10),
            openai_api_key: String::new(),
            openai_api_base: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            llm_timeout: Duration::from_secs(120),
            database_url: None,
            rate_cache_ttl: Duration::from_secs(60),
            rate_cache_max_items: 1000,
            favorites_cache_ttl: Duration::from_secs(300),
            favorites_cache_max_items: 2000,
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(500),
            page_size: 10,
            currencies: default_currencies(),
            session_max_idle: Duration::from_secs(30 * 60),
            admin_ids: Vec::new(),
        }
    }
}

fn default_currencies() -> Vec<Currency> {
    parse_list(DEFAULT_CURRENCIES).unwrap_or_default()
}

impl BotConfig {
    /// Create a new configuration builder
    pub fn builder() -> BotConfigBuilder {
        BotConfigBuilder::default()
    }

    /// Read the configuration from process environment variables.
    ///
    /// `API_BASE` and `OPENAI_API_KEY` are required. `OPENAI_API_BASE`,
    /// `OPENAI_MODEL`, `DATABASE_URL`, `CURRENCIES` and `ADMIN_IDS` (both
    /// comma separated) are optional.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(fxbot_utils::optional_var)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name).ok_or_else(|| BotError::from(fxbot_utils::EnvError::Missing(name.to_string())))
        };

        let mut builder = Self::builder()
            .api_base(required("API_BASE")?)
            .openai_api_key(required("OPENAI_API_KEY")?);

        if let Some(base) = lookup("OPENAI_API_BASE") {
            builder = builder.openai_api_base(base);
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            builder = builder.openai_model(model);
        }
        if let Some(url) = lookup("DATABASE_URL") {
            builder = builder.database_url(url);
        }
        if let Some(list) = lookup("CURRENCIES") {
            let codes = parse_list(list.split(',').map(str::trim).filter(|c| !c.is_empty()))
                .map_err(|e| BotError::Config(format!("CURRENCIES: {e}")))?;
            builder = builder.currencies(codes);
        }
        if let Some(list) = lookup("ADMIN_IDS") {
            let ids = list
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(|id| id.parse().map(UserId))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| BotError::Config(format!("ADMIN_IDS: {e}")))?;
            builder = builder.admin_ids(ids);
        }

        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_base.trim().is_empty() {
            return Err(BotError::Config("api_base must not be empty".to_string()));
        }

        if self.max_attempts == 0 {
            return Err(BotError::Config(
                "max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.page_size == 0 {
            return Err(BotError::Config("page_size must be greater than 0".to_string()));
        }

        if self.rate_cache_max_items == 0 || self.favorites_cache_max_items == 0 {
            return Err(BotError::Config(
                "cache max_items must be greater than 0".to_string(),
            ));
        }

        if self.currencies.is_empty() {
            return Err(BotError::Config("currency list must not be empty".to_string()));
        }

        Ok(())
    }

    /// Retry policy for upstream calls
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.retry_base_delay)
    }
}

/// Builder for BotConfig
#[derive(Debug, Default)]
pub struct BotConfigBuilder {
    api_base: Option<String>,
    request_timeout: Option<Duration>,
    openai_api_key: Option<String>,
    openai_api_base: Option<String>,
    openai_model: Option<String>,
    llm_timeout: Option<Duration>,
    database_url: Option<String>,
    rate_cache_ttl: Option<Duration>,
    rate_cache_max_items: Option<usize>,
    favorites_cache_ttl: Option<Duration>,
    favorites_cache_max_items: Option<usize>,
    max_attempts: Option<u32>,
    retry_base_delay: Option<Duration>,
    page_size: Option<u32>,
    currencies: Option<Vec<Currency>>,
    session_max_idle: Option<Duration>,
    admin_ids: Option<Vec<UserId>>,
}

impl BotConfigBuilder {
    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = Some(url.into());
        self
    }

    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(key.into());
        self
    }

    pub fn openai_api_base(mut self, url: impl Into<String>) -> Self {
        self.openai_api_base = Some(url.into());
        self
    }

    pub fn openai_model(mut self, model: impl Into<String>) -> Self {
        self.openai_model = Some(model.into());
        self
    }

    pub fn llm_timeout(mut self, duration: Duration) -> Self {
        self.llm_timeout = Some(duration);
        self
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Set TTL and capacity of the rate cache
    pub fn rate_cache(mut self, ttl: Duration, max_items: usize) -> Self {
        self.rate_cache_ttl = Some(ttl);
        self.rate_cache_max_items = Some(max_items);
        self
    }

    /// Set TTL and capacity of the favorites cache
    pub fn favorites_cache(mut self, ttl: Duration, max_items: usize) -> Self {
        self.favorites_cache_ttl = Some(ttl);
        self.favorites_cache_max_items = Some(max_items);
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn retry_base_delay(mut self, duration: Duration) -> Self {
        self.retry_base_delay = Some(duration);
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn currencies(mut self, currencies: Vec<Currency>) -> Self {
        self.currencies = Some(currencies);
        self
    }

    pub fn session_max_idle(mut self, duration: Duration) -> Self {
        self.session_max_idle = Some(duration);
        self
    }

    pub fn admin_ids(mut self, ids: Vec<UserId>) -> Self {
        self.admin_ids = Some(ids);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<BotConfig> {
        let defaults = BotConfig::default();

        let config = BotConfig {
            api_base: self.api_base.unwrap_or(defaults.api_base),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            openai_api_key: self.openai_api_key.unwrap_or(defaults.openai_api_key),
            openai_api_base: self.openai_api_base,
            openai_model: self.openai_model.unwrap_or(defaults.openai_model),
            llm_timeout: self.llm_timeout.unwrap_or(defaults.llm_timeout),
            database_url: self.database_url,
            rate_cache_ttl: self.rate_cache_ttl.unwrap_or(defaults.rate_cache_ttl),
            rate_cache_max_items: self
                .rate_cache_max_items
                .unwrap_or(defaults.rate_cache_max_items),
            favorites_cache_ttl: self.favorites_cache_ttl.unwrap_or(defaults.favorites_cache_ttl),
            favorites_cache_max_items: self
                .favorites_cache_max_items
                .unwrap_or(defaults.favorites_cache_max_items),
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            retry_base_delay: self.retry_base_delay.unwrap_or(defaults.retry_base_delay),
            page_size: self.page_size.unwrap_or(defaults.page_size),
            currencies: self.currencies.unwrap_or(defaults.currencies),
            session_max_idle: self.session_max_idle.unwrap_or(defaults.session_max_idle),
            admin_ids: self.admin_ids.unwrap_or(defaults.admin_ids),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = BotConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_base_delay, Duration::from_millis(500));
        assert_eq!(config.rate_cache_ttl, Duration::from_secs(60));
        assert_eq!(config.rate_cache_max_items, 1000);
        assert_eq!(config.favorites_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.page_size, 10);
        assert_eq!(config.currencies.len(), 9);
        // No rates endpoint yet
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = BotConfig::builder()
            .api_base("https://rates.example/latest")
            .max_attempts(5)
            .page_size(25)
            .rate_cache(Duration::from_secs(30), 10)
            .build()
            .unwrap();

        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.page_size, 25);
        assert_eq!(config.rate_cache_ttl, Duration::from_secs(30));
        assert_eq!(config.retry_policy().max_attempts, 5);
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let base = || BotConfig::builder().api_base("https://rates.example");
        assert!(base().max_attempts(0).build().is_err());
        assert!(base().page_size(0).build().is_err());
        assert!(base().favorites_cache(Duration::from_secs(1), 0).build().is_err());
        assert!(base().currencies(Vec::new()).build().is_err());
    }

    #[test]
    fn test_from_lookup_requires_keys() {
        let err = BotConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap_err();
        assert!(matches!(err, BotError::Config(ref m) if m.contains("API_BASE")));

        let err = BotConfig::from_lookup(lookup(&[("API_BASE", "https://rates.example")]))
            .unwrap_err();
        assert!(matches!(err, BotError::Config(ref m) if m.contains("OPENAI_API_KEY")));
    }

    #[test]
    fn test_from_lookup_optional_values() {
        let config = BotConfig::from_lookup(lookup(&[
            ("API_BASE", "https://rates.example"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "local-model"),
            ("CURRENCIES", "usd, eur ,uah"),
            ("ADMIN_IDS", "42, 7"),
        ]))
        .unwrap();

        assert_eq!(config.admin_ids, vec![UserId(42), UserId(7)]);
        assert_eq!(config.openai_model, "local-model");
        assert_eq!(config.database_url, None);
        let codes: Vec<_> = config.currencies.iter().map(Currency::as_str).collect();
        assert_eq!(codes, vec!["USD", "EUR", "UAH"]);

        let bad = BotConfig::from_lookup(lookup(&[
            ("API_BASE", "https://rates.example"),
            ("OPENAI_API_KEY", "sk-test"),
            ("CURRENCIES", "USD,DOLLARS"),
        ]));
        assert!(bad.is_err());

        let bad_ids = BotConfig::from_lookup(lookup(&[
            ("API_BASE", "https://rates.example"),
            ("OPENAI_API_KEY", "sk-test"),
            ("ADMIN_IDS", "42,alice"),
        ]));
        assert!(bad_ids.is_err());
    }
}
