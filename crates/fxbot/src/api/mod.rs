//! Exchange-rate providers

pub mod exchange_rate;

pub use exchange_rate::ExchangeRateClient;

use crate::amount::{apply_rate, quantize};
use crate::currency::Currency;
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Provider answer to a conversion request.
///
/// Providers may return the converted amount directly, a rate to apply, or
/// both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quote {
    pub rate: Option<Decimal>,
    pub result: Option<Decimal>,
}

/// Source of exchange rates
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Units of `target` per one unit of `base`
    async fn fetch_rate(&self, base: Currency, target: Currency) -> Result<Decimal>;

    /// Quote a conversion. The default asks for the rate only.
    async fn convert(&self, base: Currency, target: Currency, amount: Decimal) -> Result<Quote> {
        let _ = amount;
        let rate = self.fetch_rate(base, target).await?;
        Ok(Quote {
            rate: Some(rate),
            result: None,
        })
    }

    fn name(&self) -> &str;
}

impl Quote {
    /// Converted amount: the direct result when present, otherwise `amount`
    /// times the quoted rate or `fallback_rate`
    pub fn resolve(&self, amount: Decimal, fallback_rate: Option<Decimal>) -> Option<Result<Decimal>> {
        if let Some(result) = self.result {
            return Some(Ok(quantize(result)));
        }
        self.rate
            .or(fallback_rate)
            .map(|rate| apply_rate(amount, rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    struct FixedRate(Decimal);

    #[async_trait]
    impl RateProvider for FixedRate {
        async fn fetch_rate(&self, _base: Currency, _target: Currency) -> Result<Decimal> {
            Ok(self.0)
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_default_convert_returns_rate_only() {
        let provider = FixedRate(dec("41.5"));
        let usd = Currency::parse("USD").unwrap();
        let uah = Currency::parse("UAH").unwrap();

        let quote = provider.convert(usd, uah, dec("100")).await.unwrap();
        assert_eq!(quote.rate, Some(dec("41.5")));
        assert_eq!(quote.result, None);
    }

    #[test]
    fn test_resolve_prefers_direct_result() {
        let quote = Quote {
            rate: Some(dec("2")),
            result: Some(dec("7.1234567")),
        };
        let value = quote.resolve(dec("3"), None).unwrap().unwrap();
        assert_eq!(value.to_string(), "7.123457");
    }

    #[test]
    fn test_resolve_falls_back_to_rate() {
        let from_quote = Quote {
            rate: Some(dec("41.5")),
            result: None,
        };
        assert_eq!(
            from_quote.resolve(dec("100"), None).unwrap().unwrap().to_string(),
            "4150.000000"
        );

        let empty = Quote::default();
        assert_eq!(
            empty.resolve(dec("2"), Some(dec("0.5"))).unwrap().unwrap().to_string(),
            "1.000000"
        );
        assert!(empty.resolve(dec("2"), None).is_none());
    }
}
