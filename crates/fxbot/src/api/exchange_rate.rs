//! exchangerate-api style client
//!
//! `GET {api_base}/{BASE}` answers with every rate for that base:
//!
//! ```json
//! {"result": "success", "base_code": "USD", "conversion_rates": {"UAH": 41.5, "EUR": 0.92}}
//! ```

use super::{Quote, RateProvider};
use crate::amount::apply_rate;
use crate::currency::Currency;
use crate::error::{BotError, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument};

/// HTTP client for the rates endpoint
#[derive(Debug, Clone)]
pub struct ExchangeRateClient {
    client: Client,
    api_base: String,
}

impl ExchangeRateClient {
    /// Create a client for `api_base`, e.g.
    /// `https://v6.exchangerate-api.com/v6/<key>/latest`
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        if api_base.is_empty() {
            return Err(BotError::Config("rates API base URL is empty".to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, api_base })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    #[instrument(skip(self), fields(api_base = %self.api_base))]
    async fn latest(&self, base: Currency) -> Result<Value> {
        let url = format!("{}/{}", self.api_base, base);
        debug!("Fetching rates for {}", base);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BotError::Provider(format!("rates API returned HTTP {status}")));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl RateProvider for ExchangeRateClient {
    async fn fetch_rate(&self, base: Currency, target: Currency) -> Result<Decimal> {
        let body = self.latest(base).await?;
        parse_rate(&body, target)
    }

    async fn convert(&self, base: Currency, target: Currency, amount: Decimal) -> Result<Quote> {
        let rate = self.fetch_rate(base, target).await?;
        Ok(Quote {
            rate: Some(rate),
            result: Some(apply_rate(amount, rate)?),
        })
    }

    fn name(&self) -> &str {
        "exchangerate-api"
    }
}

/// Pick `target` out of a `latest` response body
pub fn parse_rate(body: &Value, target: Currency) -> Result<Decimal> {
    let result = body.get("result").and_then(Value::as_str);
    if result != Some("success") {
        let detail = body
            .get("error-type")
            .and_then(Value::as_str)
            .unwrap_or("unexpected response");
        return Err(BotError::Provider(format!("rates API error: {detail}")));
    }

    let rate = body
        .get("conversion_rates")
        .and_then(|rates| rates.get(target.as_str()))
        .ok_or_else(|| {
            BotError::Provider(format!("target currency {target} not found in rates response"))
        })?;

    json_decimal(rate)
        .ok_or_else(|| BotError::Provider(format!("malformed rate for {target}: {rate}")))
}

// JSON numbers go through their text form so no binary float rounding leaks in
fn json_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn code(s: &str) -> Currency {
        Currency::parse(s).unwrap()
    }

    #[test]
    fn test_parse_rate_success() {
        let body = json!({
            "result": "success",
            "base_code": "USD",
            "conversion_rates": {"USD": 1, "UAH": 41.5, "JPY": 151.234567}
        });

        assert_eq!(parse_rate(&body, code("UAH")).unwrap().to_string(), "41.5");
        assert_eq!(parse_rate(&body, code("JPY")).unwrap().to_string(), "151.234567");
        assert_eq!(parse_rate(&body, code("USD")).unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_parse_rate_missing_target() {
        let body = json!({"result": "success", "conversion_rates": {"EUR": 0.92}});
        let err = parse_rate(&body, code("UAH")).unwrap_err();
        assert!(err.to_string().contains("UAH"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_parse_rate_api_error() {
        let body = json!({"result": "error", "error-type": "invalid-key"});
        let err = parse_rate(&body, code("UAH")).unwrap_err();
        assert!(err.to_string().contains("invalid-key"));

        assert!(parse_rate(&json!({}), code("UAH")).is_err());
    }

    #[test]
    fn test_json_decimal_forms() {
        assert_eq!(json_decimal(&json!(0.92)).unwrap().to_string(), "0.92");
        assert_eq!(json_decimal(&json!("41.50")).unwrap().to_string(), "41.50");
        assert_eq!(json_decimal(&json!(1e-5)).unwrap(), Decimal::new(1, 5));
        assert!(json_decimal(&json!(null)).is_none());
        assert!(json_decimal(&json!("abc")).is_none());
    }

    #[test]
    fn test_new_trims_base_url() {
        let client =
            ExchangeRateClient::new("https://rates.example/latest/", Duration::from_secs(10))
                .unwrap();
        assert_eq!(client.api_base(), "https://rates.example/latest");
        assert!(ExchangeRateClient::new("", Duration::from_secs(1)).is_err());
    }
}
