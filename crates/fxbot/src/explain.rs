//! Plain-language explanations of exchange rates

use crate::currency::Currency;
use crate::error::{BotError, Result};
use async_trait::async_trait;
use fxbot_llm::{CompletionRequest, LLMError, LLMProvider};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

const SYSTEM_PROMPT: &str = "You are a concise financial assistant inside a currency \
converter chat. Explain exchange rates to non-experts in two or three short sentences. \
Mention what the number means for someone converting money and the usual kinds of \
factors that move this pair. Do not give investment advice and do not invent news.";

/// Produces a short human-readable comment on a rate
#[async_trait]
pub trait Explainer: Send + Sync {
    async fn explain(&self, base: Currency, target: Currency, rate: Decimal) -> Result<String>;
}

/// [`Explainer`] backed by a chat-completion model
pub struct LlmExplainer {
    provider: Arc<dyn LLMProvider>,
    model: String,
    max_tokens: u32,
}

impl LlmExplainer {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: 300,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn request(&self, base: Currency, target: Currency, rate: Decimal) -> CompletionRequest {
        let question = format!(
            "The current rate is 1 {base} = {} {target}. What does this rate mean?",
            rate.normalize()
        );
        CompletionRequest::new(&self.model, question)
            .with_system(SYSTEM_PROMPT)
            .with_max_tokens(self.max_tokens)
            .with_temperature(0.3)
    }
}

#[async_trait]
impl Explainer for LlmExplainer {
    async fn explain(&self, base: Currency, target: Currency, rate: Decimal) -> Result<String> {
        let response = self.provider.complete(self.request(base, target, rate)).await?;
        if response.truncated {
            debug!("Explanation for {}/{} hit the token limit", base, target);
        }

        response
            .text()
            .map(str::to_string)
            .ok_or_else(|| {
                BotError::Llm(LLMError::UnexpectedResponse(
                    "model returned an empty explanation".to_string(),
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxbot_llm::{CompletionResponse, Message};
    use mockall::mock;
    use std::str::FromStr;

    mock! {
        Provider {}

        #[async_trait]
        impl LLMProvider for Provider {
            async fn complete(&self, request: CompletionRequest) -> fxbot_llm::Result<CompletionResponse>;
            fn name(&self) -> &str;
        }
    }

    fn reply(text: &str) -> CompletionResponse {
        CompletionResponse::new(Message::assistant(text))
    }

    fn pair() -> (Currency, Currency) {
        (Currency::parse("USD").unwrap(), Currency::parse("UAH").unwrap())
    }

    #[tokio::test]
    async fn test_explain_builds_prompt_and_returns_text() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .withf(|request| {
                request.model == "gpt-4o-mini"
                    && request.system.as_deref() == Some(SYSTEM_PROMPT)
                    && request.messages.len() == 1
                    && request.messages[0].content.contains("1 USD = 41.5 UAH")
            })
            .times(1)
            .returning(|_| Ok(reply("One dollar buys 41.5 hryvnias.")));

        let explainer = LlmExplainer::new(Arc::new(provider), "gpt-4o-mini");
        let (usd, uah) = pair();
        let rate = Decimal::from_str("41.500000").unwrap();

        let text = explainer.explain(usd, uah, rate).await.unwrap();
        assert_eq!(text, "One dollar buys 41.5 hryvnias.");
    }

    #[tokio::test]
    async fn test_empty_reply_is_an_error() {
        let mut provider = MockProvider::new();
        provider.expect_complete().returning(|_| Ok(reply("   ")));

        let explainer = LlmExplainer::new(Arc::new(provider), "gpt-4o-mini");
        let (usd, uah) = pair();

        let err = explainer.explain(usd, uah, Decimal::ONE).await.unwrap_err();
        assert!(matches!(err, BotError::Llm(LLMError::UnexpectedResponse(_))));
    }

    #[tokio::test]
    async fn test_provider_errors_keep_retry_semantics() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .times(2)
            .returning(|request| {
                if request.max_tokens == 1 {
                    Err(LLMError::AuthenticationFailed)
                } else {
                    Err(LLMError::RateLimitExceeded("slow down".to_string()))
                }
            });
        let provider: Arc<dyn LLMProvider> = Arc::new(provider);
        let (usd, uah) = pair();

        let limited = LlmExplainer::new(Arc::clone(&provider), "m");
        let err = limited.explain(usd, uah, Decimal::ONE).await.unwrap_err();
        assert!(err.is_retryable());

        let unauthorized = LlmExplainer::new(provider, "m").with_max_tokens(1);
        let err = unauthorized.explain(usd, uah, Decimal::ONE).await.unwrap_err();
        assert!(!err.is_retryable());
    }
}
