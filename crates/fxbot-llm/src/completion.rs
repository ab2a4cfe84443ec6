//! Chat completion request and reply

use crate::Message;

const DEFAULT_MAX_TOKENS: u32 = 512;

/// One chat-completion call: an optional system prompt followed by the
/// conversation
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Single-question request for `model`
    pub fn new(model: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            messages: vec![Message::user(question)],
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Model reply
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub message: Message,
    /// Generation hit `max_tokens`
    pub truncated: bool,
    /// Prompt plus completion tokens, when the server reports them
    pub total_tokens: Option<u32>,
}

impl CompletionResponse {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            truncated: false,
            total_tokens: None,
        }
    }

    /// Reply text, `None` when blank
    pub fn text(&self) -> Option<&str> {
        self.message.text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_and_overrides() {
        let request = CompletionRequest::new("gpt-4o-mini", "Why did EUR move?");
        assert_eq!(request.messages, vec![Message::user("Why did EUR move?")]);
        assert_eq!(request.max_tokens, DEFAULT_MAX_TOKENS);
        assert!(request.system.is_none());

        let request = request
            .with_system("You explain currency rates")
            .with_max_tokens(300)
            .with_temperature(0.3);
        assert_eq!(request.max_tokens, 300);
        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.system.as_deref(), Some("You explain currency rates"));
    }

    #[test]
    fn test_blank_reply_has_no_text() {
        assert_eq!(CompletionResponse::new(Message::assistant(" \n")).text(), None);
        assert_eq!(
            CompletionResponse::new(Message::assistant("Rates moved.")).text(),
            Some("Rates moved.")
        );
    }
}
