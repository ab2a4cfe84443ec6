//! LLM provider abstraction layer for fx-bot
//!
//! This crate provides a small provider-agnostic surface for asking a Large
//! Language Model for text:
//!
//! - Message types for chat completions
//! - Completion request and reply types
//! - Provider trait for LLM implementations
//! - An OpenAI-compatible provider (behind the `openai` feature)

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse};
pub use error::{LLMError, Result};
pub use messages::{Message, Role};
pub use provider::LLMProvider;

// Provider implementations (feature-gated)
#[cfg(feature = "openai")]
pub mod providers;
