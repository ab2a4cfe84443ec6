//! Shared utilities for fx-bot
//!
//! This crate provides common functionality used across the fx-bot workspace:
//! tracing setup and helpers for reading configuration from the environment.

pub mod config;
pub mod logging;

pub use config::{EnvError, load_dotenv, optional_var, required_var};
pub use logging::init_tracing;
