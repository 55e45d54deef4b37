// PromptShelf — Prompt library for coding assistants
// License: Apache-2.0

pub mod analytics;
pub mod config;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod logger;
pub mod preferences;
pub mod prompt;
pub mod provider;
pub mod relevance;
pub mod search;
pub mod store;
pub mod submission;
pub mod transfer;
pub mod tui;
pub mod usage;
pub mod variables;

pub use error::{Result, ShelfError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
