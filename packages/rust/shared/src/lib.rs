//! Shared types, error model, and configuration for DocChat.
//!
//! This crate is the foundation depended on by all other DocChat crates.
//! It provides:
//! - [`DocChatError`]: the unified error type
//! - Domain types ([`SourceItem`], [`ExtractedText`], [`Message`], [`SessionId`])
//! - Configuration ([`AppConfig`], [`Secrets`], [`ErrorMessages`], config loading)

pub mod config;
pub mod error;
pub mod messages;
pub mod secrets;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, AppSection, CompletionConfig, DriveConfig, FailedTurnPolicy, KnowledgeConfig,
    SessionConfig, config_dir, init_config, load_config, load_config_from, resolve_config_path,
};
pub use error::{BoxError, DocChatError, Result};
pub use messages::{ErrorMessages, render_placeholders};
pub use secrets::{
    Secrets, ServiceAccountKey, load_secrets, load_secrets_from, resolve_secrets_path,
};
pub use types::{ContentType, ExtractedText, Message, Role, SessionId, SourceItem};
