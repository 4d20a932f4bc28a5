//! Knowledge pipeline, prompt composition and chat sessions for DocChat.
//!
//! This crate ties the document source, extractors and completion client
//! together into the flow the apps drive: build a knowledge buffer once
//! (cached with a TTL), then answer questions against it turn by turn.

pub mod cache;
pub mod conversation;
pub mod knowledge;
pub mod pipeline;
pub mod prompt;
pub mod session;
pub mod startup;

pub use cache::{CacheKey, KnowledgeCache};
pub use conversation::Conversation;
pub use knowledge::{KnowledgeBuffer, aggregate};
pub use pipeline::{
    KnowledgeBase, KnowledgeOptions, ProgressReporter, SilentProgress, build_knowledge,
    list_and_download,
};
pub use prompt::PromptTemplate;
pub use session::ChatSession;
pub use startup::{knowledge_base, knowledge_cache, start_session};
