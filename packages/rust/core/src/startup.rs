//! Session bootstrap: config + secrets → ready-to-chat session.
//!
//! Steps run in a fixed order and every failure here is fatal:
//! template, secrets, transport clients, then the first knowledge build.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument};

use docchat_completion::GeminiClient;
use docchat_drive::DriveClient;
use docchat_shared::{AppConfig, Result, Secrets, load_secrets};

use crate::cache::KnowledgeCache;
use crate::pipeline::{KnowledgeBase, KnowledgeOptions, ProgressReporter};
use crate::prompt::PromptTemplate;
use crate::session::ChatSession;

/// A cache sized by the `[knowledge]` section.
pub fn knowledge_cache(config: &AppConfig) -> Arc<KnowledgeCache> {
    Arc::new(KnowledgeCache::new(Duration::from_secs(
        config.knowledge.cache_ttl_secs,
    )))
}

/// Bind the configured Drive folder to `cache`.
pub fn knowledge_base(
    config: &AppConfig,
    secrets: &Secrets,
    cache: Arc<KnowledgeCache>,
) -> Result<KnowledgeBase> {
    let drive = DriveClient::new(secrets.service_account.clone(), config.drive.clone())?;
    Ok(KnowledgeBase::new(
        Arc::new(drive),
        secrets.folder_id.clone(),
        cache,
        KnowledgeOptions::from(&config.knowledge),
    ))
}

/// Load the template and secrets, build the knowledge buffer once, and
/// return a session ready for its first question.
#[instrument(skip_all, fields(title = %config.app.title))]
pub async fn start_session(
    config: &AppConfig,
    secrets_path: Option<&Path>,
    cache: Arc<KnowledgeCache>,
    progress: &dyn ProgressReporter,
) -> Result<ChatSession> {
    let template = PromptTemplate::load(&config.template_path())?;
    let secrets = load_secrets(secrets_path, &config.completion.api_key_env)?;

    let knowledge = knowledge_base(config, &secrets, cache)?;
    let completion = GeminiClient::from_config(secrets.gemini_api_key.clone(), &config.completion)?;

    let buffer = knowledge.current(progress).await?;
    info!(
        documents = buffer.documents().len(),
        bytes = buffer.len(),
        model = %config.completion.model,
        "session ready"
    );

    Ok(ChatSession::new(
        template,
        knowledge,
        Arc::new(completion),
        config.session.failed_turn,
    )
    .with_welcome(config.app.welcome_message.as_deref()))
}
