//! Background task owning the chat session.
//!
//! The UI thread never awaits; it sends [`Request`]s and drains
//! [`WorkerEvent`]s once per frame.

use std::path::PathBuf;

use docchat_core::{KnowledgeBuffer, ProgressReporter, knowledge_cache, start_session};
use docchat_shared::{AppConfig, Message};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{error, info, warn};

/// Work the UI asks for.
#[derive(Debug)]
pub(crate) enum Request {
    Ask(String),
    Refresh,
}

/// What the knowledge screen shows.
#[derive(Debug, Clone, Default)]
pub(crate) struct KnowledgeSummary {
    pub folder_id: String,
    pub documents: Vec<String>,
    pub bytes: usize,
}

impl KnowledgeSummary {
    fn new(folder_id: &str, buffer: &KnowledgeBuffer) -> Self {
        Self {
            folder_id: folder_id.to_string(),
            documents: buffer.documents().to_vec(),
            bytes: buffer.len(),
        }
    }
}

/// Updates sent back to the UI.
#[derive(Debug)]
pub(crate) enum WorkerEvent {
    /// Pipeline phase or per-document progress.
    Progress(String),
    /// Session started; `history` holds the welcome message, if any.
    Ready {
        history: Vec<Message>,
        summary: KnowledgeSummary,
        model: String,
    },
    /// A turn finished. `error` is the rendered message of a failed turn.
    Turn {
        history: Vec<Message>,
        error: Option<String>,
    },
    Refreshed(KnowledgeSummary),
    /// A reload failed; the previous knowledge stays in use.
    RefreshFailed(String),
    /// The session cannot continue.
    Fatal(String),
}

/// Forwards pipeline progress to the UI.
struct ChannelProgress(UnboundedSender<WorkerEvent>);

impl ProgressReporter for ChannelProgress {
    fn phase(&self, name: &str) {
        let _ = self.0.send(WorkerEvent::Progress(name.to_string()));
    }

    fn document_loaded(&self, name: &str, current: usize, total: usize) {
        let _ = self
            .0
            .send(WorkerEvent::Progress(format!("Reading [{current}/{total}] {name}")));
    }

    fn document_skipped(&self, name: &str, reason: &str) {
        let _ = self
            .0
            .send(WorkerEvent::Progress(format!("Skipped '{name}': {reason}")));
    }

    fn done(&self, buffer: &KnowledgeBuffer) {
        let _ = self.0.send(WorkerEvent::Progress(format!(
            "Knowledge base ready ({} documents)",
            buffer.documents().len()
        )));
    }
}

/// Start the session, then serve requests until the UI hangs up.
pub(crate) async fn run(
    config: AppConfig,
    secrets_path: Option<PathBuf>,
    mut requests: UnboundedReceiver<Request>,
    events: UnboundedSender<WorkerEvent>,
) {
    let messages = config.error_messages.clone();
    let progress = ChannelProgress(events.clone());
    let fatal = |err: &docchat_shared::DocChatError| {
        error!(scenario = err.scenario(), error = %err.detail(), "session halted");
        let _ = events.send(WorkerEvent::Fatal(messages.for_error(err)));
    };

    let cache = knowledge_cache(&config);
    let mut session =
        match start_session(&config, secrets_path.as_deref(), cache, &progress).await {
            Ok(session) => session,
            Err(err) => return fatal(&err),
        };

    let summary = match session.knowledge().current(&progress).await {
        Ok(buffer) => KnowledgeSummary::new(session.knowledge().folder_id(), &buffer),
        Err(err) => return fatal(&err),
    };
    let _ = events.send(WorkerEvent::Ready {
        history: session.conversation().history().to_vec(),
        summary,
        model: session.model().to_string(),
    });

    while let Some(request) = requests.recv().await {
        match request {
            Request::Ask(question) => {
                let error = match session.ask(&question, &progress).await {
                    Ok(_) => None,
                    Err(err) if err.halts_chat() => return fatal(&err),
                    Err(err) => Some(messages.for_error(&err)),
                };
                let _ = events.send(WorkerEvent::Turn {
                    history: session.conversation().history().to_vec(),
                    error,
                });
            }
            Request::Refresh => match session.knowledge().refresh(&progress).await {
                Ok(buffer) => {
                    let summary = KnowledgeSummary::new(session.knowledge().folder_id(), &buffer);
                    let _ = events.send(WorkerEvent::Refreshed(summary));
                }
                Err(err) if err.halts_chat() => return fatal(&err),
                Err(err) => {
                    warn!(scenario = err.scenario(), error = %err.detail(), "refresh failed");
                    let _ = events.send(WorkerEvent::RefreshFailed(messages.for_error(&err)));
                }
            },
        }
    }

    info!(turns = session.conversation().len(), "chat worker stopped");
}
