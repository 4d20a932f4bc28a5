//! One interactive chat session: knowledge, template, model and transcript.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use docchat_completion::CompletionClient;
use docchat_shared::{FailedTurnPolicy, Message, Result};

use crate::conversation::Conversation;
use crate::pipeline::{KnowledgeBase, ProgressReporter};
use crate::prompt::PromptTemplate;

/// A chat session answering questions from a knowledge base.
pub struct ChatSession {
    conversation: Conversation,
    template: PromptTemplate,
    knowledge: KnowledgeBase,
    completion: Arc<dyn CompletionClient>,
    failed_turn: FailedTurnPolicy,
}

impl ChatSession {
    pub fn new(
        template: PromptTemplate,
        knowledge: KnowledgeBase,
        completion: Arc<dyn CompletionClient>,
        failed_turn: FailedTurnPolicy,
    ) -> Self {
        Self {
            conversation: Conversation::new(),
            template,
            knowledge,
            completion,
            failed_turn,
        }
    }

    /// Open the transcript with an assistant welcome message.
    pub fn with_welcome(mut self, welcome: Option<&str>) -> Self {
        if let Some(text) = welcome.filter(|t| !t.trim().is_empty()) {
            self.conversation = Conversation::with_welcome(text);
        }
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn model(&self) -> &str {
        self.completion.model()
    }

    /// Answer one question.
    ///
    /// The knowledge buffer is fetched first (from cache unless expired); a
    /// knowledge failure leaves the transcript untouched. On
    /// `GenerationFailed` the question stays in the transcript under
    /// [`FailedTurnPolicy::Keep`] and is dropped under
    /// [`FailedTurnPolicy::Retract`].
    #[instrument(skip_all, fields(session = %self.conversation.id(), turn = self.conversation.len()))]
    pub async fn ask(&mut self, question: &str, progress: &dyn ProgressReporter) -> Result<String> {
        let knowledge = self.knowledge.current(progress).await?;
        let prompt = self.template.compose(knowledge.as_str(), question);

        let user = Message::user(question);
        let staged = match self.failed_turn {
            FailedTurnPolicy::Keep => {
                self.conversation.append(user);
                None
            }
            FailedTurnPolicy::Retract => Some(user),
        };

        let answer = match self.completion.generate(&prompt).await {
            Ok(answer) => answer,
            Err(err) => {
                warn!(error = %err, policy = ?self.failed_turn, "turn failed");
                return Err(err);
            }
        };

        if let Some(user) = staged {
            self.conversation.append(user);
        }
        self.conversation.append(Message::assistant(answer.clone()));
        info!(answer_chars = answer.len(), "turn complete");
        Ok(answer)
    }
}
