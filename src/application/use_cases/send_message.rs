use std::sync::Arc;

use tracing::{debug, error, info};

use crate::application::{ConversationStore, InferenceGateway};
use crate::domain::{ChatMessage, Conversation, DomainError, SessionId};

/// Instruction seeded as the first message of every new conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant for the Zava Storefront. \
Help customers with questions about products, pricing, and general inquiries.";

/// Prefix of the assistant message recorded when the model could not be reached.
pub const ERROR_REPLY_PREFIX: &str = "Sorry, an error occurred while processing your request: ";

/// Turn a gateway failure into text the assistant "says" in the conversation.
pub fn error_reply(err: &DomainError) -> String {
    format!("{ERROR_REPLY_PREFIX}{}", err.detail())
}

/// Use case for one chat turn: record the user's message, ask the model,
/// record its answer.
///
/// A failed inference call still completes the turn. The error is logged and
/// its description is stored as the assistant's reply, so the caller only
/// ever sees errors from the session store itself.
pub struct SendMessageUseCase {
    store: Arc<ConversationStore>,
    gateway: Arc<dyn InferenceGateway>,
    system_prompt: String,
}

impl SendMessageUseCase {
    pub fn new(store: Arc<ConversationStore>, gateway: Arc<dyn InferenceGateway>) -> Self {
        Self {
            store,
            gateway,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Returns `None` without touching the session when `user_text` is blank.
    pub async fn execute(
        &self,
        session: &SessionId,
        user_text: &str,
    ) -> Result<Option<Conversation>, DomainError> {
        if user_text.trim().is_empty() {
            debug!("Ignoring blank chat message for session {}", session);
            return Ok(None);
        }

        info!("User sent chat message: {}", user_text);

        let mut conversation = self.store.load(session).await?;

        if conversation.is_empty() {
            conversation.push(ChatMessage::system(self.system_prompt.as_str()));
        }
        conversation.push(ChatMessage::user(user_text));

        let reply = match self.gateway.complete(&conversation).await {
            Ok(text) => text,
            Err(e) => {
                error!(
                    "Error getting chat response from model {}: {}",
                    self.gateway.model(),
                    e
                );
                error_reply(&e)
            }
        };
        conversation.push(ChatMessage::assistant(reply));

        self.store.save(session, &conversation).await?;

        Ok(Some(conversation))
    }
}
