use std::sync::Arc;

use tracing::warn;

use crate::application::SessionStore;
use crate::domain::{Conversation, DomainError, SessionId};

/// Session key the serialized history lives under.
pub const CHAT_HISTORY_KEY: &str = "ChatHistory";

/// Keeps one [`Conversation`] per session as a JSON blob in a [`SessionStore`].
///
/// Every write replaces the whole blob. A blob that is missing, blank or
/// unreadable loads as an empty conversation.
pub struct ConversationStore {
    sessions: Arc<dyn SessionStore>,
}

impl ConversationStore {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    pub async fn load(&self, session: &SessionId) -> Result<Conversation, DomainError> {
        let blob = self.sessions.get_string(session, CHAT_HISTORY_KEY).await?;
        Ok(blob
            .map(|json| Self::decode(session, &json))
            .unwrap_or_default())
    }

    pub async fn save(
        &self,
        session: &SessionId,
        conversation: &Conversation,
    ) -> Result<(), DomainError> {
        let json = serde_json::to_string(conversation)
            .map_err(|e| DomainError::serialization(format!("Failed to encode history: {e}")))?;
        self.sessions
            .set_string(session, CHAT_HISTORY_KEY, json)
            .await
    }

    pub async fn clear(&self, session: &SessionId) -> Result<(), DomainError> {
        self.sessions.remove(session, CHAT_HISTORY_KEY).await
    }

    fn decode(session: &SessionId, json: &str) -> Conversation {
        if json.trim().is_empty() {
            return Conversation::new();
        }

        match serde_json::from_str(json) {
            Ok(conversation) => conversation,
            Err(e) => {
                warn!(
                    "Discarding unreadable chat history for session {}: {}",
                    session, e
                );
                Conversation::new()
            }
        }
    }
}
