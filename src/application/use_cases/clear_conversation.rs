use std::sync::Arc;

use tracing::info;

use crate::application::ConversationStore;
use crate::domain::{DomainError, SessionId};

/// Use case for resetting a session's conversation.
pub struct ClearConversationUseCase {
    store: Arc<ConversationStore>,
}

impl ClearConversationUseCase {
    pub fn new(store: Arc<ConversationStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, session: &SessionId) -> Result<(), DomainError> {
        self.store.clear(session).await?;
        info!("Cleared chat history for session {}", session);
        Ok(())
    }
}
