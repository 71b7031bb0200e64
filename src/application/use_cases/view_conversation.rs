use std::sync::Arc;

use crate::application::ConversationStore;
use crate::domain::{Conversation, DomainError, SessionId};

/// Use case for showing the current conversation of a session.
pub struct ViewConversationUseCase {
    store: Arc<ConversationStore>,
}

impl ViewConversationUseCase {
    pub fn new(store: Arc<ConversationStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, session: &SessionId) -> Result<Conversation, DomainError> {
        self.store.load(session).await
    }
}
