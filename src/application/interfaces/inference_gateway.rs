use async_trait::async_trait;

use crate::domain::{Conversation, DomainError};

/// Sends a whole conversation to a chat-completion model and returns the
/// reply text.
///
/// The complete history goes out on every call; there is no delta protocol.
/// Failures are returned, not absorbed: the caller decides how an error
/// shows up in the conversation.
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    async fn complete(&self, conversation: &Conversation) -> Result<String, DomainError>;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;
}
