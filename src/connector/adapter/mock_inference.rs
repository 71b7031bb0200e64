use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::application::InferenceGateway;
use crate::domain::{ChatRole, Conversation, DomainError};

const MOCK_MODEL: &str = "mock-inference";

/// Offline stand-in for the inference endpoint.
///
/// Replies by echoing the latest user message, or fails every call when built
/// with [`MockInferenceGateway::failing`]. Records what it was sent so tests
/// can inspect the request side.
pub struct MockInferenceGateway {
    failure: Option<String>,
    calls: AtomicUsize,
    last_request: Mutex<Option<Conversation>>,
}

impl MockInferenceGateway {
    pub fn new() -> Self {
        Self {
            failure: None,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<Conversation> {
        self.last_request
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }

    fn reply_to(conversation: &Conversation) -> String {
        match conversation.last_with_role(&ChatRole::User) {
            Some(text) => format!("You said: {text}"),
            None => "Hello! How can I help you today?".to_string(),
        }
    }
}

impl Default for MockInferenceGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceGateway for MockInferenceGateway {
    async fn complete(&self, conversation: &Conversation) -> Result<String, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(conversation.clone());
        }

        debug!("Mock inference called with {} messages", conversation.len());

        match &self.failure {
            Some(message) => Err(DomainError::inference(message.clone())),
            None => Ok(Self::reply_to(conversation)),
        }
    }

    fn model(&self) -> &str {
        MOCK_MODEL
    }
}
