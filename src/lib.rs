pub mod application;
pub mod cli;
pub mod connector;
pub mod domain;

pub use application::{
    Authenticator, ClearConversationUseCase, ConversationStore, Credential, InferenceGateway,
    SendMessageUseCase, SessionStore, ViewConversationUseCase, CHAT_HISTORY_KEY,
    DEFAULT_SYSTEM_PROMPT, ERROR_REPLY_PREFIX,
};

pub use cli::{Cli, Commands};

pub use connector::api::{Container, ContainerConfig};
pub use connector::{
    ApiKeyCredential, AzureInferenceClient, InMemorySessionStore, ManagedIdentityCredential,
    MockInferenceGateway,
};

pub use domain::{ChatMessage, ChatRole, Conversation, DomainError, SessionId};
