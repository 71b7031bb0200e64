use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info};

use crate::application::{
    Authenticator, ClearConversationUseCase, ConversationStore, InferenceGateway,
    SendMessageUseCase, SessionStore, ViewConversationUseCase,
};
use crate::connector::{
    ApiKeyCredential, AzureInferenceClient, InMemorySessionStore, ManagedIdentityCredential,
    MockInferenceGateway, DEFAULT_IDLE_TIMEOUT, DEFAULT_MODEL, DEFAULT_TIMEOUT,
};
use crate::domain::DomainError;

use super::view::ChatPage;

pub struct ContainerConfig {
    /// Base URL of the chat-completions deployment. Required unless
    /// `mock_inference` is set.
    pub endpoint: Option<String>,
    /// Static key. When absent the host's managed identity is used instead.
    pub api_key: Option<String>,
    pub model: String,
    pub request_timeout: Duration,
    pub system_prompt: Option<String>,
    /// Answer locally instead of calling the endpoint.
    pub mock_inference: bool,
    pub session_idle_timeout: Duration,
    /// Mark the session cookie `Secure` (serve behind HTTPS).
    pub secure_cookies: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            request_timeout: DEFAULT_TIMEOUT,
            system_prompt: None,
            mock_inference: false,
            session_idle_timeout: DEFAULT_IDLE_TIMEOUT,
            secure_cookies: false,
        }
    }
}

pub struct Container {
    session_store: Arc<dyn SessionStore>,
    conversation_store: Arc<ConversationStore>,
    gateway: Arc<dyn InferenceGateway>,
    chat_page: ChatPage,
    config: ContainerConfig,
}

impl Container {
    /// Wire the production adapters. Fails when the endpoint is missing so the
    /// process never starts half-configured.
    pub fn new(config: ContainerConfig) -> Result<Self> {
        let session_store: Arc<dyn SessionStore> = Arc::new(
            InMemorySessionStore::with_idle_timeout(config.session_idle_timeout),
        );

        let gateway: Arc<dyn InferenceGateway> = if config.mock_inference {
            debug!("Using mock inference gateway");
            Arc::new(MockInferenceGateway::new())
        } else {
            let endpoint = config
                .endpoint
                .as_deref()
                .filter(|e| !e.trim().is_empty())
                .ok_or_else(|| {
                    DomainError::configuration(
                        "inference endpoint is not configured (set --endpoint or AZUREAI_ENDPOINT)",
                    )
                })?;

            let authenticator: Arc<dyn Authenticator> = match config
                .api_key
                .as_deref()
                .filter(|k| !k.trim().is_empty())
            {
                Some(key) => {
                    debug!("Authenticating to inference endpoint with API key");
                    Arc::new(ApiKeyCredential::new(key))
                }
                None => {
                    debug!("No API key configured, using managed identity");
                    Arc::new(ManagedIdentityCredential::from_env())
                }
            };

            let client = AzureInferenceClient::new(
                endpoint,
                config.model.clone(),
                authenticator,
                config.request_timeout,
            )?;
            info!(
                "Using inference endpoint {} with model {}",
                client.url(),
                client.model()
            );
            Arc::new(client)
        };

        Self::with_services(config, session_store, gateway)
    }

    /// Wire the container around externally supplied collaborators.
    pub fn with_services(
        config: ContainerConfig,
        session_store: Arc<dyn SessionStore>,
        gateway: Arc<dyn InferenceGateway>,
    ) -> Result<Self> {
        let conversation_store = Arc::new(ConversationStore::new(session_store.clone()));
        let chat_page = ChatPage::new()?;

        Ok(Self {
            session_store,
            conversation_store,
            gateway,
            chat_page,
            config,
        })
    }

    pub fn view_conversation_use_case(&self) -> ViewConversationUseCase {
        ViewConversationUseCase::new(self.conversation_store.clone())
    }

    pub fn send_message_use_case(&self) -> SendMessageUseCase {
        let use_case =
            SendMessageUseCase::new(self.conversation_store.clone(), self.gateway.clone());

        match self.config.system_prompt.as_deref() {
            Some(prompt) if !prompt.trim().is_empty() => use_case.with_system_prompt(prompt),
            _ => use_case,
        }
    }

    pub fn clear_conversation_use_case(&self) -> ClearConversationUseCase {
        ClearConversationUseCase::new(self.conversation_store.clone())
    }

    pub fn session_store(&self) -> Arc<dyn SessionStore> {
        self.session_store.clone()
    }

    pub fn secure_cookies(&self) -> bool {
        self.config.secure_cookies
    }

    pub fn chat_page(&self) -> &ChatPage {
        &self.chat_page
    }

    pub fn model(&self) -> &str {
        self.gateway.model()
    }
}
