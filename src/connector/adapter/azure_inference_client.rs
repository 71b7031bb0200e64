use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::{Authenticator, Credential, InferenceGateway};
use crate::domain::{ChatMessage, ChatRole, Conversation, DomainError};

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "Phi-4";
/// Upper bound on a single completion request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";
const API_VERSION: &str = "2024-05-01-preview";

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
}

/// Role-tagged request message. Only the roles the endpoint understands have
/// a variant; anything else has no wire form.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "role", rename_all = "lowercase")]
enum ApiMessage<'a> {
    System { content: &'a str },
    User { content: &'a str },
    Assistant { content: &'a str },
}

impl<'a> ApiMessage<'a> {
    fn from_message(message: &'a ChatMessage) -> Option<Self> {
        let content = message.content();
        match message.role() {
            ChatRole::System => Some(ApiMessage::System { content }),
            ChatRole::User => Some(ApiMessage::User { content }),
            ChatRole::Assistant => Some(ApiMessage::Assistant { content }),
            ChatRole::Other(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// HTTP client for the Azure AI model inference chat-completions API.
///
/// The configured endpoint is the deployment base URL, for example
/// `https://<resource>.services.ai.azure.com/models`; requests go to
/// `{endpoint}/chat/completions`. Each request is authorized through the
/// supplied [`Authenticator`] and bounded by the client timeout. There are no
/// retries: one failed attempt is one error.
pub struct AzureInferenceClient {
    client: reqwest::Client,
    authenticator: Arc<dyn Authenticator>,
    model: String,
    /// Full endpoint URL (base + CHAT_COMPLETIONS_PATH).
    url: String,
    timeout: Duration,
}

impl AzureInferenceClient {
    pub fn new(
        endpoint: &str,
        model: impl Into<String>,
        authenticator: Arc<dyn Authenticator>,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let trimmed = endpoint.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(DomainError::configuration(
                "inference endpoint is not configured",
            ));
        }
        reqwest::Url::parse(trimmed).map_err(|e| {
            DomainError::configuration(format!("invalid inference endpoint '{trimmed}': {e}"))
        })?;

        let model: String = model.into();
        let model = if model.trim().is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            model
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            authenticator,
            model,
            url: format!("{trimmed}{CHAT_COMPLETIONS_PATH}"),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_messages(conversation: &Conversation) -> Vec<ApiMessage<'_>> {
        conversation
            .iter()
            .filter_map(|message| {
                let mapped = ApiMessage::from_message(message);
                if mapped.is_none() {
                    debug!(
                        "Dropping message with unsupported role '{}' from inference request",
                        message.role()
                    );
                }
                mapped
            })
            .collect()
    }

    fn describe_send_error(&self, e: &reqwest::Error) -> String {
        if e.is_timeout() {
            format!(
                "the model did not respond within {} seconds",
                self.timeout.as_secs()
            )
        } else if e.is_connect() {
            format!("could not connect to the inference endpoint: {e}")
        } else {
            format!("request to the inference endpoint failed: {e}")
        }
    }
}

#[async_trait]
impl InferenceGateway for AzureInferenceClient {
    async fn complete(&self, conversation: &Conversation) -> Result<String, DomainError> {
        let request = ApiRequest {
            model: &self.model,
            messages: Self::build_messages(conversation),
        };

        let builder = self
            .client
            .post(&self.url)
            .query(&[("api-version", API_VERSION)])
            .json(&request);

        let builder = match self.authenticator.credential().await? {
            Credential::ApiKey(key) => builder.header("api-key", key),
            Credential::BearerToken(token) => builder.bearer_auth(token),
        };

        debug!(
            "Sending {} messages to {} (model {})",
            request.messages.len(),
            self.url,
            self.model
        );

        let response = builder
            .send()
            .await
            .map_err(|e| DomainError::inference(self.describe_send_error(&e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Inference endpoint returned {status}: {body}");
            let detail = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| format!("endpoint returned {status}: {}", b.error.message))
                .unwrap_or_else(|_| format!("endpoint returned {status}"));
            return Err(DomainError::inference(detail));
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            DomainError::inference(format!("failed to parse inference response: {e}"))
        })?;

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| DomainError::inference("inference response contained no reply"))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
