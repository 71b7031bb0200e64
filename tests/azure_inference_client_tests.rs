//! Tests for the chat-completions client and managed identity credential
//! against local fakes of the remote endpoints.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Json;
use serde_json::{json, Value};

use storefront_chat::{
    ApiKeyCredential, Authenticator, AzureInferenceClient, ChatMessage, ChatRole, Conversation,
    ConversationStore, Credential, DomainError, InMemorySessionStore, InferenceGateway,
    ManagedIdentityCredential, SendMessageUseCase, SessionId, ERROR_REPLY_PREFIX,
};

#[derive(Debug, Clone)]
struct CapturedRequest {
    headers: HeaderMap,
    query: HashMap<String, String>,
    body: Value,
}

#[derive(Clone)]
struct FakeEndpoint {
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    status: StatusCode,
    reply: Value,
    delay: Duration,
}

impl FakeEndpoint {
    fn replying(reply: Value) -> Self {
        Self {
            captured: Arc::new(Mutex::new(Vec::new())),
            status: StatusCode::OK,
            reply,
            delay: Duration::ZERO,
        }
    }

    fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().expect("lock").clone()
    }
}

async fn chat_completions(
    State(fake): State<FakeEndpoint>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    fake.captured.lock().expect("lock").push(CapturedRequest {
        headers,
        query,
        body,
    });
    if !fake.delay.is_zero() {
        tokio::time::sleep(fake.delay).await;
    }
    (fake.status, Json(fake.reply.clone()))
}

/// Serve `fake` on an ephemeral port and return the deployment base URL.
async fn spawn_endpoint(fake: FakeEndpoint) -> String {
    let app = axum::Router::new()
        .route("/models/chat/completions", post(chat_completions))
        .with_state(fake);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}/models")
}

fn reply(text: &str) -> Value {
    json!({
        "id": "cmpl-1",
        "model": "Phi-4",
        "choices": [{
            "index": 0,
            "finish_reason": "stop",
            "message": { "role": "assistant", "content": text }
        }]
    })
}

fn api_key_client(endpoint: &str, timeout: Duration) -> AzureInferenceClient {
    AzureInferenceClient::new(
        endpoint,
        "Phi-4",
        Arc::new(ApiKeyCredential::new("test-key")),
        timeout,
    )
    .expect("client")
}

fn conversation() -> Conversation {
    Conversation::from_messages(vec![
        ChatMessage::system("You are helpful."),
        ChatMessage::user("What are your store hours?"),
    ])
}

struct StaticToken;

#[async_trait]
impl Authenticator for StaticToken {
    async fn credential(&self) -> Result<Credential, DomainError> {
        Ok(Credential::BearerToken("token-123".to_string()))
    }
}

struct BrokenIdentity;

#[async_trait]
impl Authenticator for BrokenIdentity {
    async fn credential(&self) -> Result<Credential, DomainError> {
        Err(DomainError::authentication("no managed identity available"))
    }
}

#[tokio::test]
async fn sends_full_history_and_returns_reply() {
    let fake = FakeEndpoint::replying(reply("We are open 9 to 5."));
    let endpoint = spawn_endpoint(fake.clone()).await;
    let client = api_key_client(&endpoint, Duration::from_secs(5));

    let mut history = conversation();
    history.push(ChatMessage::new(ChatRole::Other("tool".into()), "skip me"));

    let text = client.complete(&history).await.expect("reply");
    assert_eq!(text, "We are open 9 to 5.");

    let requests = fake.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(
        request.body,
        json!({
            "model": "Phi-4",
            "messages": [
                { "role": "system", "content": "You are helpful." },
                { "role": "user", "content": "What are your store hours?" }
            ]
        })
    );
    assert_eq!(
        request.headers.get("api-key").expect("api-key header"),
        "test-key"
    );
    assert_eq!(
        request.query.get("api-version").map(String::as_str),
        Some("2024-05-01-preview")
    );
}

#[tokio::test]
async fn bearer_credentials_use_authorization_header() {
    let fake = FakeEndpoint::replying(reply("hi"));
    let endpoint = spawn_endpoint(fake.clone()).await;
    let client = AzureInferenceClient::new(
        &endpoint,
        "Phi-4",
        Arc::new(StaticToken),
        Duration::from_secs(5),
    )
    .expect("client");

    client.complete(&conversation()).await.expect("reply");

    let request = &fake.requests()[0];
    assert_eq!(
        request.headers.get("authorization").expect("authorization"),
        "Bearer token-123"
    );
    assert!(request.headers.get("api-key").is_none());
}

#[tokio::test]
async fn error_status_carries_endpoint_message() {
    let fake = FakeEndpoint::replying(json!({
        "error": { "code": "Unauthorized", "message": "Access denied due to invalid key." }
    }))
    .with_status(StatusCode::UNAUTHORIZED);
    let endpoint = spawn_endpoint(fake).await;
    let client = api_key_client(&endpoint, Duration::from_secs(5));

    let err = client
        .complete(&conversation())
        .await
        .expect_err("should fail");
    assert!(matches!(err, DomainError::InferenceError(_)));
    assert!(err.detail().contains("401"));
    assert!(err.detail().contains("Access denied due to invalid key."));
}

#[tokio::test]
async fn response_without_choices_is_an_error() {
    let fake = FakeEndpoint::replying(json!({ "choices": [] }));
    let endpoint = spawn_endpoint(fake).await;
    let client = api_key_client(&endpoint, Duration::from_secs(5));

    let err = client
        .complete(&conversation())
        .await
        .expect_err("should fail");
    assert!(err.detail().contains("no reply"));
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let fake = FakeEndpoint::replying(reply("too late")).with_delay(Duration::from_secs(3));
    let endpoint = spawn_endpoint(fake).await;
    let client = api_key_client(&endpoint, Duration::from_millis(200));

    let err = client
        .complete(&conversation())
        .await
        .expect_err("should time out");
    assert!(err.detail().contains("did not respond"));
}

#[tokio::test]
async fn unreachable_endpoint_is_an_inference_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = api_key_client(&format!("http://{addr}/models"), Duration::from_secs(5));
    let err = client
        .complete(&conversation())
        .await
        .expect_err("should fail");
    assert!(matches!(err, DomainError::InferenceError(_)));
}

#[tokio::test]
async fn endpoint_failure_is_recorded_as_assistant_turn() {
    let fake = FakeEndpoint::replying(json!({ "error": { "message": "model overloaded" } }))
        .with_status(StatusCode::SERVICE_UNAVAILABLE);
    let endpoint = spawn_endpoint(fake).await;

    let sessions = Arc::new(InMemorySessionStore::new());
    let store = Arc::new(ConversationStore::new(sessions));
    let use_case = SendMessageUseCase::new(
        store.clone(),
        Arc::new(api_key_client(&endpoint, Duration::from_secs(5))),
    );
    let session = SessionId::generate();

    let conversation = use_case
        .execute(&session, "hello")
        .await
        .expect("turn completes")
        .expect("not ignored");

    assert_eq!(conversation.len(), 3);
    let text = conversation.last().expect("reply").content();
    assert!(text.starts_with(ERROR_REPLY_PREFIX));
    assert!(text.contains("model overloaded"));
    assert_eq!(store.load(&session).await.expect("load"), conversation);
}

#[tokio::test]
async fn credential_failure_is_recorded_as_assistant_turn() {
    let fake = FakeEndpoint::replying(reply("unreachable"));
    let endpoint = spawn_endpoint(fake.clone()).await;
    let client = AzureInferenceClient::new(
        &endpoint,
        "Phi-4",
        Arc::new(BrokenIdentity),
        Duration::from_secs(5),
    )
    .expect("client");

    let store = Arc::new(ConversationStore::new(Arc::new(InMemorySessionStore::new())));
    let use_case = SendMessageUseCase::new(store, Arc::new(client));

    let conversation = use_case
        .execute(&SessionId::generate(), "hello")
        .await
        .expect("turn completes")
        .expect("not ignored");

    let text = conversation.last().expect("reply").content();
    assert!(text.starts_with(ERROR_REPLY_PREFIX));
    assert!(text.contains("no managed identity available"));
    assert!(fake.requests().is_empty());
}

#[derive(Clone)]
struct FakeIdentityEndpoint {
    hits: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<(HeaderMap, HashMap<String, String>)>>>,
}

impl FakeIdentityEndpoint {
    fn new() -> Self {
        Self {
            hits: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Serve a token endpoint at `path` on an ephemeral port.
async fn spawn_identity_endpoint(fake: FakeIdentityEndpoint, path: &str) -> SocketAddr {
    let app = axum::Router::new()
        .route(path, get(issue_token))
        .with_state(fake);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

async fn issue_token(
    State(fake): State<FakeIdentityEndpoint>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    fake.hits.fetch_add(1, Ordering::SeqCst);
    fake.seen.lock().expect("lock").push((headers, query));
    let expires_on = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_secs()
        + 3600;
    Json(json!({
        "access_token": "mi-token",
        "expires_on": expires_on.to_string(),
        "token_type": "Bearer"
    }))
}

#[tokio::test]
async fn managed_identity_token_is_fetched_once_and_cached() {
    let fake = FakeIdentityEndpoint::new();
    let addr = spawn_identity_endpoint(fake.clone(), "/metadata/identity/oauth2/token").await;

    let credential = ManagedIdentityCredential::with_imds_endpoint(
        format!("http://{addr}/metadata/identity/oauth2/token"),
        "https://cognitiveservices.azure.com",
        Some("client-abc".to_string()),
    );

    for _ in 0..3 {
        let token = credential.credential().await.expect("token");
        assert_eq!(token, Credential::BearerToken("mi-token".to_string()));
    }
    assert_eq!(fake.hits.load(Ordering::SeqCst), 1);

    let seen = fake.seen.lock().expect("lock");
    let (headers, query) = &seen[0];
    assert_eq!(headers.get("metadata").expect("Metadata header"), "true");
    assert_eq!(
        query.get("resource").map(String::as_str),
        Some("https://cognitiveservices.azure.com")
    );
    assert_eq!(query.get("client_id").map(String::as_str), Some("client-abc"));
    assert_eq!(query.get("api-version").map(String::as_str), Some("2018-02-01"));
}

#[tokio::test]
async fn app_service_identity_sends_secret_header_and_caches_token() {
    let fake = FakeIdentityEndpoint::new();
    let addr = spawn_identity_endpoint(fake.clone(), "/msi/token").await;

    let credential = ManagedIdentityCredential::with_app_service_endpoint(
        format!("http://{addr}/msi/token"),
        "secret",
        "https://cognitiveservices.azure.com",
        None,
    );

    for _ in 0..2 {
        let token = credential.credential().await.expect("token");
        assert_eq!(token, Credential::BearerToken("mi-token".to_string()));
    }
    assert_eq!(fake.hits.load(Ordering::SeqCst), 1);

    let seen = fake.seen.lock().expect("lock");
    let (headers, query) = &seen[0];
    assert_eq!(headers.get("x-identity-header").expect("identity header"), "secret");
    assert!(headers.get("metadata").is_none());
    assert_eq!(query.get("api-version").map(String::as_str), Some("2019-08-01"));
    assert_eq!(
        query.get("resource").map(String::as_str),
        Some("https://cognitiveservices.azure.com")
    );
    assert!(query.get("client_id").is_none());
}
