use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use crate::domain::Conversation;

use super::super::error::ApiError;
use super::super::session::RequestSession;
use super::super::Container;

pub const CHAT_PATH: &str = "/chat";

#[derive(Debug, Default, Deserialize)]
pub struct SendMessageForm {
    #[serde(default)]
    pub user_message: Option<String>,
}

/// `GET /chat`: show the conversation.
pub async fn index(
    State(container): State<Arc<Container>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let session = RequestSession::resolve(&headers, container.session_store().as_ref()).await?;
    let conversation = container
        .view_conversation_use_case()
        .execute(session.id())
        .await?;

    render(&container, &session, &conversation)
}

/// `POST /chat/send`: run one turn and show the result.
pub async fn send_message(
    State(container): State<Arc<Container>>,
    headers: HeaderMap,
    Form(form): Form<SendMessageForm>,
) -> Result<Response, ApiError> {
    let session = RequestSession::resolve(&headers, container.session_store().as_ref()).await?;
    let text = form.user_message.unwrap_or_default();

    match container
        .send_message_use_case()
        .execute(session.id(), &text)
        .await?
    {
        Some(conversation) => render(&container, &session, &conversation),
        None => Ok(redirect_to_chat(&container, &session)),
    }
}

/// `POST /chat/clear`: forget the conversation and go back to the empty page.
pub async fn clear(
    State(container): State<Arc<Container>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let session = RequestSession::resolve(&headers, container.session_store().as_ref()).await?;
    container
        .clear_conversation_use_case()
        .execute(session.id())
        .await?;

    Ok(redirect_to_chat(&container, &session))
}

fn render(
    container: &Container,
    session: &RequestSession,
    conversation: &Conversation,
) -> Result<Response, ApiError> {
    let html = container
        .chat_page()
        .render(conversation, container.model())?;
    Ok(session.attach(Html(html).into_response(), container.secure_cookies()))
}

fn redirect_to_chat(container: &Container, session: &RequestSession) -> Response {
    session.attach(
        Redirect::to(CHAT_PATH).into_response(),
        container.secure_cookies(),
    )
}
