use std::sync::Arc;

use axum::response::Redirect;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use super::container::Container;
use super::controller::{chat_controller, CHAT_PATH};

/// Build the HTTP surface: one page to read the conversation, one form target
/// to send a message, one to clear it.
pub fn build(container: Arc<Container>) -> axum::Router {
    axum::Router::new()
        .route("/", get(|| async { Redirect::to(CHAT_PATH) }))
        .route(CHAT_PATH, get(chat_controller::index))
        .route("/chat/send", post(chat_controller::send_message))
        .route("/chat/clear", post(chat_controller::clear))
        .layer(TraceLayer::new_for_http())
        .with_state(container)
}
