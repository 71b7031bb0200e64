use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use tracing::debug;

use crate::application::SessionStore;
use crate::domain::{DomainError, SessionId};

/// Cookie carrying the browser's session id.
pub const SESSION_COOKIE: &str = "storefront_chat_session";

/// The session a request belongs to, and whether it was issued just now.
pub struct RequestSession {
    id: SessionId,
    is_new: bool,
}

impl RequestSession {
    /// Reuse the session named by the request cookie when the store issued
    /// it and still holds it. Anything else (no cookie, a malformed value, an
    /// id the server never handed out or one that has expired) gets a freshly
    /// opened session.
    pub async fn resolve(
        headers: &HeaderMap,
        sessions: &dyn SessionStore,
    ) -> Result<Self, DomainError> {
        if let Some(id) = Self::cookie_value(headers).and_then(SessionId::parse) {
            if sessions.contains(&id).await? {
                return Ok(Self { id, is_new: false });
            }
            debug!("Ignoring unknown session {}", id);
        }

        let id = SessionId::generate();
        sessions.open(&id).await?;
        debug!("Starting new chat session {}", id);
        Ok(Self { id, is_new: true })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Add the `Set-Cookie` header to `response` when the session is new.
    /// `secure` restricts the cookie to HTTPS.
    pub fn attach(&self, mut response: Response, secure: bool) -> Response {
        if self.is_new {
            let mut cookie =
                format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", self.id);
            if secure {
                cookie.push_str("; Secure");
            }
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(SET_COOKIE, value);
            }
        }
        response
    }

    fn cookie_value(headers: &HeaderMap) -> Option<&str> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, value)| value)
    }
}
