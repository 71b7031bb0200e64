use async_trait::async_trait;

use crate::domain::{DomainError, SessionId};

/// A string-keyed blob store whose entries live as long as the session they
/// belong to.
///
/// Implementations decide how sessions are backed (process memory, a shared
/// cache, a signed cookie) and when they expire. Callers see an expired
/// session exactly like one that never stored anything.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Start tracking a newly issued session so later requests can present it.
    async fn open(&self, session: &SessionId) -> Result<(), DomainError>;

    /// Whether `session` was opened here and has not expired.
    async fn contains(&self, session: &SessionId) -> Result<bool, DomainError>;

    async fn get_string(&self, session: &SessionId, key: &str)
        -> Result<Option<String>, DomainError>;

    async fn set_string(
        &self,
        session: &SessionId,
        key: &str,
        value: String,
    ) -> Result<(), DomainError>;

    async fn remove(&self, session: &SessionId, key: &str) -> Result<(), DomainError>;

    /// Drop every session whose lifetime has run out and return how many were
    /// removed. Stores without expiry have nothing to do.
    async fn purge_expired(&self) -> Result<usize, DomainError> {
        Ok(0)
    }
}
