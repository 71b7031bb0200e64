use async_trait::async_trait;

use crate::domain::DomainError;

/// Authorization material for a single inference request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Static key sent in the `api-key` header.
    ApiKey(String),
    /// OAuth access token sent as `Authorization: Bearer`.
    BearerToken(String),
}

/// Produces valid auth for the next call to the inference endpoint.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn credential(&self) -> Result<Credential, DomainError>;
}
