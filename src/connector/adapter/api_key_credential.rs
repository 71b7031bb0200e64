use async_trait::async_trait;

use crate::application::{Authenticator, Credential};
use crate::domain::DomainError;

/// Static key credential for the inference endpoint.
pub struct ApiKeyCredential {
    key: String,
}

impl ApiKeyCredential {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[async_trait]
impl Authenticator for ApiKeyCredential {
    async fn credential(&self) -> Result<Credential, DomainError> {
        Ok(Credential::ApiKey(self.key.clone()))
    }
}
