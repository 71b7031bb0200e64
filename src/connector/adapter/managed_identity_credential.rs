use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::application::{Authenticator, Credential};
use crate::domain::DomainError;

/// Token audience for Azure AI services.
pub const COGNITIVE_SERVICES_RESOURCE: &str = "https://cognitiveservices.azure.com";

const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";

/// Tokens are refreshed this long before they actually expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenSource {
    /// App Service / Container Apps identity endpoint.
    AppService { endpoint: String, header: String },
    /// Instance metadata service on VMs and AKS nodes.
    Imds { endpoint: String },
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Unix seconds; IMDS sends it as a string, some hosts as a number.
    expires_on: serde_json::Value,
}

struct CachedToken {
    token: String,
    expires_at: SystemTime,
}

/// Ambient credential that fetches access tokens for the host's managed
/// identity.
///
/// Environment:
///
/// | Variable            | Purpose                                          |
/// |---------------------|--------------------------------------------------|
/// | `IDENTITY_ENDPOINT` | App Service token endpoint (IMDS when unset)     |
/// | `IDENTITY_HEADER`   | Secret header App Service expects with requests  |
/// | `AZURE_CLIENT_ID`   | Selects a user-assigned identity                 |
///
/// A fetched token is reused until it is within five minutes of expiry.
pub struct ManagedIdentityCredential {
    client: reqwest::Client,
    source: TokenSource,
    resource: String,
    client_id: Option<String>,
    cached: Mutex<Option<CachedToken>>,
}

impl ManagedIdentityCredential {
    pub fn new(resource: impl Into<String>, client_id: Option<String>) -> Self {
        Self::with_source(Self::source_from_env(), resource, client_id)
    }

    pub fn from_env() -> Self {
        let client_id = std::env::var("AZURE_CLIENT_ID")
            .ok()
            .filter(|id| !id.trim().is_empty());
        Self::new(COGNITIVE_SERVICES_RESOURCE, client_id)
    }

    /// Point the credential at an explicit IMDS-compatible token endpoint.
    pub fn with_imds_endpoint(
        endpoint: impl Into<String>,
        resource: impl Into<String>,
        client_id: Option<String>,
    ) -> Self {
        let source = TokenSource::Imds {
            endpoint: endpoint.into(),
        };
        Self::with_source(source, resource, client_id)
    }

    /// Point the credential at an explicit App Service identity endpoint,
    /// authenticating with the `X-IDENTITY-HEADER` secret.
    pub fn with_app_service_endpoint(
        endpoint: impl Into<String>,
        header: impl Into<String>,
        resource: impl Into<String>,
        client_id: Option<String>,
    ) -> Self {
        let source = TokenSource::AppService {
            endpoint: endpoint.into(),
            header: header.into(),
        };
        Self::with_source(source, resource, client_id)
    }

    fn with_source(
        source: TokenSource,
        resource: impl Into<String>,
        client_id: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            source,
            resource: resource.into(),
            client_id,
            cached: Mutex::new(None),
        }
    }

    fn source_from_env() -> TokenSource {
        match (
            std::env::var("IDENTITY_ENDPOINT"),
            std::env::var("IDENTITY_HEADER"),
        ) {
            (Ok(endpoint), Ok(header)) if !endpoint.is_empty() => {
                TokenSource::AppService { endpoint, header }
            }
            _ => TokenSource::Imds {
                endpoint: IMDS_ENDPOINT.to_string(),
            },
        }
    }

    async fn fetch_token(&self) -> Result<CachedToken, DomainError> {
        let mut query: Vec<(&str, &str)> = vec![("resource", self.resource.as_str())];
        if let Some(client_id) = self.client_id.as_deref() {
            query.push(("client_id", client_id));
        }

        let request = match &self.source {
            TokenSource::AppService { endpoint, header } => {
                query.push(("api-version", APP_SERVICE_API_VERSION));
                self.client
                    .get(endpoint)
                    .header("X-IDENTITY-HEADER", header)
                    .query(&query)
            }
            TokenSource::Imds { endpoint } => {
                query.push(("api-version", IMDS_API_VERSION));
                self.client
                    .get(endpoint)
                    .header("Metadata", "true")
                    .query(&query)
            }
        };

        let response = request.send().await.map_err(|e| {
            DomainError::authentication(format!("managed identity endpoint unreachable: {e}"))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Managed identity endpoint returned {status}: {body}");
            return Err(DomainError::authentication(format!(
                "managed identity endpoint returned {status}"
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            DomainError::authentication(format!("failed to parse managed identity token: {e}"))
        })?;

        let expires_at = parse_expires_on(&token.expires_on).ok_or_else(|| {
            DomainError::authentication("managed identity token has no valid expires_on")
        })?;

        debug!("Acquired managed identity token for {}", self.resource);

        Ok(CachedToken {
            token: token.access_token,
            expires_at,
        })
    }
}

fn parse_expires_on(value: &serde_json::Value) -> Option<SystemTime> {
    let secs = match value {
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok()?,
        serde_json::Value::Number(n) => n.as_u64()?,
        _ => return None,
    };
    UNIX_EPOCH.checked_add(Duration::from_secs(secs))
}

fn is_fresh(token: &CachedToken, now: SystemTime) -> bool {
    token
        .expires_at
        .duration_since(now)
        .is_ok_and(|remaining| remaining > REFRESH_MARGIN)
}

#[async_trait]
impl Authenticator for ManagedIdentityCredential {
    async fn credential(&self) -> Result<Credential, DomainError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if is_fresh(token, SystemTime::now()) {
                return Ok(Credential::BearerToken(token.token.clone()));
            }
        }

        let token = self.fetch_token().await?;
        let credential = Credential::BearerToken(token.token.clone());
        *cached = Some(token);
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_on_accepts_string_and_number() {
        let from_string = parse_expires_on(&serde_json::json!("1700000000"));
        let from_number = parse_expires_on(&serde_json::json!(1700000000u64));
        assert!(from_string.is_some());
        assert_eq!(from_string, from_number);
        assert!(parse_expires_on(&serde_json::json!(null)).is_none());
        assert!(parse_expires_on(&serde_json::json!("soon")).is_none());
    }

    #[test]
    fn token_near_expiry_is_not_fresh() {
        let now = SystemTime::now();
        let stale = CachedToken {
            token: "t".into(),
            expires_at: now + Duration::from_secs(60),
        };
        let fresh = CachedToken {
            token: "t".into(),
            expires_at: now + Duration::from_secs(3600),
        };
        let expired = CachedToken {
            token: "t".into(),
            expires_at: now - Duration::from_secs(1),
        };

        assert!(!is_fresh(&stale, now));
        assert!(is_fresh(&fresh, now));
        assert!(!is_fresh(&expired, now));
    }
}
