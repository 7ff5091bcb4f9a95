//! Authenticated transport for the management API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ArmError, Result};
use crate::poller::Poller;

/// Default public cloud endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// Default interval between long-running-operation polls when the service
/// does not send `Retry-After`.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Source of bearer tokens.
///
/// Token acquisition (CLI login, managed identity, service principal) lives
/// outside this crate; implementations only hand out a current token.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn token(&self) -> Result<String>;
}

/// A pre-acquired access token.
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn token(&self) -> Result<String> {
        if self.token.is_empty() {
            return Err(ArmError::MissingCredential);
        }
        Ok(self.token.clone())
    }
}

/// A buffered response from the management API.
#[derive(Debug)]
pub struct ArmResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ArmResponse {
    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Management API client shared by all typed service clients.
#[derive(Clone)]
pub struct ArmClient {
    http: reqwest::Client,
    endpoint: String,
    credential: Arc<dyn TokenCredential>,
    poll_interval: Duration,
}

impl ArmClient {
    pub fn new(endpoint: &str, credential: Arc<dyn TokenCredential>) -> Result<Self> {
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(ArmError::InvalidUrl(endpoint.to_string()));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            credential,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Override the fallback polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub async fn get(
        &self,
        path: &str,
        api_version: &str,
        query: &[(&str, &str)],
    ) -> Result<ArmResponse> {
        let url = format!("{}{}", self.endpoint, path);
        self.send::<()>(Method::GET, &url, Some(api_version), query, None)
            .await
    }

    pub async fn put<B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<ArmResponse> {
        let url = format!("{}{}", self.endpoint, path);
        self.send(Method::PUT, &url, Some(api_version), &[], Some(body))
            .await
    }

    pub async fn patch<B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<ArmResponse> {
        let url = format!("{}{}", self.endpoint, path);
        self.send(Method::PATCH, &url, Some(api_version), &[], Some(body))
            .await
    }

    pub async fn delete(&self, path: &str, api_version: &str) -> Result<ArmResponse> {
        let url = format!("{}{}", self.endpoint, path);
        self.send::<()>(Method::DELETE, &url, Some(api_version), &[], None)
            .await
    }

    /// GET an absolute URL handed out by the service (polling and paging links
    /// already carry their own `api-version`).
    pub async fn get_link(&self, url: &str) -> Result<ArmResponse> {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ArmError::InvalidUrl(url.to_string()));
        }
        self.send::<()>(Method::GET, url, None, &[], None).await
    }

    /// Wrap the initial response of a long-running operation.
    pub fn poller(&self, initial: &ArmResponse) -> Poller {
        Poller::from_response(self.clone(), initial)
    }

    async fn send<B: Serialize + Sync + ?Sized>(
        &self,
        method: Method,
        url: &str,
        api_version: Option<&str>,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<ArmResponse> {
        let token = self.credential.token().await?;
        let request_id = Uuid::new_v4().to_string();
        debug!("{} {} (request {})", method, url, request_id);

        let mut request = self
            .http
            .request(method.clone(), url)
            .bearer_auth(token)
            .header("x-ms-client-request-id", &request_id);
        if let Some(version) = api_version {
            request = request.query(&[("api-version", version)]);
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        debug!("{} {} -> {}", method, url, status);

        if !(200..300).contains(&status) {
            return Err(ArmError::from_response(status, &body));
        }

        Ok(ArmResponse {
            status,
            headers,
            body,
        })
    }
}

/// Turn a GET result into `None` when the resource does not exist.
pub(crate) fn found<T: DeserializeOwned>(result: Result<ArmResponse>) -> Result<Option<T>> {
    match result {
        Ok(response) => Ok(Some(response.json()?)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
