use reqwest::Client;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

/// The only registry this crate talks to.
pub const REGISTRY_BASE_URL: &str = "https://registry.terraform.io";

/// Round-trip limit for every registry request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("tfdocs/", env!("CARGO_PKG_VERSION"), " (+public-registry)");

/// Query parameters for a registry request. Keys are unique and unordered.
pub type Query<'a> = BTreeMap<&'a str, &'a str>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("request to the Terraform Registry failed: {0}")]
    Transport(String),

    #[error("registry error: status={status} body={body}")]
    RegistryStatus { status: u16, body: String },

    #[error("malformed registry response: {0}")]
    MalformedResponse(String),

    #[error("invalid category: {0} (expected one of: overview, resources, data-sources)")]
    InvalidCategory(String),

    #[error("failed to find provider version id: {namespace}/{name} {version}")]
    VersionNotFound {
        namespace: String,
        name: String,
        version: String,
    },

    #[error("no hcl {category} document named '{slug}' for provider {namespace}/{name}")]
    DocumentNotFound {
        namespace: String,
        name: String,
        category: String,
        slug: String,
    },

    #[error("provider docs lookup must return exactly one document, got {count}: {ids:?}")]
    AmbiguousOrMissingDocument { count: usize, ids: Vec<String> },
}

impl From<reqwest::Error> for RegistryError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            RegistryError::Transport(format!(
                "timed out after {}s: {}",
                REQUEST_TIMEOUT.as_secs(),
                error
            ))
        } else {
            RegistryError::Transport(error.to_string())
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(error: serde_json::Error) -> Self {
        RegistryError::MalformedResponse(error.to_string())
    }
}

/// Thin GET client for the public Terraform Registry.
///
/// Knows nothing about response shapes: [`RegistryClient::fetch`] hands back
/// the raw body and [`RegistryClient::fetch_json`] decodes it into whatever the
/// caller asks for.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    base_url: String,
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryClient {
    pub fn new() -> Self {
        Self::with_base_url(REGISTRY_BASE_URL)
    }

    /// Point the client at another host. Tests use this with a local mock server.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` with `query` and return the raw body of a 2xx response.
    pub async fn fetch(&self, path: &str, query: &Query<'_>) -> Result<Vec<u8>, RegistryError> {
        let url = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };

        debug!("GET {} query={:?}", url, query);

        // Set per request as well, so the limit holds even if the builder fell back
        let mut request = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(REQUEST_TIMEOUT);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.map_err(|e| {
            error!("Registry request to {} failed: {}", url, e);
            RegistryError::from(e)
        })?;
        let status = response.status();
        debug!("Response status: {} for {}", status, url);

        let body = response.bytes().await?.to_vec();

        if !status.is_success() {
            warn!("Registry returned HTTP {} for {}", status, url);
            return Err(RegistryError::RegistryStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        debug!("Received {} bytes from {}", body.len(), url);
        Ok(body)
    }

    /// [`RegistryClient::fetch`] followed by JSON decoding into `T`.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &Query<'_>,
    ) -> Result<T, RegistryError> {
        let body = self.fetch(path, query).await?;
        let decoded = serde_json::from_slice(&body).inspect_err(|e| {
            error!(
                "Failed to decode response from {}: {} (first 200 chars: {})",
                path,
                e,
                String::from_utf8_lossy(&body).chars().take(200).collect::<String>()
            );
        })?;
        Ok(decoded)
    }
}
