use crate::registry::client::{Query, RegistryClient, RegistryError};
use crate::registry::types::{
    V1Provider, V1ProviderDoc, V2Provider, V2ProviderDocs, V2ProviderDocument, V2ProviderVersion,
};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_NAMESPACE: &str = "hashicorp";

const DOC_LANGUAGE: &str = "hcl";

/// Namespace and name of a registry provider, e.g. `hashicorp/aws`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIdentity {
    pub namespace: String,
    pub name: String,
}

impl ProviderIdentity {
    /// A missing or blank namespace falls back to [`DEFAULT_NAMESPACE`].
    pub fn new(namespace: Option<&str>, name: impl Into<String>) -> Self {
        let namespace = namespace
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE);
        Self {
            namespace: namespace.to_string(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ProviderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Documentation categories the registry filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocCategory {
    Overview,
    Resources,
    DataSources,
}

impl DocCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocCategory::Overview => "overview",
            DocCategory::Resources => "resources",
            DocCategory::DataSources => "data-sources",
        }
    }
}

impl fmt::Display for DocCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocCategory {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overview" => Ok(DocCategory::Overview),
            "resources" => Ok(DocCategory::Resources),
            "data-sources" => Ok(DocCategory::DataSources),
            other => Err(RegistryError::InvalidCategory(other.to_string())),
        }
    }
}

/// What to look up for a provider. `version: None` selects the v1 "latest"
/// path; `Some` selects the v2 versioned path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockQuery {
    pub category: DocCategory,
    pub name: String,
    pub version: Option<String>,
}

impl BlockQuery {
    /// Blank versions are treated as absent.
    pub fn new(category: DocCategory, name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            category,
            name: name.into(),
            version: version
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        }
    }
}

/// Resolves provider documentation through the registry's dependent lookups:
/// provider -> (version id) -> document id -> document content.
#[derive(Clone)]
pub struct ProviderResolver {
    client: Arc<RegistryClient>,
}

impl ProviderResolver {
    pub fn new() -> Self {
        Self::with_client(RegistryClient::new())
    }

    pub fn with_client(client: RegistryClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Resolve `query` against `identity` and return the document markdown.
    pub async fn resolve(
        &self,
        identity: &ProviderIdentity,
        query: &BlockQuery,
    ) -> Result<String, RegistryError> {
        debug!(
            "Resolving {} '{}' for provider {} (version: {:?})",
            query.category, query.name, identity, query.version
        );

        let doc_id = match query.version.as_deref() {
            None => self.latest_doc_id(identity, query).await?,
            Some(version) => {
                let version_id = self.provider_version_id(identity, version).await?;
                self.versioned_doc_id(&version_id, query.category, &query.name)
                    .await?
            }
        };

        self.doc_content(&doc_id).await
    }

    /// Latest path: scan the docs index embedded in the v1 provider document.
    pub async fn latest_doc_id(
        &self,
        identity: &ProviderIdentity,
        query: &BlockQuery,
    ) -> Result<String, RegistryError> {
        let path = format!(
            "/v1/providers/{}/{}",
            urlencoding::encode(&identity.namespace),
            urlencoding::encode(&identity.name)
        );
        let provider: V1Provider = self.client.fetch_json(&path, &Query::new()).await?;

        debug!(
            "Provider {} latest version is {} ({} docs indexed)",
            identity,
            provider.version,
            provider.docs.len()
        );

        find_latest_doc(&provider.docs, query.category, &query.name)
            .map(|doc| doc.id.clone())
            .ok_or_else(|| {
                warn!(
                    "No hcl {} document '{}' in {} {}",
                    query.category, query.name, identity, provider.version
                );
                RegistryError::DocumentNotFound {
                    namespace: identity.namespace.clone(),
                    name: identity.name.clone(),
                    category: query.category.to_string(),
                    slug: query.name.clone(),
                }
            })
    }

    /// Versioned path, step 1: find the registry id of an exact version string.
    pub async fn provider_version_id(
        &self,
        identity: &ProviderIdentity,
        version: &str,
    ) -> Result<String, RegistryError> {
        let path = format!(
            "/v2/providers/{}/{}",
            urlencoding::encode(&identity.namespace),
            urlencoding::encode(&identity.name)
        );
        let query = Query::from([("include", "provider-versions")]);
        let provider: V2Provider = self.client.fetch_json(&path, &query).await?;

        find_version_id(&provider.included, version)
            .map(str::to_string)
            .ok_or_else(|| RegistryError::VersionNotFound {
                namespace: identity.namespace.clone(),
                name: identity.name.clone(),
                version: version.to_string(),
            })
    }

    /// Versioned path, step 2: the filtered docs listing must hold exactly one entry.
    pub async fn versioned_doc_id(
        &self,
        version_id: &str,
        category: DocCategory,
        slug: &str,
    ) -> Result<String, RegistryError> {
        let query = Query::from([
            ("filter[provider-version]", version_id),
            ("filter[category]", category.as_str()),
            ("filter[slug]", slug),
            ("filter[language]", DOC_LANGUAGE),
        ]);
        let docs: V2ProviderDocs = self.client.fetch_json("/v2/provider-docs", &query).await?;

        match docs.data.as_slice() {
            [doc] => Ok(doc.id.clone()),
            others => {
                warn!(
                    "Expected one {} document '{}' for provider version {}, got {}",
                    category,
                    slug,
                    version_id,
                    others.len()
                );
                Err(RegistryError::AmbiguousOrMissingDocument {
                    count: others.len(),
                    ids: others.iter().map(|doc| doc.id.clone()).collect(),
                })
            }
        }
    }

    /// Final step for both paths: fetch the document body by id.
    pub async fn doc_content(&self, doc_id: &str) -> Result<String, RegistryError> {
        let path = format!("/v2/provider-docs/{}", urlencoding::encode(doc_id));
        let document: V2ProviderDocument = self.client.fetch_json(&path, &Query::new()).await?;

        let content = document.data.attributes.content.ok_or_else(|| {
            RegistryError::MalformedResponse(format!("document {} has no content", doc_id))
        })?;

        info!(
            "Retrieved documentation content for ID: {} ({} chars)",
            doc_id,
            content.len()
        );
        Ok(content)
    }
}

impl Default for ProviderResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// First hcl entry in registry order matching category and slug.
pub fn find_latest_doc<'a>(
    docs: &'a [V1ProviderDoc],
    category: DocCategory,
    slug: &str,
) -> Option<&'a V1ProviderDoc> {
    docs.iter().find(|doc| {
        doc.language == DOC_LANGUAGE && doc.category == category.as_str() && doc.slug == slug
    })
}

/// Exact version match, scanning from the most recently listed record backward.
pub fn find_version_id<'a>(versions: &'a [V2ProviderVersion], version: &str) -> Option<&'a str> {
    versions
        .iter()
        .rev()
        .find(|record| record.attributes.version == version)
        .map(|record| record.id.as_str())
}
