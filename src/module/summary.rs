//! Module summary pipeline: normalize, fetch, parse, summarize, wrap.

use crate::module::git_url::{normalize_git_url, GitUrlError};
use crate::module::source::{GitSource, ModuleSource};
use crate::terraform::parser::{HclWorkspaceParser, WorkspaceParser};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Failures of the `get_module` pipeline. The display text is what the tool
/// reports to the caller.
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Invalid Git URL: {0}")]
    InvalidUrl(#[from] GitUrlError),

    #[error("Error fetching repository: {0}")]
    Fetch(String),

    #[error("Error parsing Terraform configuration: {0}")]
    Parse(String),

    #[error("Error generating summary: {0}")]
    Summary(String),

    #[error("Error marshaling module info: {0}")]
    Serialize(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleRequest {
    pub url: String,
    pub reference: Option<String>,
    pub subdir: Option<String>,
}

impl ModuleRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_reference(mut self, reference: Option<String>) -> Self {
        self.reference = reference.filter(|r| !r.trim().is_empty());
        self
    }

    pub fn with_subdir(mut self, subdir: Option<String>) -> Self {
        self.subdir = subdir.filter(|s| !s.trim().is_empty());
        self
    }
}

/// What `get_module` returns. `url` is the normalized URL; `ref` and `subdir`
/// echo the request with absent values as empty strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleEnvelope {
    pub url: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub subdir: String,
    pub config: Value,
}

pub struct ModuleAssembler {
    source: Arc<dyn ModuleSource>,
    parser: Arc<dyn WorkspaceParser>,
}

impl ModuleAssembler {
    pub fn new(source: Arc<dyn ModuleSource>, parser: Arc<dyn WorkspaceParser>) -> Self {
        Self { source, parser }
    }

    pub async fn assemble(&self, request: &ModuleRequest) -> Result<ModuleEnvelope, ModuleError> {
        let url = normalize_git_url(&request.url)?;
        info!("Summarizing module {} (ref: {:?}, subdir: {:?})", url, request.reference, request.subdir);

        let fetched = self
            .source
            .fetch(&url, request.reference.as_deref(), request.subdir.as_deref())
            .await?;

        // Parsing and removal are plain filesystem work
        let parser = Arc::clone(&self.parser);
        let (parsed, cleanup) = tokio::task::spawn_blocking(move || {
            let parsed = parser.parse_workspace(fetched.root_path());
            (parsed, fetched.cleanup())
        })
        .await
        .map_err(|e| ModuleError::Parse(format!("parser task failed: {}", e)))?;

        if let Err(e) = cleanup {
            warn!("Failed to remove module working directory: {}", e);
        }
        let config = parsed?;

        let summary = config
            .summary(true)
            .map_err(|e| ModuleError::Summary(e.to_string()))?;
        let config: Value =
            serde_json::from_slice(&summary).map_err(|e| ModuleError::Summary(e.to_string()))?;

        Ok(ModuleEnvelope {
            url,
            reference: request.reference.clone().unwrap_or_default(),
            subdir: request.subdir.clone().unwrap_or_default(),
            config,
        })
    }

    /// Assemble and render as indented JSON.
    pub async fn render(&self, request: &ModuleRequest) -> Result<String, ModuleError> {
        let envelope = self.assemble(request).await?;
        serde_json::to_string_pretty(&envelope).map_err(|e| ModuleError::Serialize(e.to_string()))
    }
}

impl Default for ModuleAssembler {
    fn default() -> Self {
        Self::new(Arc::new(GitSource::new()), Arc::new(HclWorkspaceParser::new()))
    }
}
