// Re-export modules for testing and external use
pub mod registry {
    pub mod client;
    pub mod provider;
    pub mod types;

    // Re-export commonly used items
    pub use client::{RegistryClient, RegistryError};
    pub use provider::{BlockQuery, DocCategory, ProviderIdentity, ProviderResolver};
}

pub mod module {
    pub mod git_url;
    pub mod source;
    pub mod summary;

    pub use git_url::{normalize_git_url, GitUrlError};
    pub use source::{FetchedModule, GitSource, ModuleSource};
    pub use summary::{ModuleAssembler, ModuleEnvelope, ModuleError, ModuleRequest};
}

pub mod terraform {
    pub mod model;
    pub mod parser;

    pub use model::ModuleConfig;
    pub use parser::{HclWorkspaceParser, WorkspaceParser};
}

pub mod mcp {
    pub mod server;
    pub mod types;
}

// Re-export commonly used types for easier testing and external use
pub use mcp::server::TfDocsServer;
pub use module::summary::ModuleAssembler;
pub use registry::provider::ProviderResolver;
