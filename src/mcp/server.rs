//! RMCP-based MCP server exposing the documentation and module tools.

use crate::mcp::types::*;
use crate::module::summary::{ModuleAssembler, ModuleRequest};
use crate::registry::provider::{BlockQuery, DocCategory, ProviderIdentity, ProviderResolver};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, InitializeResult,
        ListToolsResult, PaginatedRequestParam, ProtocolVersion, ServerCapabilities,
        ToolsCapability,
    },
    service::{RequestContext, RoleServer, ServiceExt},
    tool, tool_router,
    transport::streamable_http_server::{
        StreamableHttpService, session::local::LocalSessionManager,
    },
};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const TOOL_NAMES: [&str; 3] = [
    "search_resource_block_document",
    "search_data_block_document",
    "get_module",
];

/// MCP server for Terraform provider documentation and module summaries.
#[derive(Clone)]
pub struct TfDocsServer {
    resolver: Arc<ProviderResolver>,
    modules: Arc<ModuleAssembler>,
    tool_router: ToolRouter<Self>,
}

impl Default for TfDocsServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_router]
impl TfDocsServer {
    /// Server backed by the public registry and the system `git`.
    pub fn new() -> Self {
        Self::with_components(ProviderResolver::new(), ModuleAssembler::default())
    }

    pub fn with_components(resolver: ProviderResolver, modules: ModuleAssembler) -> Self {
        Self {
            resolver: Arc::new(resolver),
            modules: Arc::new(modules),
            tool_router: Self::tool_router(),
        }
    }

    /// Serve the MCP server over stdio.
    pub async fn serve_stdio(self) -> anyhow::Result<()> {
        use tokio::io::{stdin, stdout};

        let transport = (stdin(), stdout());

        log_banner("JSON-RPC over stdio", "stdin/stdout");
        let service = self.serve(transport).await?;

        // Keep serving until the client disconnects
        service.waiting().await?;

        Ok(())
    }

    /// Serve the MCP server over streamable HTTP at `/mcp` until Ctrl-C.
    pub async fn serve_http(self, port: u16) -> anyhow::Result<()> {
        let server = self;
        let service = StreamableHttpService::new(
            move || Ok(server.clone()),
            LocalSessionManager::default().into(),
            Default::default(),
        );
        let app = axum::Router::new().nest_service("/mcp", service);

        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
        log_banner("HTTP", &format!("http://localhost:{}/mcp", port));

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
                info!("Shutting down HTTP server");
            })
            .await?;

        Ok(())
    }

    #[tool(
        description = "Get the documentation of a Terraform resource block for a provider, optionally at a specific provider version",
        annotations(
            title = "Search Resource Block Document",
            read_only_hint = true,
            open_world_hint = true
        )
    )]
    pub async fn search_resource_block_document(
        &self,
        params: Parameters<BlockDocumentInput>,
    ) -> Result<CallToolResult, McpError> {
        info!("Executing search_resource_block_document tool");
        Ok(self.block_document(&params.0, DocCategory::Resources).await)
    }

    #[tool(
        description = "Get the documentation of a Terraform data block for a provider, optionally at a specific provider version",
        annotations(
            title = "Search Data Block Document",
            read_only_hint = true,
            open_world_hint = true
        )
    )]
    pub async fn search_data_block_document(
        &self,
        params: Parameters<BlockDocumentInput>,
    ) -> Result<CallToolResult, McpError> {
        info!("Executing search_data_block_document tool");
        Ok(self.block_document(&params.0, DocCategory::DataSources).await)
    }

    #[tool(
        description = "Get a summary of the Terraform module in a Git repository (GitHub/GitLab). Accepts SSH or HTTPS URLs",
        annotations(
            title = "Get Terraform Module",
            read_only_hint = true,
            open_world_hint = true
        )
    )]
    pub async fn get_module(
        &self,
        params: Parameters<ModuleInput>,
    ) -> Result<CallToolResult, McpError> {
        info!("Executing get_module tool");
        let input = params.0;

        let url = match required_arg(&input.url, "url") {
            Ok(url) => url,
            Err(message) => return Ok(error_result(message)),
        };

        let request = ModuleRequest::new(url)
            .with_reference(input.reference())
            .with_subdir(optional_arg(&input.subdir).map(str::to_string));

        match self.modules.render(&request).await {
            Ok(json) => Ok(CallToolResult::success(vec![Content::text(json)])),
            Err(e) => {
                warn!("get_module failed for {}: {}", url, e);
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
        }
    }

    async fn block_document(&self, input: &BlockDocumentInput, category: DocCategory) -> CallToolResult {
        let provider_name = match required_arg(&input.provider_name, "provider_name") {
            Ok(name) => name,
            Err(message) => return error_result(message),
        };
        let block_name = match required_arg(&input.block_name, "block_name") {
            Ok(name) => name,
            Err(message) => return error_result(message),
        };

        let identity =
            ProviderIdentity::new(optional_arg(&input.provider_namespace), provider_name);
        let version = optional_arg(&input.provider_version).map(str::to_string);
        let query = BlockQuery::new(category, block_name, version);

        match self.resolver.resolve(&identity, &query).await {
            Ok(content) => CallToolResult::success(vec![Content::text(content)]),
            Err(e) => {
                warn!("Failed to resolve {} '{}' for {}: {}", category, block_name, identity, e);
                CallToolResult::error(vec![Content::text(e.to_string())])
            }
        }
    }
}

fn error_result(message: String) -> CallToolResult {
    CallToolResult::error(vec![Content::text(message)])
}

fn log_banner(protocol: &str, endpoint: &str) {
    info!("Starting tfdocs v{}", env!("CARGO_PKG_VERSION"));
    info!("Protocol: {}", protocol);
    info!("Listening on: {}", endpoint);
    info!("Available tools: {}", TOOL_NAMES.len());
    for name in TOOL_NAMES {
        info!("  {}", name);
    }
}

impl ServerHandler for TfDocsServer {
    fn get_info(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
                ..Default::default()
            },
            server_info: Implementation {
                name: "tfdocs".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "tfdocs looks up Terraform Registry documentation for provider resource and data blocks, and summarizes Terraform modules hosted in Git repositories.".into(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async move {
            let tools = self.tool_router.list_all();
            Ok(ListToolsResult {
                tools,
                ..Default::default()
            })
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            let tool_context = ToolCallContext::new(self, request, context);
            self.tool_router.call(tool_context).await
        }
    }
}
