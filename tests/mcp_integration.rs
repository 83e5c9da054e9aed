use anyhow::Result;
use async_trait::async_trait;
use mockito::{Matcher, Server};
use rmcp::ServerHandler;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tfdocs::mcp::types::{BlockDocumentInput, ModuleInput};
use tfdocs::module::{FetchedModule, ModuleAssembler, ModuleError, ModuleSource};
use tfdocs::registry::{ProviderResolver, RegistryClient};
use tfdocs::terraform::HclWorkspaceParser;
use tfdocs::TfDocsServer;

const MAIN_TF: &str = r#"
terraform {
  required_version = ">= 1.5"

  required_providers {
    aws = {
      source  = "hashicorp/aws"
      version = ">= 5.0"
    }
  }
}

variable "bucket" {
  description = "Name of the bucket"
  type        = string
}

resource "aws_s3_bucket" "this" {
  bucket = var.bucket
}

output "arn" {
  value = aws_s3_bucket.this.arn
}
"#;

/// Writes a small module into a fresh temp dir instead of cloning.
#[derive(Default)]
struct FixtureSource {
    requests: Mutex<Vec<(String, Option<String>, Option<String>)>>,
}

#[async_trait]
impl ModuleSource for FixtureSource {
    async fn fetch(
        &self,
        url: &str,
        reference: Option<&str>,
        subdir: Option<&str>,
    ) -> Result<FetchedModule, ModuleError> {
        self.requests.lock().unwrap().push((
            url.to_string(),
            reference.map(str::to_string),
            subdir.map(str::to_string),
        ));
        let workdir = tempfile::tempdir().map_err(|e| ModuleError::Fetch(e.to_string()))?;
        std::fs::write(workdir.path().join("main.tf"), MAIN_TF)
            .map_err(|e| ModuleError::Fetch(e.to_string()))?;
        let root = workdir.path().to_path_buf();
        Ok(FetchedModule::new(workdir, root))
    }
}

fn server_for(registry: &Server, source: Arc<FixtureSource>) -> TfDocsServer {
    TfDocsServer::with_components(
        ProviderResolver::with_client(RegistryClient::with_base_url(registry.url())),
        ModuleAssembler::new(source, Arc::new(HclWorkspaceParser::new())),
    )
}

fn block_input(value: Value) -> Parameters<BlockDocumentInput> {
    Parameters(serde_json::from_value(value).unwrap())
}

fn module_input(value: Value) -> Parameters<ModuleInput> {
    Parameters(serde_json::from_value(value).unwrap())
}

/// (is_error, first text block)
fn outcome(result: &CallToolResult) -> (bool, String) {
    let value = serde_json::to_value(result).unwrap();
    let is_error = value["isError"].as_bool().unwrap_or(false);
    let text = value["content"][0]["text"].as_str().unwrap_or_default().to_string();
    (is_error, text)
}

#[tokio::test]
async fn test_initialize_advertises_tools_only() {
    let registry = Server::new_async().await;
    let info = server_for(&registry, Arc::default()).get_info();

    let value = serde_json::to_value(&info).unwrap();
    assert_eq!(value["serverInfo"]["name"], "tfdocs");
    assert!(value["capabilities"]["tools"].is_object());
    assert!(value["capabilities"].get("resources").is_none());
}

#[tokio::test]
async fn test_search_resource_block_document_latest() -> Result<()> {
    let mut registry = Server::new_async().await;
    let provider = registry
        .mock("GET", "/v1/providers/hashicorp/aws")
        .with_body(
            json!({
                "version": "5.31.0",
                "docs": [
                    {"id": "7001", "slug": "s3_bucket", "category": "resources", "language": "hcl"}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;
    let document = registry
        .mock("GET", "/v2/provider-docs/7001")
        .with_body(
            json!({
                "data": {
                    "type": "provider-docs",
                    "id": "7001",
                    "attributes": {"content": "# Resource: aws_s3_bucket\n"}
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let server = server_for(&registry, Arc::default());
    let result = server
        .search_resource_block_document(block_input(json!({
            "provider_namespace": "",
            "provider_name": "aws",
            "block_name": "s3_bucket"
        })))
        .await?;

    assert_eq!(outcome(&result), (false, "# Resource: aws_s3_bucket\n".to_string()));
    provider.assert_async().await;
    document.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_search_data_block_document_versioned() -> Result<()> {
    let mut registry = Server::new_async().await;
    let _provider = registry
        .mock("GET", "/v2/providers/hashicorp/google")
        .match_query(Matcher::UrlEncoded("include".into(), "provider-versions".into()))
        .with_body(
            json!({
                "data": {"type": "providers", "id": "321", "attributes": {"name": "google"}},
                "included": [
                    {"type": "provider-versions", "id": "9001", "attributes": {"version": "4.80.0"}},
                    {"type": "provider-versions", "id": "9002", "attributes": {"version": "5.0.0"}}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;
    let listing = registry
        .mock("GET", "/v2/provider-docs")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("filter[provider-version]".into(), "9001".into()),
            Matcher::UrlEncoded("filter[category]".into(), "data-sources".into()),
            Matcher::UrlEncoded("filter[slug]".into(), "project".into()),
            Matcher::UrlEncoded("filter[language]".into(), "hcl".into()),
        ]))
        .with_body(json!({"data": [{"type": "provider-docs", "id": "55"}]}).to_string())
        .create_async()
        .await;
    let _document = registry
        .mock("GET", "/v2/provider-docs/55")
        .with_body(
            json!({"data": {"id": "55", "attributes": {"content": "# Data Source: google_project"}}})
                .to_string(),
        )
        .create_async()
        .await;

    let server = server_for(&registry, Arc::default());
    let result = server
        .search_data_block_document(block_input(json!({
            "provider_name": "google",
            "provider_version": "4.80.0",
            "block_name": "project"
        })))
        .await?;

    assert_eq!(outcome(&result), (false, "# Data Source: google_project".to_string()));
    listing.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_block_document_failures_are_error_results() -> Result<()> {
    let mut registry = Server::new_async().await;
    let _provider = registry
        .mock("GET", "/v2/providers/hashicorp/aws")
        .match_query(Matcher::Any)
        .with_body(json!({"data": {"id": "1"}, "included": []}).to_string())
        .create_async()
        .await;
    let missing = registry
        .mock("GET", "/v1/providers/hashicorp/nope")
        .with_status(404)
        .with_body("Not Found")
        .create_async()
        .await;

    let server = server_for(&registry, Arc::default());

    let (is_error, text) = outcome(
        &server
            .search_resource_block_document(block_input(json!({
                "provider_name": "aws",
                "provider_version": "0.0.1",
                "block_name": "s3_bucket"
            })))
            .await?,
    );
    assert!(is_error);
    assert_eq!(text, "failed to find provider version id: hashicorp/aws 0.0.1");

    let (is_error, text) = outcome(
        &server
            .search_resource_block_document(block_input(json!({
                "provider_name": "nope",
                "block_name": "thing"
            })))
            .await?,
    );
    assert!(is_error);
    assert!(text.contains("404"), "unexpected message: {}", text);
    missing.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_missing_arguments_are_error_results() -> Result<()> {
    let registry = Server::new_async().await;
    let server = server_for(&registry, Arc::default());

    let (is_error, text) = outcome(
        &server
            .search_resource_block_document(block_input(json!({"block_name": "s3_bucket"})))
            .await?,
    );
    assert!(is_error);
    assert_eq!(text, "'provider_name' parameter is required");

    let (is_error, text) = outcome(
        &server
            .search_data_block_document(block_input(json!({"provider_name": "aws"})))
            .await?,
    );
    assert!(is_error);
    assert_eq!(text, "'block_name' parameter is required");

    let (is_error, text) = outcome(&server.get_module(module_input(json!({}))).await?);
    assert!(is_error);
    assert_eq!(text, "'url' parameter is required");
    Ok(())
}

#[tokio::test]
async fn test_get_module_normalizes_ssh_shorthand() -> Result<()> {
    let registry = Server::new_async().await;
    let source = Arc::new(FixtureSource::default());
    let server = server_for(&registry, source.clone());

    let (is_error, text) = outcome(
        &server
            .get_module(module_input(json!({
                "url": "git@github.com:user/repo",
                "branch": "main"
            })))
            .await?,
    );
    assert!(!is_error, "unexpected error: {}", text);

    let envelope: Value = serde_json::from_str(&text)?;
    assert_eq!(envelope["url"], "https://github.com/user/repo.git");
    assert_eq!(envelope["ref"], "main");
    assert_eq!(envelope["subdir"], "");
    assert_eq!(envelope["config"]["required_version"], ">= 1.5");
    assert_eq!(envelope["config"]["resources"][0]["type"], "aws_s3_bucket");
    assert_eq!(envelope["config"]["variables"][0]["required"], true);
    assert_eq!(envelope["config"]["providers"][0]["source"], "hashicorp/aws");

    let requests = source.requests.lock().unwrap();
    assert_eq!(
        requests.as_slice(),
        &[(
            "https://github.com/user/repo.git".to_string(),
            Some("main".to_string()),
            None
        )]
    );
    Ok(())
}

#[tokio::test]
async fn test_get_module_invalid_url() -> Result<()> {
    let registry = Server::new_async().await;
    let source = Arc::new(FixtureSource::default());
    let server = server_for(&registry, source.clone());

    let (is_error, text) = outcome(
        &server
            .get_module(module_input(json!({"url": "git@github.com"})))
            .await?,
    );
    assert!(is_error);
    assert!(text.starts_with("Invalid Git URL: "), "unexpected message: {}", text);
    assert!(source.requests.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_mistyped_arguments_are_error_results() -> Result<()> {
    let mut registry = Server::new_async().await;
    let server = server_for(&registry, Arc::default());

    let (is_error, text) = outcome(
        &server
            .search_resource_block_document(block_input(json!({
                "provider_name": 5,
                "block_name": "x"
            })))
            .await?,
    );
    assert!(is_error);
    assert_eq!(text, "'provider_name' parameter must be a string, got number");

    let (is_error, text) = outcome(&server.get_module(module_input(json!({"url": []}))).await?);
    assert!(is_error);
    assert_eq!(text, "'url' parameter must be a string, got array");

    // A mistyped optional argument falls back to its default: no version selects the v1 index
    let _provider = registry
        .mock("GET", "/v1/providers/hashicorp/aws")
        .with_body(
            json!({"docs": [{"id": "12", "slug": "vpc", "category": "data-sources", "language": "hcl"}]})
                .to_string(),
        )
        .create_async()
        .await;
    let _document = registry
        .mock("GET", "/v2/provider-docs/12")
        .with_body(json!({"data": {"id": "12", "attributes": {"content": "# aws_vpc"}}}).to_string())
        .create_async()
        .await;

    let result = server
        .search_data_block_document(block_input(json!({
            "provider_namespace": false,
            "provider_name": "aws",
            "provider_version": 1,
            "block_name": "vpc"
        })))
        .await?;
    assert_eq!(outcome(&result), (false, "# aws_vpc".to_string()));
    Ok(())
}
