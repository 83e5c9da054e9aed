//! Input types for the MCP tools with automatic JSON Schema generation.
//!
//! Arguments are decoded as raw JSON values and narrowed to strings by the
//! tools, so a missing or mistyped argument becomes a tool error result
//! instead of a protocol-level fault. The schemas still advertise strings.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

/// Input for resource and data source documentation lookup
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct BlockDocumentInput {
    /// Provider namespace (e.g., "hashicorp"). Defaults to "hashicorp" when omitted or empty.
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub provider_namespace: Option<Value>,

    /// Provider name (e.g., "aws", "google", "azurerm").
    #[schemars(with = "String")]
    pub provider_name: Option<Value>,

    /// Exact provider version (e.g., "5.31.0"). Uses the latest version when omitted.
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub provider_version: Option<Value>,

    /// Block name without the provider prefix (e.g., "s3_bucket" for aws_s3_bucket).
    #[schemars(with = "String")]
    pub block_name: Option<Value>,
}

/// Input for Terraform module summary
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ModuleInput {
    /// Git repository URL (https, http, scheme-less or git@host:path).
    #[schemars(with = "String")]
    pub url: Option<Value>,

    /// Branch, tag or commit to check out. Defaults to the remote's default branch.
    #[serde(default, rename = "ref")]
    #[schemars(with = "Option<String>")]
    pub git_ref: Option<Value>,

    /// Alias for `ref`; ignored when `ref` is set.
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub branch: Option<Value>,

    /// Subdirectory of the repository that holds the module.
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub subdir: Option<Value>,
}

impl ModuleInput {
    /// `ref` wins over `branch`; blank or non-string values count as absent.
    pub fn reference(&self) -> Option<String> {
        [&self.git_ref, &self.branch]
            .into_iter()
            .find_map(optional_arg)
            .map(str::to_string)
    }
}

/// A required string argument, trimmed. Absent, null and blank values are
/// reported as missing; any other JSON type as mistyped.
pub fn required_arg<'a>(value: &'a Option<Value>, name: &str) -> Result<&'a str, String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim()),
        None | Some(Value::Null) | Some(Value::String(_)) => {
            Err(format!("'{}' parameter is required", name))
        }
        Some(other) => Err(format!(
            "'{}' parameter must be a string, got {}",
            name,
            json_kind(other)
        )),
    }
}

/// An optional string argument, trimmed. Anything that is not a non-blank
/// string falls back to the default.
pub fn optional_arg(value: &Option<Value>) -> Option<&str> {
    value
        .as_ref()
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
