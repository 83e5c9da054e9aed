use serde::{Deserialize, Serialize};
use serde_json::json;

/// Everything extracted from one Terraform module directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub files: Vec<String>,
    pub required_version: Option<String>,
    pub providers: Vec<ProviderRequirement>,
    pub variables: Vec<ModuleVariable>,
    pub outputs: Vec<ModuleOutput>,
    pub resources: Vec<ModuleResource>,
    pub data_sources: Vec<ModuleResource>,
    pub module_calls: Vec<ModuleCall>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderRequirement {
    pub name: String,
    pub source: Option<String>,
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleVariable {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub description: Option<String>,
    pub default: Option<serde_json::Value>,
    pub required: bool,
    pub sensitive: bool,
    pub file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleOutput {
    pub name: String,
    pub description: Option<String>,
    pub sensitive: bool,
    pub file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub provider: String,
    pub file: String,
}

impl ModuleResource {
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleCall {
    pub name: String,
    pub source: Option<String>,
    pub version: Option<String>,
    pub file: String,
}

impl ModuleConfig {
    /// JSON summary of the module. The verbose form carries every extracted
    /// attribute; the short form lists names only.
    pub fn summary(&self, verbose: bool) -> Result<Vec<u8>, serde_json::Error> {
        let counts = json!({
            "providers": self.providers.len(),
            "variables": self.variables.len(),
            "outputs": self.outputs.len(),
            "resources": self.resources.len(),
            "data_sources": self.data_sources.len(),
            "module_calls": self.module_calls.len(),
        });

        let summary = if verbose {
            json!({
                "files": self.files,
                "required_version": self.required_version,
                "counts": counts,
                "providers": self.providers,
                "variables": self.variables,
                "outputs": self.outputs,
                "resources": self.resources,
                "data_sources": self.data_sources,
                "module_calls": self.module_calls,
            })
        } else {
            json!({
                "required_version": self.required_version,
                "counts": counts,
                "providers": self.providers.iter().map(|p| &p.name).collect::<Vec<_>>(),
                "variables": self.variables.iter().map(|v| &v.name).collect::<Vec<_>>(),
                "outputs": self.outputs.iter().map(|o| &o.name).collect::<Vec<_>>(),
                "resources": self.resources.iter().map(ModuleResource::address).collect::<Vec<_>>(),
                "data_sources": self.data_sources.iter().map(ModuleResource::address).collect::<Vec<_>>(),
                "module_calls": self.module_calls.iter().map(|m| &m.name).collect::<Vec<_>>(),
            })
        };

        serde_json::to_vec(&summary)
    }
}
