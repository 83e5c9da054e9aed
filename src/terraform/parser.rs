use crate::module::summary::ModuleError;
use crate::terraform::model::{
    ModuleCall, ModuleConfig, ModuleOutput, ModuleResource, ModuleVariable, ProviderRequirement,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// Block headers are anchored at line start so nested blocks and expressions don't match
static RESOURCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*resource[ \t]+"([^"]+)"[ \t]+"([^"]+)""#)
        .expect("Invalid resource regex")
});

static DATA_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*data[ \t]+"([^"]+)"[ \t]+"([^"]+)""#).expect("Invalid data regex")
});

static VARIABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*variable[ \t]+"([^"]+)""#).expect("Invalid variable regex")
});

static OUTPUT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*output[ \t]+"([^"]+)""#).expect("Invalid output regex")
});

static PROVIDER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*provider[ \t]+"([^"]+)""#).expect("Invalid provider regex")
});

static MODULE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*module[ \t]+"([^"]+)""#).expect("Invalid module regex")
});

static TERRAFORM_BLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*terraform[ \t]*\{").expect("Invalid terraform block regex")
});

static REQUIRED_PROVIDERS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*required_providers[ \t]*\{").expect("Invalid required_providers regex")
});

static ATTRIBUTE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*([A-Za-z_][A-Za-z0-9_-]*)[ \t]*=[ \t]*([^\n]*)$")
        .expect("Invalid attribute regex")
});

/// Parse collaborator: turns a module directory into a [`ModuleConfig`].
pub trait WorkspaceParser: Send + Sync {
    fn parse_workspace(&self, root: &Path) -> Result<ModuleConfig, ModuleError>;
}

/// Reads the `*.tf` files directly under the module root.
#[derive(Debug, Default, Clone)]
pub struct HclWorkspaceParser;

impl HclWorkspaceParser {
    pub fn new() -> Self {
        Self
    }

    fn terraform_files(root: &Path) -> Result<Vec<PathBuf>, ModuleError> {
        let entries = std::fs::read_dir(root).map_err(|e| {
            ModuleError::Parse(format!("cannot read module directory: {}", e))
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| ModuleError::Parse(format!("cannot read module directory: {}", e)))?
                .path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "tf") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl WorkspaceParser for HclWorkspaceParser {
    fn parse_workspace(&self, root: &Path) -> Result<ModuleConfig, ModuleError> {
        let files = Self::terraform_files(root)?;
        if files.is_empty() {
            return Err(ModuleError::Parse(
                "no Terraform configuration files (*.tf) found in module root".to_string(),
            ));
        }

        let mut config = ModuleConfig::default();
        let mut providers: BTreeMap<String, ProviderRequirement> = BTreeMap::new();

        for path in &files {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let content = std::fs::read_to_string(path)
                .map_err(|e| ModuleError::Parse(format!("cannot read {}: {}", file_name, e)))?;
            debug!("Parsing {} ({} bytes)", file_name, content.len());

            let parser = TerraformParser::new(&content);
            config.resources.extend(parser.parse_resources(&file_name));
            config.data_sources.extend(parser.parse_data_sources(&file_name));
            config.variables.extend(parser.parse_variables(&file_name));
            config.outputs.extend(parser.parse_outputs(&file_name));
            config.module_calls.extend(parser.parse_module_calls(&file_name));
            if config.required_version.is_none() {
                config.required_version = parser.parse_required_version();
            }
            for provider in parser.parse_providers() {
                merge_provider(&mut providers, provider);
            }
            config.files.push(file_name);
        }

        config.providers = providers.into_values().collect();

        info!(
            "Parsed {} files: {} resources, {} data sources, {} variables, {} outputs",
            config.files.len(),
            config.resources.len(),
            config.data_sources.len(),
            config.variables.len(),
            config.outputs.len()
        );
        Ok(config)
    }
}

fn merge_provider(providers: &mut BTreeMap<String, ProviderRequirement>, incoming: ProviderRequirement) {
    let entry = providers
        .entry(incoming.name.clone())
        .or_insert_with(|| ProviderRequirement {
            name: incoming.name.clone(),
            ..Default::default()
        });
    if entry.source.is_none() {
        entry.source = incoming.source;
    }
    if entry.version.is_none() {
        entry.version = incoming.version;
    }
    for alias in incoming.aliases {
        if !entry.aliases.contains(&alias) {
            entry.aliases.push(alias);
        }
    }
}

/// Parser for the content of a single Terraform file
pub struct TerraformParser {
    content: String,
}

impl TerraformParser {
    pub fn new(content: &str) -> Self {
        Self {
            content: strip_comments(content),
        }
    }

    pub fn parse_resources(&self, file_name: &str) -> Vec<ModuleResource> {
        self.typed_blocks(&RESOURCE_REGEX, file_name)
    }

    pub fn parse_data_sources(&self, file_name: &str) -> Vec<ModuleResource> {
        self.typed_blocks(&DATA_REGEX, file_name)
    }

    pub fn parse_variables(&self, file_name: &str) -> Vec<ModuleVariable> {
        self.named_blocks(&VARIABLE_REGEX)
            .map(|(name, body)| {
                let default = attribute(body, "default").map(json_value);
                ModuleVariable {
                    name: name.to_string(),
                    type_: attribute(body, "type").map(str::to_string),
                    description: attribute(body, "description").map(string_value),
                    required: default.is_none(),
                    default,
                    sensitive: attribute(body, "sensitive") == Some("true"),
                    file: file_name.to_string(),
                }
            })
            .collect()
    }

    pub fn parse_outputs(&self, file_name: &str) -> Vec<ModuleOutput> {
        self.named_blocks(&OUTPUT_REGEX)
            .map(|(name, body)| ModuleOutput {
                name: name.to_string(),
                description: attribute(body, "description").map(string_value),
                sensitive: attribute(body, "sensitive") == Some("true"),
                file: file_name.to_string(),
            })
            .collect()
    }

    pub fn parse_module_calls(&self, file_name: &str) -> Vec<ModuleCall> {
        self.named_blocks(&MODULE_REGEX)
            .map(|(name, body)| ModuleCall {
                name: name.to_string(),
                source: attribute(body, "source").map(string_value),
                version: attribute(body, "version").map(string_value),
                file: file_name.to_string(),
            })
            .collect()
    }

    /// Providers from `required_providers` entries and `provider` blocks.
    pub fn parse_providers(&self) -> Vec<ProviderRequirement> {
        let mut providers: BTreeMap<String, ProviderRequirement> = BTreeMap::new();

        for terraform in self.blocks_after(&TERRAFORM_BLOCK_REGEX) {
            for required in blocks_in(terraform, &REQUIRED_PROVIDERS_REGEX) {
                for (name, raw) in attributes(required) {
                    let requirement = match raw.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
                        Some(object) => ProviderRequirement {
                            name: name.to_string(),
                            source: attribute(object, "source").map(string_value),
                            version: attribute(object, "version").map(string_value),
                            aliases: Vec::new(),
                        },
                        // Pre-0.13 shorthand: `aws = "~> 4.0"`
                        None => ProviderRequirement {
                            name: name.to_string(),
                            version: Some(string_value(raw)),
                            ..Default::default()
                        },
                    };
                    merge_provider(&mut providers, requirement);
                }
            }
        }

        for (name, body) in self.named_blocks(&PROVIDER_REGEX) {
            merge_provider(
                &mut providers,
                ProviderRequirement {
                    name: name.to_string(),
                    source: None,
                    version: attribute(body, "version").map(string_value),
                    aliases: attribute(body, "alias").map(string_value).into_iter().collect(),
                },
            );
        }

        providers.into_values().collect()
    }

    pub fn parse_required_version(&self) -> Option<String> {
        self.blocks_after(&TERRAFORM_BLOCK_REGEX)
            .find_map(|body| attribute(body, "required_version"))
            .map(string_value)
    }

    /// `keyword "type" "name" { ... }` blocks.
    fn typed_blocks(&self, header: &Regex, file_name: &str) -> Vec<ModuleResource> {
        header
            .captures_iter(&self.content)
            .filter_map(|captures| {
                let header_end = captures.get(0)?.end();
                let body = block_body(&self.content, header_end).unwrap_or_default();
                let resource_type = captures[1].to_string();
                let provider = attribute(body, "provider")
                    .and_then(|p| p.split('.').next())
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        resource_type
                            .split('_')
                            .next()
                            .unwrap_or("unknown")
                            .to_string()
                    });

                Some(ModuleResource {
                    resource_type,
                    name: captures[2].to_string(),
                    provider,
                    file: file_name.to_string(),
                })
            })
            .collect()
    }

    /// `keyword "name" { ... }` blocks as (name, body) pairs.
    fn named_blocks<'a>(&'a self, header: &'a Regex) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        header.captures_iter(&self.content).filter_map(|captures| {
            let header_end = captures.get(0)?.end();
            let name = captures.get(1)?.as_str();
            Some((name, block_body(&self.content, header_end).unwrap_or_default()))
        })
    }

    /// Bodies of blocks whose header regex ends with the opening brace.
    fn blocks_after<'a>(&'a self, header: &'a Regex) -> impl Iterator<Item = &'a str> + 'a {
        blocks_in(&self.content, header)
    }
}

fn blocks_in<'a>(content: &'a str, header: &'a Regex) -> impl Iterator<Item = &'a str> + 'a {
    header.find_iter(content).filter_map(move |m| {
        // The match ends just past `{`
        balanced(content, m.end() - 1).map(strip_braces)
    })
}

/// Body of the block whose opening brace follows `from` (whitespace only in between).
fn block_body(content: &str, from: usize) -> Option<&str> {
    let rest = &content[from..];
    let offset = rest.len() - rest.trim_start().len();
    if !rest[offset..].starts_with('{') {
        return None;
    }
    balanced(content, from + offset).map(strip_braces)
}

fn strip_braces(block: &str) -> &str {
    block
        .strip_prefix('{')
        .and_then(|b| b.strip_suffix('}'))
        .unwrap_or(block)
}

/// Slice from the bracket at `start` through its matching close, skipping string literals.
fn balanced(content: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in content[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' | '(' => depth += 1,
            '}' | ']' | ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&content[start..start + idx + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Bracket nesting depth at the end of `prefix`, ignoring string literals.
fn nesting_depth(prefix: &str) -> usize {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for ch in prefix.chars() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' | '(' => depth += 1,
            '}' | ']' | ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    depth
}

/// Top-level `name = value` pairs of a block body. Multi-line object, tuple
/// and call values are returned whole.
fn attributes(body: &str) -> Vec<(&str, &str)> {
    ATTRIBUTE_REGEX
        .captures_iter(body)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            if nesting_depth(&body[..whole.start()]) != 0 {
                return None;
            }
            let name = captures.get(1)?.as_str();
            let value = captures.get(2)?;
            let raw = match value.as_str().chars().next() {
                Some('{' | '[' | '(') => balanced(body, value.start()).unwrap_or(value.as_str()),
                _ => value.as_str(),
            };
            Some((name, raw.trim()))
        })
        .collect()
}

fn attribute<'a>(body: &'a str, name: &str) -> Option<&'a str> {
    attributes(body)
        .into_iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Unquote a string literal; anything else is returned as written.
fn string_value(raw: &str) -> String {
    match raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => raw.to_string(),
    }
}

/// JSON when the literal happens to be JSON, otherwise the expression text.
fn json_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Drop `#`, `//` and `/* */` comments outside string literals.
fn strip_comments(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(ch) = chars.next() {
        if in_string {
            out.push(ch);
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            '#' => skip_line(&mut chars, &mut out),
            '/' if chars.peek() == Some(&'/') => skip_line(&mut chars, &mut out),
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

fn skip_line(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, out: &mut String) {
    for c in chars.by_ref() {
        if c == '\n' {
            out.push('\n');
            break;
        }
    }
}
