//! Response shapes for the Terraform Registry endpoints consumed by the resolver.
//!
//! The v1 provider document is flat and embeds its documentation index. The
//! v2 documents follow the JSON:API layout (`data` / `included` / `attributes`).
//! Fields the resolver does not need are still decoded when present, but every
//! one of them defaults, whether missing or `null`, so a registry-side schema
//! change never breaks a lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `GET /v1/providers/{namespace}/{name}`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct V1Provider {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub owner: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub namespace: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tag: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub downloads: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tier: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logo_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub versions: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub docs: Vec<V1ProviderDoc>,
}

/// One entry of the documentation index embedded in [`V1Provider`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct V1ProviderDoc {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub language: String,
}

/// `GET /v2/providers/{namespace}/{name}?include=provider-versions`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct V2Provider {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: V2ProviderData,
    #[serde(default, deserialize_with = "null_as_default")]
    pub included: Vec<V2ProviderVersion>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct V2ProviderData {
    #[serde(default, deserialize_with = "null_as_default", rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: V2ProviderAttributes,
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: Links,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct V2ProviderAttributes {
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub downloads: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub featured: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub full_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logo_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub namespace: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub owner_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub robots_noindex: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tier: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unlisted: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub warning: String,
}

/// A `provider-versions` record from the `included` array.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct V2ProviderVersion {
    #[serde(default, deserialize_with = "null_as_default", rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: V2ProviderVersionAttributes,
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: Links,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct V2ProviderVersionAttributes {
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub downloads: u64,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tag: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: String,
}

/// `GET /v2/provider-docs?filter[...]`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct V2ProviderDocs {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<V2ProviderDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct V2ProviderDoc {
    #[serde(default, deserialize_with = "null_as_default", rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: V2DocAttributes,
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: Links,
}

/// `GET /v2/provider-docs/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V2ProviderDocument {
    pub data: V2ProviderDoc,
}

/// Attributes shared by the docs listing and the single document. Only the
/// single-document endpoint fills `content`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct V2DocAttributes {
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub language: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: String,
    // Registry sends either a string or null here
    #[serde(default)]
    pub subcategory: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Links {
    #[serde(default, rename = "self")]
    pub self_link: Option<String>,
    #[serde(default)]
    pub related: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v1_provider_with_partial_fields() {
        let body = r#"{
            "id": "hashicorp/aws/5.31.0",
            "namespace": "hashicorp",
            "name": "aws",
            "version": "5.31.0",
            "published_at": "2023-12-14T18:28:39Z",
            "docs": [
                {"id": "4242", "title": "aws_s3_bucket", "slug": "s3_bucket",
                 "category": "resources", "subcategory": "S3", "language": "hcl",
                 "path": "website/docs/r/s3_bucket.html.markdown"},
                {"id": "4243", "slug": "s3_bucket", "category": "data-sources", "language": "hcl"}
            ]
        }"#;

        let provider: V1Provider = serde_json::from_str(body).unwrap();
        assert_eq!(provider.version, "5.31.0");
        assert!(provider.published_at.is_some());
        assert_eq!(provider.docs.len(), 2);
        assert_eq!(provider.docs[0].subcategory.as_deref(), Some("S3"));
        assert_eq!(provider.docs[1].title, "");
        assert!(provider.versions.is_empty());
    }

    #[test]
    fn test_null_fields_decode_as_defaults() {
        let body = r#"{
            "description": null,
            "logo_url": null,
            "tier": null,
            "downloads": null,
            "versions": null,
            "docs": [{"id": "1", "title": null, "path": null, "slug": "s3_bucket",
                      "category": "resources", "language": "hcl"}]
        }"#;

        let provider: V1Provider = serde_json::from_str(body).unwrap();
        assert_eq!(provider.description, "");
        assert_eq!(provider.downloads, 0);
        assert!(provider.versions.is_empty());
        assert_eq!(provider.docs[0].title, "");
        assert_eq!(provider.docs[0].slug, "s3_bucket");

        let version: V2ProviderVersion = serde_json::from_str(
            r#"{"type": null, "id": "7", "attributes": {"tag": null, "version": "1.0.0"}}"#,
        )
        .unwrap();
        assert_eq!(version.kind, "");
        assert_eq!(version.attributes.version, "1.0.0");

        let docs: V2ProviderDocs = serde_json::from_str(r#"{"data": null}"#).unwrap();
        assert!(docs.data.is_empty());
    }

    #[test]
    fn test_v2_provider_included_versions() {
        let body = r#"{
            "data": {
                "type": "providers",
                "id": "323",
                "attributes": {"full-name": "hashicorp/aws", "owner-name": "hashicorp", "downloads": 10},
                "links": {"self": "/v2/providers/323"}
            },
            "included": [
                {"type": "provider-versions", "id": "1001",
                 "attributes": {"version": "5.0.0", "published-at": "2023-05-25T19:16:33Z"}},
                {"type": "provider-versions", "id": "1002", "attributes": {"version": "5.0.1"}}
            ]
        }"#;

        let provider: V2Provider = serde_json::from_str(body).unwrap();
        assert_eq!(provider.data.attributes.full_name, "hashicorp/aws");
        assert_eq!(provider.data.links.self_link.as_deref(), Some("/v2/providers/323"));
        assert_eq!(provider.included.len(), 2);
        assert_eq!(provider.included[1].id, "1002");
        assert!(provider.included[0].attributes.published_at.is_some());
    }

    #[test]
    fn test_v2_doc_subcategory_null_or_string() {
        let body = r#"{"data": [
            {"type": "provider-docs", "id": "1", "attributes": {"slug": "a", "subcategory": null}},
            {"type": "provider-docs", "id": "2", "attributes": {"slug": "b", "subcategory": "S3"}}
        ]}"#;

        let docs: V2ProviderDocs = serde_json::from_str(body).unwrap();
        assert_eq!(docs.data.len(), 2);
        assert!(docs.data[0].attributes.content.is_none());
        assert_eq!(docs.data[1].attributes.subcategory, Some(Value::from("S3")));
    }

    #[test]
    fn test_single_document_requires_data() {
        assert!(serde_json::from_str::<V2ProviderDocument>(r#"{"errors": []}"#).is_err());
    }
}
