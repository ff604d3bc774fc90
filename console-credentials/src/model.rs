//! Credential records, create inputs and partial updates.

use console_core::{FieldPatch, ResourceId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use validator::{Validate, ValidationError};

/// Cloud or service the credential authenticates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Aws,
    Cloudflare,
    Hetzner,
    Digitalocean,
    Generic,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Cloudflare => "cloudflare",
            Provider::Hetzner => "hetzner",
            Provider::Digitalocean => "digitalocean",
            Provider::Generic => "generic",
        }
    }
}

/// Shape of the secret payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    AwsAccessKey,
    ApiToken,
    BasicAuth,
    #[serde(rename = "oauth2")]
    OAuth2,
}

impl CredentialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKind::AwsAccessKey => "aws_access_key",
            CredentialKind::ApiToken => "api_token",
            CredentialKind::BasicAuth => "basic_auth",
            CredentialKind::OAuth2 => "oauth2",
        }
    }
}

/// How narrowly the credential is scoped within its provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Provider,
    Service,
    Resource,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Provider => "provider",
            ScopeKind::Service => "service",
            ScopeKind::Resource => "resource",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(Provider, CredentialKind, ScopeKind);

/// Credential metadata as returned by the backend. The secret is never included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub id: ResourceId,
    #[serde(alias = "credential_provider")]
    pub provider: Provider,
    pub kind: CredentialKind,
    #[serde(default = "default_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub name: String,
    pub scope_kind: ScopeKind,
    #[serde(default = "default_version")]
    pub scope_version: u32,
    #[serde(default)]
    pub scope: Map<String, Value>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

pub(crate) fn default_version() -> u32 {
    1
}

/// User input for a new credential.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
pub struct CreateCredential {
    #[validate(required(message = "provider is required"))]
    #[serde(default, alias = "credential_provider")]
    pub provider: Option<Provider>,

    #[validate(required(message = "kind is required"))]
    #[serde(default)]
    pub kind: Option<CredentialKind>,

    #[validate(required(message = "scope_kind is required"))]
    #[serde(default)]
    pub scope_kind: Option<ScopeKind>,

    #[validate(range(min = 1, message = "schema_version must be at least 1"))]
    #[serde(default)]
    pub schema_version: Option<u32>,

    #[validate(range(min = 1, message = "scope_version must be at least 1"))]
    #[serde(default)]
    pub scope_version: Option<u32>,

    #[validate(length(max = 100, message = "name must be at most 100 characters"))]
    #[serde(default)]
    pub name: Option<String>,

    #[validate(length(max = 32, message = "account_id must be at most 32 characters"))]
    #[serde(default)]
    pub account_id: Option<String>,

    #[validate(length(max = 32, message = "region must be at most 32 characters"))]
    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub scope: Option<Map<String, Value>>,

    #[serde(default)]
    pub secret: Option<Map<String, Value>>,
}

/// Partial update of an existing credential.
///
/// String fields are three-state; `scope` and `secret` are replaced wholesale when
/// present. Setting `secret` rotates it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
pub struct CredentialPatch {
    #[validate(custom(function = "patch_name_len"))]
    #[serde(default, skip_serializing_if = "FieldPatch::is_unset")]
    pub name: FieldPatch<String>,

    #[validate(custom(function = "patch_account_id_len"))]
    #[serde(default, skip_serializing_if = "FieldPatch::is_unset")]
    pub account_id: FieldPatch<String>,

    #[validate(custom(function = "patch_region_len"))]
    #[serde(default, skip_serializing_if = "FieldPatch::is_unset")]
    pub region: FieldPatch<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_kind: Option<ScopeKind>,

    #[validate(range(min = 1, message = "scope_version must be at least 1"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_version: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<Map<String, Value>>,

    #[serde(
        default,
        alias = "credential_provider",
        skip_serializing_if = "Option::is_none"
    )]
    pub provider: Option<Provider>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<CredentialKind>,

    #[validate(range(min = 1, message = "schema_version must be at least 1"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,
}

impl CredentialPatch {
    /// True when the patch replaces the secret.
    pub fn rotates_secret(&self) -> bool {
        self.secret.is_some()
    }
}

fn patch_max_chars(
    value: &FieldPatch<String>,
    field: &str,
    max: usize,
) -> Result<(), ValidationError> {
    match value.value() {
        Some(v) if v.chars().count() > max => {
            let mut err = ValidationError::new("length");
            err.message = Some(format!("{field} must be at most {max} characters").into());
            Err(err)
        }
        _ => Ok(()),
    }
}

fn patch_name_len(value: &FieldPatch<String>) -> Result<(), ValidationError> {
    patch_max_chars(value, "name", 100)
}

fn patch_account_id_len(value: &FieldPatch<String>) -> Result<(), ValidationError> {
    patch_max_chars(value, "account_id", 32)
}

fn patch_region_len(value: &FieldPatch<String>) -> Result<(), ValidationError> {
    patch_max_chars(value, "region", 32)
}

/// Query filters for listing credentials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CredentialFilter {
    pub provider: Option<Provider>,
    pub kind: Option<CredentialKind>,
    pub scope_kind: Option<ScopeKind>,
}

impl CredentialFilter {
    pub fn query(&self) -> Vec<(&'static str, &'static str)> {
        let mut query = Vec::new();
        if let Some(provider) = self.provider {
            query.push(("credential_provider", provider.as_str()));
        }
        if let Some(kind) = self.kind {
            query.push(("kind", kind.as_str()));
        }
        if let Some(scope_kind) = self.scope_kind {
            query.push(("scope_kind", scope_kind.as_str()));
        }
        query
    }
}

/// Plaintext secret returned by a one-time reveal.
///
/// `Debug` never prints the payload; read it through [`RevealedSecret::expose`].
#[derive(Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RevealedSecret(Map<String, Value>);

impl RevealedSecret {
    pub fn expose(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Key names only, for display next to a masked value.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Debug for RevealedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevealedSecret")
            .field("keys", &self.0.keys().collect::<Vec<_>>())
            .field("values", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn discriminators_use_snake_case_on_the_wire() {
        assert_eq!(
            serde_json::to_value(Provider::Digitalocean).unwrap(),
            json!("digitalocean")
        );
        assert_eq!(
            serde_json::to_value(CredentialKind::OAuth2).unwrap(),
            json!("oauth2")
        );
        assert_eq!(
            serde_json::to_value(CredentialKind::AwsAccessKey).unwrap(),
            json!("aws_access_key")
        );
        assert_eq!(CredentialKind::OAuth2.to_string(), "oauth2");
        assert_eq!(
            serde_json::from_value::<ScopeKind>(json!("resource")).unwrap(),
            ScopeKind::Resource
        );
    }

    #[test]
    fn credential_accepts_either_provider_key() {
        let a: Credential = serde_json::from_value(json!({
            "id": "c-1", "provider": "aws", "kind": "aws_access_key", "scope_kind": "provider"
        }))
        .unwrap();
        let b: Credential = serde_json::from_value(json!({
            "id": "c-1",
            "credential_provider": "aws",
            "kind": "aws_access_key",
            "scope_kind": "provider"
        }))
        .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.schema_version, 1);
        assert!(a.scope.is_empty());
    }

    #[test]
    fn patch_deserializes_three_states() {
        let patch: CredentialPatch =
            serde_json::from_value(json!({ "name": "x", "region": null })).unwrap();
        assert_eq!(patch.name, FieldPatch::Value("x".to_string()));
        assert_eq!(patch.region, FieldPatch::Clear);
        assert_eq!(patch.account_id, FieldPatch::Unset);
        assert!(!patch.rotates_secret());
    }

    #[test]
    fn filter_builds_backend_query() {
        let filter = CredentialFilter {
            provider: Some(Provider::Aws),
            scope_kind: Some(ScopeKind::Service),
            ..Default::default()
        };
        assert_eq!(
            filter.query(),
            vec![("credential_provider", "aws"), ("scope_kind", "service")]
        );
    }

    #[test]
    fn revealed_secret_debug_is_redacted() {
        let secret: RevealedSecret =
            serde_json::from_value(json!({ "token": "super-secret-value" })).unwrap();
        let debug = format!("{secret:?}");
        assert!(debug.contains("token"));
        assert!(!debug.contains("super-secret-value"));
        assert_eq!(secret.expose()["token"], "super-secret-value");
    }
}
