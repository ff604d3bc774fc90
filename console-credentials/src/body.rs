//! Request bodies for `POST /credentials` and `PATCH /credentials/{id}`.

use console_core::patch_body;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::model::{CredentialKind, CredentialPatch, Provider, ScopeKind};
use crate::policy::ValidatedCreate;

/// Keys a credential PATCH may carry.
pub const UPDATE_KEYS: &[&str] = &[
    "name",
    "account_id",
    "region",
    "scope_kind",
    "scope_version",
    "scope",
    "secret",
    "provider",
    "kind",
    "schema_version",
];

/// Full create payload. Every field is present except blank optional strings.
#[derive(Clone, PartialEq, Serialize)]
pub struct CreateCredentialBody {
    pub provider: Provider,
    pub kind: CredentialKind,
    pub schema_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub scope_kind: ScopeKind,
    pub scope_version: u32,
    pub scope: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub secret: Map<String, Value>,
}

impl fmt::Debug for CreateCredentialBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateCredentialBody")
            .field("provider", &self.provider)
            .field("kind", &self.kind)
            .field("schema_version", &self.schema_version)
            .field("name", &self.name)
            .field("scope_kind", &self.scope_kind)
            .field("scope_version", &self.scope_version)
            .field("scope", &self.scope)
            .field("account_id", &self.account_id)
            .field("region", &self.region)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Versions default to 1 and `scope`/`secret` to `{}`.
pub fn build_create_body(validated: ValidatedCreate) -> CreateCredentialBody {
    let ValidatedCreate {
        provider,
        kind,
        scope_kind,
        input,
    } = validated;

    CreateCredentialBody {
        provider,
        kind,
        schema_version: input.schema_version.unwrap_or(1),
        name: non_blank(input.name),
        scope_kind,
        scope_version: input.scope_version.unwrap_or(1),
        scope: input.scope.unwrap_or_default(),
        account_id: non_blank(input.account_id),
        region: non_blank(input.region),
        secret: input.secret.unwrap_or_default(),
    }
}

/// Only the fields the patch sets. Empty strings are dropped; explicit clears go out as `null`.
pub fn build_update_body(patch: &CredentialPatch) -> Result<Map<String, Value>, serde_json::Error> {
    patch_body(patch, UPDATE_KEYS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CreateCredential;
    use console_core::FieldPatch;
    use serde_json::json;

    fn validated(input: CreateCredential) -> ValidatedCreate {
        ValidatedCreate::new(input).expect("input should be valid")
    }

    fn token_input() -> CreateCredential {
        CreateCredential {
            provider: Some(Provider::Cloudflare),
            kind: Some(CredentialKind::ApiToken),
            scope_kind: Some(ScopeKind::Provider),
            secret: Some(match json!({ "token": "cf-token" }) {
                Value::Object(m) => m,
                _ => unreachable!(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn create_body_fills_defaults() {
        let body = build_create_body(validated(CreateCredential {
            account_id: Some(String::new()),
            ..token_input()
        }));
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "provider": "cloudflare",
                "kind": "api_token",
                "schema_version": 1,
                "scope_kind": "provider",
                "scope_version": 1,
                "scope": {},
                "secret": { "token": "cf-token" }
            })
        );
    }

    #[test]
    fn create_body_keeps_supplied_values() {
        let body = build_create_body(validated(CreateCredential {
            name: Some("dns".into()),
            region: Some("eu-central-1".into()),
            schema_version: Some(2),
            ..token_input()
        }));
        assert_eq!(body.schema_version, 2);
        assert_eq!(body.name.as_deref(), Some("dns"));
        assert_eq!(body.region.as_deref(), Some("eu-central-1"));
    }

    #[test]
    fn create_body_debug_hides_secret() {
        let body = build_create_body(validated(token_input()));
        assert!(!format!("{body:?}").contains("cf-token"));
    }

    #[test]
    fn update_body_drops_unset_and_empty() {
        let patch = CredentialPatch {
            name: FieldPatch::Value("x".into()),
            region: FieldPatch::Value(String::new()),
            account_id: FieldPatch::Unset,
            ..Default::default()
        };
        assert_eq!(
            Value::Object(build_update_body(&patch).unwrap()),
            json!({ "name": "x" })
        );
    }

    #[test]
    fn update_body_sends_clear_as_null_and_objects_as_is() {
        let patch = CredentialPatch {
            region: FieldPatch::Clear,
            scope: Some(Map::new()),
            kind: Some(CredentialKind::BasicAuth),
            ..Default::default()
        };
        let body = build_update_body(&patch).unwrap();
        let mut keys: Vec<_> = body.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["kind", "region", "scope"]);
        assert_eq!(body["region"], Value::Null);
        assert_eq!(body["scope"], json!({}));
        assert_eq!(body["kind"], "basic_auth");
    }
}
