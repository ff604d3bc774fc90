//! Discriminator-driven rules for credentials.
//!
//! `(provider, kind)` must name a [`CredentialType`] and `(provider, scope_kind)` a
//! [`ScopeShape`]. The shapes then check `scope` and `secret`, listing every issue they
//! find; nothing short-circuits.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::model::{CredentialKind, Provider, ScopeKind};
use crate::policy::ValidationIssue;

pub const AWS_SERVICES: &[&str] = &["route53", "s3", "ec2", "iam", "rds", "dynamodb"];

static AWS_ACCESS_KEY_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]{20}$").expect("valid access key pattern"));

const MIN_SECRET_ACCESS_KEY_LEN: usize = 10;

/// Every `(provider, kind)` pairing the backend stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialType {
    AwsAccessKey,
    CloudflareToken,
    HetznerToken,
    DigitaloceanToken,
    GenericBasicAuth,
    GenericOAuth2,
}

impl CredentialType {
    pub fn resolve(provider: Provider, kind: CredentialKind) -> Option<Self> {
        use CredentialKind as K;
        match (provider, kind) {
            (Provider::Aws, K::AwsAccessKey) => Some(Self::AwsAccessKey),
            (Provider::Cloudflare, K::ApiToken) => Some(Self::CloudflareToken),
            (Provider::Hetzner, K::ApiToken) => Some(Self::HetznerToken),
            (Provider::Digitalocean, K::ApiToken) => Some(Self::DigitaloceanToken),
            (Provider::Generic, K::BasicAuth) => Some(Self::GenericBasicAuth),
            (Provider::Generic, K::OAuth2) => Some(Self::GenericOAuth2),
            (Provider::Aws, K::ApiToken | K::BasicAuth | K::OAuth2)
            | (
                Provider::Cloudflare | Provider::Hetzner | Provider::Digitalocean,
                K::AwsAccessKey | K::BasicAuth | K::OAuth2,
            )
            | (Provider::Generic, K::AwsAccessKey | K::ApiToken) => None,
        }
    }

    /// Kinds `provider` accepts.
    pub fn kinds_for(provider: Provider) -> &'static [CredentialKind] {
        match provider {
            Provider::Aws => &[CredentialKind::AwsAccessKey],
            Provider::Cloudflare | Provider::Hetzner | Provider::Digitalocean => {
                &[CredentialKind::ApiToken]
            }
            Provider::Generic => &[CredentialKind::BasicAuth, CredentialKind::OAuth2],
        }
    }

    /// Issue on `kind` when the pairing is unsupported.
    pub fn check(provider: Provider, kind: CredentialKind) -> Option<ValidationIssue> {
        if Self::resolve(provider, kind).is_some() {
            return None;
        }
        let allowed: Vec<&str> = Self::kinds_for(provider)
            .iter()
            .map(|k| k.as_str())
            .collect();
        Some(ValidationIssue::new(
            "kind",
            format!(
                "kind {kind} is not supported for provider {provider}; expected {}",
                allowed.join(" or ")
            ),
        ))
    }

    pub fn secret_shape(&self) -> SecretShape {
        match self {
            Self::AwsAccessKey => SecretShape::AwsAccessKey,
            Self::CloudflareToken | Self::HetznerToken | Self::DigitaloceanToken => {
                SecretShape::Token
            }
            Self::GenericBasicAuth => SecretShape::BasicAuth,
            Self::GenericOAuth2 => SecretShape::OAuth2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeShape {
    /// Provider-wide scope: any payload, including none.
    ProviderWide,
    AwsService,
    AwsResource,
}

impl ScopeShape {
    /// `None` when `provider` has no scope of that kind.
    pub fn for_discriminators(provider: Provider, scope_kind: ScopeKind) -> Option<Self> {
        match (provider, scope_kind) {
            (_, ScopeKind::Provider) => Some(ScopeShape::ProviderWide),
            (Provider::Aws, ScopeKind::Service) => Some(ScopeShape::AwsService),
            (Provider::Aws, ScopeKind::Resource) => Some(ScopeShape::AwsResource),
            (
                Provider::Cloudflare
                | Provider::Hetzner
                | Provider::Digitalocean
                | Provider::Generic,
                ScopeKind::Service | ScopeKind::Resource,
            ) => None,
        }
    }

    /// Shape for the pair, or an issue on `scope_kind` when the provider lacks it.
    pub fn resolve(provider: Provider, scope_kind: ScopeKind) -> Result<Self, ValidationIssue> {
        Self::for_discriminators(provider, scope_kind).ok_or_else(|| {
            ValidationIssue::new(
                "scope_kind",
                format!("scope_kind {scope_kind} is not supported for provider {provider}"),
            )
        })
    }

    pub fn requires_scope(&self) -> bool {
        !matches!(self, ScopeShape::ProviderWide)
    }

    /// Issues with `scope` under this shape, in rule order.
    pub fn check(&self, scope: Option<&Map<String, Value>>) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.requires_scope() && scope.map_or(true, Map::is_empty) {
            issues.push(ValidationIssue::scope("scope is required"));
        }

        match self {
            ScopeShape::ProviderWide => {}
            ScopeShape::AwsService => {
                let service = scope.and_then(|s| s.get("service")).and_then(Value::as_str);
                if !service.is_some_and(|s| AWS_SERVICES.contains(&s)) {
                    issues.push(ValidationIssue::scope(format!(
                        "For AWS service scope, \"service\" must be one of: {}",
                        AWS_SERVICES.join(", ")
                    )));
                }
            }
            ScopeShape::AwsResource => {
                let arn = scope.and_then(|s| s.get("arn")).and_then(Value::as_str);
                if !arn.is_some_and(|a| a.starts_with("arn:")) {
                    issues.push(ValidationIssue::scope(
                        "For AWS resource scope, \"arn\" must start with \"arn:\"",
                    ));
                }
            }
        }

        issues
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretShape {
    AwsAccessKey,
    Token,
    BasicAuth,
    OAuth2,
}

impl From<CredentialKind> for SecretShape {
    fn from(kind: CredentialKind) -> Self {
        match kind {
            CredentialKind::AwsAccessKey => SecretShape::AwsAccessKey,
            CredentialKind::ApiToken => SecretShape::Token,
            CredentialKind::BasicAuth => SecretShape::BasicAuth,
            CredentialKind::OAuth2 => SecretShape::OAuth2,
        }
    }
}

impl SecretShape {
    /// Issues with `secret` under this shape. A missing secret is checked as `{}`.
    pub fn check(&self, secret: Option<&Map<String, Value>>) -> Vec<ValidationIssue> {
        let empty = Map::new();
        let secret = secret.unwrap_or(&empty);
        let mut issues = Vec::new();

        match self {
            SecretShape::AwsAccessKey => {
                let key_id = secret.get("access_key_id").and_then(Value::as_str);
                if !key_id.is_some_and(|id| AWS_ACCESS_KEY_ID.is_match(id)) {
                    issues.push(ValidationIssue::secret(
                        "access_key_id must be 20 chars (A-Z0-9)",
                    ));
                }
                let secret_key = secret.get("secret_access_key").and_then(Value::as_str);
                if !secret_key.is_some_and(|k| k.chars().count() >= MIN_SECRET_ACCESS_KEY_LEN) {
                    issues.push(ValidationIssue::secret("secret_access_key is required"));
                }
            }
            SecretShape::Token => {
                if !is_present(secret.get("token")) {
                    issues.push(ValidationIssue::secret("token is required"));
                }
            }
            SecretShape::BasicAuth => {
                if !["username", "password"].iter().all(|k| is_present(secret.get(*k))) {
                    issues.push(ValidationIssue::secret("username and password are required"));
                }
            }
            SecretShape::OAuth2 => {
                if !["client_id", "client_secret", "refresh_token"]
                    .iter()
                    .all(|k| is_present(secret.get(*k)))
                {
                    issues.push(ValidationIssue::secret(
                        "client_id, client_secret, and refresh_token are required",
                    ));
                }
            }
        }

        issues
    }
}

/// A value counts as present unless it is missing, `null`, `false`, `0` or `""`.
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}
