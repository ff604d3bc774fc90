//! Create and update validation for credentials.
//!
//! Create always enforces every rule that applies to the discriminators. Update only
//! enforces what the patch touches:
//!
//! - the provider and kind pairing is checked when the patch changes either;
//! - scope rules run when the patch sets `scope_kind`;
//! - secret rules run when the patch rotates the secret or changes `kind`, and only if
//!   a kind can be resolved from the patch or the stored credential.
//!
//! Every applicable check runs and all issues are returned together.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::body::{build_create_body, build_update_body, CreateCredentialBody};
use crate::error::CredentialError;
use crate::model::{
    CreateCredential, Credential, CredentialKind, CredentialPatch, Provider, ScopeKind,
};
use crate::rules::{CredentialType, ScopeShape, SecretShape};

/// A problem with one field, or with `scope`/`secret` as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn scope(message: impl Into<String>) -> Self {
        Self::new("scope", message)
    }

    pub fn secret(message: impl Into<String>) -> Self {
        Self::new("secret", message)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Input rejected before anything was sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} validation issue(s): {}", .0.len(), join_issues(.0))]
pub struct ValidationFailed(pub Vec<ValidationIssue>);

impl ValidationFailed {
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.0
    }

    /// Issues reported against `path`.
    pub fn for_path<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a ValidationIssue> {
        self.0.iter().filter(move |i| i.path == path)
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ValidationIssue::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Field-level issues from `validator`, ordered by path.
fn field_issues(result: Result<(), ValidationErrors>) -> Vec<ValidationIssue> {
    let Err(errors) = result else {
        return Vec::new();
    };

    let mut issues: Vec<ValidationIssue> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                ValidationIssue::new(field.to_string(), message)
            })
        })
        .collect();
    issues.sort_by(|a, b| a.path.cmp(&b.path));
    issues
}

/// Every issue with a new credential.
pub fn validate_create(input: &CreateCredential) -> Vec<ValidationIssue> {
    let mut issues = field_issues(input.validate());

    if let (Some(provider), Some(kind)) = (input.provider, input.kind) {
        issues.extend(CredentialType::check(provider, kind));
    }

    if let Some(scope_kind) = input.scope_kind {
        issues.extend(scope_issues(input.provider, scope_kind, input.scope.as_ref()));
    }

    if let Some(kind) = input.kind {
        issues.extend(SecretShape::from(kind).check(input.secret.as_ref()));
    }

    issues
}

/// Scope issues for `scope_kind`. Without a known provider only presence is checked.
fn scope_issues(
    provider: Option<Provider>,
    scope_kind: ScopeKind,
    scope: Option<&Map<String, Value>>,
) -> Vec<ValidationIssue> {
    match provider.map(|p| ScopeShape::resolve(p, scope_kind)) {
        Some(Ok(shape)) => shape.check(scope),
        Some(Err(issue)) => vec![issue],
        None if scope_kind != ScopeKind::Provider && scope.map_or(true, Map::is_empty) => {
            vec![ValidationIssue::scope("scope is required")]
        }
        None => Vec::new(),
    }
}

/// Issues with a partial update. `existing` fills in discriminators the patch leaves out.
pub fn validate_update(
    patch: &CredentialPatch,
    existing: Option<&Credential>,
) -> Vec<ValidationIssue> {
    let mut issues = field_issues(patch.validate());
    let provider = patch.provider.or(existing.map(|c| c.provider));
    let kind = patch.kind.or(existing.map(|c| c.kind));

    if patch.provider.is_some() || patch.kind.is_some() {
        if let (Some(provider), Some(kind)) = (provider, kind) {
            issues.extend(CredentialType::check(provider, kind));
        }
    }

    if let Some(scope_kind) = patch.scope_kind {
        match provider.map(|p| ScopeShape::resolve(p, scope_kind)) {
            Some(Err(issue)) => issues.push(issue),
            Some(Ok(shape)) => match &patch.scope {
                Some(scope) => issues.extend(shape.check(Some(scope))),
                None if shape.requires_scope() => {
                    issues.push(ValidationIssue::scope("scope is required"))
                }
                None => {}
            },
            None => issues.extend(scope_issues(None, scope_kind, patch.scope.as_ref())),
        }
    }

    if patch.rotates_secret() || patch.kind.is_some() {
        match kind {
            Some(kind) => issues.extend(SecretShape::from(kind).check(patch.secret.as_ref())),
            None => tracing::debug!("Secret rotation without a known kind, skipping secret rules"),
        }
    }

    issues
}

/// A create input that passed [`validate_create`].
#[derive(Debug, Clone)]
pub struct ValidatedCreate {
    pub provider: Provider,
    pub kind: CredentialKind,
    pub scope_kind: ScopeKind,
    pub input: CreateCredential,
}

impl ValidatedCreate {
    pub fn new(input: CreateCredential) -> Result<Self, ValidationFailed> {
        let issues = validate_create(&input);
        if !issues.is_empty() {
            return Err(ValidationFailed(issues));
        }

        match (input.provider, input.kind, input.scope_kind) {
            (Some(provider), Some(kind), Some(scope_kind)) => Ok(Self {
                provider,
                kind,
                scope_kind,
                input,
            }),
            _ => Err(ValidationFailed(vec![ValidationIssue::new(
                "provider",
                "provider, kind and scope_kind are required",
            )])),
        }
    }
}

/// Validate and build the `POST /credentials` body.
pub fn prepare_create(input: CreateCredential) -> Result<CreateCredentialBody, CredentialError> {
    match ValidatedCreate::new(input) {
        Ok(validated) => Ok(build_create_body(validated)),
        Err(failed) => {
            tracing::debug!(issues = failed.0.len(), error = %failed, "Credential create rejected");
            Err(failed.into())
        }
    }
}

/// Validate and build the `PATCH /credentials/{id}` body.
pub fn prepare_update(
    patch: &CredentialPatch,
    existing: Option<&Credential>,
) -> Result<Map<String, Value>, CredentialError> {
    let issues = validate_update(patch, existing);
    if !issues.is_empty() {
        let failed = ValidationFailed(issues);
        tracing::debug!(issues = failed.0.len(), error = %failed, "Credential update rejected");
        return Err(failed.into());
    }
    Ok(build_update_body(patch)?)
}
