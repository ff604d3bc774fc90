//! Credential policy for the infrastructure console.
//!
//! The three discriminators `provider`, `kind` and `scope_kind` decide which fields
//! of `scope` and `secret` are required. [`policy`] turns raw input into either a list
//! of [`ValidationIssue`]s or a request body ready to send.

pub mod body;
pub mod client;
pub mod error;
pub mod model;
pub mod policy;
pub mod rules;

pub use body::{build_create_body, build_update_body, CreateCredentialBody, UPDATE_KEYS};
pub use client::{CredentialsApi, CredentialsClient};
pub use error::CredentialError;
pub use model::{
    CreateCredential, Credential, CredentialFilter, CredentialKind, CredentialPatch, Provider,
    RevealedSecret, ScopeKind,
};
pub use policy::{
    prepare_create, prepare_update, validate_create, validate_update, ValidatedCreate,
    ValidationFailed, ValidationIssue,
};
pub use rules::{CredentialType, ScopeShape, SecretShape, AWS_SERVICES};
