//! Credentials REST client.
//!
//! Create and update validate locally first; a rejected input never reaches the
//! network. Reveals are never cached.

use async_trait::async_trait;
use console_core::{ApiClient, ResourceId};
use serde_json::{Map, Value};
use tracing::instrument;

use crate::error::CredentialError;
use crate::model::{CreateCredential, Credential, CredentialFilter, CredentialPatch, RevealedSecret};
use crate::policy::{prepare_create, prepare_update};

#[async_trait]
pub trait CredentialsApi: Send + Sync {
    async fn list(&self, filter: &CredentialFilter) -> Result<Vec<Credential>, CredentialError>;

    async fn get(&self, id: &ResourceId) -> Result<Credential, CredentialError>;

    async fn create(&self, input: CreateCredential) -> Result<Credential, CredentialError>;

    /// `existing` supplies discriminators the patch leaves out for validation.
    async fn update(
        &self,
        id: &ResourceId,
        patch: &CredentialPatch,
        existing: Option<&Credential>,
    ) -> Result<Credential, CredentialError>;

    async fn delete(&self, id: &ResourceId) -> Result<(), CredentialError>;

    /// One-time disclosure of the decrypted secret.
    async fn reveal(&self, id: &ResourceId) -> Result<RevealedSecret, CredentialError>;
}

#[derive(Debug, Clone)]
pub struct CredentialsClient {
    client: ApiClient,
}

impl CredentialsClient {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn item_path(id: &ResourceId) -> String {
        format!("/credentials/{}", id)
    }
}

#[async_trait]
impl CredentialsApi for CredentialsClient {
    async fn list(&self, filter: &CredentialFilter) -> Result<Vec<Credential>, CredentialError> {
        let credentials: Vec<Credential> =
            self.client.get_json("/credentials", &filter.query()).await?;
        tracing::debug!(count = credentials.len(), "Listed credentials");
        Ok(credentials)
    }

    async fn get(&self, id: &ResourceId) -> Result<Credential, CredentialError> {
        Ok(self.client.get_json(&Self::item_path(id), &[]).await?)
    }

    #[instrument(skip(self, input))]
    async fn create(&self, input: CreateCredential) -> Result<Credential, CredentialError> {
        let body = prepare_create(input)?;
        let created: Credential = self.client.post_json("/credentials", &body).await?;
        tracing::info!(
            credential_id = %created.id,
            provider = %created.provider,
            kind = %created.kind,
            "Credential created"
        );
        Ok(created)
    }

    #[instrument(skip(self, id, patch, existing), fields(credential_id = %id))]
    async fn update(
        &self,
        id: &ResourceId,
        patch: &CredentialPatch,
        existing: Option<&Credential>,
    ) -> Result<Credential, CredentialError> {
        let body: Map<String, Value> = prepare_update(patch, existing)?;
        let fields: Vec<&str> = body.keys().map(String::as_str).collect();
        tracing::debug!(
            fields = ?fields,
            rotates_secret = patch.rotates_secret(),
            "Sending credential patch"
        );

        let updated: Credential = self.client.patch_json(&Self::item_path(id), &body).await?;
        tracing::info!(rotated = patch.rotates_secret(), "Credential updated");
        Ok(updated)
    }

    #[instrument(skip(self, id), fields(credential_id = %id))]
    async fn delete(&self, id: &ResourceId) -> Result<(), CredentialError> {
        self.client.delete(&Self::item_path(id)).await?;
        tracing::info!("Credential deleted");
        Ok(())
    }

    #[instrument(skip(self, id), fields(credential_id = %id))]
    async fn reveal(&self, id: &ResourceId) -> Result<RevealedSecret, CredentialError> {
        let secret: RevealedSecret = self
            .client
            .get_json(&format!("{}/reveal", Self::item_path(id)), &[])
            .await?;
        tracing::info!("Credential secret revealed");
        Ok(secret)
    }
}
