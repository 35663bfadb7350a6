//! Credential persistence seam

use crate::models::Credential;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Storage for per-identity UMLS credentials.
///
/// Implementations must make `save` durable before returning: the broker
/// relies on a renewed grant being persisted before the next ticket attempt.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up the credential for an identity.
    ///
    /// # Returns
    /// * `Ok(Some(credential))` - Identity is enrolled
    /// * `Ok(None)` - No record for the identity
    async fn find(&self, identity: &str) -> Result<Option<Credential>>;

    /// Insert or replace the credential for `credential.identity`.
    async fn save(&self, credential: Credential) -> Result<Credential>;
}

/// Process-local credential store.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    records: RwLock<HashMap<String, Credential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find(&self, identity: &str) -> Result<Option<Credential>> {
        Ok(self.records.read().await.get(identity).cloned())
    }

    async fn save(&self, credential: Credential) -> Result<Credential> {
        self.records
            .write()
            .await
            .insert(credential.identity.clone(), credential.clone());
        Ok(credential)
    }
}
