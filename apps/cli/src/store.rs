//! Credential store backed by a JSON file

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use termgate_terminology::{Credential, CredentialStore, Error, Result};
use tokio::sync::Mutex;

/// Keeps every identity's credential in one JSON object keyed by identity.
///
/// Saves write a sibling temp file and rename it over the original.
pub struct FileCredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

type Records = BTreeMap<String, Credential>;

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_records(&self) -> Result<Records> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Records::new()),
            Err(e) => return Err(store_error(&self.path, e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Records::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| store_error(&self.path, e))
    }

    async fn write_records(&self, records: &Records) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| store_error(parent, e))?;
        }

        let json = serde_json::to_vec_pretty(records).map_err(|e| store_error(&self.path, e))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| store_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| store_error(&self.path, e))
    }
}

fn store_error(path: &Path, err: impl std::fmt::Display) -> Error {
    Error::Store(format!("{}: {err}", path.display()))
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn find(&self, identity: &str) -> Result<Option<Credential>> {
        Ok(self.read_records().await?.remove(identity))
    }

    async fn save(&self, credential: Credential) -> Result<Credential> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_records().await?;
        records.insert(credential.identity.clone(), credential.clone());
        self.write_records(&records).await?;
        tracing::debug!(
            identity = %credential.identity,
            path = %self.path.display(),
            "Credential saved"
        );
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use termgate_terminology::SessionGrant;

    fn credential(identity: &str, api_key: &str) -> Credential {
        let now = Utc::now();
        Credential {
            identity: identity.to_string(),
            api_key: api_key.to_string(),
            session_grant: Some(SessionGrant {
                value: "TGT-abc".to_string(),
                expires_at: now + Duration::hours(8),
            }),
            created_at: now,
            modified_at: now,
        }
    }

    #[tokio::test]
    async fn test_missing_file_has_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        assert!(store.find("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        let store = FileCredentialStore::new(&path);
        store.save(credential("alice", "key-a")).await.unwrap();
        store.save(credential("bob", "key-b")).await.unwrap();
        store.save(credential("alice", "key-a2")).await.unwrap();

        let reopened = FileCredentialStore::new(&path);
        let alice = reopened.find("alice").await.unwrap().unwrap();
        assert_eq!(alice.api_key, "key-a2");
        assert_eq!(alice.session_grant.unwrap().value, "TGT-abc");
        assert_eq!(reopened.find("bob").await.unwrap().unwrap().api_key, "key-b");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = FileCredentialStore::new(&path).find("alice").await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }
}
