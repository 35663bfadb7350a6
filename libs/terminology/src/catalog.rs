//! Code system catalog access and identifier matching

use crate::error::{Error, Result};
use crate::models::CodeSystemEntry;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Catalog OID of code systems known never to be published in VSAC.
pub const NOT_IN_VSAC_OID: &str = "NOT.IN.VSAC";

const URN_OID_PREFIX: &str = "urn:oid:";

/// Source of the code-system mapping document.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// All catalog entries. Repeated calls return the same document.
    async fn entries(&self) -> Result<Arc<Vec<CodeSystemEntry>>>;
}

/// Catalog held in memory, typically loaded from a local JSON file.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: Arc<Vec<CodeSystemEntry>>,
}

impl StaticCatalog {
    pub fn new(entries: Vec<CodeSystemEntry>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<CodeSystemEntry> = serde_json::from_str(json)
            .map_err(|e| Error::Catalog(format!("malformed mapping document: {e}")))?;
        Ok(Self::new(entries))
    }

    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Catalog(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }
}

#[async_trait]
impl CatalogProvider for StaticCatalog {
    async fn entries(&self) -> Result<Arc<Vec<CodeSystemEntry>>> {
        Ok(Arc::clone(&self.entries))
    }
}

/// Strip quoting artifacts and surrounding whitespace from caller input.
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != '\'' && *c != '"')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Sanitized, lowercased OID without the `urn:oid:` prefix.
pub fn normalize_oid(value: &str) -> String {
    let cleaned = sanitize(value).to_lowercase();
    match cleaned.strip_prefix(URN_OID_PREFIX) {
        Some(bare) => bare.to_string(),
        None => cleaned,
    }
}

/// Find the entry a caller-supplied identifier refers to.
///
/// The identifier may be the entry's URL (FHIR) or its OID with or without the
/// `urn:oid:` prefix (QDM). Matching is case-insensitive on sanitized input.
pub fn find_entry<'a>(
    entries: &'a [CodeSystemEntry],
    identifier: &str,
) -> Option<&'a CodeSystemEntry> {
    let wanted = sanitize(identifier);
    if wanted.is_empty() {
        return None;
    }
    let wanted_oid = normalize_oid(&wanted);

    entries.iter().find(|entry| {
        (!entry.url.is_empty() && entry.url.eq_ignore_ascii_case(&wanted))
            || (!wanted_oid.is_empty() && normalize_oid(&entry.oid) == wanted_oid)
    })
}

/// Find the entry whose OID matches, ignoring URN prefix, quoting and case.
pub fn find_entry_by_oid<'a>(
    entries: &'a [CodeSystemEntry],
    oid: &str,
) -> Option<&'a CodeSystemEntry> {
    let wanted = normalize_oid(oid);
    if wanted.is_empty() {
        return None;
    }
    entries.iter().find(|entry| normalize_oid(&entry.oid) == wanted)
}

/// True for catalog entries trusted without consulting the authority.
pub fn is_external(entry: &CodeSystemEntry) -> bool {
    normalize_oid(&entry.oid) == NOT_IN_VSAC_OID.to_lowercase()
}
