//! Client for the code-system mapping document
//!
//! The mapping document is a static JSON array pairing each code system's OID
//! with its FHIR URL, its VSAC name and the VSAC/FHIR version equivalences.
//! It is fetched once and served from memory until invalidated.

use crate::error::{Error, Result};
use crate::models::CodeSystemMapping;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub struct MappingDocumentClient {
    client: Client,
    url: String,
    cache: RwLock<Option<Arc<Vec<CodeSystemMapping>>>>,
}

impl MappingDocumentClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            cache: RwLock::new(None),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Return the mapping document, fetching it on first use.
    pub async fn mappings(&self) -> Result<Arc<Vec<CodeSystemMapping>>> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            return Ok(Arc::clone(cached));
        }

        let mut cache = self.cache.write().await;
        // Another caller may have filled the cache while we waited for the lock.
        if let Some(cached) = cache.as_ref() {
            return Ok(Arc::clone(cached));
        }

        let fetched = Arc::new(self.fetch().await?);
        tracing::info!(
            url = %self.url,
            code_systems = fetched.len(),
            "Loaded code system mapping document"
        );
        *cache = Some(Arc::clone(&fetched));
        Ok(fetched)
    }

    /// Drop the cached document so the next call refetches it.
    pub async fn invalidate(&self) {
        self.cache.write().await.take();
    }

    async fn fetch(&self) -> Result<Vec<CodeSystemMapping>> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(Error::Status {
                status: response.status().as_u16(),
                url: self.url.clone(),
            });
        }

        let mappings: Vec<CodeSystemMapping> = response.json().await?;
        Ok(mappings)
    }
}
