//! Authority transport seam and its VSAC implementation

use crate::models::{
    AuthorityValueSet, CodeLookupResult, TicketOutcome, ValueSetRequest,
};
use crate::Result;
use async_trait::async_trait;

/// Calls into the terminology authority.
///
/// A rejected grant is a normal outcome ([`TicketOutcome::Rejected`]), not an
/// error. Transport-level failures surface as [`crate::Error::Upstream`].
#[async_trait]
pub trait AuthorityTransport: Send + Sync {
    /// Exchange a long-lived API key for a session grant.
    async fn request_grant(&self, api_key: &str) -> Result<String>;

    /// Exchange a session grant for a single-use service ticket.
    async fn request_ticket(&self, grant: &str) -> Result<TicketOutcome>;

    /// Retrieve a value set expansion.
    async fn request_value_set(
        &self,
        request: &ValueSetRequest,
        ticket: &str,
    ) -> Result<AuthorityValueSet>;

    /// Look up a code by its `/CodeSystem/.../Info` path.
    async fn request_code(&self, path: &str, ticket: &str) -> Result<CodeLookupResult>;
}

#[cfg(feature = "vsac-transport")]
mod vsac {
    use super::AuthorityTransport;
    use crate::catalog::CatalogProvider;
    use crate::models::{
        AuthorityValueSet, CodeLookupResult, CodeSystemEntry, Concept, LookupError,
        TicketOutcome, ValueSetRequest, VersionPair,
    };
    use crate::{Error, Result};
    use async_trait::async_trait;
    use std::sync::Arc;
    use termgate_vsac_client as client;

    fn upstream(e: client::Error) -> Error {
        Error::Upstream {
            status: e.status(),
            message: e.to_string(),
        }
    }

    #[async_trait]
    impl AuthorityTransport for client::VsacClient {
        async fn request_grant(&self, api_key: &str) -> Result<String> {
            client::VsacClient::request_grant(self, api_key)
                .await
                .map_err(|e| match e.status() {
                    Some(401) | Some(403) => {
                        Error::Unauthorized("UMLS rejected the API key".to_string())
                    }
                    _ => upstream(e),
                })
        }

        async fn request_ticket(&self, grant: &str) -> Result<TicketOutcome> {
            let ticket = client::VsacClient::request_service_ticket(self, grant)
                .await
                .map_err(upstream)?;
            Ok(match ticket {
                Some(ticket) => TicketOutcome::Issued(ticket),
                None => TicketOutcome::Rejected,
            })
        }

        async fn request_value_set(
            &self,
            request: &ValueSetRequest,
            ticket: &str,
        ) -> Result<AuthorityValueSet> {
            let query = client::ValueSetQuery {
                oid: request.oid.clone(),
                profile: request.profile.clone(),
                include_draft: request.include_draft,
                release: request.release.clone(),
                version: request.version.clone(),
            };

            let value_set = client::VsacClient::retrieve_value_set(self, &query, ticket)
                .await
                .map_err(|e| match e {
                    client::Error::ValueSetNotFound(oid) => Error::Upstream {
                        status: Some(404),
                        message: format!("Value set not found: {oid}"),
                    },
                    other => upstream(other),
                })?;

            Ok(value_set_from_svs(value_set))
        }

        async fn request_code(&self, path: &str, ticket: &str) -> Result<CodeLookupResult> {
            let info = client::VsacClient::code_info(self, path, ticket)
                .await
                .map_err(upstream)?;

            Ok(CodeLookupResult {
                status: info.status,
                errors: info
                    .errors
                    .map(|errors| {
                        errors
                            .result_set
                            .into_iter()
                            .map(|e| LookupError {
                                code: e.err_code,
                                description: e.err_desc,
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            })
        }
    }

    #[async_trait]
    impl CatalogProvider for client::MappingDocumentClient {
        async fn entries(&self) -> Result<Arc<Vec<CodeSystemEntry>>> {
            let mappings = self
                .mappings()
                .await
                .map_err(|e| Error::Catalog(e.to_string()))?;
            Ok(Arc::new(mappings.iter().map(entry_from_mapping).collect()))
        }
    }

    pub(crate) fn value_set_from_svs(value_set: client::SvsValueSet) -> AuthorityValueSet {
        AuthorityValueSet {
            oid: value_set.id,
            display_name: value_set.display_name,
            version: value_set.version,
            source: value_set.source,
            value_set_type: value_set.value_set_type,
            binding: value_set.binding,
            status: value_set.status,
            revision_date: value_set.revision_date,
            concepts: value_set
                .concepts
                .into_iter()
                .map(|c| Concept {
                    code: c.code,
                    code_system_oid: c.code_system,
                    code_system_name: c.code_system_name,
                    code_system_version: c.code_system_version,
                    display_name: c.display_name,
                })
                .collect(),
        }
    }

    pub(crate) fn entry_from_mapping(mapping: &client::CodeSystemMapping) -> CodeSystemEntry {
        CodeSystemEntry {
            oid: mapping.oid.clone(),
            url: mapping.url.clone(),
            name: mapping.name.clone(),
            versions: mapping
                .versions
                .iter()
                .map(|v| VersionPair {
                    authority_version: v.vsac.clone(),
                    client_version: v.fhir.clone(),
                })
                .collect(),
        }
    }

}
