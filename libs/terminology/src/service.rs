//! Caller-facing facade over the broker, catalog, grouper and validator

use crate::{
    broker::{BrokerConfig, TicketBroker},
    catalog::CatalogProvider,
    compose::{group_and_compose, ComposeComponents},
    models::{
        AuthorityValueSet, CodeSystemEntry, Credential, Representation, SubmittedCode,
        ValueSetRequest,
    },
    store::CredentialStore,
    transport::AuthorityTransport,
    validator::CodeValidator,
    Error, Result,
};
use std::sync::Arc;

/// Fallbacks applied to value set requests that leave them unset.
#[derive(Debug, Clone, Default)]
pub struct ValueSetDefaults {
    pub profile: Option<String>,
    pub include_draft: Option<bool>,
}

/// Entry point for controllers and batch jobs.
pub struct TerminologyService {
    broker: Arc<TicketBroker>,
    transport: Arc<dyn AuthorityTransport>,
    catalog: Arc<dyn CatalogProvider>,
    validator: CodeValidator,
    defaults: ValueSetDefaults,
}

impl TerminologyService {
    pub fn new(
        transport: Arc<dyn AuthorityTransport>,
        store: Arc<dyn CredentialStore>,
        catalog: Arc<dyn CatalogProvider>,
    ) -> Self {
        Self::with_config(
            transport,
            store,
            catalog,
            BrokerConfig::default(),
            ValueSetDefaults::default(),
        )
    }

    pub fn with_config(
        transport: Arc<dyn AuthorityTransport>,
        store: Arc<dyn CredentialStore>,
        catalog: Arc<dyn CatalogProvider>,
        broker_config: BrokerConfig,
        defaults: ValueSetDefaults,
    ) -> Self {
        let broker = Arc::new(TicketBroker::with_config(
            Arc::clone(&transport),
            store,
            broker_config,
        ));
        let validator = CodeValidator::new(
            Arc::clone(&broker),
            Arc::clone(&transport),
            Arc::clone(&catalog),
        );
        Self {
            broker,
            transport,
            catalog,
            validator,
            defaults,
        }
    }

    pub fn broker(&self) -> &TicketBroker {
        &self.broker
    }

    pub async fn enroll(&self, identity: &str, api_key: &str) -> Result<Credential> {
        self.broker.enroll(identity, api_key).await
    }

    pub async fn ensure_valid_session(&self, identity: &str) -> Result<bool> {
        self.broker.ensure_valid_session(identity).await
    }

    /// Retrieve one value set expansion on behalf of `identity`.
    pub async fn fetch_value_set(
        &self,
        request: &ValueSetRequest,
        identity: &str,
    ) -> Result<AuthorityValueSet> {
        let request = self.apply_defaults(request)?;
        let ticket = self.broker.acquire_ticket(identity).await?;

        let value_set = self.transport.request_value_set(&request, &ticket).await?;
        tracing::info!(
            identity = %identity,
            oid = %request.oid,
            concepts = value_set.concepts.len(),
            "Fetched value set"
        );
        Ok(value_set)
    }

    /// Retrieve several value sets in order, stopping at the first failure.
    pub async fn fetch_value_sets(
        &self,
        requests: &[ValueSetRequest],
        identity: &str,
    ) -> Result<Vec<AuthorityValueSet>> {
        let mut value_sets = Vec::with_capacity(requests.len());
        for request in requests {
            value_sets.push(self.fetch_value_set(request, identity).await?);
        }
        Ok(value_sets)
    }

    /// Group an expansion into compose components for `representation`.
    pub async fn convert_to_compose_components(
        &self,
        value_set: &AuthorityValueSet,
        representation: Representation,
    ) -> Result<ComposeComponents> {
        let entries = self.catalog.entries().await?;
        Ok(group_and_compose(
            &value_set.concepts,
            &entries,
            representation,
        ))
    }

    /// Validate caller codes; see [`CodeValidator::validate`].
    pub async fn validate(
        &self,
        codes: Vec<SubmittedCode>,
        identity: &str,
        representation: Representation,
    ) -> Result<Vec<SubmittedCode>> {
        self.validator.validate(codes, identity, representation).await
    }

    pub async fn catalog_entries(&self) -> Result<Arc<Vec<CodeSystemEntry>>> {
        self.catalog.entries().await
    }

    fn apply_defaults(&self, request: &ValueSetRequest) -> Result<ValueSetRequest> {
        let oid = request.oid.trim();
        if oid.is_empty() {
            return Err(Error::InvalidRequest("value set OID is required".to_string()));
        }

        Ok(ValueSetRequest {
            oid: oid.to_string(),
            profile: non_blank(&request.profile).or_else(|| self.defaults.profile.clone()),
            include_draft: request.include_draft.or(self.defaults.include_draft),
            release: non_blank(&request.release),
            version: non_blank(&request.version),
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
