#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use termgate_terminology::{
    AuthorityTransport, AuthorityValueSet, CodeLookupResult, CodeSystemEntry, Concept, Credential,
    CredentialStore, Error, InMemoryCredentialStore, Result, SessionGrant, StaticCatalog,
    SubmittedCode, SubmittedCodeSystem, TerminologyService, TicketOutcome, ValueSetRequest,
    VersionPair,
};

/// In-memory authority that records every call it receives.
#[derive(Default)]
pub struct ScriptedTransport {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    reject_api_key: bool,
    grants_issued: usize,
    ticket_script: VecDeque<TicketOutcome>,
    always_reject_tickets: bool,
    tickets_issued: usize,
    ticket_grants: Vec<String>,
    value_sets: HashMap<String, AuthorityValueSet>,
    value_set_requests: Vec<ValueSetRequest>,
    code_results: HashMap<String, CodeLookupResult>,
    code_paths: Vec<String>,
    upstream_failure_on_code: bool,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reject_api_key(&self) {
        self.state.lock().unwrap().reject_api_key = true;
    }

    /// Queue outcomes for the next ticket requests; afterwards tickets are issued.
    pub fn script_tickets(&self, outcomes: impl IntoIterator<Item = TicketOutcome>) {
        self.state.lock().unwrap().ticket_script.extend(outcomes);
    }

    pub fn always_reject_tickets(&self) {
        self.state.lock().unwrap().always_reject_tickets = true;
    }

    pub fn add_value_set(&self, value_set: AuthorityValueSet) {
        self.state
            .lock()
            .unwrap()
            .value_sets
            .insert(value_set.oid.clone(), value_set);
    }

    pub fn set_code_result(&self, path: &str, result: CodeLookupResult) {
        self.state
            .lock()
            .unwrap()
            .code_results
            .insert(path.to_string(), result);
    }

    pub fn fail_code_lookups(&self) {
        self.state.lock().unwrap().upstream_failure_on_code = true;
    }

    pub fn grant_calls(&self) -> usize {
        self.state.lock().unwrap().grants_issued
    }

    pub fn ticket_calls(&self) -> usize {
        self.state.lock().unwrap().ticket_grants.len()
    }

    /// Grant presented on each ticket request, in order.
    pub fn ticket_grants(&self) -> Vec<String> {
        self.state.lock().unwrap().ticket_grants.clone()
    }

    pub fn code_paths(&self) -> Vec<String> {
        self.state.lock().unwrap().code_paths.clone()
    }

    pub fn value_set_requests(&self) -> Vec<ValueSetRequest> {
        self.state.lock().unwrap().value_set_requests.clone()
    }
}

#[async_trait]
impl AuthorityTransport for ScriptedTransport {
    async fn request_grant(&self, _api_key: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        if state.reject_api_key {
            return Err(Error::Unauthorized("UMLS rejected the API key".to_string()));
        }
        state.grants_issued += 1;
        Ok(format!("TGT-{}", state.grants_issued))
    }

    async fn request_ticket(&self, grant: &str) -> Result<TicketOutcome> {
        let mut state = self.state.lock().unwrap();
        state.ticket_grants.push(grant.to_string());
        if state.always_reject_tickets {
            return Ok(TicketOutcome::Rejected);
        }
        if let Some(outcome) = state.ticket_script.pop_front() {
            return Ok(outcome);
        }
        state.tickets_issued += 1;
        Ok(TicketOutcome::Issued(format!("ST-{}", state.tickets_issued)))
    }

    async fn request_value_set(
        &self,
        request: &ValueSetRequest,
        _ticket: &str,
    ) -> Result<AuthorityValueSet> {
        let mut state = self.state.lock().unwrap();
        state.value_set_requests.push(request.clone());
        state
            .value_sets
            .get(&request.oid)
            .cloned()
            .ok_or_else(|| Error::Upstream {
                status: Some(404),
                message: format!("Value set not found: {}", request.oid),
            })
    }

    async fn request_code(&self, path: &str, _ticket: &str) -> Result<CodeLookupResult> {
        let mut state = self.state.lock().unwrap();
        state.code_paths.push(path.to_string());
        if state.upstream_failure_on_code {
            return Err(Error::Upstream {
                status: Some(500),
                message: "VSAC internal error".to_string(),
            });
        }
        Ok(state
            .code_results
            .get(path)
            .cloned()
            .unwrap_or_else(CodeLookupResult::ok))
    }
}

pub fn catalog_entries() -> Vec<CodeSystemEntry> {
    vec![
        CodeSystemEntry {
            oid: "urn:oid:2.16.840.1.113883.6.1".to_string(),
            url: "http://loinc.org".to_string(),
            name: "LOINC".to_string(),
            versions: vec![
                version_pair(Some("2.74"), Some("2.74")),
                version_pair(Some("2.72"), Some("2.72.0")),
            ],
        },
        CodeSystemEntry {
            oid: "urn:oid:2.16.840.1.113883.6.96".to_string(),
            url: "http://snomed.info/sct".to_string(),
            name: "SNOMEDCT".to_string(),
            versions: vec![version_pair(
                Some("2023-03"),
                Some("http://snomed.info/sct/731000124108/version/20230301"),
            )],
        },
        CodeSystemEntry {
            oid: "urn:oid:2.16.840.1.113883.6.90".to_string(),
            url: "http://hl7.org/fhir/sid/icd-10-cm".to_string(),
            name: "ICD10CM".to_string(),
            versions: vec![version_pair(Some("2.3"), Some("2.3"))],
        },
        CodeSystemEntry {
            oid: "urn:oid:2.16.840.1.113883.6.12".to_string(),
            url: "http://www.ama-assn.org/go/cpt".to_string(),
            name: "CPT".to_string(),
            versions: vec![version_pair(None, Some("2023"))],
        },
        CodeSystemEntry {
            oid: "NOT.IN.VSAC".to_string(),
            url: "http://hl7.org/fhir/sid/cvx".to_string(),
            name: "CVX".to_string(),
            versions: vec![],
        },
    ]
}

pub fn version_pair(vsac: Option<&str>, fhir: Option<&str>) -> VersionPair {
    VersionPair {
        authority_version: vsac.map(str::to_string),
        client_version: fhir.map(str::to_string),
    }
}

pub struct Harness {
    pub transport: Arc<ScriptedTransport>,
    pub store: Arc<InMemoryCredentialStore>,
    pub service: TerminologyService,
}

impl Harness {
    pub fn new() -> Self {
        let transport = ScriptedTransport::new();
        let store = Arc::new(InMemoryCredentialStore::new());
        let service = TerminologyService::new(
            transport.clone(),
            store.clone(),
            Arc::new(StaticCatalog::new(catalog_entries())),
        );
        Self {
            transport,
            store,
            service,
        }
    }

    /// Store a credential directly, bypassing enrollment.
    pub async fn seed_credential(&self, identity: &str, api_key: &str, grant: Option<&str>) {
        self.seed_credential_expiring(identity, api_key, grant, Duration::hours(4))
            .await;
    }

    pub async fn seed_credential_expiring(
        &self,
        identity: &str,
        api_key: &str,
        grant: Option<&str>,
        expires_in: Duration,
    ) {
        let created = Utc::now() - Duration::hours(1);
        self.store
            .save(Credential {
                identity: identity.to_string(),
                api_key: api_key.to_string(),
                session_grant: grant.map(|g| SessionGrant {
                    value: g.to_string(),
                    expires_at: Utc::now() + expires_in,
                }),
                created_at: created,
                modified_at: created,
            })
            .await
            .unwrap();
    }

    pub async fn stored(&self, identity: &str) -> Credential {
        self.store.find(identity).await.unwrap().unwrap()
    }
}

pub fn submitted(
    system: Option<&str>,
    version: Option<&str>,
    code_id: Option<&str>,
) -> SubmittedCode {
    SubmittedCode {
        name: code_id.map(|c| format!("code {c}")),
        code_id: code_id.map(str::to_string),
        code_system: Some(SubmittedCodeSystem {
            oid: system.map(str::to_string),
            name: None,
            version: version.map(str::to_string),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn concept(code: &str, system: &str, version: &str) -> Concept {
    Concept {
        code: code.to_string(),
        code_system_oid: system.to_string(),
        code_system_name: None,
        code_system_version: Some(version.to_string()),
        display_name: Some(format!("Display for {code}")),
    }
}
