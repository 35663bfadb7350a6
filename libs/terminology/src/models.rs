//! Data model shared by the session broker, resolver, grouper and validator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stored UMLS credential for one identity.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub identity: String,
    pub api_key: String,
    /// Current ticket-granting ticket. Grant and expiry travel together.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_grant: Option<SessionGrant>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Credential {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identity", &self.identity)
            .field("api_key", &"<redacted>")
            .field("session_grant", &self.session_grant)
            .field("created_at", &self.created_at)
            .field("modified_at", &self.modified_at)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionGrant {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionGrant {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl fmt::Debug for SessionGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionGrant")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// One code system from the mapping document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeSystemEntry {
    /// Canonical OID, usually in `urn:oid:` form.
    pub oid: String,
    /// Dereferenceable URL used by FHIR (e.g. `http://loinc.org`).
    #[serde(default)]
    pub url: String,
    /// VSAC code system name (e.g. `LOINC`).
    #[serde(default)]
    pub name: String,
    /// Version equivalences, most current first.
    #[serde(default)]
    pub versions: Vec<VersionPair>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VersionPair {
    #[serde(rename = "vsac", default, skip_serializing_if = "Option::is_none")]
    pub authority_version: Option<String>,
    #[serde(rename = "fhir", default, skip_serializing_if = "Option::is_none")]
    pub client_version: Option<String>,
}

/// A concept from a value set expansion, exactly as the authority returned it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    pub code: String,
    pub code_system_oid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_system_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_system_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// A value set expansion as retrieved from the authority.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityValueSet {
    pub oid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_set_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_date: Option<String>,
    #[serde(default)]
    pub concepts: Vec<Concept>,
}

/// Parameters of a value set retrieval.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValueSetRequest {
    pub oid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_draft: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ValueSetRequest {
    pub fn new(oid: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            ..Default::default()
        }
    }
}

/// Result of exchanging a grant for a service ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketOutcome {
    Issued(String),
    /// The authority rejected the grant as expired or invalid.
    Rejected,
}

/// Outcome of an authority code lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeLookupResult {
    pub status: String,
    pub errors: Vec<LookupError>,
}

impl CodeLookupResult {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            errors: Vec::new(),
        }
    }

    pub fn error(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            errors: vec![LookupError {
                code: code.into(),
                description: description.into(),
            }],
        }
    }

    pub fn is_error(&self) -> bool {
        self.status.eq_ignore_ascii_case("error")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookupError {
    pub code: String,
    pub description: String,
}

/// A caller-authored code, annotated with validation results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedCode {
    /// Caller-side name of the code declaration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_system: Option<SubmittedCodeSystem>,
    #[serde(default = "default_valid")]
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedCodeSystem {
    /// Code system identifier as written by the caller: a URL or an OID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default = "default_valid")]
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

fn default_valid() -> bool {
    true
}

// Codes start out valid; validation only ever takes validity away.
impl Default for SubmittedCode {
    fn default() -> Self {
        Self {
            name: None,
            code_id: None,
            code_system: None,
            valid: true,
            error_message: None,
        }
    }
}

impl Default for SubmittedCodeSystem {
    fn default() -> Self {
        Self {
            oid: None,
            name: None,
            version: None,
            valid: true,
            error_message: None,
        }
    }
}

/// Version space and output shape a caller works in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Representation {
    /// FHIR versions, mapped to VSAC versions through the catalog.
    Fhir,
    /// QDM submits VSAC-native versions.
    Qdm,
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Representation::Fhir => f.write_str("fhir"),
            Representation::Qdm => f.write_str("qdm"),
        }
    }
}

impl FromStr for Representation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fhir" | "qi-core" | "qicore" => Ok(Representation::Fhir),
            "qdm" => Ok(Representation::Qdm),
            other => Err(format!("unknown representation '{other}'")),
        }
    }
}
