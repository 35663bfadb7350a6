//! Wire models for VSAC, UMLS and mapping-document responses

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query parameters for `svs/RetrieveMultipleValueSets`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueSetQuery {
    pub oid: String,
    pub profile: Option<String>,
    pub include_draft: Option<bool>,
    pub release: Option<String>,
    pub version: Option<String>,
}

/// A `DescribedValueSet` element from an SVS response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SvsValueSet {
    pub id: String,
    pub display_name: Option<String>,
    pub version: Option<String>,
    pub source: Option<String>,
    pub purpose: Option<String>,
    pub value_set_type: Option<String>,
    pub binding: Option<String>,
    pub status: Option<String>,
    pub revision_date: Option<String>,
    pub concepts: Vec<SvsConcept>,
}

/// A `Concept` element inside an SVS `ConceptList`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SvsConcept {
    pub code: String,
    pub code_system: String,
    pub code_system_name: Option<String>,
    pub code_system_version: Option<String>,
    pub display_name: Option<String>,
}

/// Body of `CodeSystem/{name}/Version/{version}/Code/{code}/Info`.
///
/// VSAC answers lookups for unknown systems, versions and codes with
/// `status: "error"` and a populated `errors.resultSet`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeInfoResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<CodeInfoErrors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeInfoErrors {
    #[serde(default)]
    pub result_set: Vec<CodeInfoError>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeInfoError {
    pub err_code: String,
    #[serde(default)]
    pub err_desc: String,
}

/// One code system in the mapping document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeSystemMapping {
    pub oid: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub versions: Vec<VersionMapping>,
}

/// A VSAC version and its FHIR counterpart. Either side may be missing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vsac: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fhir: Option<String>,
}
