//! Grouping of expansion concepts into code system/version components
//!
//! Concepts are grouped once into neutral [`ConceptBucket`]s; the FHIR and QDM
//! shapes are thin projections over those buckets.

use crate::models::{CodeSystemEntry, Concept, Representation};
use crate::resolver::resolve_display_identifier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Concepts sharing one code system OID and version, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptBucket {
    pub code_system_oid: String,
    pub code_system_name: Option<String>,
    pub version: Option<String>,
    pub concepts: Vec<Concept>,
}

/// FHIR `ValueSet.compose`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValueSetCompose {
    /// Always present, possibly empty.
    pub include: Vec<ValueSetInclude>,
}

/// FHIR `ValueSet.compose.include`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValueSetInclude {
    pub system: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub concept: Vec<ConceptReference>,
}

/// FHIR `ValueSet.compose.include.concept`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConceptReference {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// QDM value set component: one code system version and its codes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QdmComponent {
    pub code_system: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_system_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub codes: Vec<QdmCode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QdmCode {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Compose output in the caller's representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "representation", rename_all = "lowercase")]
pub enum ComposeComponents {
    Fhir { compose: ValueSetCompose },
    Qdm { components: Vec<QdmComponent> },
}

impl ComposeComponents {
    /// Number of code system/version components.
    pub fn len(&self) -> usize {
        match self {
            ComposeComponents::Fhir { compose } => compose.include.len(),
            ComposeComponents::Qdm { components } => components.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition concepts by (code system OID, version).
///
/// Buckets come out in order of first appearance; concepts keep their input
/// order within a bucket.
pub fn group_concepts(concepts: &[Concept]) -> Vec<ConceptBucket> {
    let mut index: HashMap<(&str, Option<&str>), usize> = HashMap::new();
    let mut buckets: Vec<ConceptBucket> = Vec::new();

    for concept in concepts {
        let key = (
            concept.code_system_oid.as_str(),
            concept.code_system_version.as_deref(),
        );
        let slot = *index.entry(key).or_insert_with(|| {
            buckets.push(ConceptBucket {
                code_system_oid: concept.code_system_oid.clone(),
                code_system_name: concept.code_system_name.clone(),
                version: concept.code_system_version.clone(),
                concepts: Vec::new(),
            });
            buckets.len() - 1
        });
        buckets[slot].concepts.push(concept.clone());
    }

    buckets
}

/// Project buckets onto a FHIR compose, translating OIDs to catalog URLs.
pub fn to_fhir_compose(buckets: &[ConceptBucket], entries: &[CodeSystemEntry]) -> ValueSetCompose {
    let include = buckets
        .iter()
        .filter(|bucket| !bucket.concepts.is_empty())
        .map(|bucket| ValueSetInclude {
            system: resolve_display_identifier(entries, &bucket.code_system_oid),
            version: bucket.version.clone(),
            concept: bucket
                .concepts
                .iter()
                .map(|c| ConceptReference {
                    code: c.code.clone(),
                    display: c.display_name.clone(),
                })
                .collect(),
        })
        .collect();

    ValueSetCompose { include }
}

/// Project buckets onto QDM components, keeping the raw OIDs.
pub fn to_qdm_components(buckets: &[ConceptBucket]) -> Vec<QdmComponent> {
    buckets
        .iter()
        .filter(|bucket| !bucket.concepts.is_empty())
        .map(|bucket| QdmComponent {
            code_system: bucket.code_system_oid.clone(),
            code_system_name: bucket.code_system_name.clone(),
            version: bucket.version.clone(),
            codes: bucket
                .concepts
                .iter()
                .map(|c| QdmCode {
                    code: c.code.clone(),
                    display_name: c.display_name.clone(),
                })
                .collect(),
        })
        .collect()
}

/// Group concepts and project them for the given representation.
pub fn group_and_compose(
    concepts: &[Concept],
    entries: &[CodeSystemEntry],
    representation: Representation,
) -> ComposeComponents {
    let buckets = group_concepts(concepts);
    match representation {
        Representation::Fhir => ComposeComponents::Fhir {
            compose: to_fhir_compose(&buckets, entries),
        },
        Representation::Qdm => ComposeComponents::Qdm {
            components: to_qdm_components(&buckets),
        },
    }
}
