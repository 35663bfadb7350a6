//! Mapping between the VSAC and FHIR identifier/version spaces
//!
//! Version policy:
//! - a caller-supplied version is trusted: it is mapped to its VSAC equivalent
//!   when the catalog knows one, otherwise passed through unchanged
//! - without a caller version the most current VSAC version (`versions[0]`)
//!   is used, and its absence means the code cannot be checked at all

use crate::catalog::{find_entry_by_oid, sanitize};
use crate::models::{CodeSystemEntry, Representation};

/// Resolve the VSAC version to look a code up against.
///
/// Returns `None` only when no version was submitted and the entry has no
/// usable most-current VSAC version.
pub fn resolve_equivalent_version(
    entry: Option<&CodeSystemEntry>,
    submitted_version: Option<&str>,
    representation: Representation,
) -> Option<String> {
    let submitted = submitted_version
        .map(sanitize)
        .filter(|v| !v.is_empty());

    let Some(submitted) = submitted else {
        return entry
            .and_then(|e| e.versions.first())
            .and_then(|pair| pair.authority_version.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
    };

    if representation == Representation::Qdm {
        return Some(submitted);
    }

    let mapped = entry.and_then(|e| {
        e.versions
            .iter()
            .find(|pair| {
                pair.client_version
                    .as_deref()
                    .is_some_and(|v| sanitize(v).eq_ignore_ascii_case(&submitted))
            })
            .and_then(|pair| pair.authority_version.clone())
    });

    Some(mapped.unwrap_or(submitted))
}

/// Presentation identifier for a raw code system OID.
///
/// Returns the catalog URL when the OID is known, the raw identifier otherwise.
pub fn resolve_display_identifier(entries: &[CodeSystemEntry], raw_identifier: &str) -> String {
    find_entry_by_oid(entries, raw_identifier)
        .filter(|entry| !entry.url.is_empty())
        .map(|entry| entry.url.clone())
        .unwrap_or_else(|| raw_identifier.to_string())
}
