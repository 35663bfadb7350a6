//! Validation of caller-authored codes against VSAC
//!
//! Each code is checked on its own: the catalog and version resolution steps
//! are pure ([`prepare`]), and only codes that survive them cost an authority
//! round-trip ([`apply_lookup`] interprets the answer). A failed check is
//! recorded on the returned code, never raised.

use crate::broker::TicketBroker;
use crate::catalog::{find_entry, is_external, sanitize, CatalogProvider};
use crate::models::{
    CodeLookupResult, CodeSystemEntry, Representation, SubmittedCode,
};
use crate::resolver::resolve_equivalent_version;
use crate::transport::AuthorityTransport;
use crate::Result;
use std::sync::Arc;

pub const CODE_SYSTEM_URL_REQUIRED: &str = "Code system URL is required";
pub const INVALID_CODE_SYSTEM: &str = "Invalid Code system";
pub const CODE_SYSTEM_VERSION_NOT_FOUND: &str = "Unable to find a code system version";
pub const CODE_ID_REQUIRED: &str = "Code Id is required";

/// VSAC lookup error codes.
const ERR_CODE_SYSTEM_NOT_FOUND: &str = "800";
const ERR_VERSION_NOT_FOUND: &str = "801";
const ERR_CODE_NOT_FOUND: &str = "802";

/// Where a code stands after the offline checks.
#[derive(Debug, Clone, PartialEq)]
pub enum CodeCheck {
    /// Fully decided without the authority.
    Decided(SubmittedCode),
    /// Needs an authority lookup at `path`.
    Lookup { code: SubmittedCode, path: String },
}

/// Run every check that does not need the authority.
pub fn prepare(
    code: SubmittedCode,
    entries: &[CodeSystemEntry],
    representation: Representation,
) -> CodeCheck {
    let mut code = reset(code);

    let Some(system) = code.code_system.as_ref() else {
        return CodeCheck::Decided(code);
    };

    let identifier = system.oid.as_deref().map(sanitize).unwrap_or_default();
    if identifier.is_empty() {
        return CodeCheck::Decided(invalidate_system(code, CODE_SYSTEM_URL_REQUIRED));
    }

    let Some(entry) = find_entry(entries, &identifier) else {
        return CodeCheck::Decided(invalidate_system(code, INVALID_CODE_SYSTEM));
    };

    if is_external(entry) {
        return CodeCheck::Decided(code);
    }

    let Some(version) =
        resolve_equivalent_version(Some(entry), system.version.as_deref(), representation)
    else {
        return CodeCheck::Decided(invalidate_system(code, CODE_SYSTEM_VERSION_NOT_FOUND));
    };

    let code_id = code.code_id.as_deref().map(sanitize).unwrap_or_default();
    if code_id.is_empty() {
        code.valid = false;
        code.error_message = Some(CODE_ID_REQUIRED.to_string());
        return CodeCheck::Decided(code);
    }

    let path = code_info_path(&entry.name, &version, &code_id);
    CodeCheck::Lookup { code, path }
}

/// Fold an authority lookup result into the code.
pub fn apply_lookup(code: SubmittedCode, result: &CodeLookupResult) -> SubmittedCode {
    if !result.is_error() {
        return code;
    }

    for error in &result.errors {
        match error.code.trim() {
            ERR_CODE_SYSTEM_NOT_FOUND | ERR_VERSION_NOT_FOUND => {
                return invalidate_system(code, &error.description);
            }
            ERR_CODE_NOT_FOUND => {
                let mut code = code;
                code.valid = false;
                code.error_message = Some(error.description.clone());
                return code;
            }
            _ => {}
        }
    }

    tracing::warn!(
        code_id = code.code_id.as_deref().unwrap_or_default(),
        errors = ?result.errors,
        "Unrecognized VSAC lookup error; leaving code valid"
    );
    code
}

/// `/CodeSystem/{name}/Version/{version}/Code/{code}/Info`, segments URL-encoded.
pub fn code_info_path(code_system_name: &str, version: &str, code_id: &str) -> String {
    format!(
        "/CodeSystem/{}/Version/{}/Code/{}/Info",
        urlencoding::encode(code_system_name),
        urlencoding::encode(version),
        urlencoding::encode(code_id)
    )
}

fn reset(mut code: SubmittedCode) -> SubmittedCode {
    code.valid = true;
    code.error_message = None;
    if let Some(system) = code.code_system.as_mut() {
        system.valid = true;
        system.error_message = None;
    }
    code
}

fn invalidate_system(mut code: SubmittedCode, message: &str) -> SubmittedCode {
    if let Some(system) = code.code_system.as_mut() {
        system.valid = false;
        system.error_message = Some(message.to_string());
    }
    code
}

/// Validates batches of codes for one identity, one code at a time.
pub struct CodeValidator {
    broker: Arc<TicketBroker>,
    transport: Arc<dyn AuthorityTransport>,
    catalog: Arc<dyn CatalogProvider>,
}

impl CodeValidator {
    pub fn new(
        broker: Arc<TicketBroker>,
        transport: Arc<dyn AuthorityTransport>,
        catalog: Arc<dyn CatalogProvider>,
    ) -> Self {
        Self {
            broker,
            transport,
            catalog,
        }
    }

    /// Validate every code, returning one annotated code per input in order.
    ///
    /// # Errors
    /// Ticket acquisition and transport failures abort the whole batch.
    pub async fn validate(
        &self,
        codes: Vec<SubmittedCode>,
        identity: &str,
        representation: Representation,
    ) -> Result<Vec<SubmittedCode>> {
        let entries = self.catalog.entries().await?;
        let total = codes.len();
        let mut validated = Vec::with_capacity(total);
        let mut lookups = 0usize;

        for code in codes {
            let checked = match prepare(code, &entries, representation) {
                CodeCheck::Decided(code) => code,
                CodeCheck::Lookup { code, path } => {
                    let ticket = self.broker.acquire_ticket(identity).await?;
                    tracing::debug!(path = %path, "Looking up code in VSAC");
                    let result = self.transport.request_code(&path, &ticket).await?;
                    lookups += 1;
                    apply_lookup(code, &result)
                }
            };
            validated.push(checked);
        }

        let invalid = validated.iter().filter(|c| !is_fully_valid(c)).count();
        tracing::info!(
            identity = %identity,
            representation = %representation,
            total,
            lookups,
            invalid,
            "Validated codes"
        );
        Ok(validated)
    }
}

fn is_fully_valid(code: &SubmittedCode) -> bool {
    code.valid && code.code_system.as_ref().map_or(true, |s| s.valid)
}
