//! VSAC / UMLS HTTP client
//!
//! Async client for the terminology authority:
//! - UMLS CAS: API key → ticket-granting ticket → single-use service ticket
//! - VSAC SVS: value set expansions (`RetrieveMultipleValueSets`)
//! - VSAC REST: code lookups (`CodeSystem/{name}/Version/{version}/Code/{code}/Info`)
//!
//! plus a small cached client for the code-system mapping document.
//!
//! # Examples
//!
//! ```rust,no_run
//! use termgate_vsac_client::{ValueSetQuery, VsacClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = VsacClient::new()?;
//! let tgt = client.request_grant("my-umls-api-key").await?;
//! if let Some(ticket) = client.request_service_ticket(&tgt).await? {
//!     let query = ValueSetQuery {
//!         oid: "2.16.840.1.113883.3.464.1003.101.12.1001".to_string(),
//!         ..Default::default()
//!     };
//!     let value_set = client.retrieve_value_set(&query, &ticket).await?;
//!     println!("{} concepts", value_set.concepts.len());
//! }
//! # Ok(())
//! # }
//! ```
pub mod catalog;
pub mod client;
pub mod error;
pub mod models;
pub mod svs;

pub use catalog::MappingDocumentClient;
pub use client::{VsacClient, VsacEndpoints};
pub use error::{Error, Result};
pub use models::{
    CodeInfoError, CodeInfoErrors, CodeInfoResponse, CodeSystemMapping, SvsConcept, SvsValueSet,
    ValueSetQuery, VersionMapping,
};
