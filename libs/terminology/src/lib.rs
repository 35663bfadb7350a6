//! Terminology gateway core
//!
//! Session lifecycle and terminology reconciliation on top of UMLS/VSAC:
//! - [`broker`]: API key → session grant → single-use ticket, with bounded renewal
//! - [`resolver`]: VSAC/FHIR version and identifier mapping via the code system catalog
//! - [`compose`]: grouping of expansion concepts into code system/version components
//! - [`validator`]: validation of caller-authored codes with per-code error annotation
//!
//! HTTP transport, credential persistence and the catalog document are reached
//! through the [`AuthorityTransport`], [`CredentialStore`] and [`CatalogProvider`]
//! traits. The `vsac-transport` feature implements the first and last for the
//! `termgate-vsac-client` types.

pub mod broker;
pub mod catalog;
pub mod compose;
pub mod error;
pub mod models;
pub mod resolver;
pub mod service;
pub mod store;
pub mod transport;
pub mod validator;

pub use broker::{BrokerConfig, TicketBroker, MAX_TICKET_ATTEMPTS};
pub use catalog::{CatalogProvider, StaticCatalog, NOT_IN_VSAC_OID};
pub use compose::{ComposeComponents, ConceptBucket, QdmComponent, ValueSetCompose};
pub use error::{Error, Result};
pub use models::{
    AuthorityValueSet, CodeLookupResult, CodeSystemEntry, Concept, Credential, Representation,
    SessionGrant, SubmittedCode, SubmittedCodeSystem, TicketOutcome, ValueSetRequest, VersionPair,
};
pub use service::{TerminologyService, ValueSetDefaults};
pub use store::{CredentialStore, InMemoryCredentialStore};
pub use transport::AuthorityTransport;
pub use validator::CodeValidator;
