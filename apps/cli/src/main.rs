//! termgate - UMLS/VSAC terminology gateway CLI
//!
//! Enrolls UMLS API keys, keeps per-identity sessions alive, retrieves value set
//! expansions and validates codes against VSAC. Results are printed as JSON on stdout.

mod config;
mod logging;
mod store;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use termgate_terminology::{
    BrokerConfig, CatalogProvider, Representation, StaticCatalog, SubmittedCode,
    TerminologyService, ValueSetDefaults, ValueSetRequest,
};
use termgate_vsac_client::{MappingDocumentClient, VsacClient, VsacEndpoints};

use crate::config::Config;
use crate::store::FileCredentialStore;

#[derive(Parser)]
#[command(name = "termgate", version, about = "UMLS/VSAC terminology gateway")]
struct Cli {
    /// Configuration file (defaults to ./termgate.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Identity whose UMLS credential is used
    #[arg(long, global = true, default_value = "default")]
    identity: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a UMLS API key for the identity and obtain its first session grant
    Enroll {
        /// API key; read from stdin when omitted
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Make sure the identity holds a working session grant
    Session,
    /// Retrieve a value set expansion
    ValueSet {
        /// Value set OID
        oid: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Raw)]
        format: OutputFormat,
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        include_draft: Option<bool>,
        #[arg(long)]
        release: Option<String>,
        #[arg(long = "version")]
        value_set_version: Option<String>,
    },
    /// Validate codes read from a JSON array file
    Validate {
        /// JSON file holding an array of codes
        #[arg(long)]
        codes: PathBuf,
        /// fhir (alias qi-core) or qdm
        #[arg(long, default_value = "fhir")]
        model: Representation,
    },
    /// List code system catalog entries
    Catalog,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// Expansion as returned by VSAC
    Raw,
    /// FHIR ValueSet.compose
    Fhir,
    /// QDM code system components
    Qdm,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionStatus<'a> {
    identity: &'a str,
    valid: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    let _logging_guard =
        logging::init_logging(&config.logging).context("Failed to initialize logging")?;

    let service = build_service(&config).await?;
    run(cli.command, &cli.identity, &service).await
}

async fn run(command: Command, identity: &str, service: &TerminologyService) -> anyhow::Result<()> {
    match command {
        Command::Enroll { api_key } => {
            let api_key = match api_key {
                Some(key) => key,
                None => read_api_key()?,
            };
            let credential = service
                .enroll(identity, &api_key)
                .await
                .with_context(|| format!("Enrollment failed for identity '{identity}'"))?;
            print_json(&SessionStatus {
                identity: &credential.identity,
                valid: credential.session_grant.is_some(),
            })
        }
        Command::Session => {
            let valid = service
                .ensure_valid_session(identity)
                .await
                .context("Failed to establish a UMLS session")?;
            print_json(&SessionStatus { identity, valid })?;
            if !valid {
                anyhow::bail!("Identity '{identity}' has no UMLS API key on file");
            }
            Ok(())
        }
        Command::ValueSet {
            oid,
            format,
            profile,
            include_draft,
            release,
            value_set_version,
        } => {
            let request = ValueSetRequest {
                oid,
                profile,
                include_draft,
                release,
                version: value_set_version,
            };
            let value_set = service
                .fetch_value_set(&request, identity)
                .await
                .with_context(|| format!("Failed to retrieve value set {}", request.oid))?;

            let representation = match format {
                OutputFormat::Raw => return print_json(&value_set),
                OutputFormat::Fhir => Representation::Fhir,
                OutputFormat::Qdm => Representation::Qdm,
            };
            let components = service
                .convert_to_compose_components(&value_set, representation)
                .await
                .context("Failed to group value set concepts")?;
            print_json(&components)
        }
        Command::Validate { codes, model } => {
            let submitted = read_codes(&codes).await?;
            let validated = service
                .validate(submitted, identity, model)
                .await
                .context("Code validation failed")?;
            print_json(&validated)
        }
        Command::Catalog => {
            let entries = service
                .catalog_entries()
                .await
                .context("Failed to load code system catalog")?;
            print_json(entries.as_ref())
        }
    }
}

async fn build_service(config: &Config) -> anyhow::Result<TerminologyService> {
    let endpoints = VsacEndpoints {
        ticket_base_url: config.vsac.ticket_base_url.clone(),
        service_url: config.vsac.service_url.clone(),
        base_url: config.vsac.base_url.clone(),
    };
    let transport = Arc::new(
        VsacClient::with_endpoints(endpoints, config.vsac.timeout())
            .context("Failed to build VSAC client")?,
    );
    let store = Arc::new(FileCredentialStore::new(&config.store.path));
    let catalog = build_catalog(config).await?;

    let broker_config = BrokerConfig {
        grant_lifetime: chrono::Duration::minutes(config.session.grant_lifetime_minutes),
        max_ticket_attempts: config.session.max_ticket_attempts,
    };
    let defaults = ValueSetDefaults {
        profile: config.vsac.default_profile.clone(),
        include_draft: Some(config.vsac.include_draft),
    };

    tracing::debug!(
        store = %store.path().display(),
        vsac = %config.vsac.base_url,
        "Terminology service configured"
    );

    Ok(TerminologyService::with_config(
        transport,
        store,
        catalog,
        broker_config,
        defaults,
    ))
}

async fn build_catalog(config: &Config) -> anyhow::Result<Arc<dyn CatalogProvider>> {
    if let Some(path) = &config.catalog.path {
        let catalog = StaticCatalog::from_json_file(path)
            .await
            .with_context(|| format!("Failed to load catalog from {}", path.display()))?;
        return Ok(Arc::new(catalog));
    }

    let url = config
        .catalog
        .url
        .as_deref()
        .context("catalog.url or catalog.path must be configured")?;
    let client = MappingDocumentClient::new(url, config.vsac.timeout())
        .context("Failed to build mapping document client")?;
    Ok(Arc::new(client))
}

fn read_api_key() -> anyhow::Result<String> {
    eprintln!("UMLS API key:");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read API key from stdin")?;
    Ok(line.trim().to_string())
}

async fn read_codes(path: &Path) -> anyhow::Result<Vec<SubmittedCode>> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid code list in {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
