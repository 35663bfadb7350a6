//! UMLS ticket service and VSAC REST client

use crate::error::{Error, Result};
use crate::models::{CodeInfoResponse, SvsValueSet, ValueSetQuery};
use crate::svs;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use std::time::Duration;

const UTS_BASE_URL: &str = "https://utslogin.nlm.nih.gov";
const UMLS_SERVICE_URL: &str = "http://umlsks.nlm.nih.gov";
const VSAC_BASE_URL: &str = "https://vsac.nlm.nih.gov/vsac";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Base URLs the client talks to.
#[derive(Debug, Clone, PartialEq)]
pub struct VsacEndpoints {
    /// UTS login host issuing ticket-granting and service tickets.
    pub ticket_base_url: String,
    /// Service name the service tickets are issued for.
    pub service_url: String,
    /// VSAC root, e.g. `https://vsac.nlm.nih.gov/vsac`.
    pub base_url: String,
}

impl Default for VsacEndpoints {
    fn default() -> Self {
        Self {
            ticket_base_url: UTS_BASE_URL.to_string(),
            service_url: UMLS_SERVICE_URL.to_string(),
            base_url: VSAC_BASE_URL.to_string(),
        }
    }
}

/// Client for the UMLS CAS ticket endpoints and VSAC.
pub struct VsacClient {
    client: Client,
    endpoints: VsacEndpoints,
}

impl VsacClient {
    /// Create a new client against the public NLM endpoints.
    pub fn new() -> Result<Self> {
        Self::with_endpoints(VsacEndpoints::default(), Duration::from_secs(30))
    }

    /// Create a client with custom endpoints and request timeout.
    pub fn with_endpoints(endpoints: VsacEndpoints, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoints: VsacEndpoints {
                ticket_base_url: endpoints.ticket_base_url.trim_end_matches('/').to_string(),
                service_url: endpoints.service_url,
                base_url: endpoints.base_url.trim_end_matches('/').to_string(),
            },
        })
    }

    pub fn endpoints(&self) -> &VsacEndpoints {
        &self.endpoints
    }

    /// Exchange an API key for a ticket-granting ticket (TGT).
    pub async fn request_grant(&self, api_key: &str) -> Result<String> {
        let url = format!("{}/cas/v1/api-key", self.endpoints.ticket_base_url);
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, FORM_URLENCODED)
            .body(format!("apikey={}", urlencoding::encode(api_key)))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        extract_grant(&body).ok_or_else(|| {
            Error::InvalidResponse("ticket-granting ticket missing from UTS response".to_string())
        })
    }

    /// Exchange a TGT for a single-use service ticket.
    ///
    /// Returns `Ok(None)` when UTS rejects the TGT (expired or unknown).
    pub async fn request_service_ticket(&self, grant: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/cas/v1/tickets/{}",
            self.endpoints.ticket_base_url,
            urlencoding::encode(grant)
        );
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, FORM_URLENCODED)
            .body(format!(
                "service={}",
                urlencoding::encode(&self.endpoints.service_url)
            ))
            .send()
            .await?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND
        ) {
            tracing::debug!(status = status.as_u16(), "UTS rejected ticket-granting ticket");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: format!("{}/cas/v1/tickets", self.endpoints.ticket_base_url),
            });
        }

        let ticket = response.text().await?.trim().to_string();
        Ok(Some(ticket).filter(|t| !t.is_empty()))
    }

    /// Retrieve one value set expansion from `svs/RetrieveMultipleValueSets`.
    pub async fn retrieve_value_set(
        &self,
        query: &ValueSetQuery,
        ticket: &str,
    ) -> Result<SvsValueSet> {
        let url = value_set_url(&self.endpoints.base_url, query, ticket);
        let response = self.client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::ValueSetNotFound(query.oid.clone()));
        }
        if !response.status().is_success() {
            return Err(Error::Status {
                status: response.status().as_u16(),
                url: format!("{}/svs/RetrieveMultipleValueSets", self.endpoints.base_url),
            });
        }

        let body = response.text().await?;
        svs::parse_value_sets(&body)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::ValueSetNotFound(query.oid.clone()))
    }

    /// Look up a code through a VSAC `CodeSystem/.../Info` path.
    ///
    /// VSAC reports unknown systems, versions and codes as a JSON body with
    /// `status: "error"`, often alongside a 4xx status. Such bodies are returned
    /// as `Ok`; only undecodable failures become errors.
    pub async fn code_info(&self, path: &str, ticket: &str) -> Result<CodeInfoResponse> {
        let url = format!(
            "{}{}?ticket={}",
            self.endpoints.base_url,
            path,
            urlencoding::encode(ticket)
        );
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        match serde_json::from_str::<CodeInfoResponse>(&body) {
            Ok(info) => Ok(info),
            Err(_) if !status.is_success() => Err(Error::Status {
                status: status.as_u16(),
                url: format!("{}{}", self.endpoints.base_url, path),
            }),
            Err(e) => Err(Error::Json(e)),
        }
    }
}

/// Pull the TGT out of the UTS `201 Created` body.
///
/// UTS answers with a small HTML form whose `action` URL ends in the TGT.
fn extract_grant(body: &str) -> Option<String> {
    let from_action = body.split("action=\"").nth(1).and_then(|rest| {
        let action = rest.split('"').next()?;
        action.rsplit('/').next().map(str::to_string)
    });

    from_action
        .filter(|tgt| tgt.starts_with("TGT-"))
        .or_else(|| {
            body.split(|c: char| c.is_whitespace() || c == '"' || c == '/')
                .find(|token| token.starts_with("TGT-"))
                .map(str::to_string)
        })
}

fn value_set_url(base_url: &str, query: &ValueSetQuery, ticket: &str) -> String {
    let mut params = vec![
        format!("id={}", urlencoding::encode(&query.oid)),
        format!("ticket={}", urlencoding::encode(ticket)),
    ];

    if let Some(profile) = &query.profile {
        params.push(format!("profile={}", urlencoding::encode(profile)));
    }
    if let Some(include_draft) = query.include_draft {
        params.push(format!(
            "includeDraft={}",
            if include_draft { "yes" } else { "no" }
        ));
    }
    if let Some(release) = &query.release {
        params.push(format!("release={}", urlencoding::encode(release)));
    }
    if let Some(version) = &query.version {
        params.push(format!("version={}", urlencoding::encode(version)));
    }

    format!(
        "{}/svs/RetrieveMultipleValueSets?{}",
        base_url,
        params.join("&")
    )
}
