//! UMLS session lifecycle: API key → grant (TGT) → single-use ticket (ST)
//!
//! Ticket acquisition is bounded: at most `max_ticket_attempts` ticket requests
//! per call, every attempt after the first preceded by exactly one grant
//! renewal, and each renewal persisted before the next attempt is made.

use crate::models::{Credential, SessionGrant, TicketOutcome};
use crate::store::CredentialStore;
use crate::transport::AuthorityTransport;
use crate::{Error, Result};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Upper bound on ticket attempts for one logical operation.
pub const MAX_TICKET_ATTEMPTS: u32 = 3;

/// UMLS ticket-granting tickets live for eight hours.
pub const DEFAULT_GRANT_LIFETIME_MINUTES: i64 = 480;

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub grant_lifetime: Duration,
    /// Clamped to `1..=MAX_TICKET_ATTEMPTS`.
    pub max_ticket_attempts: u32,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            grant_lifetime: Duration::minutes(DEFAULT_GRANT_LIFETIME_MINUTES),
            max_ticket_attempts: MAX_TICKET_ATTEMPTS,
        }
    }
}

/// Owns grant renewal and ticket issuance for enrolled identities.
pub struct TicketBroker {
    transport: Arc<dyn AuthorityTransport>,
    store: Arc<dyn CredentialStore>,
    config: BrokerConfig,
    /// One entry per identity with session work in flight.
    identity_locks: IdentityLocks,
}

type IdentityLocks = StdMutex<HashMap<String, Arc<Mutex<()>>>>;

impl TicketBroker {
    pub fn new(transport: Arc<dyn AuthorityTransport>, store: Arc<dyn CredentialStore>) -> Self {
        Self::with_config(transport, store, BrokerConfig::default())
    }

    pub fn with_config(
        transport: Arc<dyn AuthorityTransport>,
        store: Arc<dyn CredentialStore>,
        mut config: BrokerConfig,
    ) -> Self {
        config.max_ticket_attempts = config.max_ticket_attempts.clamp(1, MAX_TICKET_ATTEMPTS);
        Self {
            transport,
            store,
            config,
            identity_locks: StdMutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Register an API key for an identity and obtain its first grant.
    ///
    /// Nothing is persisted unless the authority accepts the key.
    pub async fn enroll(&self, identity: &str, api_key: &str) -> Result<Credential> {
        let identity = identity.trim();
        let api_key = api_key.trim();
        if identity.is_empty() {
            return Err(Error::InvalidRequest("identity is required".to_string()));
        }
        if api_key.is_empty() {
            return Err(Error::InvalidRequest("API key is required".to_string()));
        }

        let _guard = self.lock_identity(identity).await;

        let grant = self.transport.request_grant(api_key).await?;
        let now = Utc::now();
        let created_at = self
            .store
            .find(identity)
            .await?
            .map(|existing| existing.created_at)
            .unwrap_or(now);

        let credential = Credential {
            identity: identity.to_string(),
            api_key: api_key.to_string(),
            session_grant: Some(SessionGrant {
                value: grant,
                expires_at: now + self.config.grant_lifetime,
            }),
            created_at,
            modified_at: now,
        };
        let saved = self.store.save(credential).await?;

        tracing::info!(identity = %identity, "Enrolled UMLS credential");
        Ok(saved)
    }

    /// Exchange the credential's current grant for a service ticket.
    ///
    /// Returns `Ok(None)` when there is no grant or the authority rejects it.
    pub async fn get_service_ticket(&self, credential: &Credential) -> Result<Option<String>> {
        let Some(grant) = &credential.session_grant else {
            return Ok(None);
        };

        match self.transport.request_ticket(&grant.value).await? {
            TicketOutcome::Issued(ticket) if !ticket.trim().is_empty() => Ok(Some(ticket)),
            TicketOutcome::Issued(_) | TicketOutcome::Rejected => Ok(None),
        }
    }

    /// Make sure the identity holds a working session.
    ///
    /// # Returns
    /// * `Ok(false)` - No API key on file for the identity
    /// * `Ok(true)` - A grant was obtained, or a ticket was issued for the current one
    ///
    /// # Errors
    /// * `Unauthorized` - The authority kept rejecting the grant after renewal
    pub async fn ensure_valid_session(&self, identity: &str) -> Result<bool> {
        let identity = identity.trim();
        let _guard = self.lock_identity(identity).await;

        let Some(credential) = self.enrolled_credential(identity).await? else {
            tracing::debug!(identity = %identity, "No UMLS API key on file");
            return Ok(false);
        };

        if has_live_grant(&credential) {
            self.ticket_with_renewal(credential).await?;
        } else {
            // Missing or known-expired grant: a ticket request could only fail.
            self.renew_grant(credential).await?;
        }

        tracing::debug!(identity = %identity, "UMLS session valid");
        Ok(true)
    }

    /// Obtain a fresh single-use ticket for an authority call.
    pub async fn acquire_ticket(&self, identity: &str) -> Result<String> {
        let identity = identity.trim();
        let _guard = self.lock_identity(identity).await;

        let credential = self
            .enrolled_credential(identity)
            .await?
            .ok_or_else(|| Error::NotEnrolled(identity.to_string()))?;

        self.ticket_with_renewal(credential).await
    }

    async fn enrolled_credential(&self, identity: &str) -> Result<Option<Credential>> {
        Ok(self
            .store
            .find(identity)
            .await?
            .filter(Credential::has_api_key))
    }

    async fn ticket_with_renewal(&self, mut credential: Credential) -> Result<String> {
        if !has_live_grant(&credential) {
            credential = self.renew_grant(credential).await?;
        }

        let max_attempts = self.config.max_ticket_attempts;
        for attempt in 1..=max_attempts {
            if attempt > 1 {
                credential = self.renew_grant(credential).await?;
            }

            tracing::debug!(identity = %credential.identity, attempt, "Requesting service ticket");
            if let Some(ticket) = self.get_service_ticket(&credential).await? {
                return Ok(ticket);
            }

            tracing::warn!(
                identity = %credential.identity,
                attempt,
                max_attempts,
                "UMLS rejected session grant"
            );
        }

        tracing::warn!(
            identity = %credential.identity,
            max_attempts,
            "Giving up on service ticket after renewing session grant"
        );
        Err(Error::Unauthorized(format!(
            "unable to obtain a service ticket for '{}' after {} attempts",
            credential.identity, max_attempts
        )))
    }

    async fn renew_grant(&self, mut credential: Credential) -> Result<Credential> {
        tracing::debug!(identity = %credential.identity, "Renewing UMLS session grant");
        let grant = self.transport.request_grant(&credential.api_key).await?;

        let now = Utc::now();
        credential.session_grant = Some(SessionGrant {
            value: grant,
            expires_at: now + self.config.grant_lifetime,
        });
        credential.modified_at = now;
        self.store.save(credential).await
    }

    /// Serialize session work for `identity` until the returned guard drops.
    async fn lock_identity(&self, identity: &str) -> IdentityGuard<'_> {
        let lock = {
            let mut locks = self
                .identity_locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(identity.to_string()).or_default())
        };

        IdentityGuard {
            locks: &self.identity_locks,
            identity: identity.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }
}

/// Holds an identity's lock and drops its map entry once nobody else wants it.
struct IdentityGuard<'a> {
    locks: &'a IdentityLocks,
    identity: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for IdentityGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();

        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // The map's own reference is the only one left: no holder, no waiter.
        if locks
            .get(&self.identity)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.identity);
        }
    }
}

fn has_live_grant(credential: &Credential) -> bool {
    credential
        .session_grant
        .as_ref()
        .is_some_and(|grant| !grant.is_expired_at(Utc::now()))
}
