//! Credit ledger: resolves the day's quota for an identity and debits it.
//!
//! Flow Overview:
//! 1) Resolution reads the remote record: current → adopted, stale → reset
//!    to the allotment, missing → created. Any remote failure switches to the
//!    local fallback, which runs the same procedure on the local blob.
//! 2) Consumption waits for resolution, then decrements the in-memory quota
//!    first and persists the new value remote-first, local on failure.
//!
//! Remote failures never reach the caller. The in-memory decrement is never
//! rolled back, even when neither store accepted it.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use super::clock::Clock;
use super::config::LedgerConfig;
use super::fallback::LocalFallback;
use super::record::{CreditRecord, Credits, Feature};
use crate::session::{DebitRefused, Identity, Readiness, SessionState};
use crate::store::{BackendError, DocumentBackend, Fields, LocalStore};

/// Where a debit ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebitOutcome {
    Remote,
    Local,
    Unpersisted,
}

pub struct Ledger {
    remote: Arc<dyn DocumentBackend>,
    fallback: LocalFallback,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
    state: Arc<SessionState>,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Ledger {
    #[must_use]
    pub fn new(
        remote: Arc<dyn DocumentBackend>,
        local: Arc<dyn LocalStore>,
        clock: Arc<dyn Clock>,
        config: LedgerConfig,
        state: Arc<SessionState>,
    ) -> Self {
        Self {
            remote,
            fallback: LocalFallback::new(local),
            clock,
            config,
            state,
        }
    }

    #[must_use]
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    async fn remote_call<T, F>(&self, call: F) -> Result<T, BackendError>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        let timeout = self.config.remote_timeout();
        tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| BackendError::Timeout(timeout))?
    }

    /// Switches the session to `identity` and loads its credits for today.
    ///
    /// The administrator gets the unlimited sentinel without touching any
    /// store; signing out (`None`) zeroes the credits. Never fails.
    #[instrument(skip(self, identity), fields(uid = identity.as_ref().map(|i| i.uid.as_str())))]
    pub async fn resolve_for_identity(&self, identity: Option<Identity>) -> Credits {
        let Some(identity) = identity else {
            self.reset_signals();
            return Credits::zero();
        };

        let is_admin = self.state.admin().is_admin(&identity);
        let uid = identity.uid.clone();
        let epoch = self.state.begin(Some(identity));

        let credits = if is_admin {
            Credits::uniform(self.config.unlimited_credits())
        } else {
            self.load(&uid).await
        };

        if !self.state.publish(epoch, credits) {
            debug!("identity changed while resolving credits for {}", uid);
        }

        credits
    }

    /// Clears the identity and zeroes the credits signal.
    pub fn reset_signals(&self) {
        self.state.begin(None);
    }

    async fn load(&self, uid: &str) -> Credits {
        let now = self.clock.now();
        let defaults = CreditRecord::fresh(self.config.daily_allotment(), now);

        match self.load_remote(uid, &defaults).await {
            Ok(credits) => credits,
            Err(err) => {
                warn!(
                    error.kind = err.kind(),
                    "remote credits unavailable for {}, using local store: {}", uid, err
                );
                self.fallback
                    .load_or_init(&self.config.local_key(uid), &now, &defaults)
            }
        }
    }

    async fn load_remote(
        &self,
        uid: &str,
        defaults: &CreditRecord,
    ) -> Result<Credits, BackendError> {
        let collection = self.config.credits_collection();
        let now = self.clock.now();

        let Some(document) = self.remote_call(self.remote.get(collection, uid)).await? else {
            debug!("no credit record for {}, creating one", uid);
            self.remote_call(self.remote.set(collection, uid, defaults.to_fields(), false))
                .await?;
            return Ok(defaults.credits());
        };

        match CreditRecord::from_fields(&document.fields) {
            Ok(record) if record.is_current(&now) => Ok(record.credits()),
            Ok(_) => {
                debug!("credit record for {} is from an earlier day, resetting", uid);
                self.remote_call(self.remote.update(collection, uid, defaults.to_fields()))
                    .await?;
                Ok(defaults.credits())
            }
            Err(err) => {
                warn!("unreadable credit record for {}, resetting: {}", uid, err);
                self.remote_call(self.remote.update(collection, uid, defaults.to_fields()))
                    .await?;
                Ok(defaults.credits())
            }
        }
    }

    /// Spends one credit of `feature` for the current identity.
    ///
    /// Returns `false` when nobody is signed in, when the quota is exhausted,
    /// when resolution does not finish within the configured wait, or when
    /// the identity changes before the debit lands. The
    /// administrator always succeeds and nothing is debited.
    #[instrument(skip(self))]
    pub async fn consume(&self, feature: Feature) -> bool {
        if self.state.is_admin() {
            return true;
        }

        let (epoch, Some(identity)) = self.state.current() else {
            return false;
        };

        match self.state.settled(self.config.resolution_wait()).await {
            Some(Readiness::Ready) => {}
            Some(Readiness::SignedOut) => return false,
            Some(Readiness::Resolving) | None => {
                warn!("credits for {} not resolved in time, denying {}", identity.uid, feature);
                return false;
            }
        }

        let (new_value, snapshot) = match self.state.try_debit(feature, epoch) {
            Ok(debited) => debited,
            Err(DebitRefused::Exhausted) => {
                debug!("{} credits exhausted for {}", feature, identity.uid);
                return false;
            }
            Err(DebitRefused::IdentityChanged) => {
                warn!("identity changed before {} could be debited for {}", feature, identity.uid);
                return false;
            }
        };

        let outcome = self
            .persist_debit(&identity.uid, feature, new_value, snapshot)
            .await;
        debug!(?outcome, "{} debited to {} for {}", feature, new_value, identity.uid);

        true
    }

    async fn persist_debit(
        &self,
        uid: &str,
        feature: Feature,
        new_value: i64,
        snapshot: Credits,
    ) -> DebitOutcome {
        let mut fields = Fields::new();
        fields.insert(feature.field().to_string(), Value::from(new_value));

        let collection = self.config.credits_collection();
        let Err(err) = self
            .remote_call(self.remote.update(collection, uid, fields))
            .await
        else {
            return DebitOutcome::Remote;
        };

        warn!(
            error.kind = err.kind(),
            "remote debit failed for {}, writing locally: {}", uid, err
        );

        let now = self.clock.now();
        match self.fallback.record_debit(
            &self.config.local_key(uid),
            feature,
            new_value,
            snapshot,
            &now,
        ) {
            Ok(()) => DebitOutcome::Local,
            Err(err) => {
                error!("failed to persist debit for {} locally: {}", uid, err);
                DebitOutcome::Unpersisted
            }
        }
    }
}
