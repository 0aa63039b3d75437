//! Session: sign-in, registration and the credit ledger behind them.
//!
//! Flow Overview:
//! 1) `login`/`register` talk to the identity provider and, on success,
//!    force-set the identity and resolve its credits before returning.
//! 2) `watch_identity` follows the provider's own notifications (token
//!    refresh, sign-out elsewhere) and applies them the same way.
//! 3) Notifications for the identity already in place only refresh the
//!    identity value; they never re-run credit resolution.

pub mod admin;
pub mod errors;
pub mod identity;
pub mod state;

use std::sync::Arc;

use regex::Regex;
use secrecy::SecretString;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

pub use self::admin::{AdminPolicy, LoginState, DEFAULT_ADMIN_DISPLAY_NAME, DEFAULT_ADMIN_LABEL};
pub use self::errors::{LoginError, RegisterError};
pub use self::identity::{AuthProviderError, Identity, IdentityProvider};
pub use self::state::{DebitRefused, Readiness, SessionState};

use crate::credits::{Clock, Credits, Feature, Ledger, LedgerConfig, SystemClock};
use crate::stats::{StatField, StatsStore};
use crate::store::{DocumentBackend, LocalStore};

#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

pub struct RegisterData {
    pub email: String,
    pub secret: SecretString,
    pub full_name: String,
}

impl std::fmt::Debug for RegisterData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterData")
            .field("email", &self.email)
            .field("secret", &"***")
            .field("full_name", &self.full_name)
            .finish()
    }
}

pub struct SessionBuilder {
    provider: Arc<dyn IdentityProvider>,
    remote: Arc<dyn DocumentBackend>,
    local: Arc<dyn LocalStore>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
    admin: AdminPolicy,
}

impl SessionBuilder {
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_admin(mut self, admin: AdminPolicy) -> Self {
        self.admin = admin;
        self
    }

    #[must_use]
    pub fn build(self) -> Session {
        let state = Arc::new(SessionState::new(self.admin));
        let stats = StatsStore::new(self.remote.clone(), self.config.remote_timeout());
        let ledger = Ledger::new(
            self.remote,
            self.local,
            self.clock,
            self.config,
            state.clone(),
        );

        Session {
            provider: self.provider,
            ledger,
            stats,
            state,
        }
    }
}

pub struct Session {
    provider: Arc<dyn IdentityProvider>,
    ledger: Ledger,
    stats: StatsStore,
    state: Arc<SessionState>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl Session {
    #[must_use]
    pub fn builder(
        provider: Arc<dyn IdentityProvider>,
        remote: Arc<dyn DocumentBackend>,
        local: Arc<dyn LocalStore>,
    ) -> SessionBuilder {
        SessionBuilder {
            provider,
            remote,
            local,
            clock: Arc::new(SystemClock),
            config: LedgerConfig::default(),
            admin: AdminPolicy::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    #[must_use]
    pub fn stats(&self) -> &StatsStore {
        &self.stats
    }

    #[must_use]
    pub fn credits(&self) -> Credits {
        self.state.credits()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    /// Route guard: `false` also raises the login prompt.
    pub fn require_authenticated(&self) -> bool {
        if self.state.is_authenticated() {
            return true;
        }
        self.state.set_login_prompt(true);
        false
    }

    /// Signs in and resolves today's credits.
    ///
    /// # Errors
    /// Returns the localized [`LoginError`] for the outcome; the session is
    /// left untouched on failure.
    #[instrument(skip(self, secret))]
    pub async fn login(&self, email: &str, secret: &SecretString) -> Result<Identity, LoginError> {
        let verified = self.provider.verify_credential(email, secret).await;
        let mut state =
            LoginState::Attempt.after_verify(verified, self.state.admin(), email, secret);

        if state == LoginState::FailedMissingOrAmbiguous {
            warn!("administrator login failed, recreating the account");
            state = state.begin_restore();
            let created = match self.provider.create_credential(email, secret).await {
                Ok(identity) => Ok(self.name_restored_admin(identity).await),
                Err(err) => Err(err),
            };
            state = state.after_restore(created);
        }

        match &state {
            LoginState::RestoreConflict => warn!("administrator exists with another secret"),
            LoginState::RestoreFailed(err) => warn!("administrator restore failed: {}", err),
            LoginState::FailedOrdinary(err) => debug!("login failed: {}", err),
            _ => {}
        }

        let identity = state.into_result()?;
        self.apply_identity(Some(identity.clone())).await;
        info!("signed in as {}", identity.uid);

        Ok(identity)
    }

    async fn name_restored_admin(&self, identity: Identity) -> Identity {
        let name = self.state.admin().display_name().to_string();
        if let Err(err) = self.provider.update_display_name(&identity, &name).await {
            warn!("failed to set administrator display name: {}", err);
        }
        identity.with_display_name(name)
    }

    /// Creates an account, names it and seeds its credit record.
    ///
    /// # Errors
    /// Returns the localized [`RegisterError`] for an invalid email or a
    /// provider failure.
    #[instrument(skip(self, data), fields(email = %data.email))]
    pub async fn register(&self, data: RegisterData) -> Result<Identity, RegisterError> {
        if !valid_email(&data.email) {
            return Err(RegisterError::InvalidEmail);
        }

        let identity = self
            .provider
            .create_credential(&data.email, &data.secret)
            .await
            .map_err(|err| {
                debug!("registration failed: {}", err);
                RegisterError::from(&err)
            })?;

        if let Err(err) = self
            .provider
            .update_display_name(&identity, &data.full_name)
            .await
        {
            warn!("failed to set display name for {}: {}", identity.uid, err);
            return Err(RegisterError::Failed);
        }

        let identity = identity.with_display_name(data.full_name);
        self.apply_identity(Some(identity.clone())).await;
        self.stats.increment(StatField::StudentsRegistered).await;
        info!("registered {}", identity.uid);

        Ok(identity)
    }

    /// Signs out. Provider failures are logged; local state is always
    /// cleared.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Err(err) = self.provider.sign_out().await {
            warn!("sign out failed: {}", err);
        }
        self.ledger.reset_signals();
    }

    pub async fn consume_credit(&self, feature: Feature) -> bool {
        self.ledger.consume(feature).await
    }

    /// Applies the provider's identity notifications until the provider is
    /// dropped.
    pub fn watch_identity(self: &Arc<Self>) -> JoinHandle<()> {
        let session = Arc::clone(self);
        let mut changes = self.provider.subscribe();

        tokio::spawn(async move {
            loop {
                let identity = changes.borrow_and_update().clone();
                session.apply_identity(identity).await;
                if changes.changed().await.is_err() {
                    debug!("identity provider closed, stop watching");
                    break;
                }
            }
        })
    }

    async fn apply_identity(&self, identity: Option<Identity>) {
        match (&identity, self.state.identity()) {
            (Some(next), Some(current))
                if next.uid == current.uid && self.state.readiness() != Readiness::SignedOut =>
            {
                self.state.refresh_identity(next.clone());
                return;
            }
            (None, None) => return,
            _ => {}
        }
        self.ledger.resolve_for_identity(identity).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("hocsinh@limva.edu.vn"));
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("a b@limva.edu.vn"));
        assert!(!valid_email("a@limva"));
    }

    #[test]
    fn register_data_debug_hides_secret() {
        let data = RegisterData {
            email: "a@limva.edu.vn".to_string(),
            secret: SecretString::from("hunter22".to_string()),
            full_name: "An".to_string(),
        };
        let rendered = format!("{data:?}");
        assert!(!rendered.contains("hunter22"));
        assert!(rendered.contains("a@limva.edu.vn"));
    }
}
