//! In-process identity provider for tests and offline use.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use crate::session::{AuthProviderError, Identity, IdentityProvider};

const MIN_SECRET_LEN: usize = 6;

struct Account {
    identity: Identity,
    secret: SecretString,
}

pub struct MemoryIdentityProvider {
    accounts: RwLock<HashMap<String, Account>>,
    current: watch::Sender<Option<Identity>>,
    ambiguous_errors: bool,
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryIdentityProvider")
            .field("accounts", &self.accounts.read().len())
            .field("current", &*self.current.borrow())
            .field("ambiguous_errors", &self.ambiguous_errors)
            .finish()
    }
}

impl MemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            current: watch::channel(None).0,
            ambiguous_errors: false,
        }
    }

    /// Report `InvalidCredential` for both a missing account and a wrong
    /// secret, like providers with email enumeration protection.
    #[must_use]
    pub fn with_ambiguous_errors(mut self, ambiguous: bool) -> Self {
        self.ambiguous_errors = ambiguous;
        self
    }

    /// Adds an account without signing it in.
    pub fn insert_account(&self, email: &str, secret: SecretString) -> Identity {
        let identity = Identity::new(Uuid::new_v4().to_string(), email);
        self.accounts.write().insert(
            email.to_string(),
            Account {
                identity: identity.clone(),
                secret,
            },
        );
        identity
    }

    /// Drops an account, e.g. to simulate a deleted credential record.
    pub fn remove_account(&self, email: &str) -> bool {
        self.accounts.write().remove(email).is_some()
    }

    #[must_use]
    pub fn account(&self, email: &str) -> Option<Identity> {
        self.accounts
            .read()
            .get(email)
            .map(|account| account.identity.clone())
    }

    fn missing_or_wrong(&self, missing: bool) -> AuthProviderError {
        if self.ambiguous_errors {
            AuthProviderError::InvalidCredential
        } else if missing {
            AuthProviderError::AccountNotFound
        } else {
            AuthProviderError::WrongPassword
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn verify_credential(
        &self,
        email: &str,
        secret: &SecretString,
    ) -> Result<Identity, AuthProviderError> {
        let identity = {
            let accounts = self.accounts.read();
            let account = accounts.get(email).ok_or_else(|| self.missing_or_wrong(true))?;
            if account.secret.expose_secret() != secret.expose_secret() {
                return Err(self.missing_or_wrong(false));
            }
            account.identity.clone()
        };

        debug!("verified {}", identity.uid);
        self.current.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn create_credential(
        &self,
        email: &str,
        secret: &SecretString,
    ) -> Result<Identity, AuthProviderError> {
        if secret.expose_secret().chars().count() < MIN_SECRET_LEN {
            return Err(AuthProviderError::WeakSecret);
        }

        let identity = {
            let mut accounts = self.accounts.write();
            if accounts.contains_key(email) {
                return Err(AuthProviderError::EmailInUse);
            }
            let identity = Identity::new(Uuid::new_v4().to_string(), email);
            accounts.insert(
                email.to_string(),
                Account {
                    identity: identity.clone(),
                    secret: secret.clone(),
                },
            );
            identity
        };

        debug!("created {}", identity.uid);
        self.current.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthProviderError> {
        self.current.send_replace(None);
        Ok(())
    }

    async fn update_display_name(
        &self,
        identity: &Identity,
        name: &str,
    ) -> Result<(), AuthProviderError> {
        let updated = {
            let mut accounts = self.accounts.write();
            let account = accounts
                .values_mut()
                .find(|account| account.identity.uid == identity.uid)
                .ok_or(AuthProviderError::AccountNotFound)?;
            account.identity.display_name = Some(name.to_string());
            account.identity.clone()
        };

        self.current.send_if_modified(|current| match current {
            Some(signed_in) if signed_in.uid == updated.uid => {
                *signed_in = updated;
                true
            }
            _ => false,
        });
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }

    fn current(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }
}
