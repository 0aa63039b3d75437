//! Identities and the authentication provider contract.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Authenticated principal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
            display_name: None,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Authentication provider error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthProviderError {
    #[error("account not found")]
    AccountNotFound,

    #[error("wrong password")]
    WrongPassword,

    /// Provider-side ambiguity: either the account is missing or the secret
    /// is wrong, the provider will not say which.
    #[error("invalid credential")]
    InvalidCredential,

    #[error("email already in use")]
    EmailInUse,

    #[error("secret too weak")]
    WeakSecret,

    #[error("provider error: {0}")]
    Other(String),
}

impl AuthProviderError {
    #[inline]
    pub fn other<E: std::fmt::Display>(err: E) -> Self {
        Self::Other(err.to_string())
    }
}

/// Sign-in / sign-up provider.
///
/// Identity changes are published through a `watch` channel; dropping the
/// receiver returned by [`IdentityProvider::subscribe`] unsubscribes.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_credential(
        &self,
        email: &str,
        secret: &SecretString,
    ) -> Result<Identity, AuthProviderError>;

    async fn create_credential(
        &self,
        email: &str,
        secret: &SecretString,
    ) -> Result<Identity, AuthProviderError>;

    async fn sign_out(&self) -> Result<(), AuthProviderError>;

    async fn update_display_name(
        &self,
        identity: &Identity,
        name: &str,
    ) -> Result<(), AuthProviderError>;

    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;

    fn current(&self) -> Option<Identity>;
}

#[async_trait]
impl<P: IdentityProvider + ?Sized> IdentityProvider for Arc<P> {
    #[inline]
    async fn verify_credential(
        &self,
        email: &str,
        secret: &SecretString,
    ) -> Result<Identity, AuthProviderError> {
        (**self).verify_credential(email, secret).await
    }

    #[inline]
    async fn create_credential(
        &self,
        email: &str,
        secret: &SecretString,
    ) -> Result<Identity, AuthProviderError> {
        (**self).create_credential(email, secret).await
    }

    #[inline]
    async fn sign_out(&self) -> Result<(), AuthProviderError> {
        (**self).sign_out().await
    }

    #[inline]
    async fn update_display_name(
        &self,
        identity: &Identity,
        name: &str,
    ) -> Result<(), AuthProviderError> {
        (**self).update_display_name(identity, name).await
    }

    #[inline]
    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        (**self).subscribe()
    }

    #[inline]
    fn current(&self) -> Option<Identity> {
        (**self).current()
    }
}
