//! Administrator bypass and self-restore.
//!
//! Flow Overview:
//! 1) The administrator label is never metered (unlimited credits, no
//!    backend access).
//! 2) A failed administrator login whose error is "account not found" or the
//!    provider's ambiguous "invalid credential", and whose label and secret
//!    match the configured ones exactly, recreates the account.
//! 3) If recreation reports the email as taken, the account exists with
//!    another secret; that outcome gets its own message.
//!
//! No other label/secret pair ever reaches step 2.

use secrecy::{ExposeSecret, SecretString};

use super::errors::LoginError;
use super::identity::{AuthProviderError, Identity};

pub const DEFAULT_ADMIN_LABEL: &str = "admin@limva.edu.vn";
pub const DEFAULT_ADMIN_DISPLAY_NAME: &str = "Administrator";

#[derive(Clone)]
pub struct AdminPolicy {
    label: String,
    secret: Option<SecretString>,
    display_name: String,
}

impl Default for AdminPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ADMIN_LABEL.to_string())
    }
}

impl std::fmt::Debug for AdminPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminPolicy")
            .field("label", &self.label)
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .field("display_name", &self.display_name)
            .finish()
    }
}

impl AdminPolicy {
    /// Policy for `label` with self-restore disabled until a secret is set.
    #[must_use]
    pub fn new(label: String) -> Self {
        Self {
            label,
            secret: None,
            display_name: DEFAULT_ADMIN_DISPLAY_NAME.to_string(),
        }
    }

    #[must_use]
    pub fn with_secret(mut self, secret: SecretString) -> Self {
        self.secret = Some(secret);
        self
    }

    #[must_use]
    pub fn with_display_name(mut self, name: String) -> Self {
        self.display_name = name;
        self
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn restore_enabled(&self) -> bool {
        self.secret.is_some()
    }

    #[must_use]
    pub fn is_admin(&self, identity: &Identity) -> bool {
        identity.email == self.label
    }

    /// Exact match on both label and secret.
    #[must_use]
    pub fn matches(&self, email: &str, secret: &SecretString) -> bool {
        match &self.secret {
            Some(expected) => {
                email == self.label && expected.expose_secret() == secret.expose_secret()
            }
            None => false,
        }
    }
}

/// States of one login attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginState {
    Attempt,
    Done(Identity),
    FailedOrdinary(AuthProviderError),
    FailedMissingOrAmbiguous,
    RestoreAttempted,
    RestoreSucceeded(Identity),
    RestoreConflict,
    RestoreFailed(AuthProviderError),
}

impl LoginState {
    /// Transition out of `Attempt` once verification has answered.
    #[must_use]
    pub fn after_verify(
        self,
        result: Result<Identity, AuthProviderError>,
        policy: &AdminPolicy,
        email: &str,
        secret: &SecretString,
    ) -> Self {
        if self != Self::Attempt {
            return self;
        }
        match result {
            Ok(identity) => Self::Done(identity),
            Err(AuthProviderError::AccountNotFound | AuthProviderError::InvalidCredential)
                if policy.matches(email, secret) =>
            {
                Self::FailedMissingOrAmbiguous
            }
            Err(err) => Self::FailedOrdinary(err),
        }
    }

    #[must_use]
    pub fn begin_restore(self) -> Self {
        match self {
            Self::FailedMissingOrAmbiguous => Self::RestoreAttempted,
            other => other,
        }
    }

    /// Transition out of `RestoreAttempted` once creation has answered.
    #[must_use]
    pub fn after_restore(self, result: Result<Identity, AuthProviderError>) -> Self {
        match self {
            Self::RestoreAttempted => match result {
                Ok(identity) => Self::RestoreSucceeded(identity),
                Err(AuthProviderError::EmailInUse) => Self::RestoreConflict,
                Err(err) => Self::RestoreFailed(err),
            },
            other => other,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Done(_)
                | Self::FailedOrdinary(_)
                | Self::RestoreSucceeded(_)
                | Self::RestoreConflict
                | Self::RestoreFailed(_)
        )
    }

    /// Outcome reported to the caller.
    ///
    /// # Errors
    /// Returns the localized failure for every state but `Done` and
    /// `RestoreSucceeded`.
    pub fn into_result(self) -> Result<Identity, LoginError> {
        match self {
            Self::Done(identity) | Self::RestoreSucceeded(identity) => Ok(identity),
            Self::FailedOrdinary(err) => Err(LoginError::from(&err)),
            Self::RestoreConflict => Err(LoginError::AdminSecretMismatch),
            Self::RestoreFailed(_) => Err(LoginError::AdminRestoreFailed),
            Self::Attempt | Self::FailedMissingOrAmbiguous | Self::RestoreAttempted => {
                Err(LoginError::Failed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AdminPolicy {
        AdminPolicy::default().with_secret(SecretString::from("s3cret-admin".to_string()))
    }

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn default_policy_has_restore_disabled() {
        let policy = AdminPolicy::default();
        assert_eq!(policy.label(), "admin@limva.edu.vn");
        assert_eq!(policy.display_name(), "Administrator");
        assert!(!policy.restore_enabled());
        assert!(!policy.matches("admin@limva.edu.vn", &secret("")));
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", policy());
        assert!(!rendered.contains("s3cret-admin"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn is_admin_compares_label() {
        let policy = policy();
        assert!(policy.is_admin(&Identity::new("u", "admin@limva.edu.vn")));
        assert!(!policy.is_admin(&Identity::new("u", "student@limva.edu.vn")));
    }

    #[test]
    fn success_is_done() {
        let identity = Identity::new("u1", "student@limva.edu.vn");
        let state = LoginState::Attempt.after_verify(
            Ok(identity.clone()),
            &policy(),
            "student@limva.edu.vn",
            &secret("x"),
        );
        assert_eq!(state, LoginState::Done(identity.clone()));
        assert_eq!(state.into_result(), Ok(identity));
    }

    #[test]
    fn admin_missing_account_moves_to_restore() {
        for err in [
            AuthProviderError::AccountNotFound,
            AuthProviderError::InvalidCredential,
        ] {
            let state = LoginState::Attempt.after_verify(
                Err(err),
                &policy(),
                "admin@limva.edu.vn",
                &secret("s3cret-admin"),
            );
            assert_eq!(state, LoginState::FailedMissingOrAmbiguous);
            assert!(!state.is_terminal());
            assert_eq!(state.begin_restore(), LoginState::RestoreAttempted);
        }
    }

    #[test]
    fn admin_wrong_password_kind_is_ordinary() {
        let state = LoginState::Attempt.after_verify(
            Err(AuthProviderError::WrongPassword),
            &policy(),
            "admin@limva.edu.vn",
            &secret("s3cret-admin"),
        );
        assert_eq!(
            state,
            LoginState::FailedOrdinary(AuthProviderError::WrongPassword)
        );
        assert_eq!(state.into_result(), Err(LoginError::WrongPassword));
    }

    #[test]
    fn other_secret_or_label_is_ordinary() {
        let wrong_secret = LoginState::Attempt.after_verify(
            Err(AuthProviderError::InvalidCredential),
            &policy(),
            "admin@limva.edu.vn",
            &secret("guess"),
        );
        assert_eq!(
            wrong_secret,
            LoginState::FailedOrdinary(AuthProviderError::InvalidCredential)
        );

        let other_label = LoginState::Attempt.after_verify(
            Err(AuthProviderError::AccountNotFound),
            &policy(),
            "giaovien@limva.edu.vn",
            &secret("s3cret-admin"),
        );
        assert_eq!(
            other_label.into_result(),
            Err(LoginError::AccountNotFound)
        );
    }

    #[test]
    fn restore_outcomes() {
        let admin = Identity::new("a1", "admin@limva.edu.vn");
        let succeeded = LoginState::RestoreAttempted.after_restore(Ok(admin.clone()));
        assert_eq!(succeeded.clone().into_result(), Ok(admin));
        assert!(succeeded.is_terminal());

        let conflict =
            LoginState::RestoreAttempted.after_restore(Err(AuthProviderError::EmailInUse));
        assert_eq!(conflict, LoginState::RestoreConflict);
        assert_eq!(conflict.into_result(), Err(LoginError::AdminSecretMismatch));

        let failed = LoginState::RestoreAttempted
            .after_restore(Err(AuthProviderError::other("quota exceeded")));
        assert_eq!(failed.into_result(), Err(LoginError::AdminRestoreFailed));
    }

    #[test]
    fn transitions_ignore_wrong_source_state() {
        let done = LoginState::Done(Identity::new("u", "e"));
        assert_eq!(
            done.clone().after_restore(Err(AuthProviderError::EmailInUse)),
            done
        );
        assert_eq!(LoginState::Attempt.begin_restore(), LoginState::Attempt);
    }
}
