//! Firebase Authentication (Identity Toolkit REST) adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, instrument};
use url::Url;

use crate::session::{AuthProviderError, Identity, IdentityProvider};
use crate::store::BearerToken;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Maps an Identity Toolkit error message (`"WEAK_PASSWORD : ..."`) to a kind.
fn map_error_code(message: &str) -> AuthProviderError {
    let code = message.split(" :").next().unwrap_or(message).trim();
    match code {
        "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => AuthProviderError::AccountNotFound,
        "INVALID_PASSWORD" => AuthProviderError::WrongPassword,
        "INVALID_LOGIN_CREDENTIALS" | "INVALID_CREDENTIAL" => AuthProviderError::InvalidCredential,
        "EMAIL_EXISTS" => AuthProviderError::EmailInUse,
        "WEAK_PASSWORD" => AuthProviderError::WeakSecret,
        _ => AuthProviderError::Other(message.to_string()),
    }
}

#[derive(Debug)]
pub struct FirebaseIdentityProvider {
    client: Client,
    base_url: String,
    api_key: SecretString,
    token: BearerToken,
    current: watch::Sender<Option<Identity>>,
}

impl FirebaseIdentityProvider {
    /// Provider for the project owning `api_key`. Successful sign-ins store
    /// their ID token in `token`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: SecretString, token: BearerToken) -> Result<Self, AuthProviderError> {
        Self::with_base_url(IDENTITY_TOOLKIT_URL, api_key, token)
    }

    /// Same as [`FirebaseIdentityProvider::new`] against another endpoint,
    /// e.g. the auth emulator.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn with_base_url(
        base_url: &str,
        api_key: SecretString,
        token: BearerToken,
    ) -> Result<Self, AuthProviderError> {
        let base = Url::parse(base_url).map_err(AuthProviderError::other)?;

        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(AuthProviderError::other)?;

        Ok(Self {
            client,
            base_url: base.as_str().trim_end_matches('/').to_string(),
            api_key,
            token,
            current: watch::channel(None).0,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/accounts:{method}", self.base_url)
    }

    async fn post<T: Serialize + Sync>(
        &self,
        method: &str,
        body: &T,
    ) -> Result<Response, AuthProviderError> {
        let response = self
            .client
            .post(self.endpoint(method))
            .query(&[("key", self.api_key.expose_secret())])
            .json(body)
            .send()
            .await
            .map_err(AuthProviderError::other)?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => Err(map_error_code(&envelope.error.message)),
            Err(_) => Err(AuthProviderError::Other(format!("{status} {body}"))),
        }
    }

    async fn password_call(
        &self,
        method: &str,
        email: &str,
        secret: &SecretString,
    ) -> Result<Identity, AuthProviderError> {
        let request = PasswordRequest {
            email,
            password: secret.expose_secret(),
            return_secure_token: true,
        };
        let account: AccountResponse = self
            .post(method, &request)
            .await?
            .json()
            .await
            .map_err(AuthProviderError::other)?;

        let identity = Identity {
            uid: account.local_id,
            email: account.email,
            display_name: account.display_name.filter(|name| !name.is_empty()),
        };

        *self.token.write() = Some(SecretString::from(account.id_token));
        self.current.send_replace(Some(identity.clone()));
        debug!("signed in as {}", identity.uid);

        Ok(identity)
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    #[instrument(skip(self, secret))]
    async fn verify_credential(
        &self,
        email: &str,
        secret: &SecretString,
    ) -> Result<Identity, AuthProviderError> {
        self.password_call("signInWithPassword", email, secret).await
    }

    #[instrument(skip(self, secret))]
    async fn create_credential(
        &self,
        email: &str,
        secret: &SecretString,
    ) -> Result<Identity, AuthProviderError> {
        self.password_call("signUp", email, secret).await
    }

    async fn sign_out(&self) -> Result<(), AuthProviderError> {
        *self.token.write() = None;
        self.current.send_replace(None);
        Ok(())
    }

    #[instrument(skip(self, identity), fields(uid = %identity.uid))]
    async fn update_display_name(
        &self,
        identity: &Identity,
        name: &str,
    ) -> Result<(), AuthProviderError> {
        let id_token = self
            .token
            .read()
            .as_ref()
            .map(|token| token.expose_secret().to_string())
            .ok_or_else(|| AuthProviderError::Other("not signed in".to_string()))?;

        let request = UpdateProfileRequest {
            id_token: &id_token,
            display_name: name,
            return_secure_token: false,
        };
        self.post("update", &request).await?;

        self.current.send_if_modified(|current| match current {
            Some(signed_in) if signed_in.uid == identity.uid => {
                signed_in.display_name = Some(name.to_string());
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
