// SPDX-License-Identifier: MIT

//! Identity provider over the Firebase Auth REST API.
//!
//! Handles:
//! - Account creation and email/password sign-in
//! - Federated (Google) sign-in via an injected interactive token source
//! - Verification / password-reset emails
//! - The identity stream the session store subscribes to

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde::Deserialize;
use tokio::sync::{watch, Mutex};

use crate::backend::IdentityProvider;
use crate::error::{AppError, AuthCode, Result};
use crate::models::Identity;

/// Supplies a Google ID token through the embedding shell's popup flow.
/// A cancelled popup surfaces as `AppError::Auth(AuthCode::PopupClosed)`.
pub type GoogleTokenSource =
    Arc<dyn Fn() -> BoxFuture<'static, Result<String>> + Send + Sync>;

struct CurrentAccount {
    id_token: String,
    identity: Identity,
}

/// Firebase Auth REST client.
pub struct FirebaseAuthClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    current: Mutex<Option<CurrentAccount>>,
    /// Retained across sign-out so the unverified-email flow (which signs
    /// the account straight back out) can still resend the verification.
    last_id_token: Mutex<Option<String>>,
    google_tokens: Option<GoogleTokenSource>,
    tx: watch::Sender<Option<Identity>>,
}

impl FirebaseAuthClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            current: Mutex::new(None),
            last_id_token: Mutex::new(None),
            google_tokens: None,
            tx,
        }
    }

    /// Attach the interactive Google token source (the web shell's popup).
    pub fn with_google_token_source(mut self, source: GoogleTokenSource) -> Self {
        self.google_tokens = Some(source);
        self
    }

    fn endpoint(&self, op: &str) -> String {
        format!("{}/accounts:{}?key={}", self.base_url, op, self.api_key)
    }

    /// POST a JSON body and parse the response, mapping provider error codes.
    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        op: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let response = self
            .http
            .post(self.endpoint(op))
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(provider_error(status.as_u16(), &body));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("JSON parse error: {}", e)))
    }

    /// Fetch account details for a fresh token and publish the identity.
    async fn adopt_token(&self, id_token: String) -> Result<Identity> {
        let identity = self.lookup(&id_token).await?;

        *self.last_id_token.lock().await = Some(id_token.clone());
        *self.current.lock().await = Some(CurrentAccount {
            id_token,
            identity: identity.clone(),
        });
        self.tx.send_replace(Some(identity.clone()));

        Ok(identity)
    }

    async fn lookup(&self, id_token: &str) -> Result<Identity> {
        let response: LookupResponse = self
            .post_json("lookup", &serde_json::json!({ "idToken": id_token }))
            .await?;

        let user = response
            .users
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Provider("Account lookup returned no users".to_string()))?;

        Ok(Identity {
            uid: user.local_id,
            display_name: user.display_name,
            email: user.email,
            photo_url: user.photo_url,
            email_verified: user.email_verified,
        })
    }

    async fn verification_token(&self) -> Result<String> {
        if let Some(current) = self.current.lock().await.as_ref() {
            return Ok(current.id_token.clone());
        }
        self.last_id_token
            .lock()
            .await
            .clone()
            .ok_or_else(|| AppError::Provider("No account to send verification for".to_string()))
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuthClient {
    fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity> {
        let response: TokenResponse = self
            .post_json(
                "signUp",
                &serde_json::json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        self.adopt_token(response.id_token).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        let response: TokenResponse = self
            .post_json(
                "signInWithPassword",
                &serde_json::json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        self.adopt_token(response.id_token).await
    }

    async fn sign_in_with_google(&self) -> Result<Identity> {
        let source = self
            .google_tokens
            .as_ref()
            .ok_or_else(|| {
                AppError::Provider("No interactive Google sign-in configured".to_string())
            })?
            .clone();

        let google_token = source().await?;

        let response: TokenResponse = self
            .post_json(
                "signInWithIdp",
                &serde_json::json!({
                    "postBody": format!("id_token={}&providerId=google.com", google_token),
                    "requestUri": "http://localhost",
                    "returnSecureToken": true,
                    "returnIdpCredential": true,
                }),
            )
            .await?;

        self.adopt_token(response.id_token).await
    }

    async fn sign_out(&self) -> Result<()> {
        *self.current.lock().await = None;
        self.tx.send_replace(None);
        Ok(())
    }

    async fn send_verification_email(&self) -> Result<()> {
        let id_token = self.verification_token().await?;
        let _: serde_json::Value = self
            .post_json(
                "sendOobCode",
                &serde_json::json!({
                    "requestType": "VERIFY_EMAIL",
                    "idToken": id_token,
                }),
            )
            .await?;
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<()> {
        let _: serde_json::Value = self
            .post_json(
                "sendOobCode",
                &serde_json::json!({
                    "requestType": "PASSWORD_RESET",
                    "email": email,
                }),
            )
            .await?;
        Ok(())
    }

    async fn reload(&self) -> Result<Option<Identity>> {
        let id_token = {
            let current = self.current.lock().await;
            match current.as_ref() {
                Some(account) => account.id_token.clone(),
                None => return Ok(None),
            }
        };

        let identity = self.lookup(&id_token).await?;

        if let Some(account) = self.current.lock().await.as_mut() {
            account.identity = identity.clone();
        }
        self.tx.send_replace(Some(identity.clone()));

        Ok(Some(identity))
    }

    async fn fetch_sign_in_methods(&self, email: &str) -> Result<Vec<String>> {
        let response: AuthUriResponse = self
            .post_json(
                "createAuthUri",
                &serde_json::json!({
                    "identifier": email,
                    "continueUri": "http://localhost",
                }),
            )
            .await?;

        Ok(response.signin_methods.unwrap_or_default())
    }
}

/// Map a non-success REST response to the bounded error set.
fn provider_error(status: u16, body: &str) -> AppError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }
    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return AppError::Auth(AuthCode::from_provider(&parsed.error.message));
    }

    AppError::Provider(format!("HTTP {}: {}", status, body))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthUriResponse {
    #[serde(default)]
    signin_methods: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    email_verified: bool,
}
