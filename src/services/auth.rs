// SPDX-License-Identifier: MIT

//! Authentication flows: registration, sign-in, verification, password reset.
//!
//! Every provider failure is translated into a user-facing [`AuthCode`]
//! message; nothing here panics or escapes the bounded error set.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use validator::Validate;

use crate::backend::{DocumentStore, IdentityProvider};
use crate::error::{AppError, AuthCode, Result};
use crate::models::profile::DEFAULT_ROLE;
use crate::models::{Identity, ProfileDoc};

/// Minimum interval between verification-email resends, per email.
pub const RESEND_COOLDOWN: Duration = Duration::from_secs(60);

/// How long registration waits for the profile-document write. Account
/// creation already succeeded at that point, so the flow proceeds with a
/// warning instead of blocking on a secondary write.
pub const PROFILE_CREATE_TIMEOUT: Duration = Duration::from_secs(3);

/// Sign-in method id the provider reports for Google accounts.
const GOOGLE_METHOD: &str = "google.com";

/// Registration form input.
#[derive(Debug, Clone, Validate)]
pub struct RegisterForm {
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(must_match(other = "password"))]
    pub confirm_password: String,
}

/// Login form input.
#[derive(Debug, Clone, Validate)]
pub struct LoginForm {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Authentication flows over the identity provider.
pub struct AuthService {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    /// Last verification resend per email, for the cooldown window.
    resend_log: DashMap<String, Instant>,
}

impl AuthService {
    pub fn new(provider: Arc<dyn IdentityProvider>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            provider,
            store,
            resend_log: DashMap::new(),
        }
    }

    /// Register a new account.
    ///
    /// Creates the account, sends the verification email, writes the initial
    /// profile document (bounded wait), then signs out so the user reads the
    /// confirmation screen instead of being dropped into the dashboard.
    pub async fn register(&self, form: &RegisterForm) -> Result<()> {
        form.validate().map_err(map_validation)?;

        let identity = self.provider.sign_up(&form.email, &form.password).await?;

        if let Err(e) = self.provider.send_verification_email().await {
            tracing::warn!(error = %e, "Verification email send failed at registration");
        }

        let name = if form.name.trim().is_empty() {
            identity.derived_name()
        } else {
            form.name.trim().to_string()
        };
        let doc = ProfileDoc::initial(&name, DEFAULT_ROLE);

        match tokio::time::timeout(
            PROFILE_CREATE_TIMEOUT,
            self.store.create_profile(&identity.uid, &doc),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(uid = %identity.uid, error = %e, "Initial profile write failed");
            }
            Err(_) => {
                tracing::warn!(uid = %identity.uid, "Initial profile write timed out");
            }
        }

        self.provider.sign_out().await?;
        Ok(())
    }

    /// Email/password sign-in.
    ///
    /// An unverified email signs the account straight back out and reports
    /// [`AuthCode::UnverifiedEmail`], which the UI pairs with the resend
    /// affordance. Ambiguous credential failures trigger the sign-in-method
    /// lookup before a generic message is shown.
    pub async fn sign_in(&self, form: &LoginForm) -> Result<Identity> {
        form.validate().map_err(map_validation)?;

        match self.provider.sign_in(&form.email, &form.password).await {
            Ok(identity) => {
                if identity.email_verified {
                    Ok(identity)
                } else {
                    if let Err(e) = self.provider.sign_out().await {
                        tracing::warn!(error = %e, "Sign-out after unverified sign-in failed");
                    }
                    Err(AppError::Auth(AuthCode::UnverifiedEmail))
                }
            }
            Err(AppError::Auth(code)) if code.is_ambiguous_credential() => {
                Err(self.disambiguate_credential_failure(&form.email, code).await)
            }
            Err(e) => Err(e),
        }
    }

    /// On wrong-credential/user-not-found, check whether the email actually
    /// lives under a federated provider and steer the user there. The lookup
    /// itself failing (e.g. enumeration protection) falls back silently to
    /// the generic message.
    async fn disambiguate_credential_failure(&self, email: &str, code: AuthCode) -> AppError {
        match self.provider.fetch_sign_in_methods(email).await {
            Ok(methods) if methods.iter().any(|m| m == GOOGLE_METHOD) => {
                AppError::Auth(AuthCode::FederatedAccount("Google".to_string()))
            }
            Ok(_) => AppError::Auth(code),
            Err(e) => {
                tracing::debug!(error = %e, "Sign-in method lookup failed, using generic message");
                AppError::Auth(code)
            }
        }
    }

    /// Federated Google sign-in. A closed popup is not an error: the session
    /// simply stays as it was.
    pub async fn sign_in_with_google(&self) -> Result<Option<Identity>> {
        match self.provider.sign_in_with_google().await {
            Ok(identity) => Ok(Some(identity)),
            Err(AppError::Auth(AuthCode::PopupClosed)) => {
                tracing::info!("Google sign-in popup closed by user");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Resend the verification email, rate-limited per email address.
    pub async fn resend_verification(&self, email: &str) -> Result<()> {
        if let Some(last) = self.resend_log.get(email) {
            let elapsed = last.elapsed();
            if elapsed < RESEND_COOLDOWN {
                let remaining = (RESEND_COOLDOWN - elapsed).as_secs().max(1);
                return Err(AppError::Auth(AuthCode::ResendCooldown(remaining)));
            }
        }

        self.provider.send_verification_email().await?;
        self.resend_log.insert(email.to_string(), Instant::now());
        Ok(())
    }

    pub async fn send_password_reset(&self, email: &str) -> Result<()> {
        if validator::ValidateEmail::validate_email(&email) {
            self.provider.send_password_reset(email).await
        } else {
            Err(AppError::Validation {
                field: "email",
                message: "Informe um e-mail válido.".to_string(),
            })
        }
    }

    /// Re-fetch the current identity (e.g. after the user clicked the
    /// verification link) and publish it on the identity stream.
    pub async fn reload_identity(&self) -> Result<Option<Identity>> {
        self.provider.reload().await
    }
}

/// Map derive-validator output to a single field-level error, in a fixed
/// priority order so the UI highlights one field at a time.
fn map_validation(errors: validator::ValidationErrors) -> AppError {
    let fields = errors.field_errors();
    let has = |name: &str| fields.keys().any(|k| k.as_ref() == name);

    if has("email") {
        AppError::Validation {
            field: "email",
            message: "Informe um e-mail válido.".to_string(),
        }
    } else if has("password") {
        AppError::Validation {
            field: "password",
            message: "A senha deve ter pelo menos 6 caracteres.".to_string(),
        }
    } else if has("confirm_password") {
        AppError::Validation {
            field: "confirm_password",
            message: "As senhas não coincidem.".to_string(),
        }
    } else {
        AppError::Validation {
            field: "form",
            message: "Dados inválidos.".to_string(),
        }
    }
}
