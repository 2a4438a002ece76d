// SPDX-License-Identifier: MIT

//! Application error types with user-facing message mapping.
//!
//! No error in this crate is fatal to the session controller: every provider
//! failure is translated into a bounded set of user-facing messages and the
//! UI stays in a retryable state.

use serde::Serialize;

/// Provider-defined authentication error codes, normalized into a closed set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AuthCode {
    /// Wrong password or malformed/expired credential.
    InvalidCredential,
    /// No account registered for this email.
    UserNotFound,
    /// Provider rate limiting kicked in.
    TooManyRequests,
    /// Federated sign-in popup closed by the user.
    PopupClosed,
    /// App domain not on the provider allow-list.
    UnauthorizedDomain,
    /// Password rejected as too weak at registration.
    WeakPassword,
    /// Email already registered.
    EmailInUse,
    /// Account exists but the email was never verified.
    UnverifiedEmail,
    /// This email is registered through a federated provider.
    FederatedAccount(String),
    /// Verification resend requested inside the cooldown window.
    ResendCooldown(u64),
    /// Anything the provider reports that we do not map specifically.
    Unknown(String),
}

impl AuthCode {
    /// Normalize a raw provider error code (e.g. `EMAIL_EXISTS`).
    pub fn from_provider(code: &str) -> Self {
        // Rate-limit codes carry a suffix ("TOO_MANY_ATTEMPTS_TRY_LATER : ...")
        let code = code.split(':').next().unwrap_or(code).trim();
        match code {
            "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "INVALID_CREDENTIAL" => {
                AuthCode::InvalidCredential
            }
            "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => AuthCode::UserNotFound,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthCode::TooManyRequests,
            "POPUP_CLOSED_BY_USER" => AuthCode::PopupClosed,
            "UNAUTHORIZED_DOMAIN" => AuthCode::UnauthorizedDomain,
            "WEAK_PASSWORD" => AuthCode::WeakPassword,
            "EMAIL_EXISTS" => AuthCode::EmailInUse,
            other => AuthCode::Unknown(other.to_string()),
        }
    }

    /// True when the code is one of the ambiguous credential failures that
    /// warrant a sign-in-method lookup before reporting a generic failure.
    pub fn is_ambiguous_credential(&self) -> bool {
        matches!(self, AuthCode::InvalidCredential | AuthCode::UserNotFound)
    }

    /// Localized (pt-BR) message shown next to the login/registration form.
    pub fn user_message(&self) -> String {
        match self {
            AuthCode::InvalidCredential => "E-mail ou senha incorretos.".to_string(),
            AuthCode::UserNotFound => "Nenhuma conta encontrada para este e-mail.".to_string(),
            AuthCode::TooManyRequests => {
                "Muitas tentativas. Aguarde alguns minutos e tente novamente.".to_string()
            }
            AuthCode::PopupClosed => "Login cancelado.".to_string(),
            AuthCode::UnauthorizedDomain => {
                "Este domínio não está autorizado para login.".to_string()
            }
            AuthCode::WeakPassword => "A senha deve ter pelo menos 6 caracteres.".to_string(),
            AuthCode::EmailInUse => "Este e-mail já está cadastrado.".to_string(),
            AuthCode::UnverifiedEmail => {
                "Confirme seu e-mail antes de entrar. Verifique sua caixa de entrada.".to_string()
            }
            AuthCode::FederatedAccount(provider) => format!(
                "Esta conta usa login via {}. Use o botão correspondente.",
                provider
            ),
            AuthCode::ResendCooldown(secs) => {
                format!("Aguarde {}s para reenviar o e-mail de confirmação.", secs)
            }
            AuthCode::Unknown(_) => "Não foi possível entrar. Tente novamente.".to_string(),
        }
    }
}

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication error: {0:?}")]
    Auth(AuthCode),

    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Document store error: {0}")]
    Store(String),

    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Message suitable for direct display, without leaking provider detail.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Auth(code) => code.user_message(),
            AppError::Validation { message, .. } => message.clone(),
            AppError::Store(msg) => {
                tracing::error!(error = %msg, "Document store error");
                "Erro ao salvar os dados. Tente novamente.".to_string()
            }
            AppError::Provider(msg) => {
                tracing::error!(error = %msg, "Identity provider error");
                "Serviço de login indisponível no momento.".to_string()
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                "Erro inesperado. Tente novamente.".to_string()
            }
        }
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_provider_known_codes() {
        assert_eq!(AuthCode::from_provider("EMAIL_EXISTS"), AuthCode::EmailInUse);
        assert_eq!(
            AuthCode::from_provider("INVALID_PASSWORD"),
            AuthCode::InvalidCredential
        );
        assert_eq!(
            AuthCode::from_provider("EMAIL_NOT_FOUND"),
            AuthCode::UserNotFound
        );
    }

    #[test]
    fn test_from_provider_strips_suffix() {
        let code = AuthCode::from_provider("TOO_MANY_ATTEMPTS_TRY_LATER : Try again later.");
        assert_eq!(code, AuthCode::TooManyRequests);
    }

    #[test]
    fn test_from_provider_unknown_preserved() {
        match AuthCode::from_provider("SOMETHING_ELSE") {
            AuthCode::Unknown(raw) => assert_eq!(raw, "SOMETHING_ELSE"),
            other => panic!("expected Unknown, got {:?}", other),
        }
    }

    #[test]
    fn test_ambiguous_credential_codes() {
        assert!(AuthCode::InvalidCredential.is_ambiguous_credential());
        assert!(AuthCode::UserNotFound.is_ambiguous_credential());
        assert!(!AuthCode::EmailInUse.is_ambiguous_credential());
    }
}
