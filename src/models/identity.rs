//! Identity as reported by the external auth provider.

use serde::{Deserialize, Serialize};

/// The authenticated principal, as emitted by the identity stream.
///
/// This is a projection of provider state; the application-level user record
/// lives in the `Profile` document keyed by `uid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-unique user id (also the profile document id).
    pub uid: String,
    /// Display name (may be absent for email/password accounts).
    pub display_name: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Photo URL from the provider (federated accounts usually have one).
    pub photo_url: Option<String>,
    /// Whether the provider considers the email verified.
    pub email_verified: bool,
}

impl Identity {
    /// Best-effort display name: provider display name, else the local part
    /// of the email, else a fixed fallback. Used for the provisional profile
    /// so views are never blocked on the document store.
    pub fn derived_name(&self) -> String {
        if let Some(name) = self.display_name.as_deref() {
            if !name.trim().is_empty() {
                return name.to_string();
            }
        }
        self.email
            .as_deref()
            .and_then(|e| e.split('@').next())
            .filter(|local| !local.is_empty())
            .unwrap_or("colaborador")
            .to_string()
    }
}
