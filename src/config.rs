//! Application configuration loaded from environment variables.
//!
//! Loaded once at the composition root and carried inside `AppContext`;
//! nothing in the crate reads the environment after startup.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP project ID (Firestore).
    pub gcp_project_id: String,
    /// Firebase web API key (identity REST endpoints, not a secret).
    pub firebase_api_key: String,
    /// Base URL of the identity REST API. Overridable for the Auth emulator
    /// and for tests.
    pub identity_api_url: String,
    /// Path of the local preferences file (guided-tour flag).
    pub prefs_path: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID")
                .map_err(|_| ConfigError::Missing("GCP_PROJECT_ID"))?,
            firebase_api_key: env::var("FIREBASE_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("FIREBASE_API_KEY"))?,
            identity_api_url: env::var("IDENTITY_API_URL")
                .unwrap_or_else(|_| "https://identitytoolkit.googleapis.com/v1".to_string()),
            prefs_path: env::var("CONECTAHUB_PREFS_PATH")
                .unwrap_or_else(|_| ".conectahub_prefs.json".to_string()),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            firebase_api_key: "test_api_key".to_string(),
            identity_api_url: "http://localhost:9099/identitytoolkit.googleapis.com/v1"
                .to_string(),
            prefs_path: ".conectahub_prefs_test.json".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
