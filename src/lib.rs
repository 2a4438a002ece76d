// SPDX-License-Identifier: MIT

//! ConectaHub session core.
//!
//! Headless core of the ConectaHub intranet client: session lifecycle,
//! view routing, authentication flows and the profile/gamification updater,
//! backed by an external identity provider and document store.

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod prefs;
pub mod router;
pub mod services;
pub mod session;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use backend::{DocumentStore, FirebaseAuthClient, FirestoreStore, IdentityProvider};
use config::Config;
use controller::SessionController;
use prefs::LocalPrefs;
use services::{AuthService, ProfileService};

/// Capability object built at the composition root and passed down
/// explicitly; nothing in the crate reads ambient global state.
pub struct AppContext {
    pub config: Config,
    pub controller: Arc<SessionController>,
    pub auth: AuthService,
    pub profiles: ProfileService,
    pub prefs: LocalPrefs,
}

impl AppContext {
    /// Wire the context from explicit backend implementations.
    pub fn new(
        config: Config,
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        let controller = SessionController::start(provider.clone(), store.clone());
        let auth = AuthService::new(provider, store.clone());
        let profiles = ProfileService::new(store);
        let prefs = LocalPrefs::new(&config.prefs_path);

        Self {
            config,
            controller,
            auth,
            profiles,
            prefs,
        }
    }

    /// Production wiring: Firebase Auth + Firestore.
    pub async fn connect(config: Config) -> error::Result<Self> {
        let provider = Arc::new(FirebaseAuthClient::new(
            &config.identity_api_url,
            &config.firebase_api_key,
        ));
        let store = Arc::new(FirestoreStore::new(&config.gcp_project_id).await?);

        Ok(Self::new(config, provider, store))
    }

    /// Release the session controller's subscriptions.
    pub async fn shutdown(&self) {
        self.controller.shutdown().await;
    }
}

/// Initialize structured JSON logging (GCP-compliant). For embedders that
/// do not install their own subscriber.
pub fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("conectahub_core=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
