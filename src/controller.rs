// SPDX-License-Identifier: MIT

//! Session controller: glues the identity stream, the session store and the
//! view router together and executes router side effects.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::backend::{DocumentStore, IdentityProvider};
use crate::error::Result;
use crate::models::ViewState;
use crate::router::{NavEffect, ViewRouter};
use crate::session::{Session, SessionStore};

/// Long-lived controller owned by the session-owning scope of the UI.
pub struct SessionController {
    session: Arc<SessionStore>,
    router: Mutex<ViewRouter>,
    provider: Arc<dyn IdentityProvider>,
    pump: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SessionController {
    /// Build the controller and start pumping identity events.
    ///
    /// The provider's current identity (usually `None` at a cold start, or a
    /// restored session) is processed as the first event, which completes
    /// the session's loading phase.
    pub fn start(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
    ) -> Arc<Self> {
        let controller = Arc::new(Self {
            session: SessionStore::new(store),
            router: Mutex::new(ViewRouter::new()),
            provider: provider.clone(),
            pump: std::sync::Mutex::new(None),
        });

        let pump = tokio::spawn({
            let controller = controller.clone();
            let mut identity_rx = provider.watch();
            async move {
                let initial = identity_rx.borrow_and_update().clone();
                controller.apply_identity_event(initial).await;

                while identity_rx.changed().await.is_ok() {
                    let identity = identity_rx.borrow_and_update().clone();
                    controller.apply_identity_event(identity).await;
                }
            }
        });
        *controller.pump.lock().unwrap() = Some(pump);

        controller
    }

    async fn apply_identity_event(&self, identity: Option<crate::models::Identity>) {
        self.session.on_identity_event(identity).await;
        let snapshot = self.session.snapshot();
        self.router.lock().await.on_session_change(&snapshot);
    }

    /// Explicit navigation request from a view.
    pub async fn navigate(&self, target: ViewState) -> Result<()> {
        let snapshot = self.session.snapshot();
        let effect = self.router.lock().await.navigate(target, &snapshot);

        if effect == NavEffect::SignOut {
            self.provider.sign_out().await?;
            // The stream will also emit the sign-out; clearing locally keeps
            // logout observable as soon as this call returns.
            self.session.on_identity_event(None).await;
            let snapshot = self.session.snapshot();
            self.router.lock().await.on_session_change(&snapshot);
        }

        Ok(())
    }

    pub async fn current_view(&self) -> ViewState {
        self.router.lock().await.current()
    }

    pub async fn set_scroll_reset(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.router.lock().await.set_scroll_reset(hook);
    }

    /// Current session snapshot.
    pub fn session(&self) -> Session {
        self.session.snapshot()
    }

    /// Watch channel of session changes, for views that render reactively.
    pub fn watch_session(&self) -> tokio::sync::watch::Receiver<Session> {
        self.session.subscribe()
    }

    /// Release the identity pump and the profile subscription. No callback
    /// fires into the session after this returns.
    pub async fn shutdown(&self) {
        if let Some(pump) = self.pump.lock().unwrap().take() {
            pump.abort();
        }
        self.session.shutdown().await;
    }
}
