// SPDX-License-Identifier: MIT

//! Session store: single source of truth for "who is logged in and with
//! what profile".
//!
//! Reconciles two asynchronous event sources (the identity stream and the
//! per-user profile-document subscription) into one coherent `Session`
//! published on a watch channel. Stale subscription callbacks are fenced by
//! an epoch counter: every identity transition retires the previous epoch
//! before any effect of the new one is applied.

use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, watch, Mutex};

use crate::backend::{DocumentStore, ListenerGuard, ProfileEvent};
use crate::models::{Identity, Profile};
use crate::session::reconcile::{self, ProfileState};

/// The authenticated identity and its profile projection.
///
/// Invariant: `profile.is_some()` implies `identity.is_some()`.
#[derive(Debug, Clone)]
pub struct Session {
    pub identity: Option<Identity>,
    pub profile: Option<ProfileState>,
    /// True until the identity stream delivers its first event.
    pub loading: bool,
}

impl Session {
    /// State at process start, before the first identity event.
    pub fn initial() -> Self {
        Self {
            identity: None,
            profile: None,
            loading: true,
        }
    }

    /// The effective profile for rendering, provisional or confirmed.
    pub fn effective_profile(&self) -> Option<&Profile> {
        self.profile.as_ref().map(ProfileState::profile)
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }
}

struct Inner {
    session: Session,
    /// Bumped on every identity transition and on shutdown; profile events
    /// carrying an older epoch are discarded.
    epoch: u64,
    listener: Option<ListenerGuard>,
}

/// Reconciling store over the identity stream and profile subscription.
pub struct SessionStore {
    store: Arc<dyn DocumentStore>,
    inner: Mutex<Inner>,
    tx: watch::Sender<Session>,
    /// Self-handle for the subscription pump tasks.
    weak: Weak<SessionStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            let (tx, _) = watch::channel(Session::initial());
            Self {
                store,
                inner: Mutex::new(Inner {
                    session: Session::initial(),
                    epoch: 0,
                    listener: None,
                }),
                tx,
                weak: weak.clone(),
            }
        })
    }

    /// Subscribe to session changes. The current value is readable
    /// immediately via `borrow()`.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    /// Current session snapshot.
    pub fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    /// Handle one event from the identity stream.
    ///
    /// Ordering contract: any active profile subscription is retired before
    /// any effect of the new event is applied, so no two subscriptions are
    /// ever live at once and no retired callback can touch the new session.
    pub async fn on_identity_event(&self, identity: Option<Identity>) {
        let mut inner = self.inner.lock().await;
        inner.session.loading = false;

        // Same-uid re-emission (token refresh): update identity fields in
        // place without tearing down the subscription or regressing the
        // profile to provisional.
        if let (Some(current), Some(new)) = (&inner.session.identity, &identity) {
            if current.uid == new.uid {
                inner.session.identity = identity.clone();
                self.publish(&inner);
                return;
            }
        }

        inner.epoch += 1;
        if let Some(guard) = inner.listener.take() {
            guard.cancel();
        }

        match identity {
            None => {
                inner.session.identity = None;
                inner.session.profile = None;
                self.publish(&inner);
            }
            Some(identity) => {
                // Publish the identity-derived provisional profile before the
                // document round trip so views unblock immediately.
                inner.session.profile =
                    Some(ProfileState::Provisional(Profile::provisional(&identity)));
                inner.session.identity = Some(identity.clone());
                self.publish(&inner);

                let epoch = inner.epoch;
                match self.store.watch_profile(&identity.uid).await {
                    Ok(profile_watch) => {
                        inner.listener = Some(profile_watch.guard);
                        self.spawn_pump(epoch, profile_watch.events);
                    }
                    Err(e) => {
                        // Degrade gracefully: the provisional profile remains
                        // the effective profile for this session.
                        tracing::warn!(
                            uid = %identity.uid,
                            error = %e,
                            "Profile subscription setup failed"
                        );
                    }
                }
            }
        }
    }

    /// Drive events from one profile subscription into the store.
    fn spawn_pump(&self, epoch: u64, mut events: mpsc::Receiver<ProfileEvent>) {
        let Some(this) = self.weak.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                this.on_profile_event(epoch, event).await;
            }
        });
    }

    /// Apply one profile subscription event, unless its epoch was retired.
    pub async fn on_profile_event(&self, epoch: u64, event: ProfileEvent) {
        let mut inner = self.inner.lock().await;
        if epoch != inner.epoch {
            tracing::debug!(epoch, current = inner.epoch, "Discarding stale profile event");
            return;
        }

        match event {
            ProfileEvent::Error(e) => {
                tracing::warn!(error = %e, "Profile subscription error, keeping current profile");
            }
            ProfileEvent::Snapshot(doc) => {
                // Belt and suspenders: the epoch fence already excludes
                // post-sign-out events, but never resurrect a profile.
                let Some(state) = inner.session.profile.take() else {
                    return;
                };
                inner.session.profile = Some(reconcile::apply_snapshot(state, doc.as_ref()));
                self.publish(&inner);
            }
        }
    }

    /// Release the profile subscription and fence out any in-flight
    /// callbacks. Called when the session-owning scope unmounts.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        inner.epoch += 1;
        if let Some(guard) = inner.listener.take() {
            guard.cancel();
        }
    }

    fn publish(&self, inner: &Inner) {
        self.tx.send_replace(inner.session.clone());
    }
}
