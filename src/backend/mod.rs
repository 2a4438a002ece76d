// SPDX-License-Identifier: MIT

//! Backend seam: identity provider and document store contracts.
//!
//! The session core only ever talks to these traits; production wiring binds
//! them to Firebase Auth (REST) and Firestore, tests bind in-memory fakes.

pub mod firebase_auth;
pub mod firestore;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::error::Result;
use crate::models::{Identity, Post, PostAuthorFields, ProfileDoc};

pub use firebase_auth::FirebaseAuthClient;
pub use firestore::FirestoreStore;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const POSTS: &str = "posts";
}

/// The provider caps batched writes at 500 operations; the post-author
/// backfill chunks at exactly this size.
pub const WRITE_BATCH_LIMIT: usize = 500;

/// Event delivered by a profile-document subscription.
#[derive(Debug, Clone)]
pub enum ProfileEvent {
    /// A document snapshot; `None` when the document does not exist (yet).
    Snapshot(Option<ProfileDoc>),
    /// Transient subscription error. Non-fatal by contract.
    Error(String),
}

/// Cancels the underlying listener when dropped or explicitly cancelled.
///
/// Cancellation is synchronous from the caller's point of view so the session
/// store can retire a subscription while holding its own lock.
pub struct ListenerGuard {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl ListenerGuard {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Guard for listeners that stop when their event channel is dropped.
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// An open profile-document subscription: a stream of events plus the guard
/// that tears the listener down.
pub struct ProfileWatch {
    pub events: mpsc::Receiver<ProfileEvent>,
    pub guard: ListenerGuard,
}

/// External identity provider (auth).
///
/// Implementations own the identity stream: every sign-in, sign-out and
/// token refresh publishes `Option<Identity>` on the watch channel.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Subscribe to identity changes. The current value is delivered first.
    fn watch(&self) -> watch::Receiver<Option<Identity>>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity>;
    /// Federated sign-in (Google popup in the web client).
    async fn sign_in_with_google(&self) -> Result<Identity>;
    async fn sign_out(&self) -> Result<()>;

    /// Send a verification email to the currently signed-in account.
    async fn send_verification_email(&self) -> Result<()>;
    async fn send_password_reset(&self, email: &str) -> Result<()>;

    /// Re-fetch the current identity from the provider (e.g. to pick up a
    /// fresh email-verified flag) and publish it on the stream.
    async fn reload(&self) -> Result<Option<Identity>>;

    /// Sign-in methods registered for an email (e.g. `["google.com"]`).
    async fn fetch_sign_in_methods(&self, email: &str) -> Result<Vec<String>>;
}

/// External document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_profile(&self, uid: &str) -> Result<Option<ProfileDoc>>;

    /// Create the initial profile document at registration time.
    async fn create_profile(&self, uid: &str, doc: &ProfileDoc) -> Result<()>;

    /// Merge-write: only fields present in `patch` are touched.
    async fn merge_profile(&self, uid: &str, patch: &ProfileDoc) -> Result<()>;

    /// Atomically add `points` and union `mission` into the completed set.
    /// Must be a relative adjustment on the store side, not read-modify-write.
    async fn grant_mission_reward(&self, uid: &str, mission: &str, points: i64) -> Result<()>;

    async fn posts_by_author(&self, uid: &str) -> Result<Vec<Post>>;

    /// Update denormalized author fields on the given posts, chunked at
    /// [`WRITE_BATCH_LIMIT`].
    async fn update_post_authors(
        &self,
        post_ids: &[String],
        fields: &PostAuthorFields,
    ) -> Result<()>;

    /// Open a snapshot subscription on `users/{uid}`.
    async fn watch_profile(&self, uid: &str) -> Result<ProfileWatch>;
}
