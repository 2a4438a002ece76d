// SPDX-License-Identifier: MIT

//! In-memory fakes for the backend seam, with call-count instrumentation
//! so tests can assert which persistence operations were (not) attempted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use conectahub_core::backend::{
    DocumentStore, IdentityProvider, ListenerGuard, ProfileEvent, ProfileWatch,
};
use conectahub_core::error::{AppError, AuthCode, Result};
use conectahub_core::models::{Identity, Post, PostAuthorFields, ProfileDoc};

// ─── Document store fake ─────────────────────────────────────────

struct WatchEntry {
    uid: String,
    tx: mpsc::Sender<ProfileEvent>,
    cancelled: Arc<AtomicBool>,
}

/// In-memory [`DocumentStore`].
pub struct MemoryStore {
    profiles: Mutex<HashMap<String, ProfileDoc>>,
    posts: Mutex<Vec<Post>>,
    watches: Mutex<Vec<WatchEntry>>,
    /// Deliver the current document as the first subscription event,
    /// matching the production store. Disable to test provisional state.
    auto_initial_snapshot: bool,
    create_delay: Mutex<Option<Duration>>,
    fail_watch: AtomicBool,
    fail_posts_query: AtomicBool,
    pub create_calls: AtomicUsize,
    pub merge_calls: AtomicUsize,
    pub grant_calls: AtomicUsize,
    pub post_update_calls: AtomicUsize,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(true))
    }

    /// Store whose subscriptions emit nothing until the test says so.
    pub fn with_manual_watch() -> Arc<Self> {
        Arc::new(Self::build(false))
    }

    fn build(auto_initial_snapshot: bool) -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
            posts: Mutex::new(Vec::new()),
            watches: Mutex::new(Vec::new()),
            auto_initial_snapshot,
            create_delay: Mutex::new(None),
            fail_watch: AtomicBool::new(false),
            fail_posts_query: AtomicBool::new(false),
            create_calls: AtomicUsize::new(0),
            merge_calls: AtomicUsize::new(0),
            grant_calls: AtomicUsize::new(0),
            post_update_calls: AtomicUsize::new(0),
        }
    }

    pub fn seed_profile(&self, uid: &str, doc: ProfileDoc) {
        self.profiles.lock().unwrap().insert(uid.to_string(), doc);
    }

    pub fn seed_posts(&self, posts: Vec<Post>) {
        self.posts.lock().unwrap().extend(posts);
    }

    pub fn stored_profile(&self, uid: &str) -> Option<ProfileDoc> {
        self.profiles.lock().unwrap().get(uid).cloned()
    }

    pub fn stored_posts(&self) -> Vec<Post> {
        self.posts.lock().unwrap().clone()
    }

    /// Subscriptions whose guard has not been cancelled.
    pub fn active_watches(&self) -> usize {
        self.watches
            .lock()
            .unwrap()
            .iter()
            .filter(|w| !w.cancelled.load(Ordering::SeqCst))
            .count()
    }

    /// Total persistence calls of any kind.
    pub fn write_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
            + self.merge_calls.load(Ordering::SeqCst)
            + self.grant_calls.load(Ordering::SeqCst)
            + self.post_update_calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_watch(&self, fail: bool) {
        self.fail_watch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_posts_query(&self, fail: bool) {
        self.fail_posts_query.store(fail, Ordering::SeqCst);
    }

    pub fn set_create_delay(&self, delay: Duration) {
        *self.create_delay.lock().unwrap() = Some(delay);
    }

    /// Deliver an event to live subscriptions for `uid`.
    pub async fn emit(&self, uid: &str, event: ProfileEvent) {
        for tx in self.senders(uid, false) {
            let _ = tx.send(event.clone()).await;
        }
    }

    /// Deliver an event even into cancelled subscriptions, simulating a
    /// straggler callback racing the teardown.
    pub async fn emit_even_cancelled(&self, uid: &str, event: ProfileEvent) {
        for tx in self.senders(uid, true) {
            let _ = tx.send(event.clone()).await;
        }
    }

    fn senders(&self, uid: &str, include_cancelled: bool) -> Vec<mpsc::Sender<ProfileEvent>> {
        self.watches
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.uid == uid)
            .filter(|w| include_cancelled || !w.cancelled.load(Ordering::SeqCst))
            .map(|w| w.tx.clone())
            .collect()
    }

    fn merge_into(doc: &mut ProfileDoc, patch: &ProfileDoc) {
        macro_rules! merge_field {
            ($field:ident) => {
                if patch.$field.is_some() {
                    doc.$field = patch.$field.clone();
                }
            };
        }
        merge_field!(name);
        merge_field!(avatar_url);
        merge_field!(role);
        merge_field!(job_title);
        merge_field!(department);
        merge_field!(phone);
        merge_field!(bio);
        merge_field!(points);
        merge_field!(completed_missions);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_profile(&self, uid: &str) -> Result<Option<ProfileDoc>> {
        Ok(self.profiles.lock().unwrap().get(uid).cloned())
    }

    async fn create_profile(&self, uid: &str, doc: &ProfileDoc) -> Result<()> {
        let delay = *self.create_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.profiles
            .lock()
            .unwrap()
            .insert(uid.to_string(), doc.clone());
        Ok(())
    }

    async fn merge_profile(&self, uid: &str, patch: &ProfileDoc) -> Result<()> {
        self.merge_calls.fetch_add(1, Ordering::SeqCst);
        let mut profiles = self.profiles.lock().unwrap();
        let doc = profiles.entry(uid.to_string()).or_default();
        Self::merge_into(doc, patch);
        Ok(())
    }

    async fn grant_mission_reward(&self, uid: &str, mission: &str, points: i64) -> Result<()> {
        self.grant_calls.fetch_add(1, Ordering::SeqCst);
        let mut profiles = self.profiles.lock().unwrap();
        let doc = profiles.entry(uid.to_string()).or_default();
        doc.points = Some(doc.points.unwrap_or(0) + points);
        let missions = doc.completed_missions.get_or_insert_with(Vec::new);
        if !missions.iter().any(|m| m == mission) {
            missions.push(mission.to_string());
        }
        Ok(())
    }

    async fn posts_by_author(&self, uid: &str) -> Result<Vec<Post>> {
        if self.fail_posts_query.load(Ordering::SeqCst) {
            return Err(AppError::Store("injected posts query failure".to_string()));
        }
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.author_id == uid)
            .cloned()
            .collect())
    }

    async fn update_post_authors(
        &self,
        post_ids: &[String],
        fields: &PostAuthorFields,
    ) -> Result<()> {
        self.post_update_calls.fetch_add(1, Ordering::SeqCst);
        let mut posts = self.posts.lock().unwrap();
        for post in posts.iter_mut() {
            if post_ids.contains(&post.id) {
                post.author_name = fields.author_name.clone();
                post.author_avatar = fields.author_avatar.clone();
            }
        }
        Ok(())
    }

    async fn watch_profile(&self, uid: &str) -> Result<ProfileWatch> {
        if self.fail_watch.load(Ordering::SeqCst) {
            return Err(AppError::Store("injected watch failure".to_string()));
        }

        let (tx, rx) = mpsc::channel(16);

        if self.auto_initial_snapshot {
            let initial = self.profiles.lock().unwrap().get(uid).cloned();
            let _ = tx.send(ProfileEvent::Snapshot(initial)).await;
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        self.watches.lock().unwrap().push(WatchEntry {
            uid: uid.to_string(),
            tx,
            cancelled: cancelled.clone(),
        });

        let guard = ListenerGuard::new(move || {
            cancelled.store(true, Ordering::SeqCst);
        });

        Ok(ProfileWatch { events: rx, guard })
    }
}

// ─── Identity provider fake ──────────────────────────────────────

struct FakeAccount {
    uid: String,
    password: Option<String>,
    verified: bool,
    methods: Vec<String>,
}

/// In-memory [`IdentityProvider`].
pub struct FakeIdentityProvider {
    tx: watch::Sender<Option<Identity>>,
    accounts: Mutex<HashMap<String, FakeAccount>>,
    popup_closed: AtomicBool,
    fail_method_lookup: AtomicBool,
    pub sign_out_calls: AtomicUsize,
    pub verification_sends: AtomicUsize,
}

#[allow(dead_code)]
impl FakeIdentityProvider {
    pub fn new() -> Arc<Self> {
        let (tx, _) = watch::channel(None);
        Arc::new(Self {
            tx,
            accounts: Mutex::new(HashMap::new()),
            popup_closed: AtomicBool::new(false),
            fail_method_lookup: AtomicBool::new(false),
            sign_out_calls: AtomicUsize::new(0),
            verification_sends: AtomicUsize::new(0),
        })
    }

    pub fn add_account(&self, email: &str, password: &str, verified: bool) {
        self.accounts.lock().unwrap().insert(
            email.to_string(),
            FakeAccount {
                uid: uid_for(email),
                password: Some(password.to_string()),
                verified,
                methods: vec!["password".to_string()],
            },
        );
    }

    /// Account that only exists through Google sign-in.
    pub fn add_google_account(&self, email: &str) {
        self.accounts.lock().unwrap().insert(
            email.to_string(),
            FakeAccount {
                uid: uid_for(email),
                password: None,
                verified: true,
                methods: vec!["google.com".to_string()],
            },
        );
    }

    pub fn set_popup_closed(&self, closed: bool) {
        self.popup_closed.store(closed, Ordering::SeqCst);
    }

    pub fn set_fail_method_lookup(&self, fail: bool) {
        self.fail_method_lookup.store(fail, Ordering::SeqCst);
    }

    /// Push a raw identity event on the stream, as the provider would after
    /// a sign-in/out or token refresh.
    pub fn emit(&self, identity: Option<Identity>) {
        self.tx.send_replace(identity);
    }

    pub fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    fn identity_of(&self, email: &str, account: &FakeAccount) -> Identity {
        Identity {
            uid: account.uid.clone(),
            display_name: None,
            email: Some(email.to_string()),
            photo_url: None,
            email_verified: account.verified,
        }
    }
}

pub fn uid_for(email: &str) -> String {
    format!("uid-{}", email.split('@').next().unwrap_or(email))
}

/// A plain signed-in identity for session tests.
#[allow(dead_code)]
pub fn identity(uid: &str, email: &str) -> Identity {
    Identity {
        uid: uid.to_string(),
        display_name: None,
        email: Some(email.to_string()),
        photo_url: None,
        email_verified: true,
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(AppError::Auth(AuthCode::EmailInUse));
        }
        let account = FakeAccount {
            uid: uid_for(email),
            password: Some(password.to_string()),
            verified: false,
            methods: vec!["password".to_string()],
        };
        let identity = self.identity_of(email, &account);
        accounts.insert(email.to_string(), account);
        drop(accounts);

        self.tx.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        let accounts = self.accounts.lock().unwrap();
        let account = accounts
            .get(email)
            .ok_or(AppError::Auth(AuthCode::UserNotFound))?;
        if account.password.as_deref() != Some(password) {
            return Err(AppError::Auth(AuthCode::InvalidCredential));
        }
        let identity = self.identity_of(email, account);
        drop(accounts);

        self.tx.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in_with_google(&self) -> Result<Identity> {
        if self.popup_closed.load(Ordering::SeqCst) {
            return Err(AppError::Auth(AuthCode::PopupClosed));
        }
        let accounts = self.accounts.lock().unwrap();
        let (email, account) = accounts
            .iter()
            .find(|(_, a)| a.methods.iter().any(|m| m == "google.com"))
            .ok_or(AppError::Auth(AuthCode::UserNotFound))?;
        let identity = self.identity_of(email, account);
        drop(accounts);

        self.tx.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.tx.send_replace(None);
        Ok(())
    }

    async fn send_verification_email(&self) -> Result<()> {
        self.verification_sends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_password_reset(&self, _email: &str) -> Result<()> {
        Ok(())
    }

    async fn reload(&self) -> Result<Option<Identity>> {
        let current = self.tx.borrow().clone();
        let Some(mut identity) = current else {
            return Ok(None);
        };

        if let Some(email) = identity.email.clone() {
            if let Some(account) = self.accounts.lock().unwrap().get(&email) {
                identity.email_verified = account.verified;
            }
        }
        self.tx.send_replace(Some(identity.clone()));
        Ok(Some(identity))
    }

    async fn fetch_sign_in_methods(&self, email: &str) -> Result<Vec<String>> {
        if self.fail_method_lookup.load(Ordering::SeqCst) {
            return Err(AppError::Provider(
                "injected method lookup failure".to_string(),
            ));
        }
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .get(email)
            .map(|a| a.methods.clone())
            .unwrap_or_default())
    }
}
