// SPDX-License-Identifier: MIT

//! Firestore-backed [`DocumentStore`] with typed operations.
//!
//! Provides high-level operations for:
//! - Profiles (`users/{uid}`, merge writes and atomic reward transforms)
//! - Posts (`posts`, author queries and chunked author backfill)
//! - Per-document snapshot subscriptions for the session store

use async_trait::async_trait;
use futures_util::TryStreamExt;
use tokio::sync::{mpsc, oneshot};

use crate::backend::{
    collections, DocumentStore, ListenerGuard, ProfileEvent, ProfileWatch, WRITE_BATCH_LIMIT,
};
use crate::error::AppError;
use crate::models::{Post, PostAuthorFields, ProfileDoc};

/// Buffer of the profile-event channel; the session store drains promptly.
const WATCH_CHANNEL_CAPACITY: usize = 16;

/// Listener target id for the profile-document subscription.
const PROFILE_TARGET_ID: u32 = 1;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreStore {
    /// Connect to the project's Firestore database. When
    /// `FIRESTORE_EMULATOR_HOST` is set, connects to the emulator without
    /// real credentials instead.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::connect_emulator(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Store(format!("Firestore connection failed: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    async fn connect_emulator(project_id: &str) -> Result<Self, AppError> {
        // The emulator ignores auth, but the SDK still wants a token source;
        // a static unsigned JWT keeps real ADC credentials out of the picture.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let client = firestore::FirestoreDb::with_options_token_source(
            firestore::FirestoreDbOptions::new(project_id.to_string()),
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| AppError::Store(format!("Emulator connection failed: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore emulator");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Offline store for tests and demos; every operation fails cleanly.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Store("Database not connected (offline mode)".to_string()))
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get_profile(&self, uid: &str) -> Result<Option<ProfileDoc>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Store(e.to_string()))
    }

    async fn create_profile(&self, uid: &str, doc: &ProfileDoc) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(uid)
            .object(doc)
            .execute()
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;
        Ok(())
    }

    async fn merge_profile(&self, uid: &str, patch: &ProfileDoc) -> Result<(), AppError> {
        let fields = patch.present_fields();
        if fields.is_empty() {
            return Ok(());
        }

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(fields)
            .in_col(collections::USERS)
            .document_id(uid)
            .object(patch)
            .execute()
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;
        Ok(())
    }

    /// Points are a server-side increment and the mission id a server-side
    /// set-union, so concurrent edits from other sessions cannot lose
    /// updates.
    async fn grant_mission_reward(
        &self,
        uid: &str,
        mission: &str,
        points: i64,
    ) -> Result<(), AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Store(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(uid)
            .transforms(|t| {
                t.fields([
                    t.field("points").increment(points),
                    t.field("completed_missions")
                        .append_missing_elements([mission.to_string()]),
                ])
            })
            .only_transform()
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Store(format!("Failed to add reward transform: {}", e)))?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Store(format!("Reward commit failed: {}", e)))?;

        Ok(())
    }

    async fn posts_by_author(&self, uid: &str) -> Result<Vec<Post>, AppError> {
        let author_id = uid.to_string();
        let stream = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::POSTS)
            .filter(move |q| q.for_all([q.field("author_id").eq(&author_id)]))
            .obj::<Post>()
            .stream_query_with_errors()
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;

        stream
            .try_collect()
            .await
            .map_err(|e| AppError::Store(e.to_string()))
    }

    async fn update_post_authors(
        &self,
        post_ids: &[String],
        fields: &PostAuthorFields,
    ) -> Result<(), AppError> {
        let client = self.get_client()?;

        let mut field_mask = vec!["author_name".to_string()];
        if fields.author_avatar.is_some() {
            field_mask.push("author_avatar".to_string());
        }

        for chunk in post_ids.chunks(WRITE_BATCH_LIMIT) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Store(format!("Failed to begin transaction: {}", e)))?;

            for post_id in chunk {
                client
                    .fluent()
                    .update()
                    .fields(field_mask.clone())
                    .in_col(collections::POSTS)
                    .document_id(post_id)
                    .object(fields)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Store(format!(
                            "Failed to add post update to transaction: {}",
                            e
                        ))
                    })?;
            }

            transaction
                .commit()
                .await
                .map_err(|e| AppError::Store(format!("Post backfill commit failed: {}", e)))?;
        }

        tracing::debug!(count = post_ids.len(), "Post author fields committed");
        Ok(())
    }

    async fn watch_profile(&self, uid: &str) -> Result<ProfileWatch, AppError> {
        let client = self.get_client()?.clone();
        let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);

        // First snapshot is served from a direct read, so the subscriber
        // learns about a missing document too; the listener then takes over.
        let initial = self.get_profile(uid).await?;
        let _ = tx.send(ProfileEvent::Snapshot(initial)).await;

        let mut listener = client
            .create_listener(firestore::FirestoreTempFilesListenStateStorage::new())
            .await
            .map_err(|e| AppError::Store(format!("Failed to create listener: {}", e)))?;

        client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .batch_listen([uid.to_string()])
            .add_target(
                firestore::FirestoreListenerTarget::new(PROFILE_TARGET_ID),
                &mut listener,
            )
            .map_err(|e| AppError::Store(format!("Failed to add listener target: {}", e)))?;

        let events_tx = tx.clone();
        listener
            .start(move |event| {
                let tx = events_tx.clone();
                async move {
                    match event {
                        firestore::FirestoreListenEvent::DocumentChange(ref change) => {
                            if let Some(doc) = &change.document {
                                let event = match firestore::FirestoreDb::deserialize_doc_to::<
                                    ProfileDoc,
                                >(doc)
                                {
                                    Ok(profile) => ProfileEvent::Snapshot(Some(profile)),
                                    Err(e) => ProfileEvent::Error(e.to_string()),
                                };
                                let _ = tx.send(event).await;
                            }
                        }
                        firestore::FirestoreListenEvent::DocumentDelete(_) => {
                            let _ = tx.send(ProfileEvent::Snapshot(None)).await;
                        }
                        _ => {}
                    }
                    Ok(())
                }
            })
            .await
            .map_err(|e| AppError::Store(format!("Failed to start listener: {}", e)))?;

        // The guard is synchronous; actual listener shutdown is asynchronous
        // and runs on a detached task. Stale events that slip through before
        // shutdown completes are fenced by the session store's epoch.
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = cancel_rx.await;
            if let Err(e) = listener.shutdown().await {
                tracing::warn!(error = %e, "Profile listener shutdown failed");
            }
        });

        let guard = ListenerGuard::new(move || {
            let _ = cancel_tx.send(());
        });

        Ok(ProfileWatch { events: rx, guard })
    }
}
