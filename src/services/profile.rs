// SPDX-License-Identifier: MIT

//! Profile editing and the one-time profile-completion reward.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::backend::DocumentStore;
use crate::error::{AppError, Result};
use crate::models::{
    MissingCriterion, PostAuthorFields, Profile, ProfileDoc, ProfileEdits,
    MISSION_PROFILE, PROFILE_REWARD_POINTS,
};

/// Hard ceiling on the decoded avatar payload.
pub const AVATAR_MAX_BYTES: usize = 2 * 1024 * 1024;

/// What happened to the reward on a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Criteria met for the first time; 100 points granted.
    RewardGranted,
    /// Saved, but these criteria are still missing.
    NotYetEligible(Vec<MissingCriterion>),
    /// Saved; the reward was granted on an earlier save.
    AlreadyGranted,
}

/// Persists profile edits and grants the completion reward at most once.
pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Save a profile edit.
    ///
    /// 1. Validates the avatar payload size before any write.
    /// 2. Merge-writes the edited fields (untouched fields survive).
    /// 3. Grants the `"profile"` mission reward if eligibility is met for
    ///    the first time, as an atomic increment + set-union on the store.
    /// 4. Backfills denormalized author fields on the user's existing posts,
    ///    best effort.
    pub async fn save_profile(
        &self,
        uid: &str,
        edits: ProfileEdits,
        avatar: Option<&str>,
    ) -> Result<SaveOutcome> {
        if let Some(avatar) = avatar {
            let size = avatar_byte_len(avatar)?;
            if size > AVATAR_MAX_BYTES {
                return Err(AppError::Validation {
                    field: "avatar",
                    message: "A imagem deve ter no máximo 2 MB.".to_string(),
                });
            }
        }

        let patch = ProfileDoc {
            name: edits.name.clone(),
            job_title: edits.job_title.clone(),
            department: edits.department.clone(),
            phone: edits.phone.clone(),
            bio: edits.bio.clone(),
            avatar_url: avatar.map(String::from),
            ..ProfileDoc::default()
        };
        self.store.merge_profile(uid, &patch).await?;

        // Re-read the merged document; eligibility is judged on the result
        // of the write, not on what this client thinks it sent.
        let profile = self.current_profile(uid).await?;

        let outcome = if profile.profile_reward_granted() {
            SaveOutcome::AlreadyGranted
        } else {
            let missing = profile.reward_criteria_missing();
            if missing.is_empty() {
                self.store
                    .grant_mission_reward(uid, MISSION_PROFILE, PROFILE_REWARD_POINTS)
                    .await?;
                tracing::info!(uid, points = PROFILE_REWARD_POINTS, "Profile reward granted");
                SaveOutcome::RewardGranted
            } else {
                SaveOutcome::NotYetEligible(missing)
            }
        };

        // Fire-and-forget relative to the save outcome: stale authorship on
        // old posts is tolerable, a failed save is not.
        if let Err(e) = self.propagate_author_fields(uid, &profile).await {
            tracing::warn!(uid, error = %e, "Post author backfill failed");
        }

        Ok(outcome)
    }

    async fn current_profile(&self, uid: &str) -> Result<Profile> {
        let doc = self.store.get_profile(uid).await?.unwrap_or_default();
        let mut profile = Profile {
            name: String::new(),
            avatar_url: None,
            role: String::new(),
            job_title: None,
            department: None,
            phone: None,
            bio: None,
            points: 0,
            completed_missions: Default::default(),
        };
        profile.merge_snapshot(&doc);
        Ok(profile)
    }

    /// Push the new name/avatar onto every post this user authored.
    async fn propagate_author_fields(&self, uid: &str, profile: &Profile) -> Result<()> {
        let posts = self.store.posts_by_author(uid).await?;
        if posts.is_empty() {
            return Ok(());
        }

        let ids: Vec<String> = posts.into_iter().map(|p| p.id).collect();
        let fields = PostAuthorFields {
            author_name: profile.name.clone(),
            author_avatar: profile.avatar_url.clone(),
        };

        self.store.update_post_authors(&ids, &fields).await?;
        tracing::debug!(uid, count = ids.len(), "Post author fields updated");
        Ok(())
    }
}

/// Decoded byte length of an avatar payload.
///
/// Accepts a `data:` URL or a bare base64 string, which is how the profile
/// editor hands the image over.
fn avatar_byte_len(avatar: &str) -> Result<usize> {
    let b64 = match avatar.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => avatar,
    };

    BASE64
        .decode(b64.trim())
        .map(|bytes| bytes.len())
        .map_err(|_| AppError::Validation {
            field: "avatar",
            message: "Imagem inválida.".to_string(),
        })
}
