//! Application-level user profile and gamification records.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::Identity;

/// Mission id granted when the profile is completed.
pub const MISSION_PROFILE: &str = "profile";
/// Points granted for completing the profile (once).
pub const PROFILE_REWARD_POINTS: i64 = 100;
/// Avatar shipped with the app shell; does not count as a real avatar.
pub const PLACEHOLDER_AVATAR: &str = "/assets/avatar-placeholder.png";
/// Role assigned to accounts that never had one set.
pub const DEFAULT_ROLE: &str = "colaborador";

/// Minimum non-whitespace characters for the bio to count as filled in.
const BIO_MIN_CHARS: usize = 5;

/// Mutable user record, keyed by identity uid in `users/{uid}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub avatar_url: Option<String>,
    pub role: String,
    pub job_title: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub points: i64,
    pub completed_missions: HashSet<String>,
}

impl Profile {
    /// Identity-derived placeholder profile, published immediately on sign-in
    /// so views never wait on document-store latency.
    pub fn provisional(identity: &Identity) -> Self {
        Self {
            name: identity.derived_name(),
            avatar_url: identity.photo_url.clone(),
            role: DEFAULT_ROLE.to_string(),
            job_title: None,
            department: None,
            phone: None,
            bio: None,
            points: 0,
            completed_missions: HashSet::new(),
        }
    }

    /// Merge an incoming document snapshot, field by field.
    ///
    /// A field absent from the snapshot never clobbers a known value; the
    /// store is authoritative only for fields it actually carries.
    pub fn merge_snapshot(&mut self, doc: &ProfileDoc) {
        if let Some(name) = &doc.name {
            self.name = name.clone();
        }
        if let Some(avatar) = &doc.avatar_url {
            self.avatar_url = Some(avatar.clone());
        }
        if let Some(role) = &doc.role {
            self.role = role.clone();
        }
        if let Some(job_title) = &doc.job_title {
            self.job_title = Some(job_title.clone());
        }
        if let Some(department) = &doc.department {
            self.department = Some(department.clone());
        }
        if let Some(phone) = &doc.phone {
            self.phone = Some(phone.clone());
        }
        if let Some(bio) = &doc.bio {
            self.bio = Some(bio.clone());
        }
        if let Some(points) = doc.points {
            self.points = points;
        }
        if let Some(missions) = &doc.completed_missions {
            self.completed_missions = missions.iter().cloned().collect();
        }
    }

    /// True when the avatar is set to something other than the app placeholder.
    pub fn has_real_avatar(&self) -> bool {
        match self.avatar_url.as_deref().map(str::trim) {
            Some("") | None => false,
            Some(url) => url != PLACEHOLDER_AVATAR,
        }
    }

    /// True when the bio counts as filled in.
    pub fn has_bio(&self) -> bool {
        self.bio
            .as_deref()
            .map(|b| b.chars().filter(|c| !c.is_whitespace()).count() >= BIO_MIN_CHARS)
            .unwrap_or(false)
    }

    /// Criteria still missing for the profile-completion reward.
    /// Empty means eligible.
    pub fn reward_criteria_missing(&self) -> Vec<MissingCriterion> {
        let mut missing = Vec::new();
        if !self.has_real_avatar() {
            missing.push(MissingCriterion::Avatar);
        }
        if !self.has_bio() {
            missing.push(MissingCriterion::Bio);
        }
        missing
    }

    /// Whether the one-time profile reward was already granted.
    pub fn profile_reward_granted(&self) -> bool {
        self.completed_missions.contains(MISSION_PROFILE)
    }
}

/// What still blocks the profile-completion reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MissingCriterion {
    Avatar,
    Bio,
}

impl MissingCriterion {
    pub fn label(&self) -> &'static str {
        match self {
            MissingCriterion::Avatar => "adicione uma foto de perfil",
            MissingCriterion::Bio => "escreva uma bio (mínimo 5 caracteres)",
        }
    }
}

/// Wire form of the profile document: every field optional, so partial
/// documents (fresh registrations, older schema versions) deserialize cleanly
/// and merge non-destructively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_missions: Option<Vec<String>>,
}

impl ProfileDoc {
    /// Field paths present in this patch, for merge-write update masks.
    pub fn present_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        let mut push = |present: bool, name: &str| {
            if present {
                fields.push(name.to_string());
            }
        };
        push(self.name.is_some(), "name");
        push(self.avatar_url.is_some(), "avatar_url");
        push(self.role.is_some(), "role");
        push(self.job_title.is_some(), "job_title");
        push(self.department.is_some(), "department");
        push(self.phone.is_some(), "phone");
        push(self.bio.is_some(), "bio");
        push(self.points.is_some(), "points");
        push(self.completed_missions.is_some(), "completed_missions");
        fields
    }

    /// Initial document written at registration time.
    pub fn initial(name: &str, email_derived_role: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            role: Some(email_derived_role.to_string()),
            points: Some(0),
            completed_missions: Some(Vec::new()),
            ..Self::default()
        }
    }
}

/// Fields a profile edit may touch. `None` means untouched: the merge write
/// never erases a field the user did not change.
#[derive(Debug, Clone, Default)]
pub struct ProfileEdits {
    pub name: Option<String>,
    pub job_title: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
}
