//! Pure reconciliation of the two-stage profile value.
//!
//! The profile shown to views goes through two stages: a *provisional*
//! projection derived from identity fields alone, and a *confirmed* record
//! once the document subscription delivers a snapshot. Reconciliation is
//! pure so it can be tested without any transport.

use crate::models::{Profile, ProfileDoc};

/// Profile value tagged with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileState {
    /// Built from identity fields only; no snapshot seen yet.
    Provisional(Profile),
    /// At least one document snapshot has been merged in.
    Confirmed(Profile),
}

impl ProfileState {
    /// The effective profile, regardless of stage.
    pub fn profile(&self) -> &Profile {
        match self {
            ProfileState::Provisional(p) | ProfileState::Confirmed(p) => p,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, ProfileState::Confirmed(_))
    }

    fn into_profile(self) -> Profile {
        match self {
            ProfileState::Provisional(p) | ProfileState::Confirmed(p) => p,
        }
    }
}

/// Apply one subscription snapshot to the current state.
///
/// A missing document leaves the current state untouched (the provisional
/// projection stays effective until registration's document write lands).
/// A present document merges field-by-field and promotes to `Confirmed`.
pub fn apply_snapshot(state: ProfileState, doc: Option<&ProfileDoc>) -> ProfileState {
    match doc {
        None => state,
        Some(doc) => {
            let mut profile = state.into_profile();
            profile.merge_snapshot(doc);
            ProfileState::Confirmed(profile)
        }
    }
}
