// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod identity;
pub mod post;
pub mod profile;
pub mod view;

pub use identity::Identity;
pub use post::{Post, PostAuthorFields};
pub use profile::{
    MissingCriterion, Profile, ProfileDoc, ProfileEdits, MISSION_PROFILE, PROFILE_REWARD_POINTS,
};
pub use view::ViewState;
