//! Feed post model.
//!
//! Posts denormalize the author's name and avatar for cheap feed rendering;
//! the profile updater backfills those fields after a profile edit.

use serde::{Deserialize, Serialize};

/// A feed post as stored in the `posts` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Document id.
    pub id: String,
    /// Identity uid of the author.
    pub author_id: String,
    /// Denormalized author display name at posting time.
    pub author_name: String,
    /// Denormalized author avatar at posting time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_avatar: Option<String>,
    /// Post body.
    pub body: String,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
}

/// Denormalized author fields pushed onto existing posts after a profile
/// edit. Kept separate from `Post` so the backfill is a field-scoped merge
/// write, never a full replace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostAuthorFields {
    pub author_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_avatar: Option<String>,
}
