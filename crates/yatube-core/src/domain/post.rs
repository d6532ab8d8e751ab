use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Group, User};

/// Number of characters a post shows when displayed inline.
pub const POST_PREVIEW_CHARS: usize = 15;

/// Post entity - a short text written by a user, optionally filed under a group.
///
/// `author_id` and `pub_date` are fixed at creation. `revision` starts at 1
/// and is bumped by every edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub text: String,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
    pub pub_date: DateTime<Utc>,
    pub revision: i32,
}

impl Post {
    /// Create a new post.
    pub fn new(author_id: Uuid, text: String, group_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            author_id,
            group_id,
            pub_date: Utc::now(),
            revision: 1,
        }
    }

    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.author_id == user_id
    }

    /// The first [`POST_PREVIEW_CHARS`] characters of the text.
    pub fn preview(&self) -> &str {
        match self.text.char_indices().nth(POST_PREVIEW_CHARS) {
            Some((end, _)) => &self.text[..end],
            None => &self.text,
        }
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.preview())
    }
}

/// A post together with the author and group records it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostView {
    pub post: Post,
    pub author: User,
    pub group: Option<Group>,
}
