//! Response documents. Each mirrors what a page of the site shows.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorResponse {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupResponse {
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub revision: i32,
    pub author: AuthorResponse,
    pub group: Option<GroupResponse>,
}

/// One page of posts plus the data needed for pager controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPage {
    pub posts: Vec<PostResponse>,
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u64>,
    pub previous_page_number: Option<u64>,
}

/// GET /
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResponse {
    pub page_obj: PostPage,
}

/// GET /group/{slug}/
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupPostsResponse {
    pub group: GroupResponse,
    pub page_obj: PostPage,
}

/// GET /profile/{username}/
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub author: AuthorResponse,
    pub post_count: u64,
    pub page_obj: PostPage,
}

/// GET /posts/{id}/
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetailResponse {
    pub post: PostResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupChoice {
    pub slug: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostFormFields {
    pub text: String,
    pub group: Option<String>,
    pub revision: Option<String>,
}

/// Create/edit form, either blank, pre-filled or echoed back with errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostFormResponse {
    pub is_edit: bool,
    pub post_id: Option<Uuid>,
    pub form: PostFormFields,
    pub errors: BTreeMap<String, Vec<String>>,
    pub group_choices: Vec<GroupChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub storage: String,
    pub timestamp: DateTime<Utc>,
}
