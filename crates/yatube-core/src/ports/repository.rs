use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Group, Post, User};
use crate::error::RepoError;

/// Operations every entity store supports.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Persist a new entity.
    async fn insert(&self, entity: T) -> Result<T, RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    /// Batch lookup; unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError>;
}

/// Group repository.
#[async_trait]
pub trait GroupRepository: BaseRepository<Group, Uuid> {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError>;

    /// Batch lookup; unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Group>, RepoError>;

    /// Every group, ordered by title.
    async fn list_all(&self) -> Result<Vec<Group>, RepoError>;
}

/// Which posts a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostFilter {
    #[default]
    All,
    Group(Uuid),
    Author(Uuid),
}

impl PostFilter {
    pub fn matches(&self, post: &Post) -> bool {
        match self {
            PostFilter::All => true,
            PostFilter::Group(group_id) => post.group_id == Some(*group_id),
            PostFilter::Author(author_id) => post.author_id == *author_id,
        }
    }
}

/// Post repository.
///
/// Listings are ordered newest first (`pub_date` descending, then `id`
/// descending).
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    async fn count(&self, filter: PostFilter) -> Result<u64, RepoError>;

    async fn list(
        &self,
        filter: PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError>;

    /// Replace a post's text and group and bump its revision.
    ///
    /// With `expected_revision` set, the update only applies if the stored
    /// revision still matches; otherwise [`RepoError::Stale`] is returned.
    /// Returns [`RepoError::NotFound`] if the post does not exist.
    async fn update_content(
        &self,
        id: Uuid,
        text: &str,
        group_id: Option<Uuid>,
        expected_revision: Option<i32>,
    ) -> Result<Post, RepoError>;
}
