//! In-memory repositories - used when no database is configured, and in tests.
//!
//! Data is lost on process restart.

use std::cmp::Reverse;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use yatube_core::domain::{Group, Post, User};
use yatube_core::error::RepoError;
use yatube_core::ports::{
    BaseRepository, GroupRepository, PostFilter, PostRepository, UserRepository,
};

/// In-memory user store. Usernames are unique.
#[derive(Default)]
pub struct InMemoryUserRepository {
    store: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.store.read().await.get(&id).cloned())
    }

    async fn insert(&self, user: User) -> Result<User, RepoError> {
        let mut store = self.store.write().await;

        if store.contains_key(&user.id) {
            return Err(RepoError::Constraint(format!("user {} exists", user.id)));
        }
        if store.values().any(|u| u.username == user.username) {
            return Err(RepoError::Constraint(format!(
                "username {} is taken",
                user.username
            )));
        }

        store.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let store = self.store.read().await;
        Ok(store.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let store = self.store.read().await;
        Ok(ids.iter().filter_map(|id| store.get(id).cloned()).collect())
    }
}

/// In-memory group store. Slugs are unique.
#[derive(Default)]
pub struct InMemoryGroupRepository {
    store: RwLock<HashMap<Uuid, Group>>,
}

impl InMemoryGroupRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<Group, Uuid> for InMemoryGroupRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Group>, RepoError> {
        Ok(self.store.read().await.get(&id).cloned())
    }

    async fn insert(&self, group: Group) -> Result<Group, RepoError> {
        let mut store = self.store.write().await;

        if store.contains_key(&group.id) {
            return Err(RepoError::Constraint(format!("group {} exists", group.id)));
        }
        if store.values().any(|g| g.slug == group.slug) {
            return Err(RepoError::Constraint(format!(
                "slug {} is taken",
                group.slug
            )));
        }

        store.insert(group.id, group.clone());
        Ok(group)
    }
}

#[async_trait]
impl GroupRepository for InMemoryGroupRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
        let store = self.store.read().await;
        Ok(store.values().find(|g| g.slug == slug).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Group>, RepoError> {
        let store = self.store.read().await;
        Ok(ids.iter().filter_map(|id| store.get(id).cloned()).collect())
    }

    async fn list_all(&self) -> Result<Vec<Group>, RepoError> {
        let store = self.store.read().await;
        let mut groups: Vec<Group> = store.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }
}

/// In-memory post store.
///
/// Does not check that authors or groups exist; the handlers only ever
/// store ids they have just resolved.
#[derive(Default)]
pub struct InMemoryPostRepository {
    store: RwLock<HashMap<Uuid, Post>>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.store.read().await.get(&id).cloned())
    }

    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        let mut store = self.store.write().await;

        if store.contains_key(&post.id) {
            return Err(RepoError::Constraint(format!("post {} exists", post.id)));
        }

        store.insert(post.id, post.clone());
        Ok(post)
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn count(&self, filter: PostFilter) -> Result<u64, RepoError> {
        let store = self.store.read().await;
        Ok(store.values().filter(|p| filter.matches(p)).count() as u64)
    }

    async fn list(
        &self,
        filter: PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let store = self.store.read().await;

        let mut posts: Vec<&Post> = store.values().filter(|p| filter.matches(p)).collect();
        posts.sort_by_key(|p| Reverse((p.pub_date, p.id)));

        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);

        Ok(posts
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_content(
        &self,
        id: Uuid,
        text: &str,
        group_id: Option<Uuid>,
        expected_revision: Option<i32>,
    ) -> Result<Post, RepoError> {
        let mut store = self.store.write().await;
        let post = store.get_mut(&id).ok_or(RepoError::NotFound)?;

        if expected_revision.is_some_and(|expected| expected != post.revision) {
            return Err(RepoError::Stale);
        }

        post.text = text.to_string();
        post.group_id = group_id;
        post.revision += 1;

        Ok(post.clone())
    }
}
