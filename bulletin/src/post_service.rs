use crate::domain::{Comment, Post};
use crate::ports::{EphemeralCache, PostRepository};
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{Error, Result, TtlMs};
use std::sync::Arc;
use tracing::{debug, warn};

/// Cache-aside coordinator over the post repository and the side cache.
///
/// Reads try the cache first and fill it with set-if-absent on a miss.
/// Updates re-read the repository and refresh the cache with set-if-present.
/// Deleting a post drops its cache entry; deleting a comment does not.
///
/// Cache keys are the bare post or comment id, so both share one key space.
/// A cached comment is served without checking it against the post in the
/// request, even after that post is gone.
/// Nothing here locks across the check-mutate-reconcile steps: concurrent
/// writers race and the last one wins, in the store and in the cache.
pub struct PostService {
    repository: Arc<dyn PostRepository>,
    cache: Arc<dyn EphemeralCache>,
    ttl: TtlMs,
}

impl PostService {
    pub const DEFAULT_TTL: TtlMs = TtlMs(180_000);

    pub fn new(repository: Arc<dyn PostRepository>, cache: Arc<dyn EphemeralCache>) -> Self {
        Self {
            repository,
            cache,
            ttl: Self::DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: TtlMs) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> TtlMs {
        self.ttl
    }

    /// List every post straight from the repository
    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        self.repository.list_posts().await
    }

    /// Read-through lookup of a post, cached under its id
    pub async fn get_post(&self, id: &str) -> Result<Post> {
        if let Some(post) = self.read_cached::<Post>(id).await? {
            debug!("Cache hit for post {}", id);
            return Ok(post);
        }

        debug!("Cache miss for post {}", id);
        let post = self
            .repository
            .get_post(id)
            .await?
            .ok_or_else(|| Error::PostNotFound(id.to_string()))?;

        self.populate(id, &post).await?;
        Ok(post)
    }

    pub async fn create_post(&self, content: &str, user_id: &str) -> Result<String> {
        self.repository.create_post(content, user_id).await
    }

    pub async fn update_post(&self, id: &str, content: &str, user_id: &str) -> Result<Post> {
        self.require_post(id).await?;

        self.repository.update_post(id, content, user_id).await?;

        let updated = self.require_post(id).await?;
        self.reconcile(id, &updated).await;
        Ok(updated)
    }

    /// Delete a post and drop its cache entry, returning the pre-deletion snapshot
    pub async fn delete_post(&self, id: &str) -> Result<Post> {
        let snapshot = self.require_post(id).await?;

        self.repository.delete_post(id).await?;
        self.cache.delete(id).await?;

        Ok(snapshot)
    }

    /// Comments of a post, served through the post's read-through entry
    pub async fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        Ok(self.get_post(post_id).await?.comments)
    }

    /// Read-through lookup of a comment, cached under the comment id alone
    pub async fn get_comment(&self, post_id: &str, comment_id: &str) -> Result<Comment> {
        if let Some(comment) = self.read_cached::<Comment>(comment_id).await? {
            debug!("Cache hit for comment {}", comment_id);
            return Ok(comment);
        }

        debug!("Cache miss for comment {}", comment_id);
        let Some(comment) = self.repository.get_comment(post_id, comment_id).await? else {
            self.require_post(post_id).await?;
            return Err(Error::CommentNotFound(comment_id.to_string()));
        };

        self.populate(comment_id, &comment).await?;
        Ok(comment)
    }

    pub async fn create_comment(
        &self,
        post_id: &str,
        content: &str,
        user_id: &str,
    ) -> Result<String> {
        self.require_post(post_id).await?;
        self.repository
            .create_comment(post_id, content, user_id)
            .await
    }

    pub async fn update_comment(
        &self,
        post_id: &str,
        comment_id: &str,
        content: &str,
        user_id: &str,
    ) -> Result<Comment> {
        self.require_comment(post_id, comment_id).await?;

        self.repository
            .update_comment(post_id, comment_id, content, user_id)
            .await?;

        let updated = self
            .repository
            .get_comment(post_id, comment_id)
            .await?
            .ok_or_else(|| Error::CommentNotFound(comment_id.to_string()))?;
        self.reconcile(comment_id, &updated).await;
        Ok(updated)
    }

    /// Pull a comment from its post, returning the pre-deletion snapshot.
    ///
    /// The comment's own cache entry is left to expire.
    pub async fn delete_comment(&self, post_id: &str, comment_id: &str) -> Result<Comment> {
        let snapshot = self.require_comment(post_id, comment_id).await?;

        self.repository.delete_comment(post_id, comment_id).await?;

        Ok(snapshot)
    }

    async fn require_post(&self, id: &str) -> Result<Post> {
        self.repository
            .get_post(id)
            .await?
            .ok_or_else(|| Error::PostNotFound(id.to_string()))
    }

    async fn require_comment(&self, post_id: &str, comment_id: &str) -> Result<Comment> {
        self.require_post(post_id)
            .await?
            .find_comment(comment_id)
            .cloned()
            .ok_or_else(|| Error::CommentNotFound(comment_id.to_string()))
    }

    async fn read_cached<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.cache.get(key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| Error::Cache(e.to_string())),
            None => Ok(None),
        }
    }

    async fn populate<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let stored = self
            .cache
            .set_if_absent(key, serialize(value)?, self.ttl)
            .await?;
        if !stored {
            debug!("Cache entry {} was filled concurrently, keeping it", key);
        }
        Ok(())
    }

    // Best effort: the repository write already succeeded.
    async fn reconcile<T: Serialize>(&self, key: &str, value: &T) {
        let bytes = match serialize(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Skipping cache refresh for {}: {}", key, e);
                return;
            }
        };

        match self.cache.set_if_present(key, bytes, self.ttl).await {
            Ok(true) => debug!("Refreshed cache entry {}", key),
            Ok(false) => debug!("No cache entry for {}, nothing to refresh", key),
            Err(e) => warn!("Failed to refresh cache entry {}: {}", key, e),
        }
    }
}

fn serialize<T: Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| Error::Cache(e.to_string()))
}

impl std::fmt::Debug for PostService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostService")
            .field("ttl", &self.ttl)
            .finish()
    }
}
