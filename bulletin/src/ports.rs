#![deny(clippy::all)]

use crate::domain::response::WriteAck;
use crate::domain::{Comment, Post};
use async_trait::async_trait;
use bytes::Bytes;
use shared::{Result, TtlMs};

// Ports are the pluggable extension points for the document store and the side cache

/// Port for the document store holding posts with embedded comments.
///
/// A missing document is `Ok(None)` (or an unmatched `WriteAck`), never an error.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn list_posts(&self) -> Result<Vec<Post>>;

    async fn get_post(&self, id: &str) -> Result<Option<Post>>;

    /// Insert a new post and return its store-assigned id
    async fn create_post(&self, content: &str, user_id: &str) -> Result<String>;

    async fn update_post(&self, id: &str, content: &str, user_id: &str) -> Result<WriteAck>;

    /// Remove the post together with every embedded comment
    async fn delete_post(&self, id: &str) -> Result<WriteAck>;

    /// Append a comment to the post's list and return the new comment id.
    /// Appending to a missing post is a silent no-op.
    async fn create_comment(&self, post_id: &str, content: &str, user_id: &str)
    -> Result<String>;

    async fn get_comment(&self, post_id: &str, comment_id: &str) -> Result<Option<Comment>>;

    async fn update_comment(
        &self,
        post_id: &str,
        comment_id: &str,
        content: &str,
        user_id: &str,
    ) -> Result<WriteAck>;

    async fn delete_comment(&self, post_id: &str, comment_id: &str) -> Result<WriteAck>;
}

/// Port for a key-value side cache with per-entry expiry
#[async_trait]
pub trait EphemeralCache: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Store only if the key holds no live value; returns whether it was stored
    async fn set_if_absent(&self, key: &str, value: Bytes, ttl: TtlMs) -> Result<bool>;

    /// Overwrite only if the key already holds a live value; returns whether it was stored
    async fn set_if_present(&self, key: &str, value: Bytes, ttl: TtlMs) -> Result<bool>;

    async fn delete(&self, key: &str) -> Result<bool>;
}
