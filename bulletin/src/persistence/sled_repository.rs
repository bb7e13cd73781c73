use crate::domain::response::WriteAck;
use crate::domain::{Comment, Post};
use crate::ports::PostRepository;
use async_trait::async_trait;
use shared::{Error, Result};
use sled::{Db, Tree};
use std::fmt::Display;
use std::path::Path;
use tracing::debug;

const POSTS_TREE: &str = "posts";

/// Sled-backed document collection of posts.
///
/// Every post is one JSON document keyed by its id, comments embedded.
/// Each operation opens its own tree handle, dropped on every exit path.
#[derive(Clone)]
pub struct SledPostRepository {
    db: Db,
}

impl SledPostRepository {
    /// Open (or create) the database at `path`, creating parent directories
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(storage_error)?;
        }

        let db = sled::open(path).map_err(storage_error)?;
        Ok(Self { db })
    }

    fn posts_tree(&self) -> Result<Tree> {
        self.db.open_tree(POSTS_TREE).map_err(storage_error)
    }

    // 24 hex digits, same shape as a document store object id
    fn next_post_id(&self) -> Result<String> {
        let id = self.db.generate_id().map_err(storage_error)?;
        Ok(format!("{:024x}", id))
    }

    fn flush(&self, tree: &Tree) -> Result<()> {
        tree.flush().map_err(storage_error)?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn put_document(&self, post: &Post) -> Result<()> {
        self.posts_tree()?
            .insert(post.id.as_bytes(), encode(post)?)
            .map_err(storage_error)?;
        Ok(())
    }
}

fn storage_error(err: impl Display) -> Error {
    Error::Repository(err.to_string())
}

fn encode(post: &Post) -> Result<Vec<u8>> {
    serde_json::to_vec(post).map_err(storage_error)
}

fn decode(bytes: &[u8]) -> Result<Post> {
    serde_json::from_slice(bytes).map_err(storage_error)
}

/// Atomic read-modify-write of a single post document.
///
/// `mutate` returns whether it changed anything. A missing document is left
/// missing (never resurrected); a concurrent change to the same document
/// causes a retry against the fresh copy.
fn modify_document<F>(tree: &Tree, id: &str, mut mutate: F) -> Result<bool>
where
    F: FnMut(&mut Post) -> bool,
{
    loop {
        let Some(current) = tree.get(id.as_bytes()).map_err(storage_error)? else {
            return Ok(false);
        };

        let mut post = decode(&current)?;
        if !mutate(&mut post) {
            return Ok(false);
        }

        let swapped = tree
            .compare_and_swap(id.as_bytes(), Some(&current), Some(encode(&post)?))
            .map_err(storage_error)?;

        match swapped {
            Ok(()) => return Ok(true),
            Err(_) => debug!("Post {} changed during update, retrying", id),
        }
    }
}

#[async_trait]
impl PostRepository for SledPostRepository {
    async fn list_posts(&self) -> Result<Vec<Post>> {
        let tree = self.posts_tree()?;
        let mut posts = Vec::new();

        for item in tree.iter() {
            let (_, document) = item.map_err(storage_error)?;
            posts.push(decode(&document)?);
        }

        Ok(posts)
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>> {
        let tree = self.posts_tree()?;

        match tree.get(id.as_bytes()).map_err(storage_error)? {
            Some(document) => Ok(Some(decode(&document)?)),
            None => Ok(None),
        }
    }

    async fn create_post(&self, content: &str, user_id: &str) -> Result<String> {
        let tree = self.posts_tree()?;
        let post = Post::new(self.next_post_id()?, content, user_id);

        tree.insert(post.id.as_bytes(), encode(&post)?)
            .map_err(storage_error)?;
        self.flush(&tree)?;

        debug!("Inserted post {}", post.id);
        Ok(post.id)
    }

    async fn update_post(&self, id: &str, content: &str, user_id: &str) -> Result<WriteAck> {
        let tree = self.posts_tree()?;

        let matched = modify_document(&tree, id, |post| {
            post.revise(content, user_id);
            true
        })?;
        self.flush(&tree)?;

        debug!("Updated post {} (matched: {})", id, matched);
        Ok(WriteAck::new(matched))
    }

    async fn delete_post(&self, id: &str) -> Result<WriteAck> {
        let tree = self.posts_tree()?;

        let removed = tree.remove(id.as_bytes()).map_err(storage_error)?.is_some();
        self.flush(&tree)?;

        debug!("Deleted post {} (matched: {})", id, removed);
        Ok(WriteAck::new(removed))
    }

    async fn create_comment(
        &self,
        post_id: &str,
        content: &str,
        user_id: &str,
    ) -> Result<String> {
        let tree = self.posts_tree()?;
        let comment = Comment::new(content, user_id);

        let pushed = modify_document(&tree, post_id, |post| {
            post.comments.push(comment.clone());
            true
        })?;
        self.flush(&tree)?;

        debug!(
            "Pushed comment {} onto post {} (matched: {})",
            comment.id, post_id, pushed
        );
        Ok(comment.id)
    }

    async fn get_comment(&self, post_id: &str, comment_id: &str) -> Result<Option<Comment>> {
        let post = self.get_post(post_id).await?;
        Ok(post.and_then(|p| p.find_comment(comment_id).cloned()))
    }

    async fn update_comment(
        &self,
        post_id: &str,
        comment_id: &str,
        content: &str,
        user_id: &str,
    ) -> Result<WriteAck> {
        let tree = self.posts_tree()?;

        let matched = modify_document(&tree, post_id, |post| {
            match post.find_comment_mut(comment_id) {
                Some(comment) => {
                    comment.revise(content, user_id);
                    true
                }
                None => false,
            }
        })?;
        self.flush(&tree)?;

        debug!(
            "Updated comment {} on post {} (matched: {})",
            comment_id, post_id, matched
        );
        Ok(WriteAck::new(matched))
    }

    async fn delete_comment(&self, post_id: &str, comment_id: &str) -> Result<WriteAck> {
        let tree = self.posts_tree()?;

        let pulled = modify_document(&tree, post_id, |post| post.remove_comment(comment_id))?;
        self.flush(&tree)?;

        debug!(
            "Pulled comment {} from post {} (matched: {})",
            comment_id, post_id, pulled
        );
        Ok(WriteAck::new(pulled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn open_repo(temp_dir: &TempDir) -> SledPostRepository {
        SledPostRepository::new(temp_dir.path().join("posts.sled")).unwrap()
    }

    #[tokio::test]
    async fn test_post_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let repo = open_repo(&temp_dir);

        let id = repo.create_post("hello", "u1").await.unwrap();
        assert_eq!(id.len(), 24);

        let post = repo.get_post(&id).await.unwrap().unwrap();
        assert_eq!(post.id, id);
        assert_eq!(post.content, "hello");
        assert_eq!(post.user_id, "u1");
        assert_eq!(post.created_time, post.updated_time);
        assert!(post.comments.is_empty());
    }

    #[tokio::test]
    async fn test_missing_post_is_absent_not_error() {
        let temp_dir = TempDir::new().unwrap();
        let repo = open_repo(&temp_dir);

        assert!(repo.get_post("nope").await.unwrap().is_none());
        assert!(repo.get_comment("nope", "c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_posts() {
        let temp_dir = TempDir::new().unwrap();
        let repo = open_repo(&temp_dir);

        assert!(repo.list_posts().await.unwrap().is_empty());

        let first = repo.create_post("one", "u1").await.unwrap();
        let second = repo.create_post("two", "u2").await.unwrap();
        assert_ne!(first, second);

        let posts = repo.list_posts().await.unwrap();
        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(posts.len(), 2);
        assert!(ids.contains(&first.as_str()));
        assert!(ids.contains(&second.as_str()));
    }

    #[tokio::test]
    async fn test_update_post_keeps_identity_and_advances_time() {
        let temp_dir = TempDir::new().unwrap();
        let repo = open_repo(&temp_dir);

        let id = repo.create_post("hi", "u1").await.unwrap();
        let before = repo.get_post(&id).await.unwrap().unwrap();

        let ack = repo.update_post(&id, "bye", "u2").await.unwrap();
        assert!(ack.matched);

        let after = repo.get_post(&id).await.unwrap().unwrap();
        assert_eq!(after.id, before.id);
        assert_eq!(after.created_time, before.created_time);
        assert!(after.updated_time > before.updated_time);
        assert_eq!(after.content, "bye");
        assert_eq!(after.user_id, "u2");
    }

    #[tokio::test]
    async fn test_update_missing_post_is_unmatched_noop() {
        let temp_dir = TempDir::new().unwrap();
        let repo = open_repo(&temp_dir);

        let ack = repo.update_post("missing", "bye", "u1").await.unwrap();
        assert!(!ack.matched);
        assert!(repo.get_post("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_post_removes_embedded_comments() {
        let temp_dir = TempDir::new().unwrap();
        let repo = open_repo(&temp_dir);

        let id = repo.create_post("hi", "u1").await.unwrap();
        let comment_id = repo.create_comment(&id, "c", "u2").await.unwrap();

        assert!(repo.delete_post(&id).await.unwrap().matched);
        assert!(repo.get_post(&id).await.unwrap().is_none());
        assert!(repo.get_comment(&id, &comment_id).await.unwrap().is_none());
        assert!(!repo.delete_post(&id).await.unwrap().matched);
    }

    #[tokio::test]
    async fn test_comment_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let repo = open_repo(&temp_dir);

        let post_id = repo.create_post("hi", "u1").await.unwrap();
        let comment_id = repo.create_comment(&post_id, "nice", "u2").await.unwrap();

        let comment = repo.get_comment(&post_id, &comment_id).await.unwrap().unwrap();
        assert_eq!(comment.id, comment_id);
        assert_eq!(comment.content, "nice");
        assert_eq!(comment.user_id, "u2");
        assert_eq!(comment.created_time, comment.updated_time);

        assert!(repo.delete_comment(&post_id, &comment_id).await.unwrap().matched);
        assert!(repo.get_comment(&post_id, &comment_id).await.unwrap().is_none());
        assert!(repo.get_post(&post_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_comments_keep_insertion_order() {
        let temp_dir = TempDir::new().unwrap();
        let repo = open_repo(&temp_dir);

        let post_id = repo.create_post("hi", "u1").await.unwrap();
        let a = repo.create_comment(&post_id, "same", "u2").await.unwrap();
        let b = repo.create_comment(&post_id, "same", "u3").await.unwrap();
        let c = repo.create_comment(&post_id, "other", "u2").await.unwrap();

        let post = repo.get_post(&post_id).await.unwrap().unwrap();
        let ids: Vec<String> = post.comments.into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[tokio::test]
    async fn test_update_comment_sets_only_the_match() {
        let temp_dir = TempDir::new().unwrap();
        let repo = open_repo(&temp_dir);

        let post_id = repo.create_post("hi", "u1").await.unwrap();
        let target = repo.create_comment(&post_id, "first", "u2").await.unwrap();
        let other = repo.create_comment(&post_id, "second", "u3").await.unwrap();
        let before = repo.get_comment(&post_id, &target).await.unwrap().unwrap();

        let ack = repo
            .update_comment(&post_id, &target, "edited", "u4")
            .await
            .unwrap();
        assert!(ack.matched);

        let updated = repo.get_comment(&post_id, &target).await.unwrap().unwrap();
        assert_eq!(updated.content, "edited");
        assert_eq!(updated.user_id, "u4");
        assert_eq!(updated.created_time, before.created_time);
        assert!(updated.updated_time > before.updated_time);

        let untouched = repo.get_comment(&post_id, &other).await.unwrap().unwrap();
        assert_eq!(untouched.content, "second");
    }

    #[tokio::test]
    async fn test_comment_writes_on_missing_targets_are_noops() {
        let temp_dir = TempDir::new().unwrap();
        let repo = open_repo(&temp_dir);

        // Append to a missing post still hands back an id, but stores nothing
        let orphan = repo.create_comment("missing", "c", "u1").await.unwrap();
        assert!(!orphan.is_empty());
        assert!(repo.get_post("missing").await.unwrap().is_none());
        assert!(repo.list_posts().await.unwrap().is_empty());

        let post_id = repo.create_post("hi", "u1").await.unwrap();
        let ack = repo
            .update_comment(&post_id, "nope", "c", "u1")
            .await
            .unwrap();
        assert!(!ack.matched);
        assert!(!repo.delete_comment(&post_id, "nope").await.unwrap().matched);

        let post = repo.get_post(&post_id).await.unwrap().unwrap();
        assert!(post.comments.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_comment_pushes_are_not_lost() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Arc::new(open_repo(&temp_dir));
        let post_id = repo.create_post("busy", "u1").await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let repo = Arc::clone(&repo);
            let post_id = post_id.clone();
            handles.push(tokio::spawn(async move {
                repo.create_comment(&post_id, &format!("c{}", i), "u2")
                    .await
                    .unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }

        let post = repo.get_post(&post_id).await.unwrap().unwrap();
        assert_eq!(post.comments.len(), 16);
        for id in ids {
            assert!(post.find_comment(&id).is_some());
        }
    }
}
