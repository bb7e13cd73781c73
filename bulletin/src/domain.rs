use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod response {
    /// Acknowledgement of a repository write.
    ///
    /// `matched` is false when the addressed document (or embedded comment)
    /// did not exist; the write is then a no-op and still reported as success.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct WriteAck {
        pub matched: bool,
    }

    impl WriteAck {
        pub fn new(matched: bool) -> Self {
            Self { matched }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub created_time: DateTime<Utc>,
    pub updated_time: DateTime<Utc>,
    pub user_id: String,
}

impl Comment {
    pub fn new(content: impl Into<String>, user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            created_time: now,
            updated_time: now,
            user_id: user_id.into(),
        }
    }

    pub fn revise(&mut self, content: impl Into<String>, user_id: impl Into<String>) {
        self.content = content.into();
        self.user_id = user_id.into();
        self.updated_time = next_timestamp(self.updated_time);
    }
}

/// A post document with its embedded comments, in insertion order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub content: String,
    pub created_time: DateTime<Utc>,
    pub updated_time: DateTime<Utc>,
    pub user_id: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Post {
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            content: content.into(),
            created_time: now,
            updated_time: now,
            user_id: user_id.into(),
            comments: Vec::new(),
        }
    }

    pub fn revise(&mut self, content: impl Into<String>, user_id: impl Into<String>) {
        self.content = content.into();
        self.user_id = user_id.into();
        self.updated_time = next_timestamp(self.updated_time);
    }

    /// Linear scan of the embedded list, O(number of comments)
    pub fn find_comment(&self, comment_id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }

    pub fn find_comment_mut(&mut self, comment_id: &str) -> Option<&mut Comment> {
        self.comments.iter_mut().find(|c| c.id == comment_id)
    }

    /// Pulls every comment carrying `comment_id`, returns whether any matched
    pub fn remove_comment(&mut self, comment_id: &str) -> bool {
        let before = self.comments.len();
        self.comments.retain(|c| c.id != comment_id);
        self.comments.len() != before
    }
}

// Wall clock, but strictly after `previous` so updated_time always advances.
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}
