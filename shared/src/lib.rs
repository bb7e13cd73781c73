// shared/src/lib.rs

use std::time::Duration;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("No post found with id {0}")]
    PostNotFound(String),
    #[error("No comment found with id {0}")]
    CommentNotFound(String),
    /// Failure reported by the document store, message kept verbatim
    #[error("{0}")]
    Repository(String),
    /// Failure reported by the ephemeral cache, message kept verbatim
    #[error("{0}")]
    Cache(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::PostNotFound(_) | Error::CommentNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TtlMs(pub u64);

impl TtlMs {
    pub fn from_secs(secs: u64) -> Self {
        TtlMs(secs.saturating_mul(1000))
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }
}

pub mod config;
