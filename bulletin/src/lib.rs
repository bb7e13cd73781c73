#![deny(clippy::all)]

pub mod domain;
pub mod persistence;
pub mod ports;
pub mod post_service;

pub use domain::{Comment, Post};
pub use persistence::SledPostRepository;
pub use ports::{EphemeralCache, PostRepository};
pub use post_service::PostService;
