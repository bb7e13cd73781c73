pub mod sled_repository;

pub use sled_repository::SledPostRepository;
