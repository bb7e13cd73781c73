use bulletin::{PostService, SledPostRepository};
use shared::config::Config;
use std::path::Path;
use std::sync::Arc;
use storage_engine::MokaCache;

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub post_service: Arc<PostService>,
}

impl AppState {
    pub fn new(post_service: Arc<PostService>) -> Self {
        Self { post_service }
    }

    /// Open the document store under the data dir and wire it to a fresh cache
    pub fn from_config(config: &Config) -> shared::Result<Self> {
        let repository = SledPostRepository::new(Path::new(&config.data_dir).join("posts.sled"))?;

        let cache = match config.cache_max_entries {
            Some(capacity) => MokaCache::new_bounded(capacity),
            None => MokaCache::new_unbounded(),
        };

        let post_service =
            PostService::new(Arc::new(repository), Arc::new(cache)).with_ttl(config.cache_ttl);

        tracing::info!(
            "PostService ready (data_dir={}, ttl={}ms)",
            config.data_dir,
            post_service.ttl().0
        );

        Ok(Self::new(Arc::new(post_service)))
    }
}
