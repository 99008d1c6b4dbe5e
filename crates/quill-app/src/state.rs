use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::extract::FromRef;
use quill_auth::token::TokenManager;
use sqlx::Pool;
use url::Url;

use crate::{cache::PageCache, error::Result, media::MediaStore};

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(app_config: AppConfig, pool: Pool<sqlx::Sqlite>, tokens: TokenManager) -> Self {
        let media = MediaStore::new(app_config.media_dir.clone());
        let page_cache = PageCache::new(app_config.feed_cache_ttl);
        AppState {
            state: Arc::new(AppStateInner {
                app_config,
                pool,
                tokens,
                media,
                page_cache,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn build_url(&self, relative_url: &str) -> Result<Url> {
        let base = &self.config().base_url;
        let url = base.join(relative_url)?;
        Ok(url)
    }

    pub fn pool(&self) -> &Pool<sqlx::Sqlite> {
        &self.state.pool
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.state.tokens
    }

    pub fn media(&self) -> &MediaStore {
        &self.state.media
    }

    pub fn page_cache(&self) -> &PageCache {
        &self.state.page_cache
    }
}

impl FromRef<AppState> for () {
    fn from_ref(_: &AppState) {}
}

struct AppStateInner {
    app_config: AppConfig,
    pool: Pool<sqlx::Sqlite>,
    tokens: TokenManager,
    media: MediaStore,
    page_cache: PageCache,
}

pub struct AppConfig {
    pub base_url: Url,
    pub default_page_size: u32,
    pub media_dir: PathBuf,
    pub feed_cache_ttl: Duration,
}
