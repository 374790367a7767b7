//! # folio-http
//!
//! The web side of folio: configuration, logging, viewer resolution, forms,
//! rendering, request handlers and the page cache in front of the index.
//!
//! [`build_router`] assembles everything into an axum [`Router`];
//! [`server::serve`] runs it with graceful shutdown.

pub mod auth;
pub mod config;
pub mod error;
pub mod forms;
pub mod logging;
pub mod media;
pub mod page_cache;
pub mod render;
pub mod routes;
pub mod server;
pub mod testing;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::Router;
use folio_cache::{Cache, CacheBackend, CacheConfig, MemoryBackend};
use folio_store::{MemoryStore, Paginator, SocialGraph, Store};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use auth::{CurrentViewer, RequireUser};
pub use config::{AppConfig, ConfigError, LogFormat};
pub use error::{HttpError, HttpResult};
pub use logging::{init_logging, LoggingConfig};
pub use media::{LocalStorage, MediaStorage, MemoryStorage};
pub use render::{RenderError, RenderedPage, Renderer, TemplateRenderer};
pub use routes::Found;

/// Everything a handler can reach
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub social: SocialGraph,
    pub paginator: Paginator,
    pub renderer: Arc<dyn Renderer>,
    pub media: Arc<dyn MediaStorage>,
    pub page_cache: Cache<Arc<dyn CacheBackend>>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn Store>,
        media: Arc<dyn MediaStorage>,
        page_cache: Arc<dyn CacheBackend>,
    ) -> Result<Self, RenderError> {
        Ok(Self {
            social: SocialGraph::new(store.clone()),
            paginator: Paginator::new(config.posts_per_page),
            renderer: Arc::new(TemplateRenderer::new()?),
            page_cache: Cache::with_default_ttl(page_cache, config.page_cache_ttl()),
            store,
            media,
            config: Arc::new(config),
        })
    }

    /// Process-local store, media and cache
    pub fn in_memory(config: AppConfig) -> Result<Self, RenderError> {
        let cache = MemoryBackend::new(
            CacheConfig::builder()
                .default_ttl_duration(config.page_cache_ttl())
                .build_config(),
        );
        Self::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStorage::new()),
            Arc::new(cache),
        )
    }
}

/// The application with its middleware stack
///
/// ```text
///   TraceLayer
///   TimeoutLayer
///   RequestBodyLimitLayer
///   resolve_viewer
///   render_error_pages
///   page_cache
///   handler
/// ```
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();
    routes::routes()
        .nest_service("/media", ServeDir::new(&config.media_root))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            page_cache::page_cache,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            error::render_error_pages,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::resolve_viewer,
        ))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_request_size))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
