//! Request handlers and the route table

pub mod about;
pub mod follows;
pub mod posts;
pub mod profiles;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use folio_store::{Page, PageQuery, PageRequest, PostId, PostScope, PostView};
use serde_json::{json, Value};
use std::convert::Infallible;
use tracing::error;

use crate::error::{HttpError, HttpResult};
use crate::AppState;

/// `302 Found` pointing at another page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found(String);

impl Found {
    pub fn to(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn location(&self) -> &str {
        &self.0
    }
}

impl IntoResponse for Found {
    fn into_response(self) -> Response {
        match HeaderValue::try_from(self.0) {
            Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
            Err(e) => {
                error!("invalid redirect target: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", username)
}

pub fn post_detail_url(post_id: PostId) -> String {
    format!("/posts/{}/", post_id)
}

/// Post ids arrive as raw path segments; anything non-numeric is simply not a page
pub(crate) fn parse_post_id(raw: &str) -> HttpResult<PostId> {
    raw.parse::<i64>()
        .map(PostId)
        .map_err(|_| HttpError::not_found(format!("post '{}'", raw)))
}

/// The `page` query parameter; when it repeats the last value wins, and a
/// malformed query string never rejects the request
#[derive(Debug, Clone, Default)]
pub struct PageParam(pub PageQuery);

impl PageParam {
    pub fn from_query(query: Option<&str>) -> Self {
        let page = query.and_then(|raw| {
            url::form_urlencoded::parse(raw.as_bytes())
                .filter(|(name, _)| name == "page")
                .map(|(_, value)| value.into_owned())
                .last()
        });
        Self(PageQuery { page })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for PageParam
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_query(parts.uri.query()))
    }
}

/// One page of the posts in `scope`
pub(crate) async fn posts_page(
    state: &AppState,
    scope: PostScope,
    query: PageQuery,
) -> HttpResult<Page<PostView>> {
    let total = state.store.count_posts(scope).await?;
    let window = state.paginator.window(total, PageRequest::from(query));
    let posts = state.store.posts(scope, window.offset, window.limit).await?;
    Ok(Page::from_window(posts, window))
}

/// Every application route; layers are applied by [`crate::build_router`]
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(posts::index))
        .route("/group/:slug/", get(posts::group_posts))
        .route("/create/", get(posts::post_create_form).post(posts::post_create))
        .route("/posts/:post_id/", get(posts::post_detail))
        .route(
            "/posts/:post_id/edit/",
            get(posts::post_edit_form).post(posts::post_edit),
        )
        .route("/posts/:post_id/comment/", axum::routing::post(posts::add_comment))
        .route("/profile/:username/", get(profiles::profile))
        .route("/profile/:username/follow/", get(follows::profile_follow))
        .route("/profile/:username/unfollow/", get(follows::profile_unfollow))
        .route("/follow/", get(follows::follow_index))
        .route("/about/author/", get(about::about_author))
        .route("/about/tech/", get(about::about_tech))
        .route("/health", get(health))
        .fallback(fallback)
}

/// Liveness probe
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let store = match state.store.count_follows().await {
        Ok(_) => "ok",
        Err(_) => "unavailable",
    };
    let cache = match state.page_cache.stats().await {
        Ok(stats) => json!({
            "keys": stats.total_keys,
            "hits": stats.hits,
            "misses": stats.misses,
            "hit_ratio": stats.hit_ratio(),
        }),
        Err(_) => Value::Null,
    };
    Json(json!({
        "status": "healthy",
        "store": store,
        "cache": cache,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn fallback(uri: Uri) -> HttpError {
    HttpError::not_found(format!("page '{}'", uri.path()))
}
