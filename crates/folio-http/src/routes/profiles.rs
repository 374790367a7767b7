//! Author profile pages

use axum::extract::{Path, State};
use axum::response::Response;
use folio_store::{PostScope, User};
use serde_json::json;

use super::{posts_page, PageParam};
use crate::auth::CurrentViewer;
use crate::error::{HttpError, HttpResult};
use crate::render::render_page;
use crate::AppState;

pub(crate) async fn load_author(state: &AppState, username: &str) -> HttpResult<User> {
    state
        .store
        .user_by_username(username)
        .await?
        .ok_or_else(|| HttpError::not_found(format!("user '{}'", username)))
}

/// An author's posts, their post count and whether the viewer follows them
pub async fn profile(
    State(state): State<AppState>,
    current: CurrentViewer,
    Path(username): Path<String>,
    PageParam(query): PageParam,
) -> HttpResult<Response> {
    let author = load_author(&state, &username).await?;
    let scope = PostScope::Author(author.id);
    let count = state.store.count_posts(scope).await?;
    let following = state.social.is_following(&current.viewer, author.id).await?;
    let page_obj = posts_page(&state, scope, query).await?;
    render_page(
        state.renderer.as_ref(),
        "posts/profile.html",
        json!({
            "viewer": current.context(),
            "author": author,
            "count": count,
            "following": following,
            "page_obj": page_obj,
        }),
    )
}
