//! The subscription feed and follow toggles

use axum::extract::{Path, State};
use axum::response::Response;
use folio_store::PageRequest;
use serde_json::json;

use super::profiles::load_author;
use super::{profile_url, Found, PageParam};
use crate::auth::{CurrentViewer, RequireUser};
use crate::error::HttpResult;
use crate::render::render_page;
use crate::AppState;

/// Posts by every author the requester follows
pub async fn follow_index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    PageParam(query): PageParam,
) -> HttpResult<Response> {
    let page_obj = state
        .social
        .feed_page(user.id, state.paginator, PageRequest::from(query))
        .await?;
    let current = CurrentViewer::authenticated(user);
    render_page(
        state.renderer.as_ref(),
        "posts/follow.html",
        json!({ "viewer": current.context(), "page_obj": page_obj }),
    )
}

/// Always lands on the author's profile, even when nothing changed
pub async fn profile_follow(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(username): Path<String>,
) -> HttpResult<Found> {
    let author = load_author(&state, &username).await?;
    state.social.follow(user.id, author.id).await?;
    Ok(Found::to(profile_url(&author.username)))
}

pub async fn profile_unfollow(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(username): Path<String>,
) -> HttpResult<Found> {
    let author = load_author(&state, &username).await?;
    state.social.unfollow(user.id, author.id).await?;
    Ok(Found::to(profile_url(&author.username)))
}
