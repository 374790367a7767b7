//! Static pages

use axum::extract::State;
use axum::response::Response;
use serde_json::json;

use crate::auth::CurrentViewer;
use crate::error::HttpResult;
use crate::render::render_page;
use crate::AppState;

pub async fn about_author(State(state): State<AppState>, current: CurrentViewer) -> HttpResult<Response> {
    render_page(
        state.renderer.as_ref(),
        "about/author.html",
        json!({ "viewer": current.context() }),
    )
}

pub async fn about_tech(State(state): State<AppState>, current: CurrentViewer) -> HttpResult<Response> {
    render_page(
        state.renderer.as_ref(),
        "about/tech.html",
        json!({ "viewer": current.context() }),
    )
}
